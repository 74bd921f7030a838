//! Application state and TUI event loop for ledger-viz.
//!
//! [`App`] owns the theme, the collected pipeline log and the pipeline
//! status.  It renders progress while the pipeline runs and the report once
//! it has finished.

use std::io;
use std::time::Duration;

use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Frame, Terminal};
use tokio::sync::mpsc;

use viz_core::models::Labels;
use viz_data::analysis::LedgerReport;
use viz_runtime::orchestrator::PipelineEvent;

use crate::chart_view;
use crate::themes::Theme;

// ── AppStatus ─────────────────────────────────────────────────────────────────

/// Where the pipeline is, as seen by the UI.
#[derive(Debug, Clone)]
pub enum AppStatus {
    Running,
    Finished(Box<LedgerReport>),
    Failed(String),
}

// ── App ───────────────────────────────────────────────────────────────────────

/// Root application state for the ledger-viz TUI.
pub struct App {
    pub theme: Theme,
    pub labels: Labels,
    pub status: AppStatus,
    /// Every log line received so far.
    pub logs: Vec<String>,
    /// Lines scrolled back from the newest log entry.
    pub log_scroll: usize,
    /// Set to `true` to break out of the event loop on the next iteration.
    pub should_quit: bool,
}

impl App {
    pub fn new(theme_name: &str, labels: Labels) -> Self {
        Self {
            theme: Theme::from_name(theme_name),
            labels,
            status: AppStatus::Running,
            logs: Vec::new(),
            log_scroll: 0,
            should_quit: false,
        }
    }

    /// Run the TUI until the user quits, consuming pipeline events from `rx`.
    ///
    /// Each tick drains pending key presses and pipeline events without
    /// blocking, then sleeps on the tokio timer, so the future stays
    /// cancellable.  The loop exits on `q`, `Q`, `Esc` or `Ctrl+C`; the
    /// report stays on screen after the pipeline finishes.  The terminal is
    /// restored on every exit path, including errors and cancellation.
    pub async fn run_report(
        mut self,
        mut rx: mpsc::UnboundedReceiver<PipelineEvent>,
    ) -> io::Result<()> {
        enable_raw_mode()?;
        let _guard = TerminalGuard;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

        let tick_rate = Duration::from_millis(50);
        let mut channel_open = true;

        loop {
            terminal.draw(|frame| self.render(frame))?;

            while event::poll(Duration::ZERO)? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key(key);
                }
            }

            if channel_open {
                channel_open = self.drain_events(&mut rx);
            }

            if self.should_quit {
                return Ok(());
            }

            tokio::time::sleep(tick_rate).await;
        }
    }

    /// Apply every event already queued on `rx`.
    ///
    /// Returns `false` once the sender is gone.
    pub fn drain_events(&mut self, rx: &mut mpsc::UnboundedReceiver<PipelineEvent>) -> bool {
        loop {
            match rx.try_recv() {
                Ok(event) => self.handle_event(event),
                Err(mpsc::error::TryRecvError::Empty) => return true,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.handle_disconnect();
                    return false;
                }
            }
        }
    }

    /// Apply one pipeline event.
    pub fn handle_event(&mut self, event: PipelineEvent) {
        match event {
            PipelineEvent::Log(line) => {
                // Multi-line messages become separate log rows.
                self.logs.extend(line.split('\n').map(str::to_string));
            }
            PipelineEvent::Finished(report) => self.status = AppStatus::Finished(report),
            PipelineEvent::Failed(reason) => self.status = AppStatus::Failed(reason),
        }
    }

    /// Apply one key press.
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Up | KeyCode::Char('k') => {
                self.log_scroll = (self.log_scroll + 1).min(self.logs.len());
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.log_scroll = self.log_scroll.saturating_sub(1);
            }
            KeyCode::End => self.log_scroll = 0,
            _ => {}
        }
    }

    /// The sender went away without a final event.
    fn handle_disconnect(&mut self) {
        if matches!(self.status, AppStatus::Running) {
            self.status = AppStatus::Failed("pipeline stopped unexpectedly".to_string());
        }
    }

    /// Render the current application state into `frame`.
    pub fn render(&self, frame: &mut Frame) {
        let area = frame.area();
        match &self.status {
            AppStatus::Finished(report) => chart_view::render_report(
                frame,
                area,
                report,
                &self.logs,
                self.log_scroll,
                &self.theme,
            ),
            AppStatus::Running => chart_view::render_progress(
                frame,
                area,
                &self.labels,
                &self.logs,
                self.log_scroll,
                None,
                &self.theme,
            ),
            AppStatus::Failed(reason) => chart_view::render_progress(
                frame,
                area,
                &self.labels,
                &self.logs,
                self.log_scroll,
                Some(reason),
                &self.theme,
            ),
        }
    }
}

// ── TerminalGuard ───────────────────────────────────────────────────────────

/// Leaves raw mode and the alternate screen when dropped.
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = execute!(stdout, LeaveAlternateScreen, cursor::Show);
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
