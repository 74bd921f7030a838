//! Report views for the ledger-viz TUI.
//!
//! The report screen stacks a summary header, the category proportion table
//! next to the top-expenses bar chart, and the pipeline log pane.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span, Text},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};
use unicode_width::UnicodeWidthChar;

use viz_core::formatting::{format_amount, format_number, share_percent};
use viz_core::models::{Labels, Locale};
use viz_data::analysis::LedgerReport;

use crate::components::header::Header;
use crate::components::share_bar::ShareBar;
use crate::themes::Theme;

/// Rows reserved for the log pane on the report screen.
const LOG_PANE_HEIGHT: u16 = 10;

/// Columns available to a ranking label.
const RANK_LABEL_WIDTH: usize = 24;

// ── Localised strings ─────────────────────────────────────────────────────────

/// UI strings for one locale.
pub struct UiText {
    pub title: &'static str,
    pub proportion_title: &'static str,
    pub top_title: &'static str,
    pub log_title: &'static str,
    pub col_category: &'static str,
    pub col_amount: &'static str,
    pub col_share: &'static str,
    pub total: &'static str,
    pub records_suffix: &'static str,
    pub categories_suffix: &'static str,
    pub no_data: &'static str,
    pub no_data_hint: &'static str,
    pub running: &'static str,
    pub failed: &'static str,
    pub quit_hint: &'static str,
}

static ZH: UiText = UiText {
    title: "账单可视化",
    proportion_title: "消费类别占比",
    top_title: "前五大单笔消费",
    log_title: "日志",
    col_category: "类别",
    col_amount: "金额",
    col_share: "占比",
    total: "总计",
    records_suffix: "笔",
    categories_suffix: "类",
    no_data: "没有可显示的消费数据",
    no_data_hint: "请检查账目文件中 # start 与 # end 之间的内容。",
    running: "处理中...",
    failed: "处理失败",
    quit_hint: "按 q 或 Ctrl+C 退出",
};

static EN: UiText = UiText {
    title: "LEDGER VIZ",
    proportion_title: "Spending by category",
    top_title: "Top 5 expenses",
    log_title: "Log",
    col_category: "Category",
    col_amount: "Amount",
    col_share: "Share",
    total: "Total",
    records_suffix: "records",
    categories_suffix: "categories",
    no_data: "No expenses to chart",
    no_data_hint: "Check the lines between # start and # end in the ledger file.",
    running: "Processing...",
    failed: "Processing failed",
    quit_hint: "Press 'q' or Ctrl+C to exit",
};

impl UiText {
    pub fn for_locale(locale: Locale) -> &'static Self {
        match locale {
            Locale::Zh => &ZH,
            Locale::En => &EN,
        }
    }
}

// ── Screens ───────────────────────────────────────────────────────────────────

/// Render a finished report with its log.
///
/// `log_scroll` counts lines back from the newest entry.
pub fn render_report(
    frame: &mut Frame,
    area: Rect,
    report: &LedgerReport,
    logs: &[String],
    log_scroll: usize,
    theme: &Theme,
) {
    let text = UiText::for_locale(report.labels.locale);

    if report.is_empty() {
        let [main, log] = Layout::vertical([
            Constraint::Min(6),
            Constraint::Length(LOG_PANE_HEIGHT),
        ])
        .areas(area);
        render_no_data(frame, main, &report.labels, theme);
        render_log_pane(frame, log, text.log_title, logs, log_scroll, theme);
        return;
    }

    let [header, body, log] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(8),
        Constraint::Length(LOG_PANE_HEIGHT),
    ])
    .areas(area);

    let lines = Header::new(text.title, format_amount(report.grand_total(), &report.labels), theme)
        .counts(
            format!("{} {}", report.metadata.records_parsed, text.records_suffix),
            format!("{} {}", report.metadata.categories, text.categories_suffix),
        )
        .width(header.width)
        .to_lines();
    frame.render_widget(Paragraph::new(Text::from(lines)), header);

    let [left, right] = Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)])
        .areas(body);
    render_proportion_table(frame, left, report, theme);
    render_top_expenses(frame, right, report, theme);

    render_log_pane(frame, log, text.log_title, logs, log_scroll, theme);
}

/// Render the log while the pipeline is still running, or after it failed.
pub fn render_progress(
    frame: &mut Frame,
    area: Rect,
    labels: &Labels,
    logs: &[String],
    log_scroll: usize,
    failure: Option<&str>,
    theme: &Theme,
) {
    let text = UiText::for_locale(labels.locale);
    let [status, log] =
        Layout::vertical([Constraint::Length(3), Constraint::Min(3)]).areas(area);

    let line = match failure {
        Some(reason) => Line::from(vec![
            Span::styled(format!("{}: ", text.failed), theme.error),
            Span::styled(reason.to_string(), theme.text),
        ]),
        None => Line::from(Span::styled(text.running, theme.info)),
    };
    frame.render_widget(
        Paragraph::new(line).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.table_border)
                .title(format!(" {} ", text.title)),
        ),
        status,
    );

    render_log_pane(frame, log, text.log_title, logs, log_scroll, theme);
}

/// Render a "no data" placeholder when nothing can be charted.
pub fn render_no_data(frame: &mut Frame, area: Rect, labels: &Labels, theme: &Theme) {
    let text = UiText::for_locale(labels.locale);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(text.no_data, theme.warning)),
        Line::from(""),
        Line::from(Span::styled(text.no_data_hint, theme.dim)),
        Line::from(Span::styled(text.quit_hint, theme.dim)),
    ];
    frame.render_widget(
        Paragraph::new(Text::from(lines)).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", text.title)),
        ),
        area,
    );
}

// ── Panels ────────────────────────────────────────────────────────────────────

/// Table of collapsed categories with share bars and a totals row.
pub fn render_proportion_table(frame: &mut Frame, area: Rect, report: &LedgerReport, theme: &Theme) {
    let labels = &report.labels;
    let text = UiText::for_locale(labels.locale);
    let grand_total = report.grand_total();

    let header = Row::new(
        [text.col_category, text.col_amount, text.col_share]
            .into_iter()
            .map(|h| Cell::from(h).style(theme.table_header)),
    )
    .height(1);

    let mut rows: Vec<Row> = report
        .aggregation
        .collapsed
        .iter()
        .enumerate()
        .map(|(i, category)| {
            let colour = Style::default().fg(theme.slice_color(i));
            let style = if i % 2 == 0 {
                theme.table_row
            } else {
                theme.table_row_alt
            };
            Row::new(vec![
                Cell::from(Line::from(vec![
                    Span::styled("■ ", colour),
                    Span::raw(category.name.clone()),
                ])),
                Cell::from(format_amount(category.total, labels)),
                Cell::from(
                    ShareBar::new(share_percent(category.total, grand_total), colour, theme)
                        .width(16)
                        .to_line(),
                ),
            ])
            .style(style)
        })
        .collect();

    rows.push(
        Row::new(vec![
            Cell::from(text.total),
            Cell::from(format_amount(grand_total, labels)),
            Cell::from(""),
        ])
        .style(theme.table_total),
    );

    let widths = [
        Constraint::Min(10),
        Constraint::Length(14),
        Constraint::Length(24),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.table_border)
                .title(format!(" {} ", text.proportion_title)),
        )
        .style(theme.text);

    frame.render_widget(table, area);
}

/// Horizontal bar chart of the largest highlight entries.
pub fn render_top_expenses(frame: &mut Frame, area: Rect, report: &LedgerReport, theme: &Theme) {
    let text = UiText::for_locale(report.labels.locale);

    let bars: Vec<Bar> = report
        .top_expenses
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let label = truncate_to_width(
                &format!("{} {}", entry.date_label, entry.name),
                RANK_LABEL_WIDTH,
            );
            Bar::default()
                .value(to_cents(entry.amount))
                .label(Line::from(label))
                .text_value(format_number(entry.amount, 2))
                .style(Style::default().fg(theme.slice_color(i)))
                .value_style(theme.bar_value)
        })
        .collect();

    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.table_border)
                .title(format!(" {} ", text.top_title)),
        )
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(1)
        .label_style(theme.label)
        .data(BarGroup::default().bars(&bars));

    frame.render_widget(chart, area);
}

/// Bordered pane showing the tail of `logs`.
pub fn render_log_pane(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    logs: &[String],
    scroll: usize,
    theme: &Theme,
) {
    let visible = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = visible_window(logs, visible, scroll)
        .iter()
        .map(|l| Line::from(Span::styled(l.as_str(), log_style(l, theme))))
        .collect();

    frame.render_widget(
        Paragraph::new(Text::from(lines)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.table_border)
                .title(format!(" {} ", title)),
        ),
        area,
    );
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Slice of `lines` that fits `height` rows, `scroll` lines up from the end.
pub fn visible_window(lines: &[String], height: usize, scroll: usize) -> &[String] {
    let end = lines.len().saturating_sub(scroll);
    let start = end.saturating_sub(height);
    &lines[start..end]
}

/// Cut `s` to at most `max_width` terminal columns, marking the cut with `…`.
pub fn truncate_to_width(s: &str, max_width: usize) -> String {
    let total: usize = s.chars().map(|c| c.width().unwrap_or(0)).sum();
    if total <= max_width {
        return s.to_string();
    }

    let budget = max_width.saturating_sub(1);
    let mut used = 0;
    let mut out = String::new();
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push('…');
    out
}

fn to_cents(amount: f64) -> u64 {
    (amount * 100.0).round().max(0.0) as u64
}

fn log_style(line: &str, theme: &Theme) -> Style {
    if line.contains("失败") || line.to_lowercase().contains("fail") {
        theme.error
    } else {
        theme.text
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
