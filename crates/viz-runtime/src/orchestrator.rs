//! Async pipeline orchestrator.
//!
//! Runs prompt → completion → ledger extraction → save → analysis in a tokio
//! task, forwarding user-facing log lines and the final [`LedgerReport`]
//! through an `mpsc` channel so the UI never shares state with the worker.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use viz_core::error::{Result, VizError};
use viz_core::models::{Labels, Locale};
use viz_core::settings::Settings;
use viz_core::sink::{LogSink, TracingSink};
use viz_data::analysis::{analyze_ledger, LedgerReport};
use viz_data::parser::{extract_ledger_block, read_ledger_file};

use crate::backend::CompletionBackend;
use crate::prompt::PromptBuilder;

// ── Public types ──────────────────────────────────────────────────────────────

/// Messages sent from the pipeline task to the presentation layer.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// One user-facing log line.
    Log(String),
    /// The pipeline completed.
    Finished(Box<LedgerReport>),
    /// The pipeline stopped with an error.
    Failed(String),
}

/// Which stages the pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineMode {
    /// Ask the model to classify the notes, then report.
    Classify,
    /// Report on an existing ledger file.
    Report,
}

impl PipelineMode {
    pub fn from_name(name: &str) -> Self {
        match name {
            "report" => PipelineMode::Report,
            _ => PipelineMode::Classify,
        }
    }
}

/// Paths and display options for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub mode: PipelineMode,
    pub categories_file: PathBuf,
    pub content_file: PathBuf,
    pub prompt_file: PathBuf,
    pub ledger_file: PathBuf,
    pub output_dir: PathBuf,
    pub labels: Labels,
}

impl PipelineConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            mode: PipelineMode::from_name(&settings.mode),
            categories_file: settings.categories_file.clone(),
            content_file: settings.content_file.clone(),
            prompt_file: settings.prompt_file.clone(),
            ledger_file: settings.ledger_file.clone(),
            output_dir: settings.output_dir.clone(),
            labels: settings.labels(),
        }
    }
}

/// [`LogSink`] that forwards every line as [`PipelineEvent::Log`] and
/// mirrors it to the tracing log.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<PipelineEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<PipelineEvent>) -> Self {
        Self { tx }
    }
}

impl LogSink for ChannelSink {
    fn log(&self, message: &str) {
        TracingSink.log(message);
        // A closed receiver means the UI is gone; nothing left to inform.
        let _ = self.tx.send(PipelineEvent::Log(message.to_string()));
    }
}

// ── PipelineOrchestrator ──────────────────────────────────────────────────────

/// Background pipeline coordinator.
///
/// Call [`PipelineOrchestrator::start`] to run the pipeline in a dedicated
/// tokio task, or [`PipelineOrchestrator::run`] to drive it inline.
pub struct PipelineOrchestrator {
    backend: Arc<dyn CompletionBackend>,
    config: PipelineConfig,
}

impl PipelineOrchestrator {
    pub fn new(backend: Arc<dyn CompletionBackend>, config: PipelineConfig) -> Self {
        Self { backend, config }
    }

    /// Spawn the pipeline.
    ///
    /// Returns the event receiver and a [`PipelineHandle`] for the task.
    /// Exactly one `Finished` or `Failed` event ends the stream.
    pub fn start(self) -> (mpsc::UnboundedReceiver<PipelineEvent>, PipelineHandle) {
        let (tx, rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            let sink = ChannelSink::new(tx.clone());
            let event = match self.run(&sink).await {
                Ok(report) => PipelineEvent::Finished(Box::new(report)),
                Err(e) => {
                    warn!(error = %e, "pipeline failed");
                    sink.log(&format!("{}: {}", self.text().failed, e));
                    PipelineEvent::Failed(e.to_string())
                }
            };
            if tx.send(event).is_err() {
                debug!("pipeline receiver dropped before completion");
            }
        });

        (rx, PipelineHandle { handle })
    }

    /// Run every stage for the configured mode.
    pub async fn run(&self, sink: &dyn LogSink) -> Result<LedgerReport> {
        let ledger = match self.config.mode {
            PipelineMode::Classify => self.classify(sink).await?,
            PipelineMode::Report => {
                sink.log(&format!(
                    "{}: {}",
                    self.text().reading,
                    self.config.ledger_file.display()
                ));
                read_ledger_file(&self.config.ledger_file)?
            }
        };

        self.report(&ledger, sink)
    }

    // ── Private implementation ────────────────────────────────────────────

    /// Build the prompt, ask the model and save the extracted ledger.
    async fn classify(&self, sink: &dyn LogSink) -> Result<String> {
        let text = self.text();

        sink.log(text.building_prompt);
        let prompt = PromptBuilder::new(
            &self.config.categories_file,
            &self.config.content_file,
            &self.config.prompt_file,
        )
        .build()
        .await;
        debug!("prompt:\n{}", prompt);

        sink.log(&format!("{} ({})", text.calling_model, self.backend.name()));
        let response = self.backend.complete(&prompt).await?;
        sink.log(text.model_done);

        let ledger = extract_ledger_block(&response)
            .ok_or(VizError::MissingLedger)?
            .to_string();

        save_ledger(&self.config.ledger_file, &ledger).await?;
        info!("ledger saved to {}", self.config.ledger_file.display());
        sink.log(&format!(
            "{}: {}",
            text.saved,
            self.config.ledger_file.display()
        ));

        Ok(ledger)
    }

    /// Analyse the ledger text and write the chart data.
    fn report(&self, ledger: &str, sink: &dyn LogSink) -> Result<LedgerReport> {
        let text = self.text();
        let report = analyze_ledger(ledger, &self.config.labels, sink);

        if report.is_empty() {
            sink.log(text.no_data);
        }

        let path = report.write_chart_payload(&self.config.output_dir)?;
        sink.log(&format!("{}: {}", text.chart_saved, path.display()));

        Ok(report)
    }

    fn text(&self) -> &'static PipelineText {
        PipelineText::for_locale(self.config.labels.locale)
    }
}

// ── PipelineHandle ────────────────────────────────────────────────────────────

/// A handle to the background pipeline task.
pub struct PipelineHandle {
    handle: tokio::task::JoinHandle<()>,
}

impl PipelineHandle {
    /// Immediately abort the pipeline.
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Wait for the task to finish.
    pub async fn wait(self) {
        if let Err(e) = self.handle.await {
            if !e.is_cancelled() {
                warn!(error = %e, "pipeline task panicked");
            }
        }
    }
}

/// Ask `backend` whether it is reachable, logging the outcome to `sink`.
pub async fn check_connection(
    backend: &dyn CompletionBackend,
    labels: &Labels,
    sink: &dyn LogSink,
) -> bool {
    let text = PipelineText::for_locale(labels.locale);
    sink.log(&format!("{} ({})", text.checking, backend.name()));
    let ok = backend.health_check().await;
    sink.log(if ok { text.check_ok } else { text.check_failed });
    ok
}

// ── Private helpers ───────────────────────────────────────────────────────────

async fn save_ledger(path: &Path, ledger: &str) -> Result<()> {
    let write_error = |source: std::io::Error| VizError::FileWrite {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_error)?;
    }
    tokio::fs::write(path, ledger).await.map_err(write_error)
}

struct PipelineText {
    building_prompt: &'static str,
    calling_model: &'static str,
    model_done: &'static str,
    saved: &'static str,
    reading: &'static str,
    no_data: &'static str,
    chart_saved: &'static str,
    failed: &'static str,
    checking: &'static str,
    check_ok: &'static str,
    check_failed: &'static str,
}

static ZH_TEXT: PipelineText = PipelineText {
    building_prompt: "正在生成处理提示...",
    calling_model: "正在处理账目...",
    model_done: "AI 处理完成",
    saved: "数据已保存到",
    reading: "读取账目文件",
    no_data: "没有可显示的消费数据",
    chart_saved: "图表数据已保存为",
    failed: "处理失败",
    checking: "测试API连接...",
    check_ok: "API 连接正常",
    check_failed: "API 连接失败",
};

static EN_TEXT: PipelineText = PipelineText {
    building_prompt: "Building prompt...",
    calling_model: "Classifying expenses...",
    model_done: "Model response received",
    saved: "Ledger saved to",
    reading: "Reading ledger file",
    no_data: "No expenses to chart",
    chart_saved: "Chart data saved to",
    failed: "Processing failed",
    checking: "Testing API connection...",
    check_ok: "API connection OK",
    check_failed: "API connection failed",
};

impl PipelineText {
    fn for_locale(locale: Locale) -> &'static Self {
        match locale {
            Locale::Zh => &ZH_TEXT,
            Locale::En => &EN_TEXT,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
