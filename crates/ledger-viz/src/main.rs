mod bootstrap;

use std::sync::Arc;

use anyhow::{bail, Result};
use tokio::sync::mpsc;
use viz_core::formatting::{format_amount, format_percent, share_percent};
use viz_core::models::{Labels, Locale};
use viz_core::settings::Settings;
use viz_data::analysis::LedgerReport;
use viz_runtime::backend::{mask_key, CompletionBackend, OpenAiCompatibleBackend};
use viz_runtime::orchestrator::{
    check_connection, PipelineConfig, PipelineEvent, PipelineOrchestrator,
};
use viz_ui::app::App;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    // The TUI owns the terminal, so its log goes to a file.
    let log_file = settings
        .log_file
        .clone()
        .or_else(|| (!settings.plain).then(bootstrap::default_log_file));
    bootstrap::setup_logging(&settings.log_level, log_file.as_deref())?;

    tracing::info!("ledger-viz v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Mode: {}, Model: {}, Base URL: {}, Key: {}",
        settings.mode,
        settings.model,
        settings.base_url,
        mask_key(&settings.api_key)
    );

    settings.validate()?;

    let labels = settings.labels();
    let backend: Arc<dyn CompletionBackend> = Arc::new(OpenAiCompatibleBackend::with_api_key(
        &settings.base_url,
        &settings.model,
        &settings.api_key,
    ));

    match settings.mode.as_str() {
        "check" => {
            let print = |line: &str| println!("{}", line);
            if !check_connection(backend.as_ref(), &labels, &print).await {
                bail!("API connection check failed");
            }
        }

        "classify" | "report" => {
            let orchestrator =
                PipelineOrchestrator::new(backend, PipelineConfig::from_settings(&settings));
            let (rx, handle) = orchestrator.start();

            if settings.plain {
                let outcome = run_plain(rx, &labels).await;
                handle.wait().await;
                outcome?;
            } else {
                let app = App::new(&settings.theme, labels);

                // In raw mode Ctrl+C is a key event; SIGINT from elsewhere
                // cancels the UI future, which restores the terminal on drop.
                tokio::select! {
                    result = app.run_report(rx) => {
                        handle.abort();
                        result?;
                    }
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("Ctrl+C received; stopping pipeline");
                        handle.abort();
                    }
                }
            }
        }

        unknown => bail!("Unknown mode: {}", unknown),
    }

    Ok(())
}

/// Print pipeline events to stdout and finish with a text summary.
async fn run_plain(mut rx: mpsc::UnboundedReceiver<PipelineEvent>, labels: &Labels) -> Result<()> {
    while let Some(event) = rx.recv().await {
        match event {
            PipelineEvent::Log(line) => println!("{}", line),
            PipelineEvent::Finished(report) => {
                for line in summary_lines(&report) {
                    println!("{}", line);
                }
                return Ok(());
            }
            PipelineEvent::Failed(reason) => bail!(reason),
        }
    }
    bail!(match labels.locale {
        Locale::Zh => "处理意外中止",
        Locale::En => "pipeline stopped unexpectedly",
    })
}

/// Text rendition of the two charts.
fn summary_lines(report: &LedgerReport) -> Vec<String> {
    let labels = &report.labels;
    let (share_title, top_title) = match labels.locale {
        Locale::Zh => ("消费类别占比", "前五大单笔消费"),
        Locale::En => ("Spending by category", "Top 5 expenses"),
    };

    let mut lines = vec![String::new(), format!("== {} ==", share_title)];
    for category in &report.aggregation.collapsed {
        lines.push(format!(
            "{}  {}  {}",
            category.name,
            format_amount(category.total, labels),
            format_percent(share_percent(category.total, report.grand_total()))
        ));
    }

    lines.push(String::new());
    lines.push(format!("== {} ==", top_title));
    for (i, entry) in report.top_expenses.iter().enumerate() {
        lines.push(format!(
            "{}. {} {}  {}",
            i + 1,
            entry.date_label,
            entry.name,
            format_amount(entry.amount, labels)
        ));
    }
    lines
}
