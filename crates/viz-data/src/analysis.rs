//! Main analysis pipeline for ledger-viz.
//!
//! Parses a ledger text, aggregates it, selects the top expenses and writes
//! the per-category detail log, returning a [`LedgerReport`] ready for the
//! UI layer or for serialisation to disk.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use viz_core::error::{Result, VizError};
use viz_core::formatting::{format_amount, percentage};
use viz_core::models::{HighlightEntry, Labels, LineError, Locale, Record};
use viz_core::sink::LogSink;

use crate::aggregator::{Aggregation, CategoryAggregator, CategoryGroup};
use crate::parser::parse_ledger;

/// File name of the chart data written into the output directory.
pub const CHART_DATA_FILE: &str = "chart_data.json";

// ── Public types ──────────────────────────────────────────────────────────────

/// Metadata produced alongside the report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportMetadata {
    /// ISO-8601 timestamp when this report was generated.
    pub generated_at: String,
    /// Number of records parsed.
    pub records_parsed: usize,
    /// Number of ledger lines skipped.
    pub lines_skipped: usize,
    /// Number of distinct categories.
    pub categories: usize,
}

/// The complete output of [`analyze_ledger`].
#[derive(Debug, Clone)]
pub struct LedgerReport {
    /// Records grouped by category, first-seen order.
    pub groups: Vec<CategoryGroup>,
    /// Totals, shares and the collapsed proportion view.
    pub aggregation: Aggregation,
    /// Up to five largest highlight entries, largest first.
    pub top_expenses: Vec<HighlightEntry>,
    /// Lines that failed to parse.
    pub errors: Vec<LineError>,
    pub metadata: ReportMetadata,
    pub labels: Labels,
}

/// One slice of the proportion chart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategorySlice {
    pub name: String,
    pub total: f64,
    /// Share of the grand total, rounded to two decimals.
    pub percentage: f64,
}

/// One bar of the ranking chart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedExpense {
    /// Display date and item name separated by a newline.
    pub label: String,
    pub amount: f64,
}

/// Data handed to chart renderers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartPayload {
    pub total: f64,
    pub categories: Vec<CategorySlice>,
    pub top: Vec<RankedExpense>,
    pub metadata: ReportMetadata,
}

impl LedgerReport {
    pub fn grand_total(&self) -> f64 {
        self.aggregation.grand_total
    }

    /// `true` when there is nothing to chart.
    pub fn is_empty(&self) -> bool {
        self.aggregation.collapsed.is_empty()
    }

    /// Every parsed record in input order within its category.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.groups.iter().flat_map(|g| g.records.iter())
    }

    /// Build the renderer payloads from this report.
    pub fn chart_payload(&self) -> ChartPayload {
        let grand_total = self.aggregation.grand_total;
        ChartPayload {
            total: grand_total,
            categories: self
                .aggregation
                .collapsed
                .iter()
                .map(|c| CategorySlice {
                    name: c.name.clone(),
                    total: c.total,
                    percentage: percentage(c.total, grand_total, 2),
                })
                .collect(),
            top: self
                .top_expenses
                .iter()
                .map(|h| RankedExpense {
                    label: h.label(),
                    amount: h.amount,
                })
                .collect(),
            metadata: self.metadata.clone(),
        }
    }

    /// Write [`ChartPayload`] as pretty JSON to `dir/chart_data.json`,
    /// creating `dir` if needed.  Returns the written path.
    pub fn write_chart_payload(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(CHART_DATA_FILE);
        let json = serde_json::to_string_pretty(&self.chart_payload())?;

        std::fs::create_dir_all(dir)
            .and_then(|_| std::fs::write(&path, json))
            .map_err(|source| VizError::FileWrite {
                path: path.clone(),
                source,
            })?;

        Ok(path)
    }
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Run the full analysis pipeline over a ledger text.
///
/// 1. Parse the ledger block (skipped lines go to `sink`).
/// 2. Group and aggregate the records.
/// 3. Select the top five highlight entries.
/// 4. Write the per-category detail log to `sink`.
pub fn analyze_ledger(text: &str, labels: &Labels, sink: &dyn LogSink) -> LedgerReport {
    let parsed = parse_ledger(text, labels, sink);

    let groups = CategoryAggregator::group(&parsed.records);
    let aggregation = CategoryAggregator::aggregate_groups(&groups, labels.other);
    let top_expenses = CategoryAggregator::top_highlights(&parsed.highlights);

    let metadata = ReportMetadata {
        generated_at: chrono::Utc::now().to_rfc3339(),
        records_parsed: parsed.records.len(),
        lines_skipped: parsed.errors.len(),
        categories: groups.len(),
    };

    debug!(
        "Analysis: {} records, {} categories, grand total {:.2}",
        metadata.records_parsed, metadata.categories, aggregation.grand_total
    );

    let report = LedgerReport {
        groups,
        aggregation,
        top_expenses,
        errors: parsed.errors,
        metadata,
        labels: labels.clone(),
    };

    log_category_details(&report, sink);
    report
}

/// Write the per-category breakdown to `sink`.
pub fn log_category_details(report: &LedgerReport, sink: &dyn LogSink) {
    let labels = &report.labels;
    let text = Messages::for_locale(labels.locale);

    sink.log(text.details_header);
    for group in report.groups.iter().filter(|g| !g.records.is_empty()) {
        sink.log(&format!("\n{}: {}", text.category, group.name));
        sink.log(&format!(
            "{}: {}",
            text.total,
            format_amount(group.total(), labels)
        ));
        sink.log(&format!("{}: {}", text.count, group.count()));
        sink.log(text.records);
        for record in &group.records {
            sink.log(&format!("  - {}: {}", text.date, record.date));
            sink.log(&format!("    {}: {}", text.item, record.name));
            sink.log(&format!(
                "    {}: {}",
                text.amount,
                format_amount(record.amount, labels)
            ));
            sink.log(&format!("    {}: {}", text.description, record.description));
            sink.log("    -------------------");
        }
    }
    sink.log(text.details_footer);
    sink.log(&format!(
        "{}: {}",
        text.grand_total,
        format_amount(report.grand_total(), labels)
    ));
}

// ── Internal helpers ──────────────────────────────────────────────────────────

struct Messages {
    details_header: &'static str,
    details_footer: &'static str,
    category: &'static str,
    total: &'static str,
    count: &'static str,
    records: &'static str,
    date: &'static str,
    item: &'static str,
    amount: &'static str,
    description: &'static str,
    grand_total: &'static str,
}

impl Messages {
    fn for_locale(locale: Locale) -> Self {
        match locale {
            Locale::Zh => Self {
                details_header: "\n=== 详细分类消费记录 ===",
                details_footer: "\n=== 分类详情结束 ===",
                category: "分类",
                total: "总金额",
                count: "交易次数",
                records: "具体消费记录:",
                date: "日期",
                item: "项目",
                amount: "金额",
                description: "描述",
                grand_total: "总计",
            },
            Locale::En => Self {
                details_header: "\n=== Expenses by category ===",
                details_footer: "\n=== End of category details ===",
                category: "Category",
                total: "Total",
                count: "Transactions",
                records: "Records:",
                date: "Date",
                item: "Item",
                amount: "Amount",
                description: "Description",
                grand_total: "Grand total",
            },
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
