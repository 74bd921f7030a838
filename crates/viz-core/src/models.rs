use serde::{Deserialize, Serialize};

use crate::error::LineErrorKind;

/// Line that opens a ledger block.
pub const START_MARKER: &str = "# start";

/// Line that closes a ledger block.
pub const END_MARKER: &str = "# end";

/// Records costing at least this much become highlight entries.
pub const HIGHLIGHT_THRESHOLD: f64 = 30.0;

/// Categories below this share of the grand total (in percent) fold into
/// the "other" bucket.
pub const COLLAPSE_THRESHOLD_PERCENT: f64 = 3.0;

/// Maximum number of entries in the ranking chart.
pub const TOP_N: usize = 5;

/// One parsed expense line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Date as written in the ledger, normally `YYYY-MM-DD`.
    pub date: String,
    pub category: String,
    pub name: String,
    /// Non-negative amount.
    pub amount: f64,
    /// Free-text tail of the line, or the locale's "no description" label.
    pub description: String,
}

impl Record {
    /// Render the record back into ledger grammar.
    ///
    /// The description tail is omitted when it is the `labels` sentinel.
    pub fn to_ledger_line(&self, labels: &Labels) -> String {
        let mut line = format!(
            "DATE:{} TYPE:{} NAME:{} COST:{:.2}",
            self.date, self.category, self.name, self.amount
        );
        if self.description != labels.no_description {
            line.push(' ');
            line.push_str(&self.description);
        }
        line
    }
}

/// A record reshaped for the "largest expenses" chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightEntry {
    /// Localised date, e.g. `2024月01月05日`.
    pub date_label: String,
    pub name: String,
    pub amount: f64,
    pub description: String,
}

impl HighlightEntry {
    /// Build a highlight from `record`, localising the date with `labels`.
    pub fn from_record(record: &Record, labels: &Labels) -> Self {
        Self {
            date_label: labels.format_date(&record.date),
            name: record.name.clone(),
            amount: record.amount,
            description: record.description.clone(),
        }
    }

    /// Two-line chart label: date above name.
    pub fn label(&self) -> String {
        format!("{}\n{}", self.date_label, self.name)
    }
}

/// A category's share of the grand total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedCategory {
    pub name: String,
    pub total: f64,
    /// `total / grand_total * 100`, or `0.0` when the grand total is zero.
    pub percentage: f64,
}

/// A ledger line that was skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct LineError {
    /// 1-based line number within the parsed text.
    pub line_number: usize,
    /// The trimmed line text.
    pub line: String,
    pub kind: LineErrorKind,
}

impl std::fmt::Display for LineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {} '{}': {}", self.line_number, self.line, self.kind)
    }
}

// ── Labels ────────────────────────────────────────────────────────────────────

/// Display locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Zh,
    En,
}

impl Locale {
    /// Parse a locale code; unknown codes fall back to [`Locale::Zh`].
    pub fn from_code(code: &str) -> Self {
        match code.to_lowercase().as_str() {
            "en" => Locale::En,
            _ => Locale::Zh,
        }
    }
}

/// Locale-dependent strings used while parsing and reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
    pub locale: Locale,
    /// Name of the synthetic bucket collecting small categories.
    pub other: &'static str,
    /// Description given to records without a free-text tail.
    pub no_description: &'static str,
    /// Replaces every `-` in highlight dates; `None` keeps the date verbatim.
    pub month_marker: Option<&'static str>,
    /// Appended to highlight dates when `month_marker` is set.
    pub day_marker: &'static str,
    /// Currency suffix for amounts.
    pub currency: &'static str,
}

impl Labels {
    pub fn zh() -> Self {
        Self {
            locale: Locale::Zh,
            other: "其他",
            no_description: "无描述",
            month_marker: Some("月"),
            day_marker: "日",
            currency: "元",
        }
    }

    pub fn en() -> Self {
        Self {
            locale: Locale::En,
            other: "other",
            no_description: "no description",
            month_marker: None,
            day_marker: "",
            currency: "",
        }
    }

    pub fn for_locale(locale: Locale) -> Self {
        match locale {
            Locale::Zh => Self::zh(),
            Locale::En => Self::en(),
        }
    }

    /// Localise a ledger date for display.
    ///
    /// `2024-01-05` becomes `2024月01月05日` in `zh`; `en` returns it unchanged.
    pub fn format_date(&self, date: &str) -> String {
        match self.month_marker {
            Some(marker) => format!("{}{}", date.replace('-', marker), self.day_marker),
            None => date.to_string(),
        }
    }
}

impl Default for Labels {
    fn default() -> Self {
        Self::zh()
    }
}
