//! Ledger text parsing for ledger-viz.
//!
//! Reads the fixed-grammar block between `# start` and `# end` and turns each
//! line into a [`Record`].  Malformed lines are skipped and reported; they
//! never stop the parse.

use std::path::Path;

use tracing::{debug, warn};
use viz_core::error::{LineErrorKind, Result, VizError};
use viz_core::models::{
    HighlightEntry, Labels, LineError, Locale, Record, END_MARKER, HIGHLIGHT_THRESHOLD,
    START_MARKER,
};
use viz_core::sink::LogSink;

// ── Public types ──────────────────────────────────────────────────────────────

/// Everything recovered from one ledger text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedLedger {
    /// Records in input order.
    pub records: Vec<Record>,
    /// Records costing at least [`HIGHLIGHT_THRESHOLD`], in input order.
    pub highlights: Vec<HighlightEntry>,
    /// Lines that were skipped.
    pub errors: Vec<LineError>,
}

impl ParsedLedger {
    /// Sum of every parsed amount.
    pub fn total_amount(&self) -> f64 {
        self.records.iter().map(|r| r.amount).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Where the scanner is relative to the ledger markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    BeforeStart,
    Reading,
    Done,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Parse the ledger block contained in `text`.
///
/// Only lines after the first `# start` and before the next `# end` are
/// read.  Without a start marker the result is empty.  Each rejected line is
/// reported to `sink` and collected in [`ParsedLedger::errors`].
pub fn parse_ledger(text: &str, labels: &Labels, sink: &dyn LogSink) -> ParsedLedger {
    let mut parsed = ParsedLedger::default();
    let mut state = ParseState::BeforeStart;

    for (index, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();

        match state {
            ParseState::BeforeStart => {
                if line == START_MARKER {
                    state = ParseState::Reading;
                }
                continue;
            }
            ParseState::Reading => {
                if line == END_MARKER {
                    state = ParseState::Done;
                    break;
                }
                // A repeated start marker changes nothing.
                if line.is_empty() || line == START_MARKER {
                    continue;
                }
            }
            ParseState::Done => break,
        }

        match parse_line(line, labels) {
            Ok(record) => {
                if record.amount >= HIGHLIGHT_THRESHOLD {
                    parsed
                        .highlights
                        .push(HighlightEntry::from_record(&record, labels));
                }
                parsed.records.push(record);
            }
            Err(kind) => {
                let error = LineError {
                    line_number: index + 1,
                    line: line.to_string(),
                    kind,
                };
                warn!("skipping ledger {}", error);
                sink.log(&line_failure_message(&error, labels));
                parsed.errors.push(error);
            }
        }
    }

    if state == ParseState::BeforeStart {
        debug!("no '{}' marker found; nothing to parse", START_MARKER);
    }

    debug!(
        "Parsed {} records ({} highlights, {} skipped lines)",
        parsed.records.len(),
        parsed.highlights.len(),
        parsed.errors.len()
    );

    parsed
}

/// Parse a single ledger line.
///
/// The first four space-separated tokens are `DATE`, `TYPE`, `NAME` and
/// `COST`, read by position; each value is whatever follows the token's
/// first `:`.  Remaining tokens form the description.
pub fn parse_line(line: &str, labels: &Labels) -> std::result::Result<Record, LineErrorKind> {
    let parts: Vec<&str> = line.split(' ').collect();
    if parts.len() < 4 {
        return Err(LineErrorKind::TooFewFields { found: parts.len() });
    }

    let value = |index: usize| {
        parts[index]
            .split_once(':')
            .map(|(_, v)| v)
            .ok_or_else(|| LineErrorKind::MissingColon {
                index,
                token: parts[index].to_string(),
            })
    };

    let date = value(0)?;
    let category = value(1)?;
    let name = value(2)?;
    let raw_amount = value(3)?;

    let amount: f64 = raw_amount
        .parse()
        .map_err(|_| LineErrorKind::InvalidAmount(raw_amount.to_string()))?;
    if !amount.is_finite() {
        return Err(LineErrorKind::NonFiniteAmount(raw_amount.to_string()));
    }
    if amount < 0.0 {
        return Err(LineErrorKind::NegativeAmount(raw_amount.to_string()));
    }

    let description = if parts.len() > 4 {
        parts[4..].join(" ")
    } else {
        labels.no_description.to_string()
    };

    Ok(Record {
        date: date.to_string(),
        category: category.to_string(),
        name: name.to_string(),
        amount,
        description,
    })
}

/// Cut the ledger block out of a model response.
///
/// Returns the text from the first `# start` up to and including the first
/// `# end` that follows it, or `None` when either marker is missing.
pub fn extract_ledger_block(response: &str) -> Option<&str> {
    let start = response.find(START_MARKER)?;
    let end = start + response[start..].find(END_MARKER)? + END_MARKER.len();
    Some(&response[start..end])
}

/// Read a ledger file from disk.
pub fn read_ledger_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| VizError::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn line_failure_message(error: &LineError, labels: &Labels) -> String {
    match labels.locale {
        Locale::Zh => format!("解析行 '{}' 失败: {}", error.line, error.kind),
        Locale::En => format!("Failed to parse line '{}': {}", error.line, error.kind),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
