use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by ledger-viz.
#[derive(Error, Debug)]
pub enum VizError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file could not be written to disk.
    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed or produced.
    #[error("Failed to process JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The completion API returned an error or an unusable response.
    #[error("Completion API error: {0}")]
    Api(String),

    /// A model response did not contain a `# start` … `# end` block.
    #[error("No ledger block found in model response")]
    MissingLedger,

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the ledger-viz crates.
pub type Result<T> = std::result::Result<T, VizError>;

/// Why a single ledger line was rejected.
///
/// These never abort a parse; the line is skipped and reported.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LineErrorKind {
    /// Fewer than the four mandatory `KEY:VALUE` fields.
    #[error("expected at least 4 fields, found {found}")]
    TooFewFields { found: usize },

    /// A mandatory field has no `:` separator.
    #[error("field {index} ({token:?}) has no ':' separator")]
    MissingColon { index: usize, token: String },

    /// The `COST` value is not a number.
    #[error("invalid amount {0:?}")]
    InvalidAmount(String),

    /// The `COST` value parsed but is negative.
    #[error("amount must be a non-negative number, got {0}")]
    NegativeAmount(String),

    /// The `COST` value parsed to NaN or an infinity.
    #[error("amount must be a finite number, got {0}")]
    NonFiniteAmount(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = VizError::FileRead {
            path: PathBuf::from("/some/config.txt"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/some/config.txt"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_file_write() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = VizError::FileWrite {
            path: PathBuf::from("/out/chart_data.json"),
            source: io_err,
        };
        assert!(err.to_string().starts_with("Failed to write file /out/chart_data.json"));
    }

    #[test]
    fn test_error_display_api() {
        let err = VizError::Api("401 Unauthorized".to_string());
        assert_eq!(err.to_string(), "Completion API error: 401 Unauthorized");
    }

    #[test]
    fn test_error_display_missing_ledger() {
        assert_eq!(
            VizError::MissingLedger.to_string(),
            "No ledger block found in model response"
        );
    }

    #[test]
    fn test_error_display_config() {
        let err = VizError::Config("missing api key".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing api key");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: VizError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: VizError = json_err.into();
        assert!(err.to_string().contains("Failed to process JSON"));
    }

    #[test]
    fn test_line_error_kind_display() {
        assert_eq!(
            LineErrorKind::TooFewFields { found: 2 }.to_string(),
            "expected at least 4 fields, found 2"
        );
        assert_eq!(
            LineErrorKind::InvalidAmount("abc".to_string()).to_string(),
            "invalid amount \"abc\""
        );
        assert_eq!(
            LineErrorKind::MissingColon {
                index: 1,
                token: "TYPE".to_string()
            }
            .to_string(),
            "field 1 (\"TYPE\") has no ':' separator"
        );
        assert_eq!(
            LineErrorKind::NegativeAmount("-5".to_string()).to_string(),
            "amount must be a non-negative number, got -5"
        );
        assert_eq!(
            LineErrorKind::NonFiniteAmount("NaN".to_string()).to_string(),
            "amount must be a finite number, got NaN"
        );
    }
}
