use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to load PDF: {0}")]
    PdfLoad(#[from] lopdf::Error),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("no pages available after applying selection")]
    NoPagesSelected,

    #[error("header row {index} is out of range ({available} logical rows)")]
    HeaderRowOutOfRange { index: usize, available: usize },

    #[error("template '{}' could not be read: {source}", path.display())]
    TemplateRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failure to run a single worksheet action. These are reported to the
/// caller as warnings; the action is skipped and the worksheet is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("missing {parameter} for {action}")]
    MissingParameter {
        action: &'static str,
        parameter: &'static str,
    },

    #[error("invalid {parameter} for {action}: {reason}")]
    InvalidParameter {
        action: &'static str,
        parameter: &'static str,
        reason: String,
    },

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("invalid row pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}
