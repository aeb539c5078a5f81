use std::fmt;
use thiserror::Error;

use crate::types::FormatKind;

/// Nearest source position an error can be pinned to: a row index for
/// tabular inputs, a character offset for PDF text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLocation {
    Row(usize),
    Offset(usize),
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocation::Row(n) => write!(f, "row {n}"),
            SourceLocation::Offset(n) => write!(f, "offset {n}"),
        }
    }
}

/// Everything that can abort a parse invocation. Row-level issues (bad
/// dates, underivable amounts) are not errors: those rows are dropped.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unsupported file format (filename {filename:?}, content type {content_type:?})")]
    UnsupportedFormat {
        filename: Option<String>,
        content_type: Option<String>,
    },

    #[error("no bank profile registered under parser key '{0}'")]
    UnknownParserKey(String),

    #[error("bank '{parser_key}' has no enabled {format} profile")]
    FormatNotConfigured {
        parser_key: String,
        format: FormatKind,
    },

    #[error("bank '{parser_key}' ({format}): no sufficient header band within rows {from}..={to}")]
    HeaderNotFound {
        parser_key: String,
        format: FormatKind,
        from: usize,
        to: usize,
    },

    #[error(
        "bank '{parser_key}' ({format}): header mapping at {location} lacks \
         date/reference and an amount, credit or debit column"
    )]
    HeaderMappingInsufficient {
        parser_key: String,
        format: FormatKind,
        location: SourceLocation,
    },

    #[error("malformed profile: {0}")]
    MalformedProfile(String),

    #[error("bank '{parser_key}' ({format}): {detail}")]
    IoFailure {
        parser_key: String,
        format: FormatKind,
        detail: String,
    },
}
