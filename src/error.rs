//! Error types for export, rule loading and preferences

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExportError>;

/// Failure conditions surfaced by the export orchestrator.
///
/// `UnsupportedSite` and `NoMessages` are normal negative outcomes; only
/// `Internal` marks something unexpected.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unsupported site: {0}")]
    UnsupportedSite(String),

    #[error("no messages found in the conversation")]
    NoMessages,

    #[error("unexpected internal error: {0}")]
    Internal(String),
}

impl ExportError {
    pub fn code(&self) -> &'static str {
        match self {
            ExportError::UnsupportedSite(_) => "UNSUPPORTED_SITE",
            ExportError::NoMessages => "NO_MESSAGES",
            ExportError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, ExportError::Internal(_))
    }
}

/// Errors raised while loading extraction-rule configuration.
#[derive(Debug, Error)]
pub enum RulesError {
    #[error("could not read selector configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid selector configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors raised while parsing a flavour table.
#[derive(Debug, Error)]
pub enum FlavourError {
    #[error("invalid flavour table: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors reported by a preference store.
#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("preference store unavailable: {0}")]
    Unavailable(String),

    #[error("preference store is read-only: {0}")]
    ReadOnly(String),
}
