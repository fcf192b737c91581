//! Error types for codegraph-pta
//!
//! Unsound input and resource exhaustion are errors. Cancellation is not:
//! a cancelled solve still yields a result, marked incomplete.

use crate::config::ConfigError;
use thiserror::Error;

/// Main error type for analysis operations
#[derive(Debug, Error)]
pub enum PtaError {
    /// Input IR is inconsistent; no meaningful fixpoint exists
    #[error("Malformed IR in {procedure}: {detail}")]
    MalformedIr { procedure: String, detail: String },

    /// Entry point names a procedure the program does not contain
    #[error("Unknown entry point: {0}")]
    UnknownEntryPoint(String),

    /// A configured budget was exhausted; retry with a coarser context policy
    #[error("Budget exceeded: more than {limit} {resource}")]
    BudgetExceeded { resource: &'static str, limit: usize },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PtaError {
    /// Create a malformed-IR error
    pub fn malformed(procedure: impl Into<String>, detail: impl Into<String>) -> Self {
        PtaError::MalformedIr {
            procedure: procedure.into(),
            detail: detail.into(),
        }
    }

    /// Whether retrying with a coarser configuration could succeed
    pub fn is_resource_exhaustion(&self) -> bool {
        matches!(self, PtaError::BudgetExceeded { .. })
    }
}

/// Result type alias for analysis operations
pub type Result<T> = std::result::Result<T, PtaError>;
