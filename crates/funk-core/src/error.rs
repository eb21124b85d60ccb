//! Error types for input parsing.

use thiserror::Error;

/// Result type alias for core parsing operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while reading user input or inventory files.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid walltime: {0}")]
    Walltime(String),

    #[error("invalid date: {0}")]
    Date(String),

    #[error("invalid horizon: {0}")]
    Horizon(String),

    #[error("invalid resource request: {0}")]
    Request(String),

    #[error("invalid booking on {resource}: {reason}")]
    Booking { resource: String, reason: String },

    #[error("inventory error: {0}")]
    Inventory(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
