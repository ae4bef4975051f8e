//! Error types for the relay bot

use thiserror::Error;

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

/// The only text a user ever sees when a turn fails.
pub const APOLOGY: &str = "Sorry, I'm having trouble right now. Please try again.";

#[derive(Error, Debug)]
pub enum RelayError {

    // =============================
    // Turn Failures
    // =============================

    #[error("Storage failure: {0}")]
    Storage(String),

    #[error("Upstream failure: {0}")]
    Upstream(String),

    #[error("Transport failure: {0}")]
    Transport(String),

    // =============================
    // Startup Errors
    // =============================

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Persona error: {0}")]
    Persona(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Coarse classification used for logging and turn outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Storage,
    Upstream,
    Transport,
    Other,
}

impl RelayError {
    pub fn kind(&self) -> FailureKind {
        match self {
            RelayError::Storage(_) | RelayError::DatabaseError(_) => FailureKind::Storage,
            RelayError::Upstream(_) => FailureKind::Upstream,
            RelayError::Transport(_) => FailureKind::Transport,
            _ => FailureKind::Other,
        }
    }
}

/// Render an error together with its `source()` chain on one line.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
