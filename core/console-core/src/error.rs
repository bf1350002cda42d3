//! Error types for console-core.
//!
//! Only configuration and fixture loading can fail. The polling engine itself
//! degrades to empty or placeholder values instead of returning errors.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    // ─────────────────────────────────────────────────────────────────────
    // Fixture Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Fixture invalid: {0}")]
    FixtureInvalid(String),

    // ─────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parsing error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience type alias for Results using ConsoleError.
pub type Result<T> = std::result::Result<T, ConsoleError>;

impl From<ConsoleError> for String {
    fn from(err: ConsoleError) -> String {
        err.to_string()
    }
}
