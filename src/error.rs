//! Error types for har-timeline

use thiserror::Error;

/// Result type alias for har-timeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for har-timeline
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] har_timeline_core::Error),

    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Unknown state: {0}")]
    UnknownState(String),

    #[error("Template error: {0}")]
    TemplateError(#[from] minijinja::Error),
}
