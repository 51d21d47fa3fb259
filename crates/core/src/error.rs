//! Error types for har-timeline-core

use thiserror::Error;

/// Result type alias for har-timeline-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while normalizing captures or fitting the viewport
#[derive(Error, Debug)]
pub enum Error {
    #[error("HAR document has no pages")]
    MissingPages,

    #[error("HAR document is missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid timestamp '{value}'")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("Selection matches no records")]
    EmptySelection,

    #[error("Selection has zero extent on the {0} axis")]
    DegenerateSelection(&'static str),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}
