//! Error types for Vitals Flux

use thiserror::Error;

/// Errors that can occur during computation
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("No observations to build a date range from: {0}")]
    EmptyInput(String),

    #[error("Invalid score definition: {0}")]
    InvalidDefinition(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
}
