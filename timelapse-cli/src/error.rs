use thiserror::Error;

/// Failures that happen before logging is up
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Initialization failed: {0}")]
    Initialization(String),
}
