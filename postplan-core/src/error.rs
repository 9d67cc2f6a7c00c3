use thiserror::Error;

use crate::generation::GenerationError;

/// Rejected user input. Raised before any upstream call is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter a topic!")]
    EmptyTopic,

    #[error("Number of ideas must be between 1 and 5, got {0}")]
    CountOutOfRange(u8),
}

/// Failure of a single generate action. Either variant aborts the request.
#[derive(Error, Debug)]
pub enum PlanError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),
}

/// Start-up errors.
#[derive(Error, Debug)]
pub enum PostplanError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Generation client error: {0}")]
    Generation(#[from] GenerationError),
}
