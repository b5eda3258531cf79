use thiserror::Error;

use crate::summarizer::SummarizerError;

#[derive(Error, Debug)]
pub enum RecapError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Meeting {0} not found")]
    NotFound(i32),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Summarizer(#[from] SummarizerError),
}
