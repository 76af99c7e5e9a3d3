//! Error types for the pipeline core

use thiserror::Error;

/// Pipeline-wide error type for shape violations in item data
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorylineError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unknown source type: {0}")]
    UnknownSourceType(String),
}

impl StorylineError {
    pub fn invalid_url(url: impl Into<String>) -> Self {
        StorylineError::InvalidUrl(url.into())
    }

    pub fn unknown_source_type(value: impl Into<String>) -> Self {
        StorylineError::UnknownSourceType(value.into())
    }
}

/// Result type alias for core operations
pub type StorylineResult<T> = Result<T, StorylineError>;
