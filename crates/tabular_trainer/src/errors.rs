use tabular_core::{DataError, LibraryError};
use thiserror::Error;

/// Errors returned by a training run.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Library(#[from] LibraryError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("tracking error: {0}")]
    Tracking(String),
}

impl From<serde_json::Error> for TrainerError {
    fn from(err: serde_json::Error) -> Self {
        TrainerError::Library(LibraryError::Serialization(err))
    }
}

pub type Result<T> = std::result::Result<T, TrainerError>;
