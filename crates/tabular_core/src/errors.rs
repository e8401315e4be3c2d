//! Error types for the tabular core

use thiserror::Error;

/// Problems with the shape or content of the input data.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DataError {
    #[error("label column `{0}` not found")]
    MissingLabelColumn(String),

    #[error("weight column `{0}` not found")]
    MissingWeightColumn(String),

    #[error("row {row}: label is not numeric")]
    NonNumericLabel { row: usize },

    #[error("row {row}: sample weight must be a non-negative number")]
    InvalidWeight { row: usize },

    #[error("split ratio {0} must lie strictly between 0 and 1")]
    InvalidSplitRatio(f64),

    #[error("cannot split {rows} row(s) with ratio {ratio}: both partitions need at least one row")]
    InsufficientRows { rows: usize, ratio: f64 },

    #[error("cannot stratify: {0}")]
    StratificationInfeasible(String),

    #[error("dataset `{0}` not found")]
    DatasetNotFound(String),

    #[error("invalid dataset id `{0}`")]
    InvalidDatasetId(String),

    #[error("dataset has no rows")]
    EmptyDataset,

    #[error("malformed table: {0}")]
    Malformed(String),
}

/// Opaque failures from the featurization, training and scoring machinery.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("featurization error: {0}")]
    Featurization(String),

    #[error("training error: {0}")]
    Training(String),

    #[error("scoring error: {0}")]
    Scoring(String),

    #[error("invalid model: {0}")]
    InvalidModel(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for library operations
pub type Result<T> = std::result::Result<T, LibraryError>;
