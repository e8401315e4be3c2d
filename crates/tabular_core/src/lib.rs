//! Tabular regression core
//!
//! Featurization, scaling, GBDT inference and regression scoring for a
//! single-table training run. Training itself lives in `tabular-trainer`.
//!
//! Modules:
//! - `table`: In-memory column-major table of parsed CSV cells
//! - `matrix`: Dense feature matrix produced by featurization
//! - `featurize`: Per-column transform chains grouped into a feature union
//! - `scaler`: Max-abs feature scaling
//! - `gbdt`: Tree ensemble model and inference
//! - `binning`: Quantile bins over regression targets
//! - `metrics`: Regression metrics and their log methods
//! - `serialization`: Canonical JSON and artifact hashing
//! - `deterministic`: Seeded hashing and split tie-breaking

pub mod binning;
pub mod deterministic;
pub mod errors;
pub mod featurize;
pub mod gbdt;
pub mod matrix;
pub mod metrics;
pub mod scaler;
pub mod serialization;
pub mod stage;
pub mod table;

pub use binning::{make_dataset_bins, DatasetBins};
pub use errors::{DataError, LibraryError, Result};
pub use featurize::{ColumnMapper, FeatureUnion, Recipe, Tokenizer};
pub use gbdt::{GbdtModel, Node, Tree};
pub use matrix::FeatureMatrix;
pub use metrics::{
    score_regression, LogMethod, MetricName, MetricValue, MetricsBundle, ScoringInputs,
};
pub use scaler::MaxAbsScaler;
pub use stage::{Predictor, Stage};
pub use table::{Column, ColumnKind, Table, Value};

/// Crate version string for artifact metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
