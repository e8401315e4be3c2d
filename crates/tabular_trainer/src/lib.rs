//! Tabular regression trainer
//!
//! Loads a dataset snapshot, drops unlabelled rows, splits train/validation,
//! fits a featurize → scale → GBDT pipeline, scores the validation rows and
//! reports metrics plus a versioned model artifact to a tracking run.

pub mod cart;
pub mod config;
pub mod dataset;
pub mod errors;
pub mod evaluate;
pub mod pipeline;
pub mod prepare;
pub mod quantize;
pub mod report;
pub mod run;
pub mod split;
pub mod telemetry;
pub mod tracking;
pub mod trainer;

pub use config::TrainerConfig;
pub use dataset::{read_csv, DatasetStore, WorkspaceDatasetStore};
pub use errors::{Result, TrainerError};
pub use evaluate::calculate_metrics;
pub use pipeline::{build_model_pipeline, train_model, FittedPipeline, Pipeline};
pub use prepare::{prepare_data, PreparedData};
pub use report::{log_metrics, report, save_model, LogOutcome, SavedArtifact};
pub use run::{run_training, RunSummary};
pub use split::{split_dataset, Partition};
pub use telemetry::{FileTelemetrySink, LogContext, TelemetrySink};
pub use tracking::{LocalTrackingRun, TrackingRun};
pub use trainer::{GbdtParams, GbdtTrainer, Regressor};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
