//! End-to-end training run
//!
//! Loader → Preparer → Splitter → Builder/Trainer → Evaluator → Reporter,
//! each stage feeding the next. Any error aborts the run.

use std::path::PathBuf;

use tabular_core::{MetricName, MetricsBundle};

use crate::config::TrainerConfig;
use crate::dataset::DatasetStore;
use crate::errors::Result;
use crate::evaluate::calculate_metrics;
use crate::pipeline::train_model;
use crate::prepare::prepare_data;
use crate::report::report;
use crate::split::split_dataset;
use crate::telemetry::LogContext;
use crate::tracking::TrackingRun;

/// What a completed run produced
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub dataset_id: String,
    pub dropped_rows: usize,

    /// Loaded-table row indices of each partition, in partition order
    pub train_row_ids: Vec<usize>,
    pub valid_row_ids: Vec<usize>,

    pub metrics: MetricsBundle,
    pub model_hash: String,
    pub artifact_dir: PathBuf,
}

impl RunSummary {
    pub fn rmse(&self) -> Option<f64> {
        self.metrics.scalar(MetricName::RootMeanSquaredError)
    }
}

pub fn run_training(
    config: &TrainerConfig,
    dataset_id: &str,
    store: &dyn DatasetStore,
    tracking: &mut dyn TrackingRun,
    ctx: &LogContext,
) -> Result<RunSummary> {
    ctx.info("Running get_training_dataset");
    let table = store.fetch(dataset_id)?;
    tracing::info!(
        parent: ctx.span(),
        dataset_id,
        rows = table.n_rows(),
        columns = table.n_cols(),
        "dataset loaded"
    );

    ctx.info("Running prepare_data");
    let data = &config.data;
    let prepared = prepare_data(&table, &data.label_column, data.weight_column.as_deref())?;
    let dropped_rows = table.n_rows() - prepared.len();

    ctx.info("Running split_dataset");
    let (train, valid) = split_dataset(&prepared, data.split_ratio, data.stratify, data.seed)?;
    tracing::info!(
        parent: ctx.span(),
        train_rows = train.len(),
        valid_rows = valid.len(),
        "dataset split"
    );

    let fitted = train_model(
        config,
        ctx,
        &train.features,
        &train.labels,
        train.weights.as_deref(),
    )?;

    let metrics = calculate_metrics(&fitted, &prepared.labels, &valid, ctx)?;
    if let Some(rmse) = metrics.scalar(MetricName::RootMeanSquaredError) {
        tracing::info!(parent: ctx.span(), rmse, "validation scored");
    }

    let saved = report(
        tracking,
        &metrics,
        &fitted,
        &prepared.features,
        &data.label_column,
        &config.tracking.outputs_dir,
        ctx,
    )?;

    Ok(RunSummary {
        dataset_id: dataset_id.to_string(),
        dropped_rows,
        train_row_ids: train.row_ids,
        valid_row_ids: valid.row_ids,
        metrics,
        model_hash: saved.model_hash,
        artifact_dir: saved.dir,
    })
}
