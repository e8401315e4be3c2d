//! Tabular regression training CLI

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use tabular_trainer::config::DEFAULT_DATASET_ID;
use tabular_trainer::{
    run_training, FileTelemetrySink, LocalTrackingRun, LogContext, TrainerConfig,
    WorkspaceDatasetStore,
};

#[derive(Parser, Debug)]
#[command(name = "tabular-train")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train a GBDT regression pipeline on a tabular dataset", long_about = None)]
struct Args {
    /// Id of the dataset snapshot in the workspace store
    #[arg(long = "training_dataset_id", default_value = DEFAULT_DATASET_ID)]
    training_dataset_id: String,
}

fn init_logging(default_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()
        .context("Failed to set tracing subscriber")
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = TrainerConfig::load().context("Failed to load configuration")?;
    init_logging(&config.logging.level)?;

    info!("Tabular trainer v{}", tabular_trainer::VERSION);

    let tracking_config = &config.tracking;
    let mut ctx = LogContext::new(tracking_config.run_id(), &tracking_config.automl_run_id);
    if let Some(path) = &tracking_config.telemetry_path {
        ctx = ctx.with_telemetry(Box::new(FileTelemetrySink::new(path)));
    }

    let store = WorkspaceDatasetStore::new(&tracking_config.workspace);
    let outcome = LocalTrackingRun::new(tracking_config.run_dir(), tracking_config.run_id())
        .and_then(|mut tracking| {
            run_training(&config, &args.training_dataset_id, &store, &mut tracking, &ctx)
        });

    match outcome {
        Ok(summary) => {
            info!(
                train_rows = summary.train_row_ids.len(),
                valid_rows = summary.valid_row_ids.len(),
                "Training complete"
            );
            info!("  Model hash: {}", summary.model_hash);
            info!("  Artifact: {}", summary.artifact_dir.display());
            Ok(())
        }
        Err(err) => {
            let err = anyhow::Error::from(err);
            ctx.report_failure(&err);
            Err(err)
        }
    }
}
