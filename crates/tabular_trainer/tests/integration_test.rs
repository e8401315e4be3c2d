//! End-to-end runs over a synthetic bike-rental dataset
//!
//! Exercises load → prepare → split → train → evaluate → report against a
//! temporary workspace.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

use tabular_core::{DataError, GbdtModel, MetricName};
use tabular_trainer::config::TrackingConfig;
use tabular_trainer::{
    read_csv, run_training, FittedPipeline, GbdtParams, LocalTrackingRun, LogContext,
    RunSummary, TrainerConfig, TrainerError, WorkspaceDatasetStore,
};

const DATASET_ID: &str = "bike-rentals";
const LABELLED_ROWS: usize = 1000;

/// Rows at these positions have no `rentals` value
const UNLABELLED_AT: [usize; 3] = [10, 500, 1001];

const HEADER: &str =
    "day,mnth,year,season,holiday,weekday,workingday,weathersit,temp,atemp,hum,windspeed,rentals";

/// Write a 13-column bike-rental CSV into `<workspace>/datasets/`
fn create_bike_dataset(workspace: &Path) -> Result<()> {
    let datasets = workspace.join("datasets");
    fs::create_dir_all(&datasets)?;
    let mut file = fs::File::create(datasets.join(format!("{}.csv", DATASET_ID)))?;
    writeln!(file, "{}", HEADER)?;

    let mut rng = StdRng::seed_from_u64(7);
    let total = LABELLED_ROWS + UNLABELLED_AT.len();
    for i in 0..total {
        let day = i % 31 + 1;
        let mnth = (i / 31) % 12 + 1;
        let year = i / 372 % 2;
        let season = (mnth - 1) / 3 + 1;
        let holiday = usize::from(i % 23 == 0);
        let weekday = i % 7;
        let workingday = usize::from(weekday > 0 && weekday < 6 && holiday == 0);
        let weathersit = rng.gen_range(1..=3);
        let temp: f64 = rng.gen_range(0.05..0.9);
        let atemp = temp * 0.9 + rng.gen_range(0.0..0.05);
        let hum: f64 = rng.gen_range(0.2..1.0);
        let windspeed: f64 = rng.gen_range(0.0..0.5);

        let rentals = if UNLABELLED_AT.contains(&i) {
            String::new()
        } else {
            let base = 200.0 + 900.0 * temp + 150.0 * season as f64 + 250.0 * workingday as f64
                - 120.0 * weathersit as f64
                - 200.0 * hum;
            let noise: f64 = rng.gen_range(-40.0..40.0);
            format!("{}", (base + noise).max(0.0).round())
        };

        writeln!(
            file,
            "{},{},{},{},{},{},{},{},{:.4},{:.4},{:.4},{:.4},{}",
            day, mnth, year, season, holiday, weekday, workingday, weathersit, temp, atemp, hum,
            windspeed, rentals
        )?;
    }

    file.flush()?;
    Ok(())
}

fn config(workspace: &Path, run_id: &str) -> TrainerConfig {
    TrainerConfig {
        gbdt: GbdtParams {
            num_trees: 25,
            ..GbdtParams::default()
        },
        tracking: TrackingConfig {
            workspace: workspace.to_path_buf(),
            run_dir: Some(workspace.join("runs").join(run_id)),
            run_id: Some(run_id.to_string()),
            outputs_dir: workspace.join(run_id).join("outputs"),
            ..TrackingConfig::default()
        },
        ..TrainerConfig::default()
    }
}

fn run(config: &TrainerConfig, dataset_id: &str) -> Result<(RunSummary, LocalTrackingRun)> {
    let tracking = &config.tracking;
    let store = WorkspaceDatasetStore::new(&tracking.workspace);
    let mut run = LocalTrackingRun::new(tracking.run_dir(), tracking.run_id())?;
    let ctx = LogContext::new(tracking.run_id(), &tracking.automl_run_id);

    let summary = run_training(config, dataset_id, &store, &mut run, &ctx)?;
    Ok((summary, run))
}

fn workspace() -> Result<TempDir> {
    let dir = tempfile::tempdir()?;
    create_bike_dataset(dir.path())?;
    Ok(dir)
}

#[test]
fn test_end_to_end_bike_rentals() -> Result<()> {
    let dir = workspace()?;
    let (summary, run) = run(&config(dir.path(), "run-a"), DATASET_ID)?;

    assert_eq!(summary.dropped_rows, UNLABELLED_AT.len());
    assert_eq!(summary.train_row_ids.len(), 750);
    assert_eq!(summary.valid_row_ids.len(), 250);

    let rmse = summary.rmse().expect("rmse is a scalar metric");
    assert!(rmse.is_finite() && rmse >= 0.0, "rmse = {}", rmse);
    assert_eq!(summary.metrics.len(), 14);
    assert!(summary.metrics.scalar(MetricName::R2Score).is_some_and(|r2| r2 > 0.5));

    // Artifact written locally and uploaded into the run
    let model_json = summary.artifact_dir.join("model.json");
    assert_eq!(
        fs::read_to_string(summary.artifact_dir.join("model.hash"))?,
        summary.model_hash
    );
    for file in ["model.json", "signature.json", "environment.json", "MLmodel.toml"] {
        assert!(
            run.run_dir().join("outputs").join("model").join(file).exists(),
            "{} not uploaded",
            file
        );
    }

    // Fourteen entries, records carrying their kind
    let entries = run.read_metrics()?;
    assert_eq!(entries.len(), 14);
    let kinds: BTreeSet<&str> = entries.iter().map(|e| e.kind.as_str()).collect();
    assert_eq!(kinds, BTreeSet::from(["predicted_true", "residuals", "scalar"]));

    // The saved pipeline reproduces its hash and predicts the raw table
    let fitted = FittedPipeline::<GbdtModel>::load_json(&model_json)?;
    assert_eq!(fitted.hash_hex()?, summary.model_hash);
    let csv = fs::File::open(dir.path().join("datasets").join(format!("{}.csv", DATASET_ID)))?;
    let predictions = fitted.predict(&read_csv(csv)?)?;
    assert_eq!(predictions.len(), LABELLED_ROWS + UNLABELLED_AT.len());
    Ok(())
}

#[test]
fn test_unlabelled_rows_are_excluded() -> Result<()> {
    let dir = workspace()?;
    let (summary, _) = run(&config(dir.path(), "run-a"), DATASET_ID)?;

    let train: BTreeSet<usize> = summary.train_row_ids.iter().copied().collect();
    let valid: BTreeSet<usize> = summary.valid_row_ids.iter().copied().collect();
    assert!(train.is_disjoint(&valid));

    let expected: BTreeSet<usize> = (0..LABELLED_ROWS + UNLABELLED_AT.len())
        .filter(|i| !UNLABELLED_AT.contains(i))
        .collect();
    let union: BTreeSet<usize> = train.union(&valid).copied().collect();
    assert_eq!(union, expected);
    Ok(())
}

#[test]
fn test_rerun_is_reproducible() -> Result<()> {
    let dir = workspace()?;
    let (first, _) = run(&config(dir.path(), "run-a"), DATASET_ID)?;
    let (second, _) = run(&config(dir.path(), "run-b"), DATASET_ID)?;

    assert_eq!(first.train_row_ids, second.train_row_ids);
    assert_eq!(first.valid_row_ids, second.valid_row_ids);
    assert_eq!(first.model_hash, second.model_hash);
    assert_eq!(
        first.metrics.scalar(MetricName::MeanAbsoluteError),
        second.metrics.scalar(MetricName::MeanAbsoluteError)
    );
    Ok(())
}

#[test]
fn test_different_seed_changes_assignment() -> Result<()> {
    let dir = workspace()?;
    let (first, _) = run(&config(dir.path(), "run-a"), DATASET_ID)?;

    let mut reseeded = config(dir.path(), "run-b");
    reseeded.data.seed = 43;
    let (second, _) = run(&reseeded, DATASET_ID)?;

    assert_eq!(second.valid_row_ids.len(), 250);
    assert_ne!(first.valid_row_ids, second.valid_row_ids);
    Ok(())
}

#[test]
fn test_unknown_dataset() -> Result<()> {
    let dir = workspace()?;
    let err = run(&config(dir.path(), "run-a"), "no-such-dataset")
        .err()
        .expect("missing dataset must fail");

    assert!(matches!(
        err.downcast_ref::<TrainerError>(),
        Some(TrainerError::Data(DataError::DatasetNotFound(_)))
    ));
    Ok(())
}

#[test]
fn test_missing_label_column() -> Result<()> {
    let dir = workspace()?;
    let mut config = config(dir.path(), "run-a");
    config.data.label_column = "count".to_string();

    let err = run(&config, DATASET_ID).err().expect("unknown label must fail");
    assert!(matches!(
        err.downcast_ref::<TrainerError>(),
        Some(TrainerError::Data(DataError::MissingLabelColumn(_)))
    ));
    // Nothing is reported for a failed run
    assert!(!config.tracking.outputs_dir.exists());
    Ok(())
}

#[test]
fn test_stratify_rejects_singleton_labels() -> Result<()> {
    let dir = workspace()?;
    let mut config = config(dir.path(), "run-a");
    config.data.stratify = true;

    let err = run(&config, DATASET_ID).err().expect("continuous labels cannot stratify");
    assert!(matches!(
        err.downcast_ref::<TrainerError>(),
        Some(TrainerError::Data(DataError::StratificationInfeasible(_)))
    ));
    Ok(())
}
