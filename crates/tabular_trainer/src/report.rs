//! Metric logging and model artifact output

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use tabular_core::gbdt::MODEL_VERSION;
use tabular_core::serialization::canonical_json_string;
use tabular_core::{ColumnKind, GbdtModel, LogMethod, MetricsBundle, Table};

use crate::errors::{Result, TrainerError};
use crate::pipeline::FittedPipeline;
use crate::telemetry::LogContext;
use crate::tracking::TrackingRun;

pub const FLAVOR: &str = "tabular_gbdt";
pub const MODEL_DIR: &str = "model";
pub const MODEL_FILE: &str = "model.json";
pub const HASH_FILE: &str = "model.hash";
pub const SIGNATURE_FILE: &str = "signature.json";
pub const ENVIRONMENT_FILE: &str = "environment.json";
pub const DESCRIPTOR_FILE: &str = "MLmodel.toml";

/// How many metrics each handler received
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogOutcome {
    pub scalars: usize,
    pub records: usize,
    pub skipped: usize,
    pub unsupported: usize,
}

/// Send every metric to the tracking run according to its log method
pub fn log_metrics(
    run: &mut dyn TrackingRun,
    metrics: &MetricsBundle,
    ctx: &LogContext,
) -> Result<LogOutcome> {
    let mut outcome = LogOutcome::default();

    for (name, value, method) in metrics.iter() {
        match method {
            LogMethod::Scalar => {
                let scalar = value.as_scalar().ok_or_else(|| {
                    TrainerError::Tracking(format!("metric {} is not a scalar", name))
                })?;
                run.log_scalar(name.as_str(), scalar)?;
                outcome.scalars += 1;
            }
            LogMethod::Record => {
                run.log_record(name.as_str(), value)?;
                outcome.records += 1;
            }
            LogMethod::Skip => outcome.skipped += 1,
            LogMethod::Unsupported => {
                ctx.warn(&format!("Unsupported non-scalar metric {}. Will not log.", name));
                outcome.unsupported += 1;
            }
        }
    }

    Ok(outcome)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ColumnKind,
}

/// Input and output schema of the saved pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSignature {
    pub inputs: Vec<ColumnSpec>,
    pub outputs: Vec<ColumnSpec>,
}

impl ModelSignature {
    pub fn infer(features: &Table, label_column: &str) -> Self {
        let inputs = features
            .schema()
            .into_iter()
            .map(|(name, kind)| ColumnSpec { name, kind })
            .collect();

        Self {
            inputs,
            outputs: vec![ColumnSpec {
                name: label_column.to_string(),
                kind: ColumnKind::Double,
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct Environment {
    name: &'static str,
    version: &'static str,
    flavor: &'static str,
    model_format_version: i32,
    os: &'static str,
    arch: &'static str,
    created_at: String,
}

#[derive(Debug, Clone, Serialize)]
struct ModelDescriptor<'a> {
    artifact_path: &'a str,
    flavor: &'a str,
    run_id: &'a str,
    model_hash: &'a str,
    utc_time_created: &'a str,
    files: DescriptorFiles<'a>,
}

#[derive(Debug, Clone, Serialize)]
struct DescriptorFiles<'a> {
    model: &'a str,
    hash: &'a str,
    signature: &'a str,
    environment: &'a str,
}

/// Location and hash of a written artifact
#[derive(Debug, Clone, PartialEq)]
pub struct SavedArtifact {
    pub dir: PathBuf,
    pub model_hash: String,
}

/// Write the model artifact directory `<outputs_dir>/model/`
pub fn save_model(
    outputs_dir: &Path,
    fitted: &FittedPipeline<GbdtModel>,
    features: &Table,
    label_column: &str,
    run_id: &str,
    ctx: &LogContext,
) -> Result<SavedArtifact> {
    let dir = outputs_dir.join(MODEL_DIR);
    fs::create_dir_all(&dir)?;

    let model_json = fitted.to_canonical_json()?;
    let model_hash = hex::encode(blake3::hash(model_json.as_bytes()).as_bytes());
    fs::write(dir.join(MODEL_FILE), &model_json)?;
    fs::write(dir.join(HASH_FILE), &model_hash)?;

    let signature = ModelSignature::infer(features, label_column);
    fs::write(dir.join(SIGNATURE_FILE), canonical_json_string(&signature)?)?;

    let created_at = chrono::Utc::now().to_rfc3339();
    let environment = Environment {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        flavor: FLAVOR,
        model_format_version: MODEL_VERSION,
        os: std::env::consts::OS,
        arch: std::env::consts::ARCH,
        created_at: created_at.clone(),
    };
    fs::write(dir.join(ENVIRONMENT_FILE), serde_json::to_string_pretty(&environment)?)?;

    let descriptor = ModelDescriptor {
        artifact_path: MODEL_DIR,
        flavor: FLAVOR,
        run_id,
        model_hash: &model_hash,
        utc_time_created: &created_at,
        files: DescriptorFiles {
            model: MODEL_FILE,
            hash: HASH_FILE,
            signature: SIGNATURE_FILE,
            environment: ENVIRONMENT_FILE,
        },
    };
    let descriptor = toml::to_string(&descriptor)
        .map_err(|e| TrainerError::Tracking(format!("failed to encode model descriptor: {}", e)))?;
    fs::write(dir.join(DESCRIPTOR_FILE), descriptor)?;

    tracing::info!(
        parent: ctx.span(),
        path = %dir.display(),
        hash = %model_hash,
        "model artifact written"
    );

    Ok(SavedArtifact { dir, model_hash })
}

/// Log metrics, write the artifact and upload the outputs directory
pub fn report(
    run: &mut dyn TrackingRun,
    metrics: &MetricsBundle,
    fitted: &FittedPipeline<GbdtModel>,
    features: &Table,
    label_column: &str,
    outputs_dir: &Path,
    ctx: &LogContext,
) -> Result<SavedArtifact> {
    ctx.info("Running log_metrics");
    let outcome = log_metrics(run, metrics, ctx)?;
    tracing::debug!(parent: ctx.span(), ?outcome, "metrics logged");

    ctx.info("Saving model");
    let run_id = run.run_id().to_string();
    let saved = save_model(outputs_dir, fitted, features, label_column, &run_id, ctx)?;

    ctx.info("Uploading outputs");
    run.upload_folder("outputs/", outputs_dir)?;
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::LocalTrackingRun;
    use anyhow::Result;
    use std::collections::BTreeMap;
    use tabular_core::metrics::ResidualsRecord;
    use tabular_core::{Column, MetricName, MetricValue, Value};

    /// Records calls instead of writing anything
    #[derive(Default)]
    struct RecordingRun {
        scalars: Vec<String>,
        records: Vec<String>,
    }

    impl TrackingRun for RecordingRun {
        fn run_id(&self) -> &str {
            "recording"
        }

        fn log_scalar(&mut self, name: &str, _value: f64) -> crate::errors::Result<()> {
            self.scalars.push(name.to_string());
            Ok(())
        }

        fn log_record(
            &mut self,
            name: &str,
            _value: &tabular_core::MetricValue,
        ) -> crate::errors::Result<()> {
            self.records.push(name.to_string());
            Ok(())
        }

        fn upload_folder(&mut self, _dest: &str, _source: &Path) -> crate::errors::Result<()> {
            Ok(())
        }
    }

    fn bundle() -> MetricsBundle {
        let values: BTreeMap<MetricName, MetricValue> = MetricName::ALL
            .iter()
            .map(|&name| {
                let value = if name.is_record() {
                    MetricValue::Residuals(ResidualsRecord {
                        bin_edges: vec![f64::NEG_INFINITY, f64::INFINITY],
                        bin_counts: vec![1],
                        mean: 0.0,
                        stddev: 0.0,
                        res_count: 1,
                    })
                } else {
                    MetricValue::Scalar(1.0)
                };
                (name, value)
            })
            .collect();
        MetricsBundle::new(values).expect("complete bundle")
    }

    #[test]
    fn test_default_dispatch() -> Result<()> {
        let mut run = RecordingRun::default();
        let ctx = LogContext::new("codegen", "automl");

        let outcome = log_metrics(&mut run, &bundle(), &ctx)?;
        assert_eq!(outcome.scalars, 12);
        assert_eq!(outcome.records, 2);
        assert_eq!(outcome.skipped + outcome.unsupported, 0);
        assert!(run.records.contains(&"residuals".to_string()));
        assert!(run.records.contains(&"predicted_true".to_string()));
        Ok(())
    }

    #[test]
    fn test_skip_and_unsupported_log_nothing() -> Result<()> {
        let metrics = bundle()
            .with_log_method(MetricName::Residuals, LogMethod::Skip)
            .with_log_method(MetricName::PredictedTrue, LogMethod::Unsupported);
        let mut run = RecordingRun::default();
        let ctx = LogContext::new("codegen", "automl");

        let outcome = log_metrics(&mut run, &metrics, &ctx)?;
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.unsupported, 1);
        assert!(run.records.is_empty());
        assert_eq!(run.scalars.len(), 12);
        Ok(())
    }

    #[test]
    fn test_scalar_method_on_record_fails() {
        let metrics = bundle().with_log_method(MetricName::Residuals, LogMethod::Scalar);
        let mut run = RecordingRun::default();
        let ctx = LogContext::new("codegen", "automl");
        assert!(log_metrics(&mut run, &metrics, &ctx).is_err());
    }

    #[test]
    fn test_signature_inference() -> Result<()> {
        let table = Table::from_columns(vec![
            Column::new("season", vec![Value::Number(1.0), Value::Number(2.0)]),
            Column::new("temp", vec![Value::Number(0.3), Value::Missing]),
            Column::new("note", vec![Value::Text("a".into()), Value::Missing]),
        ])?;

        let signature = serde_json::to_value(ModelSignature::infer(&table, "rentals"))?;
        assert_eq!(
            signature["inputs"],
            serde_json::json!([
                {"name": "season", "type": "long"},
                {"name": "temp", "type": "double"},
                {"name": "note", "type": "string"},
            ])
        );
        assert_eq!(
            signature["outputs"],
            serde_json::json!([{"name": "rentals", "type": "double"}])
        );
        Ok(())
    }

    #[test]
    fn test_report_writes_and_uploads() -> Result<()> {
        use crate::pipeline::Pipeline;
        use crate::trainer::{GbdtParams, GbdtTrainer};
        use tabular_core::{ColumnMapper, FeatureUnion, MaxAbsScaler, Recipe};

        let n = 40;
        let table = Table::from_columns(vec![Column::new(
            "temp",
            (0..n).map(|i| Value::Number(i as f64)).collect(),
        )])?;
        let labels: Vec<f64> = (0..n).map(|i| (i * 2) as f64).collect();
        let pipeline = Pipeline::new(
            FeatureUnion::new(vec![ColumnMapper::new("mapper_2", &["temp"], Recipe::MeanImpute)]),
            MaxAbsScaler::new(),
            GbdtTrainer::new(GbdtParams {
                num_trees: 3,
                min_child_samples: 5,
                ..GbdtParams::default()
            }),
        );
        let fitted = pipeline.fit(&table, &labels, None)?;

        let dir = tempfile::tempdir()?;
        let outputs = dir.path().join("outputs");
        let mut run = LocalTrackingRun::new(dir.path().join("run"), "run-7")?;
        let ctx = LogContext::new("run-7", "automl");

        let saved = report(&mut run, &bundle(), &fitted, &table, "rentals", &outputs, &ctx)?;

        for file in [MODEL_FILE, HASH_FILE, SIGNATURE_FILE, ENVIRONMENT_FILE, DESCRIPTOR_FILE] {
            assert!(saved.dir.join(file).exists(), "missing {}", file);
        }
        assert_eq!(fs::read_to_string(saved.dir.join(HASH_FILE))?, saved.model_hash);
        assert_eq!(saved.model_hash, fitted.hash_hex()?);

        let descriptor: toml::Value = toml::from_str(&fs::read_to_string(
            saved.dir.join(DESCRIPTOR_FILE),
        )?)?;
        assert_eq!(descriptor["run_id"].as_str(), Some("run-7"));
        assert_eq!(descriptor["flavor"].as_str(), Some(FLAVOR));

        let uploaded = run.run_dir().join("outputs").join(MODEL_DIR).join(MODEL_FILE);
        assert!(uploaded.exists());
        assert_eq!(run.read_metrics()?.len(), 14);
        Ok(())
    }
}
