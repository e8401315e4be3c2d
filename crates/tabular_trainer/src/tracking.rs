//! Run tracking
//!
//! A `TrackingRun` receives metric values and artifact uploads for one run.
//! `LocalTrackingRun` keeps everything under a run directory on disk.

use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tabular_core::MetricValue;

use crate::errors::{Result, TrainerError};

pub const METRICS_FILE: &str = "metrics.jsonl";

pub trait TrackingRun {
    fn run_id(&self) -> &str;

    fn log_scalar(&mut self, name: &str, value: f64) -> Result<()>;

    fn log_record(&mut self, name: &str, value: &MetricValue) -> Result<()>;

    /// Copy the directory tree at `source` to `dest` inside the run
    fn upload_folder(&mut self, dest: &str, source: &Path) -> Result<()>;
}

/// One line of `metrics.jsonl`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEntry {
    pub name: String,
    pub kind: String,
    pub value: serde_json::Value,
    pub timestamp: String,
}

#[derive(Debug, Clone)]
pub struct LocalTrackingRun {
    run_dir: PathBuf,
    run_id: String,
}

impl LocalTrackingRun {
    pub fn new<P: AsRef<Path>>(run_dir: P, run_id: impl Into<String>) -> Result<Self> {
        let run_dir = run_dir.as_ref().to_path_buf();
        fs::create_dir_all(&run_dir)?;
        Ok(Self {
            run_dir,
            run_id: run_id.into(),
        })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.run_dir.join(METRICS_FILE)
    }

    /// Entries logged so far, in order
    pub fn read_metrics(&self) -> Result<Vec<MetricEntry>> {
        let path = self.metrics_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        fs::read_to_string(path)?
            .lines()
            .map(|line| serde_json::from_str(line).map_err(TrainerError::from))
            .collect()
    }

    fn append(&self, name: &str, kind: &str, value: serde_json::Value) -> Result<()> {
        let entry = MetricEntry {
            name: name.to_string(),
            kind: kind.to_string(),
            value,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.metrics_path())?;
        writeln!(file, "{}", serde_json::to_string(&entry)?)?;
        Ok(())
    }
}

impl TrackingRun for LocalTrackingRun {
    fn run_id(&self) -> &str {
        &self.run_id
    }

    fn log_scalar(&mut self, name: &str, value: f64) -> Result<()> {
        self.append(name, "scalar", serde_json::to_value(value)?)
    }

    fn log_record(&mut self, name: &str, value: &MetricValue) -> Result<()> {
        let record = match value {
            MetricValue::Residuals(r) => serde_json::to_value(r)?,
            MetricValue::PredictedTrue(r) => serde_json::to_value(r)?,
            MetricValue::Scalar(v) => serde_json::to_value(v)?,
        };
        self.append(name, value.kind(), record)
    }

    fn upload_folder(&mut self, dest: &str, source: &Path) -> Result<()> {
        if !source.is_dir() {
            return Err(TrainerError::Tracking(format!(
                "upload source {} is not a directory",
                source.display()
            )));
        }

        let target = self.run_dir.join(dest.trim_matches('/'));
        copy_tree(source, &target)?;
        tracing::debug!(
            source = %source.display(),
            target = %target.display(),
            "uploaded folder"
        );
        Ok(())
    }
}

fn copy_tree(source: &Path, target: &Path) -> std::io::Result<()> {
    fs::create_dir_all(target)?;

    let mut entries = fs::read_dir(source)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        let dest = target.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&path, &dest)?;
        } else {
            fs::copy(&path, &dest)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tabular_core::metrics::ResidualsRecord;
    use tempfile::tempdir;

    #[test]
    fn test_metrics_are_appended() -> Result<()> {
        let dir = tempdir()?;
        let mut run = LocalTrackingRun::new(dir.path().join("run"), "run-1")?;

        run.log_scalar("r2_score", 0.5)?;
        run.log_scalar("spearman_correlation", f64::NAN)?;
        run.log_record(
            "residuals",
            &MetricValue::Residuals(ResidualsRecord {
                bin_edges: vec![f64::NEG_INFINITY, 0.0, f64::INFINITY],
                bin_counts: vec![1, 2],
                mean: 0.1,
                stddev: 1.0,
                res_count: 3,
            }),
        )?;

        let entries = run.read_metrics()?;
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].name, "r2_score");
        assert_eq!(entries[0].value, serde_json::json!(0.5));
        assert!(entries[1].value.is_null());
        assert_eq!(entries[2].kind, "residuals");
        assert_eq!(entries[2].value["res_count"], 3);
        Ok(())
    }

    #[test]
    fn test_upload_copies_tree() -> Result<()> {
        let dir = tempdir()?;
        let outputs = dir.path().join("outputs");
        fs::create_dir_all(outputs.join("model"))?;
        fs::write(outputs.join("model").join("model.json"), "{}")?;

        let mut run = LocalTrackingRun::new(dir.path().join("run"), "run-1")?;
        run.upload_folder("outputs/", &outputs)?;

        let copied = run.run_dir().join("outputs").join("model").join("model.json");
        assert_eq!(fs::read_to_string(copied)?, "{}");
        Ok(())
    }

    #[test]
    fn test_upload_missing_source() -> Result<()> {
        let dir = tempdir()?;
        let mut run = LocalTrackingRun::new(dir.path(), "run-1")?;
        assert!(run.upload_folder("outputs/", &dir.path().join("nope")).is_err());
        Ok(())
    }
}
