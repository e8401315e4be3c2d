//! Training run configuration
//!
//! Defaults reproduce the bike-rental regression run. A TOML file named by
//! `TABULAR_TRAINER_CONFIG` replaces the defaults, then individual
//! environment variables override single fields.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tabular_core::{Recipe, Tokenizer};

use crate::errors::{Result, TrainerError};
use crate::trainer::GbdtParams;

pub const CONFIG_ENV: &str = "TABULAR_TRAINER_CONFIG";
pub const WORKSPACE_ENV: &str = "TABULAR_TRAINER_WORKSPACE";
pub const RUN_DIR_ENV: &str = "TABULAR_TRAINER_RUN_DIR";
pub const RUN_ID_ENV: &str = "TABULAR_TRAINER_RUN_ID";
pub const TELEMETRY_ENV: &str = "TABULAR_TRAINER_TELEMETRY";

/// Dataset used when no id is given on the command line
pub const DEFAULT_DATASET_ID: &str = "37bbc6d9-9f05-4528-99cd-efc508cc2aa9";

/// Parent search run the trained pipeline belongs to
pub const DEFAULT_AUTOML_RUN_ID: &str = "AutoML_27220109-27e7-4f3b-882c-3b786c7f6b08_0";

/// Seed for label-encoding categories unseen during fit
pub const LABEL_HASHING_SEED: u64 = 314_489_979;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub label_column: String,
    pub weight_column: Option<String>,
    pub split_ratio: f64,
    pub stratify: bool,
    pub seed: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            label_column: "rentals".to_string(),
            weight_column: None,
            split_ratio: 0.25,
            stratify: false,
            seed: 42,
        }
    }
}

/// Columns sharing one featurization recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnGroupConfig {
    pub name: String,
    pub columns: Vec<String>,
    pub recipe: Recipe,
}

impl ColumnGroupConfig {
    fn new(name: &str, columns: &[&str], recipe: Recipe) -> Self {
        Self {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            recipe,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturizationConfig {
    /// Groups in concatenation order
    pub groups: Vec<ColumnGroupConfig>,
}

impl Default for FeaturizationConfig {
    fn default() -> Self {
        Self {
            groups: vec![
                ColumnGroupConfig::new(
                    "mapper_0",
                    &["day", "mnth", "season", "weekday", "weathersit"],
                    Recipe::BagOfWords {
                        tokenizer: Tokenizer::WholeValue,
                    },
                ),
                ColumnGroupConfig::new(
                    "mapper_1",
                    &["year", "holiday", "workingday"],
                    Recipe::Categorical {
                        hashing_seed: LABEL_HASHING_SEED,
                    },
                ),
                ColumnGroupConfig::new(
                    "mapper_2",
                    &["temp", "atemp", "hum", "windspeed"],
                    Recipe::MeanImpute,
                ),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Root of the dataset store
    pub workspace: PathBuf,

    /// Where metrics and uploads land; `runs/<run_id>` when unset
    pub run_dir: Option<PathBuf>,

    /// Generated from the start time when unset
    pub run_id: Option<String>,

    pub automl_run_id: String,

    /// Local directory the artifact is written to before upload
    pub outputs_dir: PathBuf,

    /// Telemetry sink file; telemetry is off when unset
    pub telemetry_path: Option<PathBuf>,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            workspace: PathBuf::from("."),
            run_dir: None,
            run_id: None,
            automl_run_id: DEFAULT_AUTOML_RUN_ID.to_string(),
            outputs_dir: PathBuf::from("outputs"),
            telemetry_path: None,
        }
    }
}

impl TrackingConfig {
    pub fn run_id(&self) -> &str {
        self.run_id.as_deref().unwrap_or("local")
    }

    pub fn run_dir(&self) -> PathBuf {
        self.run_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("runs").join(self.run_id()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub data: DataConfig,
    pub featurization: FeaturizationConfig,
    pub gbdt: GbdtParams,
    pub tracking: TrackingConfig,
    pub logging: LoggingConfig,
}

impl TrainerConfig {
    /// Defaults, then the optional TOML file, then environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };

        config.apply_overrides(|key| env::var(key).ok());
        config.ensure_run_id();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            TrainerError::Config(format!("failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| TrainerError::Config(format!("failed to parse config file: {}", e)))
    }

    /// Apply `TABULAR_TRAINER_*` overrides resolved through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(WORKSPACE_ENV) {
            self.tracking.workspace = PathBuf::from(value);
        }
        if let Some(value) = lookup(RUN_DIR_ENV) {
            self.tracking.run_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup(RUN_ID_ENV) {
            self.tracking.run_id = Some(value);
        }
        if let Some(value) = lookup(TELEMETRY_ENV) {
            self.tracking.telemetry_path = Some(PathBuf::from(value));
        }
    }

    fn ensure_run_id(&mut self) {
        self.tracking.run_id.get_or_insert_with(|| {
            format!("run_{}", chrono::Utc::now().format("%Y%m%dT%H%M%S"))
        });
    }

    pub fn validate(&self) -> Result<()> {
        let data = &self.data;
        if data.label_column.is_empty() {
            return Err(TrainerError::Config("label column must not be empty".into()));
        }
        if data.weight_column.as_deref() == Some(data.label_column.as_str()) {
            return Err(TrainerError::Config(
                "weight column must differ from the label column".into(),
            ));
        }
        if !(data.split_ratio > 0.0 && data.split_ratio < 1.0) {
            return Err(TrainerError::Config(format!(
                "split ratio {} must lie strictly between 0 and 1",
                data.split_ratio
            )));
        }

        let mut seen = BTreeSet::new();
        for group in &self.featurization.groups {
            for column in &group.columns {
                if column == &data.label_column {
                    return Err(TrainerError::Config(format!(
                        "label column `{}` listed in group `{}`",
                        column, group.name
                    )));
                }
                if !seen.insert(column.as_str()) {
                    return Err(TrainerError::Config(format!(
                        "column `{}` assigned to more than one group",
                        column
                    )));
                }
            }
        }

        self.gbdt.validate()
    }
}
