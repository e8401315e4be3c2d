//! Regression metrics and how each one is reported

pub mod regression;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::errors::{LibraryError, Result};

pub use regression::{score_regression, ScoringInputs};

/// The fourteen regression metrics computed for every run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricName {
    NormalizedRootMeanSquaredLogError,
    NormalizedMedianAbsoluteError,
    Residuals,
    RootMeanSquaredError,
    MeanAbsoluteError,
    NormalizedRootMeanSquaredError,
    PredictedTrue,
    MeanAbsolutePercentageError,
    ExplainedVariance,
    MedianAbsoluteError,
    SpearmanCorrelation,
    RootMeanSquaredLogError,
    R2Score,
    NormalizedMeanAbsoluteError,
}

impl MetricName {
    pub const ALL: [MetricName; 14] = [
        MetricName::NormalizedRootMeanSquaredLogError,
        MetricName::NormalizedMedianAbsoluteError,
        MetricName::Residuals,
        MetricName::RootMeanSquaredError,
        MetricName::MeanAbsoluteError,
        MetricName::NormalizedRootMeanSquaredError,
        MetricName::PredictedTrue,
        MetricName::MeanAbsolutePercentageError,
        MetricName::ExplainedVariance,
        MetricName::MedianAbsoluteError,
        MetricName::SpearmanCorrelation,
        MetricName::RootMeanSquaredLogError,
        MetricName::R2Score,
        MetricName::NormalizedMeanAbsoluteError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::NormalizedRootMeanSquaredLogError => "normalized_root_mean_squared_log_error",
            MetricName::NormalizedMedianAbsoluteError => "normalized_median_absolute_error",
            MetricName::Residuals => "residuals",
            MetricName::RootMeanSquaredError => "root_mean_squared_error",
            MetricName::MeanAbsoluteError => "mean_absolute_error",
            MetricName::NormalizedRootMeanSquaredError => "normalized_root_mean_squared_error",
            MetricName::PredictedTrue => "predicted_true",
            MetricName::MeanAbsolutePercentageError => "mean_absolute_percentage_error",
            MetricName::ExplainedVariance => "explained_variance",
            MetricName::MedianAbsoluteError => "median_absolute_error",
            MetricName::SpearmanCorrelation => "spearman_correlation",
            MetricName::RootMeanSquaredLogError => "root_mean_squared_log_error",
            MetricName::R2Score => "r2_score",
            MetricName::NormalizedMeanAbsoluteError => "normalized_mean_absolute_error",
        }
    }

    /// True for metrics whose value is a record rather than a number
    pub fn is_record(&self) -> bool {
        matches!(self, MetricName::Residuals | MetricName::PredictedTrue)
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Histogram of residuals (`y_true - y_pred`).
///
/// The outer edges are infinite; they serialize as `null` in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidualsRecord {
    pub bin_edges: Vec<f64>,
    pub bin_counts: Vec<usize>,
    pub mean: f64,
    pub stddev: f64,
    pub res_count: usize,
}

/// Prediction statistics per target bin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictedTrueRecord {
    pub bin_starts: Vec<f64>,
    pub bin_ends: Vec<f64>,
    pub bin_counts: Vec<usize>,
    pub mean_predicted: Vec<f64>,
    pub stddev_predicted: Vec<f64>,
    pub mean_true: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MetricValue {
    Scalar(f64),
    Residuals(ResidualsRecord),
    PredictedTrue(PredictedTrueRecord),
}

impl MetricValue {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            MetricValue::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MetricValue::Scalar(_) => "scalar",
            MetricValue::Residuals(_) => "residuals",
            MetricValue::PredictedTrue(_) => "predicted_true",
        }
    }
}

/// How a metric is handed to the tracking run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogMethod {
    /// Logged as a single number
    Scalar,
    /// Logged as a structured record
    Record,
    /// Not logged, silently
    Skip,
    /// Not logged; a warning is emitted
    Unsupported,
}

impl LogMethod {
    pub fn default_for(name: MetricName) -> Self {
        if name.is_record() {
            LogMethod::Record
        } else {
            LogMethod::Scalar
        }
    }
}

/// Complete set of scored metrics, each paired with its log method
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsBundle {
    values: BTreeMap<MetricName, MetricValue>,
    log_methods: BTreeMap<MetricName, LogMethod>,
}

impl MetricsBundle {
    /// Wrap scored values; all fourteen metrics must be present
    pub fn new(values: BTreeMap<MetricName, MetricValue>) -> Result<Self> {
        let missing: Vec<&str> = MetricName::ALL
            .iter()
            .filter(|name| !values.contains_key(name))
            .map(|name| name.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(LibraryError::Scoring(format!(
                "missing metrics: {}",
                missing.join(", ")
            )));
        }

        let log_methods = MetricName::ALL
            .iter()
            .map(|&name| (name, LogMethod::default_for(name)))
            .collect();

        Ok(Self {
            values,
            log_methods,
        })
    }

    pub fn with_log_method(mut self, name: MetricName, method: LogMethod) -> Self {
        self.log_methods.insert(name, method);
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: MetricName) -> Option<&MetricValue> {
        self.values.get(&name)
    }

    pub fn scalar(&self, name: MetricName) -> Option<f64> {
        self.get(name).and_then(MetricValue::as_scalar)
    }

    pub fn log_method(&self, name: MetricName) -> LogMethod {
        self.log_methods
            .get(&name)
            .copied()
            .unwrap_or_else(|| LogMethod::default_for(name))
    }

    /// Metrics in declaration order with their log methods
    pub fn iter(&self) -> impl Iterator<Item = (MetricName, &MetricValue, LogMethod)> + '_ {
        self.values
            .iter()
            .map(move |(&name, value)| (name, value, self.log_method(name)))
    }
}
