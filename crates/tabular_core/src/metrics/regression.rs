//! Regression scoring
//!
//! Residuals are `e = y_true - y_pred`. When sample weights are given, means,
//! medians and variances are weighted; Spearman correlation always uses
//! unweighted ranks.

use std::collections::BTreeMap;

use super::{MetricName, MetricValue, PredictedTrueRecord, ResidualsRecord};
use crate::binning::DatasetBins;
use crate::errors::{LibraryError, Result};

/// Everything `score_regression` needs besides the metric names.
///
/// `y_min`, `y_max` and `y_std` describe the full labelled dataset; the
/// other fields describe the held-out rows.
#[derive(Debug, Clone, Copy)]
pub struct ScoringInputs<'a> {
    pub y_true: &'a [f64],
    pub y_pred: &'a [f64],
    pub y_max: f64,
    pub y_min: f64,
    pub y_std: f64,
    pub weights: Option<&'a [f64]>,
    pub bins: &'a DatasetBins,
}

/// Residual histogram edges in units of the dataset std
const RESIDUAL_STEPS: [f64; 9] = [-2.0, -1.5, -1.0, -0.5, 0.0, 0.5, 1.0, 1.5, 2.0];

struct Weights<'a> {
    values: Option<&'a [f64]>,
    total: f64,
}

impl<'a> Weights<'a> {
    fn new(values: Option<&'a [f64]>, n: usize) -> Self {
        let total = values.map_or(n as f64, |w| w.iter().sum());
        Self { values, total }
    }

    fn at(&self, i: usize) -> f64 {
        self.values.map_or(1.0, |w| w[i])
    }

    fn mean<I: Iterator<Item = f64>>(&self, xs: I) -> f64 {
        let sum: f64 = xs.enumerate().map(|(i, x)| self.at(i) * x).sum();
        sum / self.total
    }

    fn variance(&self, xs: &[f64]) -> f64 {
        let mean = self.mean(xs.iter().copied());
        self.mean(xs.iter().map(|x| (x - mean).powi(2)))
    }

    /// Smallest value whose cumulative weight reaches half the total
    fn median(&self, xs: &[f64]) -> f64 {
        let mut order: Vec<usize> = (0..xs.len()).collect();
        order.sort_by(|&a, &b| xs[a].total_cmp(&xs[b]));

        if self.values.is_none() {
            let n = order.len();
            return if n % 2 == 1 {
                xs[order[n / 2]]
            } else {
                (xs[order[n / 2 - 1]] + xs[order[n / 2]]) / 2.0
            };
        }

        let half = self.total / 2.0;
        let mut cumulative = 0.0;
        for &i in &order {
            cumulative += self.at(i);
            if cumulative >= half {
                return xs[i];
            }
        }
        order.last().map_or(f64::NAN, |&i| xs[i])
    }
}

fn normalize(value: f64, range: f64) -> f64 {
    if range == 0.0 || !range.is_finite() {
        value
    } else {
        value / range
    }
}

/// Average ranks, 1-based; ties share the mean of their positions
fn average_ranks(xs: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..xs.len()).collect();
    order.sort_by(|&a, &b| xs[a].total_cmp(&xs[b]));

    let mut ranks = vec![0.0; xs.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && xs[order[end]] == xs[order[start]] {
            end += 1;
        }
        let rank = (start + end + 1) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = rank;
        }
        start = end;
    }
    ranks
}

fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;

    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b) {
        cov += (x - mean_a) * (y - mean_b);
        var_a += (x - mean_a).powi(2);
        var_b += (y - mean_b).powi(2);
    }

    if var_a == 0.0 || var_b == 0.0 {
        f64::NAN
    } else {
        cov / (var_a * var_b).sqrt()
    }
}

fn spearman(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.len() < 2 {
        return f64::NAN;
    }
    pearson(&average_ranks(y_true), &average_ranks(y_pred))
}

fn rmsle(w: &Weights<'_>, y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.iter().chain(y_pred).any(|&v| v <= -1.0) {
        return f64::NAN;
    }
    w.mean(
        y_true
            .iter()
            .zip(y_pred)
            .map(|(y, p)| (y.ln_1p() - p.ln_1p()).powi(2)),
    )
    .sqrt()
}

fn mape(w: &Weights<'_>, y_true: &[f64], y_pred: &[f64]) -> f64 {
    let (mut sum, mut total) = (0.0, 0.0);
    for (i, (y, p)) in y_true.iter().zip(y_pred).enumerate() {
        if *y == 0.0 {
            continue;
        }
        sum += w.at(i) * ((y - p) / y).abs();
        total += w.at(i);
    }
    if total == 0.0 {
        f64::NAN
    } else {
        100.0 * sum / total
    }
}

/// `1 - num/den`, with the constant-target convention: a zero numerator is a
/// perfect score and a zero denominator otherwise scores 0
fn variance_ratio_score(num: f64, den: f64) -> f64 {
    if num == 0.0 {
        1.0
    } else if den == 0.0 {
        0.0
    } else {
        1.0 - num / den
    }
}

fn residuals_record(w: &Weights<'_>, residuals: &[f64], y_std: f64) -> ResidualsRecord {
    let sigma = if y_std > 0.0 && y_std.is_finite() { y_std } else { 1.0 };

    let mut bin_edges = Vec::with_capacity(RESIDUAL_STEPS.len() + 2);
    bin_edges.push(f64::NEG_INFINITY);
    bin_edges.extend(RESIDUAL_STEPS.iter().map(|s| s * sigma));
    bin_edges.push(f64::INFINITY);

    let interior = &bin_edges[1..bin_edges.len() - 1];
    let mut bin_counts = vec![0usize; bin_edges.len() - 1];
    for &r in residuals {
        bin_counts[interior.partition_point(|&edge| edge <= r)] += 1;
    }

    ResidualsRecord {
        bin_edges,
        bin_counts,
        mean: w.mean(residuals.iter().copied()),
        stddev: w.variance(residuals).sqrt(),
        res_count: residuals.len(),
    }
}

fn predicted_true_record(bins: &DatasetBins, y_true: &[f64], y_pred: &[f64]) -> PredictedTrueRecord {
    let n_bins = bins.number_of_bins;
    let mut counts = vec![0usize; n_bins];
    let mut sum_pred = vec![0.0; n_bins];
    let mut sum_pred_sq = vec![0.0; n_bins];
    let mut sum_true = vec![0.0; n_bins];

    for ((&bin, &y), &p) in bins.assignments.iter().zip(y_true).zip(y_pred) {
        counts[bin] += 1;
        sum_pred[bin] += p;
        sum_pred_sq[bin] += p * p;
        sum_true[bin] += y;
    }

    let mut mean_predicted = Vec::with_capacity(n_bins);
    let mut stddev_predicted = Vec::with_capacity(n_bins);
    let mut mean_true = Vec::with_capacity(n_bins);
    for b in 0..n_bins {
        let c = counts[b] as f64;
        if counts[b] == 0 {
            mean_predicted.push(f64::NAN);
            stddev_predicted.push(f64::NAN);
            mean_true.push(f64::NAN);
            continue;
        }
        let mean = sum_pred[b] / c;
        mean_predicted.push(mean);
        stddev_predicted.push((sum_pred_sq[b] / c - mean * mean).max(0.0).sqrt());
        mean_true.push(sum_true[b] / c);
    }

    PredictedTrueRecord {
        bin_starts: bins.bin_starts.clone(),
        bin_ends: bins.bin_ends.clone(),
        bin_counts: counts,
        mean_predicted,
        stddev_predicted,
        mean_true,
    }
}

fn check_inputs(inputs: &ScoringInputs<'_>) -> Result<()> {
    let n = inputs.y_true.len();
    if n == 0 {
        return Err(LibraryError::Scoring("no rows to score".into()));
    }
    if inputs.y_pred.len() != n {
        return Err(LibraryError::Scoring(format!(
            "{} predictions for {} labels",
            inputs.y_pred.len(),
            n
        )));
    }
    if inputs.bins.assignments.len() != n {
        return Err(LibraryError::Scoring(format!(
            "{} bin assignments for {} labels",
            inputs.bins.assignments.len(),
            n
        )));
    }
    if let Some(w) = inputs.weights {
        if w.len() != n {
            return Err(LibraryError::Scoring(format!("{} weights for {} labels", w.len(), n)));
        }
        if w.iter().sum::<f64>() <= 0.0 {
            return Err(LibraryError::Scoring("sample weights sum to zero".into()));
        }
    }
    Ok(())
}

/// Compute the requested metrics over held-out predictions
pub fn score_regression(
    inputs: &ScoringInputs<'_>,
    names: &[MetricName],
) -> Result<BTreeMap<MetricName, MetricValue>> {
    check_inputs(inputs)?;

    let ScoringInputs {
        y_true,
        y_pred,
        y_max,
        y_min,
        y_std,
        ..
    } = *inputs;
    let w = Weights::new(inputs.weights, y_true.len());

    let residuals: Vec<f64> = y_true.iter().zip(y_pred).map(|(y, p)| y - p).collect();
    let abs_errors: Vec<f64> = residuals.iter().map(|e| e.abs()).collect();

    let range = y_max - y_min;
    let log_range = if y_min > -1.0 {
        y_max.ln_1p() - y_min.ln_1p()
    } else {
        f64::NAN
    };

    let mae = w.mean(abs_errors.iter().copied());
    let median_ae = w.median(&abs_errors);
    let rmse = w.mean(residuals.iter().map(|e| e * e)).sqrt();
    let rmsle = rmsle(&w, y_true, y_pred);

    let mut scores = BTreeMap::new();
    for &name in names {
        let value = match name {
            MetricName::MeanAbsoluteError => MetricValue::Scalar(mae),
            MetricName::MedianAbsoluteError => MetricValue::Scalar(median_ae),
            MetricName::RootMeanSquaredError => MetricValue::Scalar(rmse),
            MetricName::RootMeanSquaredLogError => MetricValue::Scalar(rmsle),
            MetricName::NormalizedMeanAbsoluteError => MetricValue::Scalar(normalize(mae, range)),
            MetricName::NormalizedMedianAbsoluteError => {
                MetricValue::Scalar(normalize(median_ae, range))
            }
            MetricName::NormalizedRootMeanSquaredError => {
                MetricValue::Scalar(normalize(rmse, range))
            }
            MetricName::NormalizedRootMeanSquaredLogError => {
                if log_range.is_nan() {
                    MetricValue::Scalar(f64::NAN)
                } else {
                    MetricValue::Scalar(normalize(rmsle, log_range))
                }
            }
            MetricName::MeanAbsolutePercentageError => {
                MetricValue::Scalar(mape(&w, y_true, y_pred))
            }
            MetricName::ExplainedVariance => {
                MetricValue::Scalar(variance_ratio_score(w.variance(&residuals), w.variance(y_true)))
            }
            MetricName::R2Score => {
                let mean_y = w.mean(y_true.iter().copied());
                let sse = w.mean(residuals.iter().map(|e| e * e));
                let sst = w.mean(y_true.iter().map(|y| (y - mean_y).powi(2)));
                MetricValue::Scalar(variance_ratio_score(sse, sst))
            }
            MetricName::SpearmanCorrelation => MetricValue::Scalar(spearman(y_true, y_pred)),
            MetricName::Residuals => {
                MetricValue::Residuals(residuals_record(&w, &residuals, y_std))
            }
            MetricName::PredictedTrue => {
                MetricValue::PredictedTrue(predicted_true_record(inputs.bins, y_true, y_pred))
            }
        };
        scores.insert(name, value);
    }

    Ok(scores)
}
