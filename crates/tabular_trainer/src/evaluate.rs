//! Held-out evaluation

use tabular_core::{
    make_dataset_bins, score_regression, MetricName, MetricsBundle, Predictor, ScoringInputs,
};

use crate::errors::Result;
use crate::pipeline::FittedPipeline;
use crate::split::Partition;
use crate::telemetry::LogContext;

/// Population mean and standard deviation
fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Score the fitted pipeline on the validation partition.
///
/// Label range and spread come from `all_labels`, the labels of every
/// prepared row, so normalized metrics do not depend on the split.
pub fn calculate_metrics<M: Predictor>(
    model: &FittedPipeline<M>,
    all_labels: &[f64],
    validation: &Partition,
    ctx: &LogContext,
) -> Result<MetricsBundle> {
    ctx.info("Running calculate_metrics");

    let y_pred = model.predict(&validation.features)?;
    let y_min = all_labels.iter().copied().fold(f64::INFINITY, f64::min);
    let y_max = all_labels.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let (_, y_std) = mean_std(all_labels);

    let bins = make_dataset_bins(&validation.labels)?;
    let inputs = ScoringInputs {
        y_true: &validation.labels,
        y_pred: &y_pred,
        y_max,
        y_min,
        y_std,
        weights: validation.weights.as_deref(),
        bins: &bins,
    };

    let scores = score_regression(&inputs, &MetricName::ALL)?;
    Ok(MetricsBundle::new(scores)?)
}
