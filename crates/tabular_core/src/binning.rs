//! Quantile binning of regression targets
//!
//! Bins group held-out labels so predicted-vs-true statistics can be
//! reported per label range.

use serde::{Deserialize, Serialize};

use crate::errors::{LibraryError, Result};

/// Upper limit on the number of target bins
pub const MAX_DATASET_BINS: usize = 10;

/// Bin layout for one target vector.
///
/// Bins are left-closed; the last bin is also right-closed, so every label
/// falls into exactly one bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetBins {
    pub number_of_bins: usize,
    pub bin_starts: Vec<f64>,
    pub bin_ends: Vec<f64>,
    pub bin_counts: Vec<usize>,

    /// Bin index of every input label, in input order
    pub assignments: Vec<usize>,
}

impl DatasetBins {
    pub fn bin_of(&self, value: f64) -> usize {
        // Interior edges are the starts of bins 1..n
        let interior = self.bin_starts.get(1..).unwrap_or(&[]);
        interior.partition_point(|&edge| edge <= value)
    }
}

/// Linear-interpolated quantile of sorted data
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Bin `y` into `min(10, distinct values)` quantile bins.
///
/// Edges that coincide after interpolation are merged, so heavily repeated
/// labels may produce fewer bins than requested.
pub fn make_dataset_bins(y: &[f64]) -> Result<DatasetBins> {
    if y.is_empty() {
        return Err(LibraryError::Scoring("cannot bin an empty target".into()));
    }
    if y.iter().any(|v| !v.is_finite()) {
        return Err(LibraryError::Scoring("target contains non-finite values".into()));
    }

    let mut sorted = y.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut distinct = sorted.clone();
    distinct.dedup();
    let requested = distinct.len().min(MAX_DATASET_BINS);

    let mut edges: Vec<f64> = (0..=requested)
        .map(|k| quantile(&sorted, k as f64 / requested as f64))
        .collect();
    edges.dedup();

    // A constant target collapses to a single degenerate bin
    let (bin_starts, bin_ends) = if edges.len() < 2 {
        (vec![edges[0]], vec![edges[0]])
    } else {
        (edges[..edges.len() - 1].to_vec(), edges[1..].to_vec())
    };

    let mut bins = DatasetBins {
        number_of_bins: bin_starts.len(),
        bin_starts,
        bin_ends,
        bin_counts: Vec::new(),
        assignments: Vec::with_capacity(y.len()),
    };

    let mut counts = vec![0usize; bins.number_of_bins];
    for &value in y {
        let bin = bins.bin_of(value);
        counts[bin] += 1;
        bins.assignments.push(bin);
    }
    bins.bin_counts = counts;

    Ok(bins)
}
