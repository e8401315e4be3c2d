//! Feature quantization for histogram-based split search
//!
//! Each feature gets at most `max_bin` bins. Bin `b` holds values in
//! `(upper[b-1], upper[b]]`; the last upper bound is `+inf`. Upper bounds sit
//! halfway between neighbouring distinct training values, so a split after
//! bin `b` is the raw-value test `x <= upper[b]`.

use tabular_core::{FeatureMatrix, LibraryError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureBins {
    upper_bounds: Vec<f64>,
}

impl FeatureBins {
    /// Learn bin bounds from one feature column
    pub fn fit(values: &[f64], max_bin: usize) -> Self {
        let mut sorted: Vec<f64> = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let mut distinct = sorted.clone();
        distinct.dedup();

        let mut upper_bounds = Vec::new();
        if distinct.len() <= max_bin {
            upper_bounds.extend(distinct.windows(2).map(|w| midpoint(w[0], w[1])));
        } else {
            // Equal-frequency cut points, each moved to the gap after its value
            for k in 1..max_bin {
                let cut = sorted[k * sorted.len() / max_bin];
                let next = distinct.partition_point(|&v| v <= cut);
                if let Some(&above) = distinct.get(next) {
                    upper_bounds.push(midpoint(cut, above));
                }
            }
            upper_bounds.dedup();
        }
        upper_bounds.push(f64::INFINITY);

        Self { upper_bounds }
    }

    pub fn n_bins(&self) -> usize {
        self.upper_bounds.len()
    }

    pub fn bin(&self, value: f64) -> usize {
        self.upper_bounds.partition_point(|&upper| upper < value)
    }

    /// Raw-value threshold separating bins `..=bin` from the rest
    pub fn threshold(&self, bin: usize) -> f64 {
        self.upper_bounds[bin]
    }
}

fn midpoint(a: f64, b: f64) -> f64 {
    a + (b - a) / 2.0
}

/// Bin indices for every cell, stored feature-major
#[derive(Debug, Clone)]
pub struct BinnedMatrix {
    n_rows: usize,
    features: Vec<FeatureBins>,
    bins: Vec<Vec<u16>>,
}

impl BinnedMatrix {
    pub fn from_matrix(matrix: &FeatureMatrix, max_bin: usize) -> Result<Self> {
        if !(2..=u16::MAX as usize).contains(&max_bin) {
            return Err(LibraryError::Training(format!("max_bin {} out of range", max_bin)));
        }

        let mut features = Vec::with_capacity(matrix.n_cols());
        let mut bins = Vec::with_capacity(matrix.n_cols());
        for c in 0..matrix.n_cols() {
            let column: Vec<f64> = matrix.column(c).collect();
            if column.iter().any(|v| !v.is_finite()) {
                return Err(LibraryError::Training(format!(
                    "feature `{}` contains non-finite values",
                    matrix.names()[c]
                )));
            }

            let mapper = FeatureBins::fit(&column, max_bin);
            bins.push(column.iter().map(|&v| mapper.bin(v) as u16).collect());
            features.push(mapper);
        }

        Ok(Self {
            n_rows: matrix.n_rows(),
            features,
            bins,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    pub fn feature(&self, f: usize) -> &FeatureBins {
        &self.features[f]
    }

    /// Bin index of every row for feature `f`
    pub fn feature_bins(&self, f: usize) -> &[u16] {
        &self.bins[f]
    }
}
