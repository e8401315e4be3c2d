//! Max-abs scaling
//!
//! Each column is divided by the largest absolute value seen during fit,
//! so training values fall in [-1, 1]. Later inputs are divided by the same
//! divisors and may fall outside that range.

use serde::{Deserialize, Serialize};

use crate::errors::{LibraryError, Result};
use crate::matrix::FeatureMatrix;
use crate::stage::Stage;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaxAbsScaler {
    max_abs: Option<Vec<f64>>,
}

impl MaxAbsScaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-column max |x| observed in fit
    pub fn max_abs(&self) -> Option<&[f64]> {
        self.max_abs.as_deref()
    }

    /// Divisor for a column; all-zero columns are left unscaled
    fn divisor(max_abs: f64) -> f64 {
        if max_abs == 0.0 {
            1.0
        } else {
            max_abs
        }
    }
}

impl Stage<FeatureMatrix> for MaxAbsScaler {
    type Output = FeatureMatrix;

    fn fit(&mut self, input: &FeatureMatrix) -> Result<()> {
        let max_abs = (0..input.n_cols())
            .map(|c| input.column(c).fold(0.0_f64, |acc, v| acc.max(v.abs())))
            .collect::<Vec<f64>>();

        if let Some(c) = max_abs.iter().position(|m| !m.is_finite()) {
            return Err(LibraryError::Featurization(format!(
                "column `{}` contains non-finite values",
                input.names()[c]
            )));
        }

        self.max_abs = Some(max_abs);
        Ok(())
    }

    fn transform(&self, input: &FeatureMatrix) -> Result<FeatureMatrix> {
        let max_abs = self
            .max_abs
            .as_deref()
            .ok_or_else(|| LibraryError::Featurization("scaler used before fit".into()))?;

        if max_abs.len() != input.n_cols() {
            return Err(LibraryError::Featurization(format!(
                "scaler fit on {} columns, got {}",
                max_abs.len(),
                input.n_cols()
            )));
        }

        let mut scaled = input.clone();
        scaled.map_in_place(|c, v| v / Self::divisor(max_abs[c]));
        Ok(scaled)
    }
}
