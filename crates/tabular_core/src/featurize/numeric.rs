//! Mean imputation for continuous columns

use serde::{Deserialize, Serialize};

use crate::errors::{LibraryError, Result};
use crate::stage::ValueEncoder;
use crate::table::Value;

/// Replaces missing cells with the training mean (0.0 when nothing was observed)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeanImputer {
    mean: Option<f64>,
}

impl MeanImputer {
    pub fn mean(&self) -> Option<f64> {
        self.mean
    }

    fn numeric(value: &Value) -> Result<Option<f64>> {
        match value {
            Value::Missing => Ok(None),
            Value::Number(n) => Ok(Some(*n)),
            Value::Text(text) => Err(LibraryError::Featurization(format!(
                "cannot impute non-numeric value `{}`",
                text
            ))),
        }
    }
}

impl ValueEncoder for MeanImputer {
    fn fit(&mut self, values: &[Value]) -> Result<()> {
        let mut sum = 0.0;
        let mut count = 0usize;
        for value in values {
            if let Some(n) = Self::numeric(value)? {
                sum += n;
                count += 1;
            }
        }

        self.mean = Some(if count > 0 { sum / count as f64 } else { 0.0 });
        Ok(())
    }

    fn encode(&self, values: &[Value]) -> Result<Vec<Vec<f64>>> {
        let mean = self
            .mean
            .ok_or_else(|| LibraryError::Featurization("mean imputer used before fit".into()))?;

        let column = values
            .iter()
            .map(|v| Self::numeric(v).map(|n| n.unwrap_or(mean)))
            .collect::<Result<Vec<f64>>>()?;
        Ok(vec![column])
    }

    fn output_names(&self, column: &str) -> Result<Vec<String>> {
        Ok(vec![column.to_string()])
    }
}
