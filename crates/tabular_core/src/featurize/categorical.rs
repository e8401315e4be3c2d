//! Categorical imputation and label encoding

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::deterministic::seeded_hash;
use crate::errors::{LibraryError, Result};
use crate::stage::{ValueEncoder, ValueTransform};
use crate::table::Value;

/// Fills missing cells with the most frequent observed category.
///
/// Frequency ties go to the lexicographically smallest category. A column
/// with no observed categories is left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryImputer {
    fill: Option<String>,
}

impl CategoryImputer {
    pub fn fill_value(&self) -> Option<&str> {
        self.fill.as_deref()
    }
}

impl ValueTransform for CategoryImputer {
    fn fit(&mut self, values: &[Value]) -> Result<()> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for category in values.iter().filter_map(Value::as_category) {
            *counts.entry(category).or_default() += 1;
        }

        let mut best: Option<(String, usize)> = None;
        for (category, count) in counts {
            if best.as_ref().map_or(true, |(_, best_count)| count > *best_count) {
                best = Some((category, count));
            }
        }

        self.fill = best.map(|(category, _)| category);
        Ok(())
    }

    fn transform(&self, values: &[Value]) -> Result<Vec<Value>> {
        Ok(values
            .iter()
            .map(|value| match (value, &self.fill) {
                (Value::Missing, Some(fill)) => Value::Text(fill.clone()),
                _ => value.clone(),
            })
            .collect())
    }
}

/// Maps each category to its index in the sorted set of training categories.
///
/// Categories unseen during fit are assigned a stable existing code derived
/// from a seeded hash of their text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    pub hashing_seed: u64,
    classes: Option<Vec<String>>,
}

impl LabelEncoder {
    pub fn new(hashing_seed: u64) -> Self {
        Self {
            hashing_seed,
            classes: None,
        }
    }

    pub fn classes(&self) -> Option<&[String]> {
        self.classes.as_deref()
    }

    /// Code for one category string
    pub fn code(&self, category: &str) -> Result<usize> {
        let classes = self
            .classes
            .as_deref()
            .ok_or_else(|| LibraryError::Featurization("label encoder used before fit".into()))?;

        Ok(match classes.binary_search_by(|c| c.as_str().cmp(category)) {
            Ok(idx) => idx,
            Err(_) => (seeded_hash(category.as_bytes(), self.hashing_seed) % classes.len() as u64)
                as usize,
        })
    }
}

impl ValueEncoder for LabelEncoder {
    fn fit(&mut self, values: &[Value]) -> Result<()> {
        let classes: BTreeSet<String> = values.iter().map(|v| v.to_string()).collect();
        if classes.is_empty() {
            return Err(LibraryError::Featurization(
                "label encoder needs at least one category".into(),
            ));
        }
        self.classes = Some(classes.into_iter().collect());
        Ok(())
    }

    fn encode(&self, values: &[Value]) -> Result<Vec<Vec<f64>>> {
        let codes = values
            .iter()
            .map(|v| self.code(&v.to_string()).map(|code| code as f64))
            .collect::<Result<Vec<f64>>>()?;
        Ok(vec![codes])
    }

    fn output_names(&self, column: &str) -> Result<Vec<String>> {
        Ok(vec![column.to_string()])
    }
}
