//! GBDT regression model
//!
//! Prediction is `bias + Σ tree.weight * leaf`. The model serializes to
//! canonical JSON and is identified by the BLAKE3 hash of that form.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::tree::Tree;
use crate::errors::{LibraryError, Result};
use crate::matrix::FeatureMatrix;
use crate::serialization::{canonical_hash_hex, canonical_json_string};
use crate::stage::Predictor;

/// Current model format version
pub const MODEL_VERSION: i32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GbdtModel {
    pub version: i32,
    pub trees: Vec<Tree>,
    pub bias: f64,
    pub feature_names: Vec<String>,
}

impl GbdtModel {
    pub fn new(trees: Vec<Tree>, bias: f64, feature_names: Vec<String>) -> Self {
        Self {
            version: MODEL_VERSION,
            trees,
            bias,
            feature_names,
        }
    }

    pub fn feature_count(&self) -> usize {
        self.feature_names.len()
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Validate model structure
    pub fn validate(&self) -> Result<()> {
        if self.version != MODEL_VERSION {
            return Err(LibraryError::InvalidModel(format!(
                "unsupported model version {}",
                self.version
            )));
        }
        if !self.bias.is_finite() {
            return Err(LibraryError::InvalidModel(format!("non-finite bias {}", self.bias)));
        }

        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.feature_count())
                .map_err(|e| LibraryError::InvalidModel(format!("tree {}: {}", i, e)))?;
        }

        Ok(())
    }

    /// Score a single feature row
    pub fn score(&self, features: &[f64]) -> f64 {
        self.trees
            .iter()
            .fold(self.bias, |sum, tree| sum + tree.evaluate(features))
    }

    pub fn to_canonical_json(&self) -> Result<String> {
        Ok(canonical_json_string(self)?)
    }

    /// BLAKE3 hash (hex) of the canonical JSON form
    pub fn hash_hex(&self) -> Result<String> {
        Ok(canonical_hash_hex(self)?)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_canonical_json()?)?;
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let model: GbdtModel = serde_json::from_str(&json)?;
        model.validate()?;
        Ok(model)
    }
}

impl Predictor for GbdtModel {
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>> {
        if features.n_cols() != self.feature_count() {
            return Err(LibraryError::InvalidModel(format!(
                "model expects {} features, got {}",
                self.feature_count(),
                features.n_cols()
            )));
        }

        Ok((0..features.n_rows())
            .map(|r| self.score(features.row(r)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gbdt::tree::Node;
    use tempfile::tempdir;

    fn two_tree_model() -> GbdtModel {
        let t1 = Tree::new(
            vec![
                Node::internal(0, 0, 50.0, 1, 2),
                Node::leaf(1, 100.0),
                Node::leaf(2, 200.0),
            ],
            0.1,
        );
        let t2 = Tree::new(
            vec![
                Node::internal(0, 1, 30.0, 1, 2),
                Node::leaf(1, -50.0),
                Node::leaf(2, 50.0),
            ],
            0.1,
        );
        GbdtModel::new(vec![t1, t2], 10.0, vec!["a".into(), "b".into()])
    }

    #[test]
    fn test_two_tree_inference() {
        let model = two_tree_model();
        // 10 + 0.1 * 100 + 0.1 * -50
        assert!((model.score(&[30.0, 20.0]) - 15.0).abs() < 1e-9);
        // 10 + 0.1 * 200 + 0.1 * 50
        assert!((model.score(&[60.0, 40.0]) - 35.0).abs() < 1e-9);
    }

    #[test]
    fn test_predict_checks_width() -> Result<()> {
        let model = two_tree_model();
        let narrow = FeatureMatrix::from_columns(1, vec!["a".into()], vec![vec![1.0]])?;
        assert!(model.predict(&narrow).is_err());
        Ok(())
    }

    #[test]
    fn test_hash_stability() -> Result<()> {
        let model = two_tree_model();
        assert_eq!(model.hash_hex()?, model.clone().hash_hex()?);
        Ok(())
    }

    #[test]
    fn test_save_load_roundtrip() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("model.json");
        let model = two_tree_model();
        model.save_json(&path)?;
        assert_eq!(GbdtModel::load_json(&path)?, model);
        Ok(())
    }
}
