//! Gradient Boosted Decision Tree (GBDT) trainer
//!
//! Squared-error boosting: start from the (weighted) label mean, then fit
//! each tree to the current gradients `pred - y` with unit hessians, scaled by
//! sample weight when present.

use serde::{Deserialize, Serialize};

use tabular_core::{FeatureMatrix, GbdtModel, LibraryError, Predictor, Tree};

use crate::cart::{CartBuilder, TreeConfig};
use crate::errors::TrainerError;
use crate::quantize::BinnedMatrix;

/// GBDT hyper-parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GbdtParams {
    pub num_trees: usize,
    pub num_leaves: usize,
    pub learning_rate: f64,
    /// Unlimited when unset
    pub max_depth: Option<usize>,
    pub min_child_samples: usize,
    pub min_child_weight: f64,
    pub min_split_gain: f64,
    pub reg_lambda: f64,
    pub max_bin: usize,
}

impl Default for GbdtParams {
    fn default() -> Self {
        Self {
            num_trees: 100,
            num_leaves: 31,
            learning_rate: 0.1,
            max_depth: None,
            min_child_samples: 20,
            min_child_weight: 1e-3,
            min_split_gain: 0.0,
            reg_lambda: 0.0,
            max_bin: 255,
        }
    }
}

impl GbdtParams {
    pub fn validate(&self) -> Result<(), TrainerError> {
        let invalid = |msg: String| Err(TrainerError::Config(msg));

        if self.num_trees == 0 {
            return invalid("num_trees must be at least 1".into());
        }
        if self.num_leaves < 2 {
            return invalid(format!("num_leaves {} must be at least 2", self.num_leaves));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return invalid(format!("learning_rate {} must be positive", self.learning_rate));
        }
        if !(2..=u16::MAX as usize).contains(&self.max_bin) {
            return invalid(format!("max_bin {} out of range", self.max_bin));
        }
        if self.reg_lambda < 0.0 || self.min_child_weight < 0.0 || self.min_split_gain < 0.0 {
            return invalid("regularization parameters must be non-negative".into());
        }
        Ok(())
    }

    pub fn tree_config(&self) -> TreeConfig {
        TreeConfig {
            num_leaves: self.num_leaves,
            max_depth: self.max_depth,
            min_child_samples: self.min_child_samples,
            min_child_weight: self.min_child_weight,
            min_split_gain: self.min_split_gain,
            reg_lambda: self.reg_lambda,
        }
    }
}

/// Final pipeline stage: learns a predictor from features and labels
pub trait Regressor {
    type Model: Predictor;

    fn fit(
        &self,
        features: &FeatureMatrix,
        labels: &[f64],
        weights: Option<&[f64]>,
    ) -> tabular_core::Result<Self::Model>;
}

/// GBDT trainer
#[derive(Clone, Debug, Default)]
pub struct GbdtTrainer {
    params: GbdtParams,
}

impl GbdtTrainer {
    pub fn new(params: GbdtParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &GbdtParams {
        &self.params
    }

    /// Train a GBDT model on the given features
    pub fn train(
        &self,
        features: &FeatureMatrix,
        labels: &[f64],
        weights: Option<&[f64]>,
    ) -> tabular_core::Result<GbdtModel> {
        let n = features.n_rows();
        if n == 0 {
            return Err(LibraryError::Training("no training rows".into()));
        }
        if labels.len() != n || weights.is_some_and(|w| w.len() != n) {
            return Err(LibraryError::Training(format!(
                "{} feature rows, {} labels, {} weights",
                n,
                labels.len(),
                weights.map_or(n, <[f64]>::len)
            )));
        }

        let bias = self.calculate_bias(labels, weights)?;
        let binned = BinnedMatrix::from_matrix(features, self.params.max_bin)?;
        let tree_config = self.params.tree_config();

        let mut predictions = vec![bias; n];
        let mut trees = Vec::with_capacity(self.params.num_trees);

        for tree_idx in 0..self.params.num_trees {
            let (gradients, hessians) =
                self.calculate_gradients_hessians(labels, weights, &predictions);

            let nodes = CartBuilder::new(&binned, &gradients, &hessians, &tree_config).build();
            let tree = Tree::new(nodes, self.params.learning_rate);

            if tree.num_leaves() < 2 {
                tracing::info!(
                    trees = tree_idx,
                    "stopped boosting: no leaf meets the split requirements"
                );
                break;
            }

            for (r, prediction) in predictions.iter_mut().enumerate() {
                *prediction += tree.evaluate(features.row(r));
            }
            tracing::debug!("trained tree {}/{}", tree_idx + 1, self.params.num_trees);
            trees.push(tree);
        }

        let model = GbdtModel::new(trees, bias, features.names().to_vec());
        model.validate()?;
        Ok(model)
    }

    /// Initial score: (weighted) mean of labels
    fn calculate_bias(&self, labels: &[f64], weights: Option<&[f64]>) -> tabular_core::Result<f64> {
        let (sum, total) = match weights {
            Some(w) => (
                labels.iter().zip(w).map(|(y, w)| y * w).sum::<f64>(),
                w.iter().sum::<f64>(),
            ),
            None => (labels.iter().sum::<f64>(), labels.len() as f64),
        };

        if total <= 0.0 {
            return Err(LibraryError::Training("sample weights sum to zero".into()));
        }
        Ok(sum / total)
    }

    /// Squared-error gradients `pred - y`; hessian 1, both times the sample weight
    fn calculate_gradients_hessians(
        &self,
        labels: &[f64],
        weights: Option<&[f64]>,
        predictions: &[f64],
    ) -> (Vec<f64>, Vec<f64>) {
        labels
            .iter()
            .zip(predictions)
            .enumerate()
            .map(|(i, (y, p))| {
                let w = weights.map_or(1.0, |w| w[i]);
                (w * (p - y), w)
            })
            .unzip()
    }
}

impl Regressor for GbdtTrainer {
    type Model = GbdtModel;

    fn fit(
        &self,
        features: &FeatureMatrix,
        labels: &[f64],
        weights: Option<&[f64]>,
    ) -> tabular_core::Result<GbdtModel> {
        self.train(features, labels, weights)
    }
}
