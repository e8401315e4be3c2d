//! Decision tree structures for GBDT inference
//!
//! Nodes live in a flat vector with node 0 as the root. Traversal goes left
//! when `feature <= threshold`.

use serde::{Deserialize, Serialize};

/// A decision tree node (internal or leaf)
///
/// For internal nodes `feature_idx >= 0`, `left`/`right` index child nodes
/// and `leaf` is `None`. Leaf nodes have `feature_idx == -1` and carry the
/// raw leaf value in `leaf`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub id: i32,
    pub left: i32,
    pub right: i32,
    pub feature_idx: i32,
    pub threshold: f64,
    pub leaf: Option<f64>,
}

impl Node {
    /// Create a new internal (split) node
    pub fn internal(id: i32, feature_idx: i32, threshold: f64, left: i32, right: i32) -> Self {
        Self {
            id,
            left,
            right,
            feature_idx,
            threshold,
            leaf: None,
        }
    }

    /// Create a new leaf node
    pub fn leaf(id: i32, value: f64) -> Self {
        Self {
            id,
            left: -1,
            right: -1,
            feature_idx: -1,
            threshold: 0.0,
            leaf: Some(value),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.feature_idx == -1 || self.leaf.is_some()
    }
}

/// A single regression tree; its output is `weight * leaf`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tree {
    pub nodes: Vec<Node>,

    /// Shrinkage applied to every leaf of this tree
    pub weight: f64,
}

impl Tree {
    pub fn new(nodes: Vec<Node>, weight: f64) -> Self {
        Self { nodes, weight }
    }

    /// Raw leaf value reached by `features` (before `weight`)
    pub fn leaf_value(&self, features: &[f64]) -> f64 {
        let mut idx = 0usize;

        loop {
            let Some(node) = self.nodes.get(idx) else {
                return 0.0;
            };

            if node.is_leaf() {
                return node.leaf.unwrap_or(0.0);
            }

            let Some(&value) = features.get(node.feature_idx as usize) else {
                return 0.0;
            };

            let next = if value <= node.threshold {
                node.left
            } else {
                node.right
            };
            if next < 0 {
                return 0.0;
            }
            idx = next as usize;
        }
    }

    /// Weighted output for one feature row
    pub fn evaluate(&self, features: &[f64]) -> f64 {
        self.weight * self.leaf_value(features)
    }

    pub fn num_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Validate tree structure
    pub fn validate(&self, feature_count: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        if !self.weight.is_finite() {
            return Err(format!("non-finite tree weight {}", self.weight));
        }

        let n = self.nodes.len() as i32;
        for (i, node) in self.nodes.iter().enumerate() {
            if node.is_leaf() {
                match node.leaf {
                    Some(v) if v.is_finite() => {}
                    _ => return Err(format!("leaf {} has no finite value", i)),
                }
                continue;
            }

            if node.feature_idx < 0 || node.feature_idx as usize >= feature_count {
                return Err(format!(
                    "node {} splits on feature {} of {}",
                    i, node.feature_idx, feature_count
                ));
            }
            // Children are always stored after their parent, which rules out cycles
            if node.left <= i as i32 || node.left >= n || node.right <= i as i32 || node.right >= n {
                return Err(format!("node {} has invalid children", i));
            }
        }

        Ok(())
    }
}
