//! Regression tree builder
//!
//! Leaf-wise growth over binned features: each round splits the leaf whose
//! best histogram split has the largest gain, until the leaf budget is spent
//! or no leaf has a valid split.

use tabular_core::deterministic::SplitTieBreaker;
use tabular_core::gbdt::Node;

use crate::quantize::BinnedMatrix;

/// Training parameters for a single tree
#[derive(Clone, Debug, PartialEq)]
pub struct TreeConfig {
    pub num_leaves: usize,
    pub max_depth: Option<usize>,
    pub min_child_samples: usize,
    pub min_child_weight: f64,
    pub min_split_gain: f64,
    pub reg_lambda: f64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            num_leaves: 31,
            max_depth: None,
            min_child_samples: 20,
            min_child_weight: 1e-3,
            min_split_gain: 0.0,
            reg_lambda: 0.0,
        }
    }
}

/// Gradient statistics of a row set
#[derive(Clone, Copy, Debug, Default)]
struct Stats {
    grad: f64,
    hess: f64,
    count: usize,
}

impl Stats {
    fn add(&mut self, grad: f64, hess: f64) {
        self.grad += grad;
        self.hess += hess;
        self.count += 1;
    }

    fn minus(&self, other: &Stats) -> Stats {
        Stats {
            grad: self.grad - other.grad,
            hess: self.hess - other.hess,
            count: self.count - other.count,
        }
    }
}

/// Split candidate with gain and tie-breaker
#[derive(Debug, Clone)]
struct SplitCandidate {
    feature_idx: usize,
    bin: usize,
    gain: f64,
    tie_breaker: SplitTieBreaker,
}

impl SplitCandidate {
    fn new(feature_idx: usize, bin: usize, gain: f64, leaf_id: usize) -> Self {
        Self {
            feature_idx,
            bin,
            gain,
            tie_breaker: SplitTieBreaker::new(feature_idx, bin, leaf_id),
        }
    }

    /// Higher gain wins; equal gains fall back to the smaller tie-breaker
    fn beats(&self, other: &SplitCandidate) -> bool {
        self.gain > other.gain
            || (self.gain == other.gain && self.tie_breaker < other.tie_breaker)
    }
}

/// A leaf still open for splitting
struct OpenLeaf {
    leaf_id: usize,
    node_idx: usize,
    depth: usize,
    rows: Vec<usize>,
    stats: Stats,
    best: Option<SplitCandidate>,
}

pub struct CartBuilder<'a> {
    config: &'a TreeConfig,
    data: &'a BinnedMatrix,
    gradients: &'a [f64],
    hessians: &'a [f64],
}

impl<'a> CartBuilder<'a> {
    pub fn new(
        data: &'a BinnedMatrix,
        gradients: &'a [f64],
        hessians: &'a [f64],
        config: &'a TreeConfig,
    ) -> Self {
        debug_assert_eq!(data.n_rows(), gradients.len());
        debug_assert_eq!(data.n_rows(), hessians.len());

        Self {
            config,
            data,
            gradients,
            hessians,
        }
    }

    /// Grow one tree; node 0 is the root and children follow their parent
    pub fn build(&self) -> Vec<Node> {
        let rows: Vec<usize> = (0..self.data.n_rows()).collect();
        let root = self.open_leaf(0, 0, 0, rows);

        let mut nodes = vec![Node::leaf(0, 0.0)];
        let mut leaves = vec![root];
        let mut next_leaf_id = 1;

        while leaves.len() < self.config.num_leaves {
            let Some(pos) = self.pick_leaf(&leaves) else {
                break;
            };
            let leaf = leaves.swap_remove(pos);
            let Some(split) = leaf.best else {
                break;
            };

            let bins = self.data.feature_bins(split.feature_idx);
            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = leaf
                .rows
                .iter()
                .partition(|&&r| bins[r] as usize <= split.bin);

            let left_idx = nodes.len();
            let right_idx = left_idx + 1;
            nodes.push(Node::leaf(left_idx as i32, 0.0));
            nodes.push(Node::leaf(right_idx as i32, 0.0));
            nodes[leaf.node_idx] = Node::internal(
                leaf.node_idx as i32,
                split.feature_idx as i32,
                self.data.feature(split.feature_idx).threshold(split.bin),
                left_idx as i32,
                right_idx as i32,
            );

            leaves.push(self.open_leaf(next_leaf_id, left_idx, leaf.depth + 1, left_rows));
            leaves.push(self.open_leaf(next_leaf_id + 1, right_idx, leaf.depth + 1, right_rows));
            next_leaf_id += 2;
        }

        for leaf in &leaves {
            nodes[leaf.node_idx] = Node::leaf(leaf.node_idx as i32, self.leaf_value(&leaf.stats));
        }

        nodes
    }

    fn open_leaf(&self, leaf_id: usize, node_idx: usize, depth: usize, rows: Vec<usize>) -> OpenLeaf {
        let mut stats = Stats::default();
        for &r in &rows {
            stats.add(self.gradients[r], self.hessians[r]);
        }

        let mut leaf = OpenLeaf {
            leaf_id,
            node_idx,
            depth,
            rows,
            stats,
            best: None,
        };
        leaf.best = self.find_best_split(&leaf);
        leaf
    }

    /// Open leaf with the best positive-gain split
    fn pick_leaf(&self, leaves: &[OpenLeaf]) -> Option<usize> {
        let mut chosen: Option<(usize, &SplitCandidate)> = None;

        for (pos, leaf) in leaves.iter().enumerate() {
            let Some(candidate) = &leaf.best else {
                continue;
            };
            if candidate.gain <= self.config.min_split_gain.max(0.0) {
                continue;
            }
            chosen = match chosen {
                Some((_, current)) if !candidate.beats(current) => chosen,
                _ => Some((pos, candidate)),
            };
        }

        chosen.map(|(pos, _)| pos)
    }

    fn find_best_split(&self, leaf: &OpenLeaf) -> Option<SplitCandidate> {
        let cfg = self.config;
        if cfg.max_depth.is_some_and(|d| leaf.depth >= d) {
            return None;
        }
        if leaf.rows.len() < 2 * cfg.min_child_samples.max(1) {
            return None;
        }

        let parent_score = self.score(&leaf.stats);
        let mut best: Option<SplitCandidate> = None;

        for feature_idx in 0..self.data.n_features() {
            let n_bins = self.data.feature(feature_idx).n_bins();
            if n_bins < 2 {
                continue;
            }

            let bins = self.data.feature_bins(feature_idx);
            let mut histogram = vec![Stats::default(); n_bins];
            for &r in &leaf.rows {
                histogram[bins[r] as usize].add(self.gradients[r], self.hessians[r]);
            }

            let mut left = Stats::default();
            for (bin, bucket) in histogram.iter().enumerate().take(n_bins - 1) {
                left.grad += bucket.grad;
                left.hess += bucket.hess;
                left.count += bucket.count;
                let right = leaf.stats.minus(&left);

                if left.count < cfg.min_child_samples
                    || right.count < cfg.min_child_samples
                    || left.count == 0
                    || right.count == 0
                    || left.hess < cfg.min_child_weight
                    || right.hess < cfg.min_child_weight
                {
                    continue;
                }

                let gain = self.score(&left) + self.score(&right) - parent_score;
                let candidate = SplitCandidate::new(feature_idx, bin, gain, leaf.leaf_id);
                best = match best {
                    Some(current) if !candidate.beats(&current) => Some(current),
                    _ => Some(candidate),
                };
            }
        }

        best
    }

    /// G² / (H + λ)
    fn score(&self, stats: &Stats) -> f64 {
        let denom = stats.hess + self.config.reg_lambda;
        if denom <= 0.0 {
            0.0
        } else {
            stats.grad * stats.grad / denom
        }
    }

    /// Optimal leaf value: -G / (H + λ)
    fn leaf_value(&self, stats: &Stats) -> f64 {
        let denom = stats.hess + self.config.reg_lambda;
        if denom <= 0.0 {
            0.0
        } else {
            -stats.grad / denom
        }
    }
}
