//! CART decision trees shared by the forest and the boosting model.
//!
//! Two split criteria are supported:
//!
//! - `Criterion::Gini`: classification on binary labels; leaves store the
//!   fraction of positive samples that reached them
//! - `Criterion::Newton`: second-order regression on per-sample gradients and
//!   hessians (logistic loss); leaves store `-G / (H + λ)`
//!
//! Split search is exact: for each candidate feature the node's samples are
//! sorted and every boundary between distinct values is scored. Samples with
//! `x <= threshold` go left.

use rand::Rng;
use rand::seq::index::sample;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Gains at or below this are not worth a split.
const MIN_GAIN: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted tree stored as a flat node arena (root at index 0).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<Node>,
}

impl DecisionTree {
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() { 0 } else { walk(&self.nodes, 0) }
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, Node::Leaf { .. })).count()
    }

    /// Structural check for trees read back from disk.
    ///
    /// Nodes are stored in pre-order, so every child index must lie strictly
    /// after its parent and inside the arena. That also bounds `predict_row`.
    pub fn validate(&self, n_features: usize) -> Result<(), AppError> {
        if self.nodes.is_empty() {
            return Err(AppError::ArtifactLoad("decision tree has no nodes".to_string()));
        }
        let len = self.nodes.len();
        for (idx, node) in self.nodes.iter().enumerate() {
            match *node {
                Node::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(AppError::ArtifactLoad(format!("tree node {idx} has non-finite leaf value")));
                    }
                }
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if feature >= n_features {
                        return Err(AppError::ArtifactLoad(format!(
                            "tree node {idx} splits on feature {feature} but the model has {n_features}"
                        )));
                    }
                    if !threshold.is_finite() {
                        return Err(AppError::ArtifactLoad(format!("tree node {idx} has non-finite threshold")));
                    }
                    for child in [left, right] {
                        if child <= idx || child >= len {
                            return Err(AppError::ArtifactLoad(format!(
                                "tree node {idx} points to child {child} (arena holds {len} nodes)"
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// What the tree is fitted against.
#[derive(Debug, Clone, Copy)]
pub enum Criterion<'a> {
    Gini {
        labels: &'a [u8],
    },
    Newton {
        grad: &'a [f64],
        hess: &'a [f64],
        lambda: f64,
        min_child_weight: f64,
    },
}

/// Structural limits for tree growth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Features examined per node; `None` examines all of them.
    pub max_features: Option<usize>,
}

/// Grow a tree over `indices` (which may contain repeats, e.g. a bootstrap).
pub fn grow_tree<R: Rng>(
    rows: &[Vec<f64>],
    indices: &mut [usize],
    criterion: Criterion<'_>,
    params: &TreeParams,
    rng: &mut R,
) -> DecisionTree {
    let n_features = rows.first().map_or(0, Vec::len);
    let mut grower = Grower {
        rows,
        criterion,
        params,
        n_features,
        nodes: Vec::new(),
    };
    grower.build(indices, 0, rng);
    DecisionTree { nodes: grower.nodes }
}

struct Grower<'a> {
    rows: &'a [Vec<f64>],
    criterion: Criterion<'a>,
    params: &'a TreeParams,
    n_features: usize,
    nodes: Vec<Node>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl Grower<'_> {
    fn build<R: Rng>(&mut self, indices: &mut [usize], depth: usize, rng: &mut R) -> usize {
        let node_idx = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: self.leaf_value(indices),
        });

        if depth >= self.params.max_depth || indices.len() < self.params.min_samples_split.max(2) || self.is_pure(indices) {
            return node_idx;
        }

        let Some(split) = self.best_split(indices, rng) else {
            return node_idx;
        };

        let mid = partition(indices, |i| self.rows[i][split.feature] <= split.threshold);
        if mid == 0 || mid == indices.len() {
            return node_idx;
        }

        let (left_idx, right_idx) = indices.split_at_mut(mid);
        let left = self.build(left_idx, depth + 1, rng);
        let right = self.build(right_idx, depth + 1, rng);
        self.nodes[node_idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_idx
    }

    fn leaf_value(&self, indices: &[usize]) -> f64 {
        match self.criterion {
            Criterion::Gini { labels } => {
                if indices.is_empty() {
                    return 0.5;
                }
                let pos = indices.iter().filter(|&&i| labels[i] == 1).count();
                pos as f64 / indices.len() as f64
            }
            Criterion::Newton { grad, hess, lambda, .. } => {
                let g: f64 = indices.iter().map(|&i| grad[i]).sum();
                let h: f64 = indices.iter().map(|&i| hess[i]).sum();
                -g / (h + lambda)
            }
        }
    }

    fn is_pure(&self, indices: &[usize]) -> bool {
        match self.criterion {
            Criterion::Gini { labels } => {
                let first = labels[indices[0]];
                indices.iter().all(|&i| labels[i] == first)
            }
            Criterion::Newton { .. } => false,
        }
    }

    fn candidate_features<R: Rng>(&self, rng: &mut R) -> Vec<usize> {
        match self.params.max_features {
            Some(m) if m < self.n_features => {
                let mut features = sample(rng, self.n_features, m.max(1)).into_vec();
                features.sort_unstable();
                features
            }
            _ => (0..self.n_features).collect(),
        }
    }

    fn best_split<R: Rng>(&self, indices: &[usize], rng: &mut R) -> Option<SplitCandidate> {
        let mut sorted = indices.to_vec();
        let mut best: Option<SplitCandidate> = None;

        for feature in self.candidate_features(rng) {
            let rows = self.rows;
            sorted.sort_by(|&a, &b| rows[a][feature].total_cmp(&rows[b][feature]).then(a.cmp(&b)));
            if let Some((gain, threshold)) = self.scan_feature(&sorted, feature) {
                if best.as_ref().is_none_or(|b| gain > b.gain) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        gain,
                    });
                }
            }
        }

        best
    }

    /// Best `(gain, threshold)` for one feature over samples sorted by it.
    fn scan_feature(&self, sorted: &[usize], feature: usize) -> Option<(f64, f64)> {
        let value = |k: usize| self.rows[sorted[k]][feature];
        let n = sorted.len();
        let mut best: Option<(f64, f64)> = None;

        match self.criterion {
            Criterion::Gini { labels } => {
                let total_pos = sorted.iter().filter(|&&i| labels[i] == 1).count() as f64;
                let parent = weighted_gini(total_pos, n as f64);
                let mut left_pos = 0.0;
                for k in 0..n - 1 {
                    left_pos += f64::from(labels[sorted[k]]);
                    if value(k) == value(k + 1) {
                        continue;
                    }
                    let n_left = (k + 1) as f64;
                    let n_right = (n - k - 1) as f64;
                    let child = weighted_gini(left_pos, n_left) + weighted_gini(total_pos - left_pos, n_right);
                    let gain = parent - child;
                    if gain > MIN_GAIN && best.is_none_or(|(g, _)| gain > g) {
                        best = Some((gain, midpoint(value(k), value(k + 1))));
                    }
                }
            }
            Criterion::Newton {
                grad,
                hess,
                lambda,
                min_child_weight,
            } => {
                let g_total: f64 = sorted.iter().map(|&i| grad[i]).sum();
                let h_total: f64 = sorted.iter().map(|&i| hess[i]).sum();
                let parent = g_total * g_total / (h_total + lambda);
                let (mut g_left, mut h_left) = (0.0, 0.0);
                for k in 0..n - 1 {
                    g_left += grad[sorted[k]];
                    h_left += hess[sorted[k]];
                    if value(k) == value(k + 1) {
                        continue;
                    }
                    let (g_right, h_right) = (g_total - g_left, h_total - h_left);
                    if h_left < min_child_weight || h_right < min_child_weight {
                        continue;
                    }
                    let gain = 0.5
                        * (g_left * g_left / (h_left + lambda) + g_right * g_right / (h_right + lambda) - parent);
                    if gain > MIN_GAIN && best.is_none_or(|(g, _)| gain > g) {
                        best = Some((gain, midpoint(value(k), value(k + 1))));
                    }
                }
            }
        }

        best
    }
}

/// `n * gini` for a node with `pos` positives out of `n`.
fn weighted_gini(pos: f64, n: f64) -> f64 {
    if n <= 0.0 {
        return 0.0;
    }
    2.0 * pos * (n - pos) / n
}

fn midpoint(a: f64, b: f64) -> f64 {
    let m = a + (b - a) / 2.0;
    // Guard against rounding up onto `b` for adjacent floats.
    if m >= b { a } else { m }
}

/// Move items satisfying `pred` to the front; returns how many there are.
fn partition(items: &mut [usize], pred: impl Fn(usize) -> bool) -> usize {
    let mut mid = 0;
    for k in 0..items.len() {
        if pred(items[k]) {
            items.swap(mid, k);
            mid += 1;
        }
    }
    mid
}
