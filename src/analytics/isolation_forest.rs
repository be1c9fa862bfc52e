//! Isolation forest outlier scoring.
//!
//! Each tree recursively splits a random sub-sample on a random feature at a random value.
//! Points that end up alone after few splits are scored as more anomalous.

use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::seq::{SliceRandom, index};
use rand::{Rng, SeedableRng};

use crate::error::AnalyticsError;

const EULER_GAMMA: f64 = 0.577_215_664_9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_samples: usize,
    /// Expected share of outliers, used to place the zero of the decision function.
    pub contamination: f64,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_samples: 256,
            contamination: 0.1,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        value: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    fn grow(x: ArrayView2<f64>, rows: &[usize], height_limit: usize, rng: &mut StdRng) -> Self {
        let mut tree = IsolationTree { nodes: Vec::new() };
        tree.build(x, rows, 0, height_limit, rng);
        tree
    }

    fn build(
        &mut self,
        x: ArrayView2<f64>,
        rows: &[usize],
        depth: usize,
        height_limit: usize,
        rng: &mut StdRng,
    ) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { size: rows.len() });
        if rows.len() <= 1 || depth >= height_limit {
            return id;
        }

        // only features that still vary inside this node can split it
        let candidates: Vec<(usize, f64, f64)> = (0..x.ncols())
            .filter_map(|feature| {
                let (lo, hi) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| {
                    let v = x[[r, feature]];
                    (lo.min(v), hi.max(v))
                });
                (hi > lo).then_some((feature, lo, hi))
            })
            .collect();
        let Some(&(feature, lo, hi)) = candidates.choose(rng) else {
            return id;
        };

        let value = rng.gen_range(lo..hi);
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
            rows.iter().copied().partition(|&r| x[[r, feature]] <= value);

        let left = self.build(x, &left_rows, depth + 1, height_limit, rng);
        let right = self.build(x, &right_rows, depth + 1, height_limit, rng);
        self.nodes[id] = Node::Split {
            feature,
            value,
            left,
            right,
        };
        id
    }

    fn path_length(&self, point: ArrayView1<f64>) -> f64 {
        let mut node = 0;
        let mut depth = 0.0;
        loop {
            match self.nodes[node] {
                Node::Leaf { size } => return depth + average_path_length(size),
                Node::Split {
                    feature,
                    value,
                    left,
                    right,
                } => {
                    node = if point[feature] <= value { left } else { right };
                    depth += 1.0;
                }
            }
        }
    }
}

/// Expected path length of an unsuccessful search in a binary search tree of `n` points.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Linear interpolation between closest ranks, `p` in `[0, 100]`.
fn percentile(values: &Array1<f64>, p: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    sample_size: usize,
    offset: f64,
}

impl IsolationForest {
    pub fn fit(x: ArrayView2<f64>, params: &ForestParams) -> Result<Self, AnalyticsError> {
        let n = x.nrows();
        if n < 2 {
            return Err(AnalyticsError::model_fit(
                "isolation forest",
                format!("needs at least 2 rows, got {n}"),
            ));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(AnalyticsError::model_fit(
                "isolation forest",
                "feature matrix contains non-finite values",
            ));
        }
        if params.n_trees == 0 || !(0.0..=0.5).contains(&params.contamination) {
            return Err(AnalyticsError::model_fit(
                "isolation forest",
                "n_trees must be positive and contamination within [0, 0.5]",
            ));
        }

        let sample_size = params.max_samples.min(n).max(2);
        let height_limit = (sample_size as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(params.seed);

        let trees = (0..params.n_trees)
            .map(|_| {
                let rows = index::sample(&mut rng, n, sample_size).into_vec();
                IsolationTree::grow(x, &rows, height_limit, &mut rng)
            })
            .collect();

        let mut forest = IsolationForest {
            trees,
            sample_size,
            offset: 0.0,
        };
        let training_scores = forest.score_samples(x);
        forest.offset = percentile(&training_scores, 100.0 * params.contamination);
        Ok(forest)
    }

    /// Opposite of the normalised anomaly measure, in `[-1, 0]`; lower means more isolated.
    pub fn score_samples(&self, x: ArrayView2<f64>) -> Array1<f64> {
        let norm = average_path_length(self.sample_size);
        x.rows()
            .into_iter()
            .map(|point| {
                let mean_path = self
                    .trees
                    .iter()
                    .map(|t| t.path_length(point))
                    .sum::<f64>()
                    / self.trees.len() as f64;
                -(2f64.powf(-mean_path / norm))
            })
            .collect()
    }

    /// Scores shifted so that roughly `contamination` of the training rows fall below zero.
    pub fn decision_function(&self, x: ArrayView2<f64>) -> Array1<f64> {
        self.score_samples(x) - self.offset
    }
}
