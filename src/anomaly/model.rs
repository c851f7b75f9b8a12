use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::AnalyticsError;

use super::types::{FeatureRow, FEATURE_COUNT};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// An unsupervised outlier model over the account feature matrix.
pub trait OutlierModel {
    /// Fit on every row of `matrix` and score those same rows.
    ///
    /// Scores follow the "higher is more normal" convention; the detector turns
    /// them into decisions relative to the contamination boundary.
    fn fit_predict(&mut self, matrix: &[FeatureRow]) -> Result<Vec<f64>, AnalyticsError>;

    fn name(&self) -> &'static str;
}

enum IsolationNode {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<IsolationNode>,
        right: Box<IsolationNode>,
    },
}

/// Isolation Forest (Liu, Ting & Zhou 2008).
///
/// Each tree is grown on a random subsample by splitting on a random feature at
/// a uniform random value until points are isolated or the depth limit is hit.
/// Anomalies isolate in fewer splits, so their mean path length is short.
pub struct IsolationForest {
    n_trees: usize,
    max_samples: usize,
    rng: StdRng,
}

impl IsolationForest {
    pub const DEFAULT_TREES: usize = 100;
    pub const DEFAULT_MAX_SAMPLES: usize = 256;

    /// Without a seed the forest draws from OS entropy and scores vary between runs.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => {
                tracing::warn!("Isolation forest is unseeded, anomaly flags are not reproducible");
                StdRng::from_entropy()
            }
        };
        Self {
            n_trees: Self::DEFAULT_TREES,
            max_samples: Self::DEFAULT_MAX_SAMPLES,
            rng,
        }
    }

    pub fn with_trees(mut self, n_trees: usize) -> Self {
        self.n_trees = n_trees.max(1);
        self
    }

    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = max_samples.max(2);
        self
    }

    fn grow(
        &mut self,
        matrix: &[FeatureRow],
        indices: Vec<usize>,
        depth: usize,
        max_depth: usize,
    ) -> IsolationNode {
        if depth >= max_depth || indices.len() <= 1 {
            return IsolationNode::Leaf {
                size: indices.len(),
            };
        }

        // Only features that still vary inside this node can split it.
        let candidates: Vec<(usize, f64, f64)> = (0..FEATURE_COUNT)
            .filter_map(|feature| {
                let (lo, hi) = indices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
                    let v = matrix[i][feature];
                    (lo.min(v), hi.max(v))
                });
                (hi > lo).then_some((feature, lo, hi))
            })
            .collect();

        let Some(&(feature, lo, hi)) = candidates.choose(&mut self.rng) else {
            return IsolationNode::Leaf {
                size: indices.len(),
            };
        };

        let threshold = self.rng.gen_range(lo..hi);
        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| matrix[i][feature] <= threshold);

        IsolationNode::Split {
            feature,
            threshold,
            left: Box::new(self.grow(matrix, left, depth + 1, max_depth)),
            right: Box::new(self.grow(matrix, right, depth + 1, max_depth)),
        }
    }
}

impl OutlierModel for IsolationForest {
    fn fit_predict(&mut self, matrix: &[FeatureRow]) -> Result<Vec<f64>, AnalyticsError> {
        validate_matrix(matrix)?;

        let n = matrix.len();
        let sample_size = self.max_samples.min(n);
        let max_depth = (sample_size as f64).log2().ceil().max(1.0) as usize;

        let mut trees = Vec::with_capacity(self.n_trees);
        for _ in 0..self.n_trees {
            let sample = rand::seq::index::sample(&mut self.rng, n, sample_size).into_vec();
            trees.push(self.grow(matrix, sample, 0, max_depth));
        }

        let normaliser = average_path_length(sample_size);
        let scores = matrix
            .iter()
            .map(|row| {
                let mean_depth = trees
                    .iter()
                    .map(|tree| path_length(tree, row))
                    .sum::<f64>()
                    / trees.len() as f64;
                -(2f64).powf(-mean_depth / normaliser)
            })
            .collect();

        tracing::debug!(
            rows = n,
            trees = trees.len(),
            sample_size,
            max_depth,
            "Isolation forest fitted"
        );

        Ok(scores)
    }

    fn name(&self) -> &'static str {
        "isolation_forest"
    }
}

fn validate_matrix(matrix: &[FeatureRow]) -> Result<(), AnalyticsError> {
    if matrix.len() < 2 {
        return Err(AnalyticsError::Classification(format!(
            "need at least two accounts to fit an outlier model, got {}",
            matrix.len()
        )));
    }
    if matrix.iter().flatten().any(|v| !v.is_finite()) {
        return Err(AnalyticsError::Classification(
            "feature matrix contains non-finite values".to_string(),
        ));
    }
    let first = matrix[0];
    if matrix.iter().all(|row| *row == first) {
        return Err(AnalyticsError::Classification(
            "feature matrix is constant, nothing can be isolated".to_string(),
        ));
    }
    Ok(())
}

fn path_length(node: &IsolationNode, row: &FeatureRow) -> f64 {
    let mut node = node;
    let mut depth = 0.0;
    loop {
        match node {
            IsolationNode::Leaf { size } => return depth + average_path_length(*size),
            IsolationNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                node = if row[*feature] <= *threshold { left } else { right };
                depth += 1.0;
            }
        }
    }
}

/// Expected path length of an unsuccessful BST search over `n` points, used
/// both to normalise scores and to credit unsplit leaves.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}
