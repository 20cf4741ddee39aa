use std::cmp::Ordering;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::PaceError;

/// Seed shared by the train/test split and tree construction so a run is
/// reproducible end to end.
pub const DEFAULT_SEED: u64 = 38;

const MIN_SPLIT_GAIN: f64 = 1e-12;

#[derive(Debug, Clone, Copy)]
pub struct GbrtConfig {
    pub stages: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Fraction of rows drawn per stage. 1.0 uses every row and never
    /// touches the RNG, so the default fit is fully deterministic.
    pub subsample: f64,
    pub seed: u64,
}

impl Default for GbrtConfig {
    fn default() -> Self {
        Self {
            stages: 200,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
            subsample: 1.0,
            seed: DEFAULT_SEED,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
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

#[derive(Debug, Clone)]
struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    fn predict_row(&self, row: &[f64]) -> f64 {
        let mut at = 0usize;
        loop {
            match &self.nodes[at] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    at = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// Additive ensemble of shallow regression trees fit by gradient boosting
/// on squared error: every stage fits the current residuals and its leaf
/// values are shrunk by the learning rate.
#[derive(Debug, Clone)]
pub struct Gbrt {
    base: f64,
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl Gbrt {
    pub fn fit(features: &[Vec<f64>], targets: &[f64], config: GbrtConfig) -> Result<Self, PaceError> {
        if features.is_empty() {
            return Err(PaceError::ShapeMismatch {
                what: "training rows",
                expected: 1,
                got: 0,
            });
        }
        if features.len() != targets.len() {
            return Err(PaceError::ShapeMismatch {
                what: "training target count",
                expected: features.len(),
                got: targets.len(),
            });
        }
        let n_features = features[0].len();
        for row in features {
            if row.len() != n_features {
                return Err(PaceError::ShapeMismatch {
                    what: "feature width",
                    expected: n_features,
                    got: row.len(),
                });
            }
        }

        let n = features.len();
        let base = targets.iter().sum::<f64>() / n as f64;
        let mut preds = vec![base; n];
        let mut residuals = vec![0.0; n];
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut trees = Vec::with_capacity(config.stages);

        for _ in 0..config.stages {
            for i in 0..n {
                residuals[i] = targets[i] - preds[i];
            }
            let rows = stage_rows(n, config.subsample, &mut rng);
            let mut tree = fit_tree(features, &residuals, &rows, &config);
            scale_leaves(&mut tree, config.learning_rate);
            for (i, row) in features.iter().enumerate() {
                preds[i] += tree.predict_row(row);
            }
            trees.push(tree);
        }

        Ok(Self {
            base,
            trees,
            n_features,
        })
    }

    pub fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, PaceError> {
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            if row.len() != self.n_features {
                return Err(PaceError::ShapeMismatch {
                    what: "feature width",
                    expected: self.n_features,
                    got: row.len(),
                });
            }
            let mut value = self.base;
            for tree in &self.trees {
                value += tree.predict_row(row);
            }
            out.push(value);
        }
        Ok(out)
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

fn stage_rows(n: usize, subsample: f64, rng: &mut StdRng) -> Vec<usize> {
    if subsample >= 1.0 {
        return (0..n).collect();
    }
    let take = ((n as f64) * subsample).floor().max(1.0) as usize;
    let mut rows: Vec<usize> = (0..n).collect();
    rows.shuffle(rng);
    rows.truncate(take);
    rows.sort_unstable();
    rows
}

fn fit_tree(
    features: &[Vec<f64>],
    residuals: &[f64],
    rows: &[usize],
    config: &GbrtConfig,
) -> RegressionTree {
    let mut nodes = Vec::new();
    grow_node(&mut nodes, features, residuals, rows, 0, config);
    RegressionTree { nodes }
}

fn grow_node(
    nodes: &mut Vec<Node>,
    features: &[Vec<f64>],
    residuals: &[f64],
    rows: &[usize],
    depth: usize,
    config: &GbrtConfig,
) -> usize {
    let mean = rows.iter().map(|&i| residuals[i]).sum::<f64>() / rows.len() as f64;
    if depth >= config.max_depth || rows.len() < 2 * config.min_samples_leaf.max(1) {
        nodes.push(Node::Leaf { value: mean });
        return nodes.len() - 1;
    }

    let Some((feature, threshold)) = best_split(features, residuals, rows, config) else {
        nodes.push(Node::Leaf { value: mean });
        return nodes.len() - 1;
    };

    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
        .iter()
        .copied()
        .partition(|&i| features[i][feature] <= threshold);

    // Reserve the split slot before recursing so child indices are known.
    let at = nodes.len();
    nodes.push(Node::Leaf { value: mean });
    let left = grow_node(nodes, features, residuals, &left_rows, depth + 1, config);
    let right = grow_node(nodes, features, residuals, &right_rows, depth + 1, config);
    nodes[at] = Node::Split {
        feature,
        threshold,
        left,
        right,
    };
    at
}

/// Exact greedy search: every feature, every boundary between distinct
/// sorted values. The first strictly better gain wins, so ties resolve to
/// the lowest feature index and lowest threshold; construction is
/// deterministic for a given input.
fn best_split(
    features: &[Vec<f64>],
    residuals: &[f64],
    rows: &[usize],
    config: &GbrtConfig,
) -> Option<(usize, f64)> {
    let n_features = features[rows[0]].len();
    let min_leaf = config.min_samples_leaf.max(1);
    let total_sum: f64 = rows.iter().map(|&i| residuals[i]).sum();
    let parent_score = total_sum * total_sum / rows.len() as f64;

    let mut best: Option<(f64, usize, f64)> = None;
    let mut sorted = rows.to_vec();

    for feature in 0..n_features {
        sorted.sort_by(|&a, &b| {
            features[a][feature]
                .partial_cmp(&features[b][feature])
                .unwrap_or(Ordering::Equal)
                .then(a.cmp(&b))
        });

        let mut left_sum = 0.0;
        for split_at in 1..sorted.len() {
            left_sum += residuals[sorted[split_at - 1]];
            if split_at < min_leaf || sorted.len() - split_at < min_leaf {
                continue;
            }
            let lo = features[sorted[split_at - 1]][feature];
            let hi = features[sorted[split_at]][feature];
            if lo == hi {
                continue;
            }

            let right_sum = total_sum - left_sum;
            let left_n = split_at as f64;
            let right_n = (sorted.len() - split_at) as f64;
            let gain =
                left_sum * left_sum / left_n + right_sum * right_sum / right_n - parent_score;
            if gain > MIN_SPLIT_GAIN && best.map_or(true, |(g, _, _)| gain > g) {
                best = Some((gain, feature, (lo + hi) / 2.0));
            }
        }
    }

    best.map(|(_, feature, threshold)| (feature, threshold))
}

fn scale_leaves(tree: &mut RegressionTree, factor: f64) {
    for node in &mut tree.nodes {
        if let Node::Leaf { value } = node {
            *value *= factor;
        }
    }
}

/// Seeded Fisher-Yates split. The last `round(n * test_fraction)` shuffled
/// indices (clamped to keep both sides non-empty) are held out.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    if n < 2 {
        return (indices, Vec::new());
    }
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let test_len = ((n as f64) * test_fraction).round().clamp(1.0, (n - 1) as f64) as usize;
    let test = indices.split_off(n - test_len);
    (indices, test)
}

pub fn mean_absolute_error(predicted: &[f64], actual: &[f64]) -> f64 {
    if predicted.is_empty() || predicted.len() != actual.len() {
        return 0.0;
    }
    let sum: f64 = predicted
        .iter()
        .zip(actual)
        .map(|(p, a)| (p - a).abs())
        .sum();
    sum / predicted.len() as f64
}
