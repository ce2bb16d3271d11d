//! Regression trees for gradient boosting
//!
//! A depth-limited binary regression tree fit with exact greedy splits.
//! Split search scans every candidate column and every threshold between
//! distinct consecutive values, maximizing squared-error reduction. The
//! search is exhaustive and tie-broken by column order, so fitting is
//! deterministic for a given row and column selection.

use serde::{Deserialize, Serialize};

/// Tree growth limits
#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    /// Maximum depth; 1 yields a stump
    pub max_depth: usize,
    /// Minimum number of rows on each side of a split
    pub min_data_in_leaf: usize,
}

/// A fitted regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    root: Node,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Branch {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl RegressionTree {
    /// Fit a tree to `targets` over the given row indices, considering only
    /// the given columns of the feature matrix.
    pub fn fit(
        features: &[Vec<f64>],
        targets: &[f64],
        rows: &[usize],
        columns: &[usize],
        params: &TreeParams,
    ) -> Self {
        let root = grow(features, targets, rows, columns, params, 0);
        Self { root }
    }

    /// Predict a single feature vector.
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { value } => return *value,
                Node::Branch {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

fn grow(
    features: &[Vec<f64>],
    targets: &[f64],
    rows: &[usize],
    columns: &[usize],
    params: &TreeParams,
    depth: usize,
) -> Node {
    if depth >= params.max_depth || rows.len() < 2 * params.min_data_in_leaf {
        return leaf(targets, rows);
    }

    let split = match best_split(features, targets, rows, columns, params.min_data_in_leaf) {
        Some(split) => split,
        None => return leaf(targets, rows),
    };

    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
        .iter()
        .copied()
        .partition(|&row| features[row][split.feature] <= split.threshold);

    Node::Branch {
        feature: split.feature,
        threshold: split.threshold,
        left: Box::new(grow(features, targets, &left_rows, columns, params, depth + 1)),
        right: Box::new(grow(
            features, targets, &right_rows, columns, params, depth + 1,
        )),
    }
}

fn leaf(targets: &[f64], rows: &[usize]) -> Node {
    let sum: f64 = rows.iter().map(|&row| targets[row]).sum();
    Node::Leaf {
        value: sum / rows.len() as f64,
    }
}

/// Exact greedy search over all columns and thresholds.
///
/// For each column the rows are sorted by value; sweeping the sorted order
/// with running sums gives the squared-error reduction of every boundary
/// between distinct values in one pass.
fn best_split(
    features: &[Vec<f64>],
    targets: &[f64],
    rows: &[usize],
    columns: &[usize],
    min_data_in_leaf: usize,
) -> Option<BestSplit> {
    if rows.len() < 2 {
        return None;
    }

    let total_sum: f64 = rows.iter().map(|&row| targets[row]).sum();
    let total_count = rows.len() as f64;

    let mut best: Option<BestSplit> = None;

    for &feature in columns {
        let mut order: Vec<usize> = rows.to_vec();
        order.sort_by(|&a, &b| {
            features[a][feature]
                .partial_cmp(&features[b][feature])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut left_sum = 0.0;
        for (position, &row) in order.iter().enumerate().take(order.len() - 1) {
            left_sum += targets[row];

            let here = features[row][feature];
            let next = features[order[position + 1]][feature];
            if here == next {
                continue;
            }

            if (position + 1) < min_data_in_leaf
                || (order.len() - position - 1) < min_data_in_leaf
            {
                continue;
            }
            let left_count = (position + 1) as f64;
            let right_count = total_count - left_count;

            // Variance reduction up to a constant: sum^2/n on each side
            // minus the parent term.
            let right_sum = total_sum - left_sum;
            let gain = left_sum * left_sum / left_count + right_sum * right_sum / right_count
                - total_sum * total_sum / total_count;

            if gain > best.as_ref().map_or(1e-12, |b| b.gain) {
                best = Some(BestSplit {
                    feature,
                    threshold: (here + next) / 2.0,
                    gain,
                });
            }
        }
    }

    best
}
