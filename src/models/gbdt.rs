//! Gradient boosted tree regressor
//!
//! An additive ensemble of regression trees fit sequentially to the
//! residuals of the running prediction, with optional per-tree feature and
//! row subsampling and validation-driven early stopping. Subsampling is
//! seeded, so training is deterministic for a fixed configuration and
//! input.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{AppConfig, ModelParams};
use crate::data::types::{Dataset, FeatureRow, Prediction};
use crate::models::tree::{RegressionTree, TreeParams};
use crate::models::{mape, ForecastModel, ModelError};

/// Code used for categorical values outside a trained model's vocabulary.
///
/// Rows with such values still get a prediction, but land in a bucket the
/// model never saw during training.
fn out_of_vocabulary_code(vocabulary: &[String]) -> f64 {
    vocabulary.len() as f64
}

/// Everything a fitted ensemble needs to predict, persisted as the model
/// artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FittedEnsemble {
    /// Hyperparameters the ensemble was trained with
    params: ModelParams,
    /// Prediction before any tree is applied (training target mean)
    base_score: f64,
    /// Boosted trees, best-round prefix after early stopping
    trees: Vec<RegressionTree>,
    /// Ordered input columns the ensemble was trained on
    feature_columns: Vec<String>,
    /// Categorical vocabulary frozen at training time
    categories: BTreeMap<String, Vec<String>>,
}

impl FittedEnsemble {
    fn predict_row(&self, row: &[f64]) -> f64 {
        let trees: f64 = self.trees.iter().map(|tree| tree.predict_row(row)).sum();
        self.base_score + self.params.learning_rate * trees
    }
}

/// Gradient boosted tree forecasting model.
///
/// Starts untrained; `train` or `load` moves it to the trained state that
/// `predict`, `evaluate`, and `save` require.
#[derive(Debug)]
pub struct GbdtModel {
    params: ModelParams,
    feature_columns: Vec<String>,
    target_column: String,
    ensemble: Option<FittedEnsemble>,
}

impl GbdtModel {
    /// Create an untrained model from the configuration.
    pub fn new(config: &AppConfig) -> Self {
        Self {
            params: config.model.params.clone(),
            feature_columns: config.features.feature_columns(),
            target_column: config.data.target_column.clone(),
            ensemble: None,
        }
    }

    /// True once the model can predict.
    pub fn is_trained(&self) -> bool {
        self.ensemble.is_some()
    }

    /// Number of trees in the fitted ensemble.
    pub fn n_trees(&self) -> usize {
        self.ensemble.as_ref().map_or(0, |e| e.trees.len())
    }

    fn fitted(&self) -> Result<&FittedEnsemble, ModelError> {
        self.ensemble.as_ref().ok_or(ModelError::NotTrained)
    }

    /// Encode the configured feature columns of every row into a numeric
    /// matrix, in column order. Time features pass through as numbers;
    /// categorical values become their index in the frozen vocabulary, or
    /// the out-of-vocabulary code when absent from it.
    ///
    /// Callers wrap the message in their stage-specific error kind.
    fn build_matrix(
        rows: &[FeatureRow],
        feature_columns: &[String],
        categories: &BTreeMap<String, Vec<String>>,
    ) -> Result<Vec<Vec<f64>>, String> {
        rows.iter()
            .map(|row| {
                feature_columns
                    .iter()
                    .map(|column| {
                        if let Some(value) = row.numeric_feature(column) {
                            return Ok(value);
                        }
                        if FeatureRow::has_categorical_column(column) {
                            let vocabulary = categories.get(column).ok_or_else(|| {
                                format!("no vocabulary for categorical column `{column}`")
                            })?;
                            return Ok(match row.categorical_feature(column) {
                                Some(value) => vocabulary
                                    .binary_search_by(|v| v.as_str().cmp(value))
                                    .map_or(out_of_vocabulary_code(vocabulary), |i| i as f64),
                                None => out_of_vocabulary_code(vocabulary),
                            });
                        }
                        Err(format!("unknown feature column `{column}`"))
                    })
                    .collect()
            })
            .collect()
    }

    fn targets(&self, dataset: &Dataset) -> Result<Vec<f64>, ModelError> {
        dataset
            .rows
            .iter()
            .map(|row| {
                row.num_sold.ok_or_else(|| {
                    ModelError::Training(format!(
                        "row {} is missing target `{}`",
                        row.id, self.target_column
                    ))
                })
            })
            .collect()
    }
}

fn rmse(predictions: &[f64], targets: &[f64]) -> f64 {
    let sse: f64 = predictions
        .iter()
        .zip(targets)
        .map(|(p, t)| (p - t) * (p - t))
        .sum();
    (sse / targets.len() as f64).sqrt()
}

impl ForecastModel for GbdtModel {
    fn train(&mut self, train: &Dataset, validation: &Dataset) -> Result<(), ModelError> {
        if train.is_empty() {
            return Err(ModelError::Training("empty training data".to_string()));
        }

        let categories = train.categories.clone();
        let features = Self::build_matrix(&train.rows, &self.feature_columns, &categories)
            .map_err(ModelError::Training)?;
        let targets = self.targets(train)?;

        let validation_features = if validation.is_empty() {
            Vec::new()
        } else {
            Self::build_matrix(&validation.rows, &self.feature_columns, &categories)
                .map_err(ModelError::Training)?
        };
        let validation_targets = if validation.is_empty() {
            Vec::new()
        } else {
            self.targets(validation)?
        };

        info!(
            "training gbdt on {} rows, {} features, validating on {} rows",
            train.len(),
            self.feature_columns.len(),
            validation.len()
        );

        let params = &self.params;
        let base_score = targets.iter().sum::<f64>() / targets.len() as f64;
        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_data_in_leaf: params.min_data_in_leaf,
        };

        let all_rows: Vec<usize> = (0..train.len()).collect();
        let all_columns: Vec<usize> = (0..self.feature_columns.len()).collect();
        let mut rng = StdRng::seed_from_u64(params.seed);

        let mut train_pred = vec![base_score; targets.len()];
        let mut validation_pred = vec![base_score; validation_targets.len()];
        let mut residuals = vec![0.0; targets.len()];

        let mut trees: Vec<RegressionTree> = Vec::new();
        let mut bagged_rows = all_rows.clone();
        let mut best_round = 0usize;
        let mut best_rmse = f64::INFINITY;

        for round in 1..=params.n_estimators {
            for (residual, (target, pred)) in
                residuals.iter_mut().zip(targets.iter().zip(&train_pred))
            {
                *residual = target - pred;
            }

            if params.bagging_freq > 0
                && params.bagging_fraction < 1.0
                && (round - 1) % params.bagging_freq == 0
            {
                bagged_rows = sample(&all_rows, params.bagging_fraction, &mut rng);
            }
            let columns = if params.feature_fraction < 1.0 {
                sample(&all_columns, params.feature_fraction, &mut rng)
            } else {
                all_columns.clone()
            };

            let tree =
                RegressionTree::fit(&features, &residuals, &bagged_rows, &columns, &tree_params);

            for (pred, row) in train_pred.iter_mut().zip(&features) {
                *pred += params.learning_rate * tree.predict_row(row);
            }
            for (pred, row) in validation_pred.iter_mut().zip(&validation_features) {
                *pred += params.learning_rate * tree.predict_row(row);
            }
            trees.push(tree);

            if validation_targets.is_empty() {
                best_round = round;
                if round % 100 == 0 {
                    info!("round {round}: train rmse {:.5}", rmse(&train_pred, &targets));
                }
                continue;
            }

            let validation_rmse = rmse(&validation_pred, &validation_targets);
            if validation_rmse < best_rmse {
                best_rmse = validation_rmse;
                best_round = round;
            }

            if round % 100 == 0 {
                info!(
                    "round {round}: train rmse {:.5}, valid rmse {validation_rmse:.5}",
                    rmse(&train_pred, &targets)
                );
            }

            if params.early_stopping_rounds > 0
                && round - best_round >= params.early_stopping_rounds
            {
                info!(
                    "early stopping at round {round}, best round {best_round} \
                     (valid rmse {best_rmse:.5})"
                );
                break;
            }
        }

        // Keep the ensemble as of the best validation round, not the last.
        trees.truncate(best_round);
        info!("training finished with {} trees", trees.len());

        self.ensemble = Some(FittedEnsemble {
            params: self.params.clone(),
            base_score,
            trees,
            feature_columns: self.feature_columns.clone(),
            categories,
        });
        Ok(())
    }

    fn predict(&self, data: &Dataset) -> Result<Vec<Prediction>, ModelError> {
        let ensemble = self.fitted()?;
        let features =
            Self::build_matrix(&data.rows, &ensemble.feature_columns, &ensemble.categories)
                .map_err(ModelError::Prediction)?;

        Ok(data
            .rows
            .iter()
            .zip(&features)
            .map(|(row, encoded)| Prediction {
                id: row.id,
                num_sold: ensemble.predict_row(encoded),
            })
            .collect())
    }

    fn evaluate(&self, data: &Dataset) -> Result<f64, ModelError> {
        let ensemble = self.fitted()?;
        let features =
            Self::build_matrix(&data.rows, &ensemble.feature_columns, &ensemble.categories)
                .map_err(ModelError::Evaluation)?;

        let actual: Vec<f64> = data
            .rows
            .iter()
            .map(|row| {
                row.num_sold.ok_or_else(|| {
                    ModelError::Evaluation(format!(
                        "row {} is missing target `{}`",
                        row.id, self.target_column
                    ))
                })
            })
            .collect::<Result<_, _>>()?;
        let predicted: Vec<f64> = features.iter().map(|row| ensemble.predict_row(row)).collect();

        Ok(mape(&actual, &predicted))
    }

    fn save(&self, path: &Path) -> Result<(), ModelError> {
        let ensemble = self.fitted()?;
        let json = serde_json::to_string(ensemble).map_err(|source| {
            ModelError::Persistence(format!("failed to encode model: {source}"))
        })?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| {
                    ModelError::Persistence(format!(
                        "failed to create {}: {source}",
                        parent.display()
                    ))
                })?;
            }
        }
        fs::write(path, json).map_err(|source| {
            ModelError::Persistence(format!("failed to write {}: {source}", path.display()))
        })?;

        info!("saved model to {}", path.display());
        Ok(())
    }

    fn load(&mut self, path: &Path) -> Result<(), ModelError> {
        let content = fs::read_to_string(path).map_err(|source| {
            ModelError::Persistence(format!("failed to read {}: {source}", path.display()))
        })?;
        let ensemble: FittedEnsemble = serde_json::from_str(&content).map_err(|source| {
            ModelError::Persistence(format!("failed to decode {}: {source}", path.display()))
        })?;

        info!(
            "loaded model with {} trees from {}",
            ensemble.trees.len(),
            path.display()
        );
        self.ensemble = Some(ensemble);
        Ok(())
    }
}

/// Deterministically sample `floor(len * fraction)` items, at least one.
fn sample(items: &[usize], fraction: f64, rng: &mut StdRng) -> Vec<usize> {
    let count = ((items.len() as f64 * fraction) as usize).max(1);
    let mut shuffled = items.to_vec();
    shuffled.shuffle(rng);
    shuffled.truncate(count);
    shuffled.sort_unstable();
    shuffled
}
