//! Forecasting models
//!
//! This module provides:
//! - The `ForecastModel` capability interface (train, predict, evaluate,
//!   save, load)
//! - The gradient boosted tree implementation
//! - A name-keyed factory for selecting a model from configuration
//! - The MAPE evaluation metric

use std::path::Path;

use thiserror::Error;

use crate::config::AppConfig;
use crate::data::types::{Dataset, Prediction};

pub mod gbdt;
pub mod tree;

pub use gbdt::GbdtModel;

/// Errors that can occur with a model
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("training failed: {0}")]
    Training(String),

    #[error("prediction failed: {0}")]
    Prediction(String),

    #[error("evaluation failed: {0}")]
    Evaluation(String),

    #[error("model has not been trained yet")]
    NotTrained,

    #[error("model persistence failed: {0}")]
    Persistence(String),

    #[error("unsupported model type `{0}`")]
    UnsupportedModel(String),
}

/// Capability interface every forecasting model variant implements.
///
/// A model starts untrained. `train` and `load` move it to the trained
/// state; `predict`, `evaluate`, and `save` fail with
/// [`ModelError::NotTrained`] before that.
pub trait ForecastModel: std::fmt::Debug {
    /// Fit on the training rows, using the validation rows for early
    /// stopping when they are non-empty.
    fn train(&mut self, train: &Dataset, validation: &Dataset) -> Result<(), ModelError>;

    /// Produce one prediction per input row, preserving ids and order.
    fn predict(&self, data: &Dataset) -> Result<Vec<Prediction>, ModelError>;

    /// Mean absolute percentage error against the rows' target values.
    fn evaluate(&self, data: &Dataset) -> Result<f64, ModelError>;

    /// Serialize the fitted model to a file.
    fn save(&self, path: &Path) -> Result<(), ModelError>;

    /// Reconstruct the fitted model from a file written by `save`.
    fn load(&mut self, path: &Path) -> Result<(), ModelError>;
}

/// Create the model variant named in the configuration.
///
/// New variants register here under their own name; callers stay unchanged.
pub fn create_model(config: &AppConfig) -> Result<Box<dyn ForecastModel>, ModelError> {
    match config.model.name.as_str() {
        "gbdt" => Ok(Box::new(GbdtModel::new(config))),
        other => Err(ModelError::UnsupportedModel(other.to_string())),
    }
}

/// Mean absolute percentage error, as a percentage.
///
/// Unbounded above; rows with a zero actual value make the result infinite
/// or NaN rather than being filtered out.
pub fn mape(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len();
    if n == 0 {
        return f64::NAN;
    }

    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| ((a - p) / a).abs())
        .sum::<f64>()
        / n as f64
        * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        DataConfig, FeatureConfig, ModelConfig, ModelParams, TrainingConfig,
    };

    fn config(model_name: &str) -> AppConfig {
        AppConfig {
            data: DataConfig {
                train_path: "train.csv".into(),
                test_path: "test.csv".into(),
                target_column: "num_sold".to_string(),
            },
            features: FeatureConfig {
                time_features: vec!["year".to_string()],
                categorical_features: vec!["store".to_string()],
            },
            model: ModelConfig {
                name: model_name.to_string(),
                model_path: "model.json".into(),
                params: ModelParams::default(),
            },
            training: TrainingConfig {
                validation_fraction: 0.2,
                output_dir: ".".into(),
            },
            output: None,
        }
    }

    #[test]
    fn test_create_registered_model() {
        assert!(create_model(&config("gbdt")).is_ok());
    }

    #[test]
    fn test_create_unknown_model_fails() {
        let err = create_model(&config("randomforest")).unwrap_err();
        assert!(matches!(err, ModelError::UnsupportedModel(_)));
        assert!(err.to_string().contains("randomforest"));
    }

    #[test]
    fn test_mape_basic() {
        let value = mape(&[100.0, 200.0], &[90.0, 220.0]);
        // (10/100 + 20/200) / 2 * 100 = 10%.
        assert!((value - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_mape_perfect_predictions() {
        assert_eq!(mape(&[5.0, 7.0], &[5.0, 7.0]), 0.0);
    }

    #[test]
    fn test_mape_zero_actual_is_not_special_cased() {
        assert!(mape(&[0.0], &[1.0]).is_infinite());
    }

    #[test]
    fn test_mape_empty_is_nan() {
        assert!(mape(&[], &[]).is_nan());
    }
}
