//! Configuration loading and validation
//!
//! The pipeline is driven by a YAML configuration file with sections for
//! data paths, feature selection, model hyperparameters, training, and
//! prediction output. Missing required keys fail at parse time with an
//! error naming the key.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Time feature names the pipeline knows how to derive.
pub const KNOWN_TIME_FEATURES: &[&str] = &[
    "year",
    "month",
    "day",
    "dayofweek",
    "quarter",
    "is_weekend",
    "is_holiday",
];

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Input data settings
    pub data: DataConfig,

    /// Feature selection settings
    pub features: FeatureConfig,

    /// Model selection and hyperparameters
    pub model: ModelConfig,

    /// Training settings
    pub training: TrainingConfig,

    /// Prediction output settings (required by the predict pipeline)
    #[serde(default)]
    pub output: Option<OutputConfig>,
}

/// Input data settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Path to the labeled historical dataset
    pub train_path: PathBuf,

    /// Path to the unlabeled future dataset
    pub test_path: PathBuf,

    /// Name of the target column
    pub target_column: String,
}

/// Feature selection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Calendar features to feed the model, in order
    pub time_features: Vec<String>,

    /// Categorical columns to feed the model, in order
    pub categorical_features: Vec<String>,
}

impl FeatureConfig {
    /// Full ordered list of model input columns: time features followed by
    /// categorical features. This order is the feature contract a trained
    /// model is bound to.
    pub fn feature_columns(&self) -> Vec<String> {
        self.time_features
            .iter()
            .chain(self.categorical_features.iter())
            .cloned()
            .collect()
    }
}

/// Model selection and hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Registered model name (currently only "gbdt")
    pub name: String,

    /// Path the predict pipeline loads the model artifact from
    pub model_path: PathBuf,

    /// Boosting hyperparameters
    pub params: ModelParams,
}

/// Gradient boosting hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelParams {
    /// Cap on the number of boosting rounds
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,

    /// Shrinkage applied to each tree's contribution
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,

    /// Maximum tree depth
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Minimum number of samples in a leaf
    #[serde(default = "default_min_data_in_leaf")]
    pub min_data_in_leaf: usize,

    /// Fraction of feature columns considered per tree
    #[serde(default = "default_fraction")]
    pub feature_fraction: f64,

    /// Fraction of rows sampled when bagging is active
    #[serde(default = "default_fraction")]
    pub bagging_fraction: f64,

    /// Resample rows every this many rounds; 0 disables bagging
    #[serde(default)]
    pub bagging_freq: usize,

    /// Stop after this many rounds without validation improvement;
    /// 0 disables early stopping
    #[serde(default = "default_early_stopping_rounds")]
    pub early_stopping_rounds: usize,

    /// Seed for feature and row subsampling
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_n_estimators() -> usize {
    100
}

fn default_learning_rate() -> f64 {
    0.1
}

fn default_max_depth() -> usize {
    6
}

fn default_min_data_in_leaf() -> usize {
    20
}

fn default_fraction() -> f64 {
    1.0
}

fn default_early_stopping_rounds() -> usize {
    10
}

fn default_seed() -> u64 {
    42
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            n_estimators: default_n_estimators(),
            learning_rate: default_learning_rate(),
            max_depth: default_max_depth(),
            min_data_in_leaf: default_min_data_in_leaf(),
            feature_fraction: default_fraction(),
            bagging_fraction: default_fraction(),
            bagging_freq: 0,
            early_stopping_rounds: default_early_stopping_rounds(),
            seed: default_seed(),
        }
    }
}

/// Training settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Fraction of the labeled data held out for validation
    pub validation_fraction: f64,

    /// Directory the trained model artifact is written to
    pub output_dir: PathBuf,
}

/// Prediction output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Path the predictions CSV is written to
    pub predictions_path: PathBuf,
}

impl AppConfig {
    /// Check value ranges and feature names that the serde schema cannot
    /// express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let f = self.training.validation_fraction;
        if !(f > 0.0 && f < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "training.validation_fraction must be in (0, 1), got {f}"
            )));
        }

        let known: HashSet<&str> = KNOWN_TIME_FEATURES.iter().copied().collect();
        for name in &self.features.time_features {
            if !known.contains(name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "unknown time feature `{name}`; known features: {}",
                    KNOWN_TIME_FEATURES.join(", ")
                )));
            }
        }

        if self.features.feature_columns().is_empty() {
            return Err(ConfigError::Invalid(
                "at least one feature column must be configured".to_string(),
            ));
        }

        let p = &self.model.params;
        if p.n_estimators == 0 {
            return Err(ConfigError::Invalid(
                "model.params.n_estimators must be at least 1".to_string(),
            ));
        }
        if p.learning_rate <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "model.params.learning_rate must be positive, got {}",
                p.learning_rate
            )));
        }
        if p.max_depth == 0 {
            return Err(ConfigError::Invalid(
                "model.params.max_depth must be at least 1".to_string(),
            ));
        }
        for (key, value) in [
            ("feature_fraction", p.feature_fraction),
            ("bagging_fraction", p.bagging_fraction),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::Invalid(format!(
                    "model.params.{key} must be in (0, 1], got {value}"
                )));
            }
        }

        Ok(())
    }
}

/// Load and validate configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig, ConfigError> {
    let path = path.as_ref();
    info!("loading configuration from {}", path.display());

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let config: AppConfig = serde_yaml::from_str(&content)?;
    config.validate()?;

    Ok(config)
}
