//! Per-store, per-product daily sales forecasting
//!
//! This library ingests labeled historical sales records and unlabeled
//! future records, derives calendar and categorical features, trains a
//! gradient boosted tree regressor with early stopping, and emits
//! predictions as an `id,num_sold` CSV.
//!
//! # Modules
//!
//! - [`config`] - YAML configuration loading and validation
//! - [`data`] - Record types, CSV I/O, and the preparation pipeline
//! - [`features`] - Calendar feature derivation and categorical tagging
//! - [`models`] - The `ForecastModel` interface and the boosted tree model
//! - [`pipeline`] - Train and predict orchestrators behind the CLIs
//!
//! # Example
//!
//! ```rust,no_run
//! use sales_forecast::{config, pipeline};
//!
//! fn main() -> anyhow::Result<()> {
//!     let cfg = config::load_config("configs/train_config.yaml")?;
//!     pipeline::run_training(&cfg)?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod data;
pub mod features;
pub mod models;
pub mod pipeline;

// Re-export commonly used items at the crate level
pub use config::{AppConfig, ConfigError};
pub use data::{Dataset, FeatureRow, Prediction, SalesRecord};
pub use features::FeatureEngineer;
pub use models::{create_model, ForecastModel, GbdtModel, ModelError};
