//! Data loading and preparation
//!
//! This module provides:
//! - Core row and dataset types
//! - CSV reading and prediction writing
//! - The data preparation pipeline (derive, clean, split)

pub mod loader;
pub mod processor;
pub mod types;

pub use loader::{load_records, save_predictions, LoadError};
pub use processor::{DataProcessor, PrepareError};
pub use types::{Dataset, FeatureRow, Prediction, SalesRecord};
