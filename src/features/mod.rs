//! Feature engineering
//!
//! This module provides:
//! - Calendar feature derivation from record dates
//! - Categorical vocabulary tagging

pub mod engineer;

pub use engineer::{FeatureEngineer, FeatureError};
