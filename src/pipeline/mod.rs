//! Pipeline orchestrators
//!
//! Thin drivers behind the two CLI entry points. All failures propagate;
//! there is no partial-success mode.

pub mod predict;
pub mod train;

pub use predict::run_prediction;
pub use train::run_training;
