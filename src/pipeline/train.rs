//! Training pipeline
//!
//! Thin driver composing the data processor and the configured model:
//! prepare data, train with early stopping, report validation MAPE, and
//! save the model artifact.

use anyhow::{Context, Result};
use tracing::info;

use crate::config::AppConfig;
use crate::data::processor::DataProcessor;
use crate::models;

/// Run the full training pipeline.
pub fn run_training(config: &AppConfig) -> Result<()> {
    info!("starting training pipeline");

    let processor = DataProcessor::new(config);
    let (train, validation, _test) = processor
        .prepare(false)
        .context("data preparation failed")?;

    let mut model = models::create_model(config)?;
    model.train(&train, &validation)?;

    let mape = model.evaluate(&validation)?;
    info!("validation MAPE: {mape:.2}%");

    std::fs::create_dir_all(&config.training.output_dir).with_context(|| {
        format!(
            "failed to create output directory {}",
            config.training.output_dir.display()
        )
    })?;
    let model_path = config.training.output_dir.join("model.json");
    model.save(&model_path)?;

    info!("training pipeline completed");
    Ok(())
}
