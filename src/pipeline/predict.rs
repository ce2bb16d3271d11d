//! Prediction pipeline
//!
//! Thin driver for the batch prediction run: load the persisted model,
//! prepare the unlabeled dataset, predict, and write the predictions file.

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::config::AppConfig;
use crate::data::loader;
use crate::data::processor::DataProcessor;
use crate::models;

/// Run the full prediction pipeline.
pub fn run_prediction(config: &AppConfig) -> Result<()> {
    info!("starting prediction pipeline");

    let model_path = &config.model.model_path;
    if !model_path.exists() {
        bail!("model file not found: {}", model_path.display());
    }

    let mut model = models::create_model(config)?;
    model.load(model_path)?;

    let processor = DataProcessor::new(config);
    let (_, _, test) = processor
        .prepare(true)
        .context("data preparation failed")?;

    let predictions = model.predict(&test)?;

    let output = config
        .output
        .as_ref()
        .context("config is missing the `output.predictions_path` key")?;
    loader::save_predictions(&predictions, &output.predictions_path)?;

    info!("prediction pipeline completed");
    Ok(())
}
