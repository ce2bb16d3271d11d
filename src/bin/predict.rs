//! Generate sales predictions with a trained model.
//!
//! Usage:
//! ```
//! cargo run --bin predict -- --config configs/predict_config.yaml
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

use sales_forecast::{config, pipeline};

#[derive(Parser, Debug)]
#[command(
    name = "predict",
    about = "Generate sales predictions with a trained model",
    version
)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long)]
    config: PathBuf,
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config = config::load_config(&args.config)?;

    if let Err(e) = pipeline::run_prediction(&config) {
        error!("prediction failed: {e:#}");
        return Err(e);
    }
    Ok(())
}
