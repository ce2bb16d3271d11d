//! Train the sales forecasting model.
//!
//! Usage:
//! ```
//! cargo run --bin train -- --config configs/train_config.yaml
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

use sales_forecast::{config, pipeline};

#[derive(Parser, Debug)]
#[command(name = "train", about = "Train the sales forecasting model", version)]
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

    if let Err(e) = pipeline::run_training(&config) {
        error!("training failed: {e:#}");
        return Err(e);
    }
    Ok(())
}
