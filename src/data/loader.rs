//! CSV reading and writing
//!
//! Loads raw sales records from CSV files and writes the predictions file.
//! Predictions are buffered and moved into place in one step so a failed run
//! never leaves a partially written output file.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use super::types::{Prediction, SalesRecord};

/// Errors raised while reading or writing tabular files
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse { path: PathBuf, source: csv::Error },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode predictions: {0}")]
    Encode(#[from] csv::Error),
}

/// Load sales records from a CSV file, preserving file order.
pub fn load_records<P: AsRef<Path>>(path: P) -> Result<Vec<SalesRecord>, LoadError> {
    let path = path.as_ref();
    let file = fs::File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = csv::Reader::from_reader(file);
    let mut records = Vec::new();

    for result in reader.deserialize() {
        let record: SalesRecord = result.map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        records.push(record);
    }

    info!("loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Write the predictions file with exactly the columns `id,num_sold`, one
/// row per prediction, in the given order.
pub fn save_predictions<P: AsRef<Path>>(
    predictions: &[Prediction],
    path: P,
) -> Result<(), LoadError> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| LoadError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    for prediction in predictions {
        writer.serialize(prediction)?;
    }
    writer.flush().map_err(|source| LoadError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    let buffer = writer.into_inner().map_err(|source| LoadError::Write {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::Other, source.to_string()),
    })?;

    // Stage next to the destination, then rename: the output file either
    // appears complete or not at all.
    let staged = path.with_extension("tmp");
    fs::write(&staged, buffer).map_err(|source| LoadError::Write {
        path: staged.clone(),
        source,
    })?;
    fs::rename(&staged, path).map_err(|source| LoadError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    info!("wrote {} predictions to {}", predictions.len(), path.display());
    Ok(())
}
