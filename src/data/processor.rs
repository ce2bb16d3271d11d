//! Data preparation pipeline
//!
//! Orchestrates loading, feature derivation, missing-value handling, and the
//! chronological train/validation split. Each stage wraps its root cause in
//! a stage-specific error; nothing is downgraded to a warning except the
//! documented missing-value counts.

use thiserror::Error;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::data::loader::{self, LoadError};
use crate::data::types::Dataset;
use crate::features::{FeatureEngineer, FeatureError};

/// Stage-specific preparation errors
#[derive(Error, Debug)]
pub enum PrepareError {
    #[error("failed to load data: {0}")]
    Load(#[from] LoadError),

    #[error("failed to derive features: {0}")]
    FeatureDerivation(#[from] FeatureError),

    #[error("failed to preprocess data: {0}")]
    Preprocess(String),

    #[error("failed to split data: {0}")]
    Split(String),
}

/// Prepares train, validation, and test datasets for the model.
pub struct DataProcessor {
    config: AppConfig,
    engineer: FeatureEngineer,
}

impl DataProcessor {
    /// Create a processor for the given configuration.
    pub fn new(config: &AppConfig) -> Self {
        Self {
            config: config.clone(),
            engineer: FeatureEngineer::new(&config.features),
        }
    }

    /// Run the full preparation pipeline.
    ///
    /// In prediction mode only the unlabeled dataset is loaded and prepared;
    /// train and validation come back empty. Otherwise the labeled dataset
    /// is loaded, cleaned, and split chronologically, and the unlabeled
    /// dataset is prepared alongside it.
    ///
    /// Rows are processed in input file order throughout; the split assumes
    /// the labeled file is already chronological.
    pub fn prepare(
        &self,
        prediction_mode: bool,
    ) -> Result<(Dataset, Dataset, Dataset), PrepareError> {
        info!("starting data preparation (prediction_mode={prediction_mode})");

        let test = self.prepare_dataset(&self.config.data.test_path, false)?;

        if prediction_mode {
            return Ok((Dataset::empty(), Dataset::empty(), test));
        }

        let labeled = self.prepare_dataset(&self.config.data.train_path, true)?;
        let (train, validation) = self.split(&labeled)?;

        info!(
            "prepared {} train, {} validation, {} test rows",
            train.len(),
            validation.len(),
            test.len()
        );
        Ok((train, validation, test))
    }

    /// Load one file and run derivation, cleaning, and categorical tagging.
    fn prepare_dataset(
        &self,
        path: &std::path::Path,
        is_training: bool,
    ) -> Result<Dataset, PrepareError> {
        let records = loader::load_records(path)?;
        let rows = self.engineer.derive_time_features(&records)?;
        let mut dataset = Dataset::new(rows);

        self.clean(&mut dataset, is_training)?;
        self.engineer.mark_categorical(&mut dataset);

        Ok(dataset)
    }

    /// Apply the missing-value policy.
    ///
    /// Labeled rows without a target are dropped. Missing categorical cells
    /// are filled with the literal `"missing"` category. The derived
    /// calendar features are total functions of the date, so they carry no
    /// gaps to impute once derivation has succeeded.
    fn clean(&self, dataset: &mut Dataset, is_training: bool) -> Result<(), PrepareError> {
        if is_training {
            let before = dataset.len();
            dataset
                .rows
                .retain(|row| row.num_sold.is_some());
            let dropped = before - dataset.len();
            if dropped > 0 {
                warn!(
                    "dropped {dropped} rows with missing `{}`",
                    self.config.data.target_column
                );
            }
            if dataset.is_empty() {
                return Err(PrepareError::Preprocess(format!(
                    "no rows left after dropping missing `{}` values",
                    self.config.data.target_column
                )));
            }
        }

        for column in self.engineer.categorical_features() {
            let mut filled = 0usize;
            for row in &mut dataset.rows {
                let cell = match column.as_str() {
                    "country" => &mut row.country,
                    "store" => &mut row.store,
                    "product" => &mut row.product,
                    other => {
                        return Err(PrepareError::Preprocess(format!(
                            "unknown categorical column `{other}`"
                        )))
                    }
                };
                if cell.is_none() {
                    *cell = Some("missing".to_string());
                    filled += 1;
                }
            }
            if filled > 0 {
                warn!("filled {filled} missing values in `{column}` with \"missing\"");
            }
        }

        Ok(())
    }

    /// Chronological prefix/suffix split of the labeled dataset.
    fn split(&self, dataset: &Dataset) -> Result<(Dataset, Dataset), PrepareError> {
        let fraction = self.config.training.validation_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(PrepareError::Split(format!(
                "validation_fraction must be in (0, 1), got {fraction}"
            )));
        }

        let (train, validation) = dataset.split_chronological(fraction);
        info!(
            "split {} rows into {} train and {} validation",
            dataset.len(),
            train.len(),
            validation.len()
        );
        Ok((train, validation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        DataConfig, FeatureConfig, ModelConfig, ModelParams, TrainingConfig,
    };
    use chrono::NaiveDate;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn config(dir: &Path) -> AppConfig {
        AppConfig {
            data: DataConfig {
                train_path: dir.join("train.csv"),
                test_path: dir.join("test.csv"),
                target_column: "num_sold".to_string(),
            },
            features: FeatureConfig {
                time_features: vec![
                    "year".to_string(),
                    "month".to_string(),
                    "dayofweek".to_string(),
                ],
                categorical_features: vec!["country".to_string(), "store".to_string()],
            },
            model: ModelConfig {
                name: "gbdt".to_string(),
                model_path: dir.join("model.json"),
                params: ModelParams::default(),
            },
            training: TrainingConfig {
                validation_fraction: 0.2,
                output_dir: dir.to_path_buf(),
            },
            output: None,
        }
    }

    fn write_labeled_csv(path: &Path, rows: usize, missing_target: usize) {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let mut content = String::from("id,date,country,store,product,num_sold\n");
        for i in 0..rows {
            let date = start + chrono::Duration::days(i as i64 / 4);
            let target = if i < missing_target {
                String::new()
            } else {
                format!("{}", 10 + i % 50)
            };
            content.push_str(&format!(
                "{},{},Norway,Mart,Stickers,{}\n",
                i + 1,
                date,
                target
            ));
        }
        fs::write(path, content).unwrap();
    }

    fn write_unlabeled_csv(path: &Path, rows: usize) {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut content = String::from("id,date,country,store,product\n");
        for i in 0..rows {
            let date = start + chrono::Duration::days(i as i64);
            content.push_str(&format!("{},{},Norway,Mart,Stickers\n", 1000 + i, date));
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_prepare_splits_after_dropping_missing_targets() {
        let dir = tempdir().unwrap();
        // 20 labeled rows, 4 without a target: 16 survive, split 12/4.
        write_labeled_csv(&dir.path().join("train.csv"), 20, 4);
        write_unlabeled_csv(&dir.path().join("test.csv"), 5);

        let processor = DataProcessor::new(&config(dir.path()));
        let (train, validation, test) = processor.prepare(false).unwrap();

        assert_eq!(train.len() + validation.len(), 16);
        assert_eq!(train.len(), 12);
        assert_eq!(validation.len(), 4);
        assert_eq!(test.len(), 5);
        assert!(train.rows.iter().all(|r| r.num_sold.is_some()));
    }

    #[test]
    fn test_year_of_daily_rows_with_a_few_missing_targets() {
        let dir = tempdir().unwrap();
        // One year of 3 countries x 3 stores x 3 products = 3285 rows, 10 of
        // them unlabeled: 3275 survive the drop, then split 2620/655.
        write_labeled_csv(&dir.path().join("train.csv"), 3285, 10);
        write_unlabeled_csv(&dir.path().join("test.csv"), 5);

        let processor = DataProcessor::new(&config(dir.path()));
        let (train, validation, _) = processor.prepare(false).unwrap();

        assert_eq!(train.len() + validation.len(), 3275);
        assert_eq!(train.len(), 2620);
        assert_eq!(validation.len(), 655);
    }

    #[test]
    fn test_prediction_mode_skips_labeled_data() {
        let dir = tempdir().unwrap();
        // No train.csv on disk at all; prediction mode must not touch it.
        write_unlabeled_csv(&dir.path().join("test.csv"), 7);

        let processor = DataProcessor::new(&config(dir.path()));
        let (train, validation, test) = processor.prepare(true).unwrap();

        assert!(train.is_empty());
        assert!(validation.is_empty());
        assert_eq!(test.len(), 7);
        assert!(test.categories.contains_key("country"));
    }

    #[test]
    fn test_missing_categorical_filled_with_sentinel() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("train.csv"),
            "id,date,country,store,product,num_sold\n\
             1,2023-01-01,,Mart,Stickers,10\n\
             2,2023-01-02,Norway,Mart,Stickers,11\n\
             3,2023-01-03,Canada,Mart,Stickers,12\n\
             4,2023-01-04,Norway,Mart,Stickers,13\n\
             5,2023-01-05,Norway,Mart,Stickers,14\n",
        )
        .unwrap();
        write_unlabeled_csv(&dir.path().join("test.csv"), 1);

        let processor = DataProcessor::new(&config(dir.path()));
        let (train, _, _) = processor.prepare(false).unwrap();

        assert_eq!(train.rows[0].country.as_deref(), Some("missing"));
        // The sentinel joins the fixed vocabulary.
        assert!(train
            .categories
            .get("country")
            .unwrap()
            .contains(&"missing".to_string()));
    }

    #[test]
    fn test_load_failure_names_path() {
        let dir = tempdir().unwrap();
        write_unlabeled_csv(&dir.path().join("test.csv"), 1);
        // train.csv is missing.
        let processor = DataProcessor::new(&config(dir.path()));
        let err = processor.prepare(false).unwrap_err();

        assert!(matches!(err, PrepareError::Load(_)));
        assert!(err.to_string().contains("train.csv"));
    }

    #[test]
    fn test_all_targets_missing_is_an_error() {
        let dir = tempdir().unwrap();
        write_labeled_csv(&dir.path().join("train.csv"), 5, 5);
        write_unlabeled_csv(&dir.path().join("test.csv"), 1);

        let processor = DataProcessor::new(&config(dir.path()));
        let err = processor.prepare(false).unwrap_err();
        assert!(matches!(err, PrepareError::Preprocess(_)));
    }
}
