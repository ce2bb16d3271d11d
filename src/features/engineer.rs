//! Calendar feature derivation and categorical tagging
//!
//! Transforms raw sales records into feature rows carrying calendar-derived
//! fields, and attaches the fixed vocabulary of each categorical column to a
//! dataset. All derivations are pure functions of the row's own date; no
//! feature depends on any other row.

use chrono::{Datelike, NaiveDate};
use thiserror::Error;
use tracing::info;

use crate::config::FeatureConfig;
use crate::data::types::{Dataset, FeatureRow, SalesRecord};

/// Errors raised for malformed records during feature derivation
#[derive(Error, Debug)]
pub enum FeatureError {
    #[error("row {id} has unparseable date `{value}`: {source}")]
    InvalidDate {
        id: i64,
        value: String,
        source: chrono::ParseError,
    },
}

/// Derives calendar features and tags categorical columns.
pub struct FeatureEngineer {
    time_features: Vec<String>,
    categorical_features: Vec<String>,
}

impl FeatureEngineer {
    /// Create an engineer from the configured feature lists.
    pub fn new(config: &FeatureConfig) -> Self {
        Self {
            time_features: config.time_features.clone(),
            categorical_features: config.categorical_features.clone(),
        }
    }

    /// Derive calendar features for every record.
    ///
    /// Dates must be ISO-8601 calendar dates (`YYYY-MM-DD`); the first
    /// unparseable date aborts derivation. Output rows keep the input order.
    pub fn derive_time_features(
        &self,
        records: &[SalesRecord],
    ) -> Result<Vec<FeatureRow>, FeatureError> {
        let rows = records
            .iter()
            .map(|record| {
                let date = NaiveDate::parse_from_str(&record.date, "%Y-%m-%d").map_err(
                    |source| FeatureError::InvalidDate {
                        id: record.id,
                        value: record.date.clone(),
                        source,
                    },
                )?;
                Ok(derive_row(record, date))
            })
            .collect::<Result<Vec<_>, FeatureError>>()?;

        info!(
            "derived calendar features for {} rows ({})",
            rows.len(),
            self.time_features.join(", ")
        );
        Ok(rows)
    }

    /// Attach the fixed vocabulary of each configured categorical column.
    ///
    /// The vocabulary is the sorted, deduplicated set of values present in
    /// this dataset. Values unseen at prediction time relative to a trained
    /// model's vocabulary fall into a reserved out-of-vocabulary bucket; see
    /// the model encoding.
    pub fn mark_categorical(&self, dataset: &mut Dataset) {
        for column in &self.categorical_features {
            let mut values: Vec<String> = dataset
                .rows
                .iter()
                .filter_map(|row| row.categorical_feature(column))
                .map(str::to_string)
                .collect();
            values.sort();
            values.dedup();
            dataset.categories.insert(column.clone(), values);
        }

        info!(
            "tagged categorical columns: {}",
            self.categorical_features.join(", ")
        );
    }

    /// Ordered model input columns: time features then categorical features.
    pub fn feature_columns(&self) -> Vec<String> {
        self.time_features
            .iter()
            .chain(self.categorical_features.iter())
            .cloned()
            .collect()
    }

    /// Configured categorical column names.
    pub fn categorical_features(&self) -> &[String] {
        &self.categorical_features
    }
}

fn derive_row(record: &SalesRecord, date: NaiveDate) -> FeatureRow {
    let dayofweek = date.weekday().num_days_from_monday();
    let is_weekend = dayofweek >= 5;

    FeatureRow {
        id: record.id,
        date,
        country: record.country.clone(),
        store: record.store.clone(),
        product: record.product.clone(),
        num_sold: record.num_sold,
        year: date.year(),
        month: date.month(),
        day: date.day(),
        dayofweek,
        quarter: (date.month() - 1) / 3 + 1,
        is_weekend,
        is_holiday: is_holiday(date, is_weekend),
    }
}

/// Two-date holiday heuristic: weekends plus New Year's Day and Christmas
/// Day. This is an approximation, not a full holiday calendar.
fn is_holiday(date: NaiveDate, is_weekend: bool) -> bool {
    is_weekend
        || (date.month() == 1 && date.day() == 1)
        || (date.month() == 12 && date.day() == 25)
}
