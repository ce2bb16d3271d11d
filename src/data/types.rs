//! Core data types for the forecasting pipeline
//!
//! This module defines the raw sales record as it appears in the input
//! files, the feature-enriched row produced by feature derivation, and the
//! dataset container the model consumes.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One raw row of a sales CSV file.
///
/// `date` stays a string here; it is parsed during feature derivation so
/// that an unparseable date is reported per row rather than aborting the
/// whole file read. `num_sold` is absent for future (prediction-target)
/// rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    /// Unique row id
    pub id: i64,
    /// ISO-8601 calendar date string
    pub date: String,
    /// Country the sale happened in
    #[serde(default)]
    pub country: Option<String>,
    /// Store identifier
    #[serde(default)]
    pub store: Option<String>,
    /// Product identifier
    #[serde(default)]
    pub product: Option<String>,
    /// Units sold; unset for future rows
    #[serde(default)]
    pub num_sold: Option<f64>,
}

/// A sales record enriched with calendar features.
///
/// Every derived field is a pure function of `date` alone; deriving twice
/// from the same record yields identical values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    /// Unique row id, carried over from the raw record
    pub id: i64,
    /// Parsed calendar date
    pub date: NaiveDate,
    /// Country the sale happened in
    pub country: Option<String>,
    /// Store identifier
    pub store: Option<String>,
    /// Product identifier
    pub product: Option<String>,
    /// Units sold; unset for future rows
    pub num_sold: Option<f64>,
    /// Calendar year
    pub year: i32,
    /// Month of year, 1-12
    pub month: u32,
    /// Day of month, 1-31
    pub day: u32,
    /// Day of week, 0 = Monday .. 6 = Sunday
    pub dayofweek: u32,
    /// Quarter of year, 1-4
    pub quarter: u32,
    /// True on Saturday and Sunday
    pub is_weekend: bool,
    /// Weekend, New Year's Day, or Christmas Day
    pub is_holiday: bool,
}

impl FeatureRow {
    /// Look up a derived calendar feature by column name.
    pub fn numeric_feature(&self, name: &str) -> Option<f64> {
        match name {
            "year" => Some(f64::from(self.year)),
            "month" => Some(f64::from(self.month)),
            "day" => Some(f64::from(self.day)),
            "dayofweek" => Some(f64::from(self.dayofweek)),
            "quarter" => Some(f64::from(self.quarter)),
            "is_weekend" => Some(f64::from(u8::from(self.is_weekend))),
            "is_holiday" => Some(f64::from(u8::from(self.is_holiday))),
            _ => None,
        }
    }

    /// Look up a raw categorical column by name.
    pub fn categorical_feature(&self, name: &str) -> Option<&str> {
        match name {
            "country" => self.country.as_deref(),
            "store" => self.store.as_deref(),
            "product" => self.product.as_deref(),
            _ => None,
        }
    }

    /// True when `name` refers to one of the raw categorical columns,
    /// whether or not this row has a value for it.
    pub fn has_categorical_column(name: &str) -> bool {
        matches!(name, "country" | "store" | "product")
    }
}

/// An ordered collection of feature rows plus the fixed vocabulary of each
/// categorical column.
///
/// Row order is the input file order. The chronological split assumes rows
/// are already in date order; the pipeline never re-sorts them.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    /// Rows in input order
    pub rows: Vec<FeatureRow>,
    /// Sorted, deduplicated values per categorical column, filled in by
    /// categorical tagging
    pub categories: BTreeMap<String, Vec<String>>,
}

impl Dataset {
    /// Create a dataset from rows, with no categorical vocabulary yet.
    pub fn new(rows: Vec<FeatureRow>) -> Self {
        Self {
            rows,
            categories: BTreeMap::new(),
        }
    }

    /// Create an empty dataset.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Split into a train prefix and validation suffix without shuffling.
    ///
    /// The train set holds `floor(len * (1 - validation_fraction))` rows and
    /// entirely precedes the validation set in the original order.
    pub fn split_chronological(&self, validation_fraction: f64) -> (Dataset, Dataset) {
        let train_len = (self.len() as f64 * (1.0 - validation_fraction)).floor() as usize;

        let train = Dataset {
            rows: self.rows[..train_len].to_vec(),
            categories: self.categories.clone(),
        };
        let validation = Dataset {
            rows: self.rows[train_len..].to_vec(),
            categories: self.categories.clone(),
        };

        (train, validation)
    }
}

/// One output row of the predictions file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Row id, carried over from the input row
    pub id: i64,
    /// Forecast units sold
    pub num_sold: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, date: NaiveDate) -> FeatureRow {
        FeatureRow {
            id,
            date,
            country: Some("Norway".to_string()),
            store: Some("Mart".to_string()),
            product: Some("Stickers".to_string()),
            num_sold: Some(10.0),
            year: 2023,
            month: 1,
            day: 1,
            dayofweek: 6,
            quarter: 1,
            is_weekend: true,
            is_holiday: true,
        }
    }

    fn dataset_of(n: usize) -> Dataset {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let rows = (0..n)
            .map(|i| row(i as i64 + 1, start + chrono::Duration::days(i as i64)))
            .collect();
        Dataset::new(rows)
    }

    #[test]
    fn test_split_sizes() {
        // One year of 3 countries x 3 stores x 3 products.
        let dataset = dataset_of(3285);
        let (train, validation) = dataset.split_chronological(0.2);

        assert_eq!(train.len(), 2628);
        assert_eq!(validation.len(), 657);
        assert_eq!(train.len() + validation.len(), dataset.len());
    }

    #[test]
    fn test_split_preserves_order() {
        let dataset = dataset_of(10);
        let (train, validation) = dataset.split_chronological(0.3);

        assert_eq!(train.len(), 7);
        let train_ids: Vec<i64> = train.rows.iter().map(|r| r.id).collect();
        let validation_ids: Vec<i64> = validation.rows.iter().map(|r| r.id).collect();
        assert_eq!(train_ids, vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(validation_ids, vec![8, 9, 10]);
    }

    #[test]
    fn test_numeric_feature_lookup() {
        let r = row(1, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(r.numeric_feature("year"), Some(2023.0));
        assert_eq!(r.numeric_feature("dayofweek"), Some(6.0));
        assert_eq!(r.numeric_feature("is_weekend"), Some(1.0));
        assert_eq!(r.numeric_feature("close"), None);
    }

    #[test]
    fn test_categorical_feature_lookup() {
        let r = row(1, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(r.categorical_feature("country"), Some("Norway"));
        assert_eq!(r.categorical_feature("year"), None);
        assert!(FeatureRow::has_categorical_column("store"));
        assert!(!FeatureRow::has_categorical_column("month"));
    }
}
