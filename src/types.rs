//! Core types for the Stress Flux pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: per-source metric tables, the merged table, and the projected
//! feature vectors consumed by the predictor.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ComputeError;

/// Number of features the stress model was trained on
pub const FEATURE_COUNT: usize = 11;

/// Feature names, in the exact column order the model was trained on
pub static FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "activity_minutes_sum",
    "rmssd",
    "nremhr",
    "entropy",
    "spo2_average",
    "sleep_overall_score",
    "sleep_revitalization_score",
    "sleep_deep_minutes",
    "sleep_resting_heart_rate",
    "sleep_restlessness",
    "stress_score",
];

/// Common key name the per-source date columns are renamed to before merging
pub const DATE_KEY: &str = "date";

/// Export source identifier for provenance tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricSource {
    Activity,
    HeartRateVariability,
    BloodOxygen,
    SleepScore,
    StressScore,
}

impl MetricSource {
    /// All sources, in merge order
    pub const ALL: [MetricSource; 5] = [
        MetricSource::Activity,
        MetricSource::HeartRateVariability,
        MetricSource::BloodOxygen,
        MetricSource::SleepScore,
        MetricSource::StressScore,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricSource::Activity => "activity",
            MetricSource::HeartRateVariability => "hrv",
            MetricSource::BloodOxygen => "spo2",
            MetricSource::SleepScore => "sleep",
            MetricSource::StressScore => "stress",
        }
    }

    /// Name of the date-bearing column in the raw export
    pub fn date_column(&self) -> &'static str {
        match self {
            MetricSource::Activity => "date",
            MetricSource::HeartRateVariability
            | MetricSource::BloodOxygen
            | MetricSource::SleepScore => "timestamp",
            MetricSource::StressScore => "DATE",
        }
    }

    /// Numeric columns this source contributes to the feature vector
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            MetricSource::Activity => &FEATURE_NAMES[0..1],
            MetricSource::HeartRateVariability => &FEATURE_NAMES[1..4],
            MetricSource::BloodOxygen => &FEATURE_NAMES[4..5],
            MetricSource::SleepScore => &FEATURE_NAMES[5..10],
            MetricSource::StressScore => &FEATURE_NAMES[10..11],
        }
    }
}

impl std::fmt::Display for MetricSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A date-keyed numeric table.
///
/// Rows are kept sorted by date and each date appears at most once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricTable {
    name: String,
    key: String,
    columns: Vec<String>,
    rows: BTreeMap<NaiveDate, Vec<f64>>,
}

impl MetricTable {
    /// Create an empty table with the given key column and value columns
    pub fn new(name: impl Into<String>, key: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            columns,
            rows: BTreeMap::new(),
        }
    }

    /// Create an empty table shaped for one export source
    pub fn for_source(source: MetricSource) -> Self {
        Self::new(
            source.as_str(),
            source.date_column(),
            source.columns().iter().map(|c| c.to_string()).collect(),
        )
    }

    /// Insert a row; a date that is already present is rejected
    pub fn insert(&mut self, date: NaiveDate, values: Vec<f64>) -> Result<(), ComputeError> {
        self.check_width(&values)?;
        if self.rows.contains_key(&date) {
            return Err(ComputeError::DuplicateDate {
                table: self.name.clone(),
                date: date.format("%Y-%m-%d").to_string(),
            });
        }
        self.rows.insert(date, values);
        Ok(())
    }

    /// Add values to the row for `date`, creating it if needed
    pub fn accumulate(&mut self, date: NaiveDate, values: &[f64]) -> Result<(), ComputeError> {
        self.check_width(values)?;
        let row = self
            .rows
            .entry(date)
            .or_insert_with(|| vec![0.0; values.len()]);
        for (total, value) in row.iter_mut().zip(values) {
            *total += value;
        }
        Ok(())
    }

    /// Rename the date-bearing column
    pub fn rename_key(&mut self, key: impl Into<String>) {
        self.key = key.into();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, date: &NaiveDate) -> Option<&[f64]> {
        self.rows.get(date).map(Vec::as_slice)
    }

    pub fn contains(&self, date: &NaiveDate) -> bool {
        self.rows.contains_key(date)
    }

    /// Dates in ascending order
    pub fn dates(&self) -> impl Iterator<Item = &NaiveDate> {
        self.rows.keys()
    }

    /// Rows in ascending date order
    pub fn rows(&self) -> impl Iterator<Item = (&NaiveDate, &[f64])> {
        self.rows.iter().map(|(d, v)| (d, v.as_slice()))
    }

    fn check_width(&self, values: &[f64]) -> Result<(), ComputeError> {
        if values.len() != self.columns.len() {
            return Err(ComputeError::ShapeError {
                expected: self.columns.len(),
                actual: values.len(),
            });
        }
        Ok(())
    }
}

/// One day's model input, in [`FEATURE_NAMES`] order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn values(&self) -> [f64; FEATURE_COUNT] {
        self.0
    }
}

impl TryFrom<&[f64]> for FeatureVector {
    type Error = ComputeError;

    fn try_from(values: &[f64]) -> Result<Self, Self::Error> {
        let array: [f64; FEATURE_COUNT] =
            values.try_into().map_err(|_| ComputeError::ShapeError {
                expected: FEATURE_COUNT,
                actual: values.len(),
            })?;
        Ok(Self(array))
    }
}

impl AsRef<[f64]> for FeatureVector {
    fn as_ref(&self) -> &[f64] {
        &self.0
    }
}

/// Projected merge result: one feature vector per surviving date
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureMatrix {
    dates: Vec<NaiveDate>,
    rows: Vec<FeatureVector>,
}

impl FeatureMatrix {
    pub(crate) fn push(&mut self, date: NaiveDate, row: FeatureVector) {
        self.dates.push(date);
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn rows(&self) -> &[FeatureVector] {
        &self.rows
    }

    /// Iterate over `(date, vector)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDate, &FeatureVector)> {
        self.dates.iter().zip(self.rows.iter())
    }

    /// Row-major values without dates or header
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.rows.iter().map(|r| r.as_slice().to_vec()).collect()
    }
}
