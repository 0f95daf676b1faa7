//! Pipeline orchestration
//!
//! This module provides the public API for Stress Flux.
//! It orchestrates the full pipeline from a raw export directory to the
//! feature matrix consumed by the stress model.

use std::path::{Path, PathBuf};

use crate::adapters::{all_adapters, MetricSourceAdapter};
use crate::error::ComputeError;
use crate::merge::{join, project};
use crate::types::{FeatureMatrix, MetricSource, MetricTable, DATE_KEY};

/// Convert a raw wearable export directory into model feature vectors.
///
/// # Arguments
/// * `export_root` - Directory containing `Active Zone Minutes (AZM)/`,
///   `Heart Rate Variability/`, `Oxygen Saturation (SpO2)/`, `Sleep Score/`
///   and `Stress Score/`
///
/// # Returns
/// One feature vector per day present in all five sources, ascending by date
///
/// # Example
/// ```ignore
/// let matrix = vectorize_export("/data/fitbit/Physical Activity_GoogleData")?;
/// for (date, features) in matrix.iter() {
///     println!("{date}: {:?}", features.as_slice());
/// }
/// ```
pub fn vectorize_export(export_root: impl AsRef<Path>) -> Result<FeatureMatrix, ComputeError> {
    Vectorizer::new(export_root.as_ref()).vectorize()
}

/// Runs the extract → join → project stages over one export directory.
///
/// Nothing is cached: every call re-reads the files from disk.
pub struct Vectorizer {
    export_root: PathBuf,
    adapters: Vec<Box<dyn MetricSourceAdapter>>,
}

impl Vectorizer {
    /// Create a vectorizer over `export_root` with the default adapters
    pub fn new(export_root: impl Into<PathBuf>) -> Self {
        Self {
            export_root: export_root.into(),
            adapters: all_adapters(),
        }
    }

    pub fn export_root(&self) -> &Path {
        &self.export_root
    }

    /// Stage 1: extract every source table, in merge order
    pub fn extract_all(&self) -> Result<Vec<MetricTable>, ComputeError> {
        self.adapters
            .iter()
            .map(|adapter| adapter.extract(&self.export_root))
            .collect()
    }

    /// Stages 1-2: extract and inner-join on the date key
    pub fn merged(&self) -> Result<MetricTable, ComputeError> {
        let tables = self.extract_all()?;
        join(&tables, DATE_KEY)
    }

    /// Stages 1-3: extract, join and project to feature vectors
    pub fn vectorize(&self) -> Result<FeatureMatrix, ComputeError> {
        let matrix = project(&self.merged()?)?;
        tracing::info!(
            export_root = %self.export_root.display(),
            days = matrix.len(),
            "vectorized export"
        );
        Ok(matrix)
    }

    /// Extract each source independently and report how it went.
    ///
    /// Unlike [`Vectorizer::vectorize`], one failing source does not stop the
    /// others from being checked.
    pub fn inspect(&self) -> Vec<SourceStatus> {
        self.adapters
            .iter()
            .map(|adapter| SourceStatus {
                source: adapter.source(),
                result: adapter.extract(&self.export_root).map(|t| t.len()),
            })
            .collect()
    }
}

/// Outcome of extracting one source
#[derive(Debug)]
pub struct SourceStatus {
    pub source: MetricSource,
    /// Number of days extracted, or the extraction error
    pub result: Result<usize, ComputeError>,
}

impl SourceStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self.result, Ok(days) if days > 0)
    }
}
