//! Export source adapters
//!
//! This module provides adapters that read one metric family out of a raw
//! wearable export directory and normalize it into a date-keyed
//! [`MetricTable`].

mod activity;
mod hrv;
mod sleep;
mod spo2;
mod stress;

pub use activity::ActivityAdapter;
pub use hrv::HrvAdapter;
pub use sleep::SleepScoreAdapter;
pub use spo2::Spo2Adapter;
pub use stress::StressScoreAdapter;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::ComputeError;
use crate::types::{MetricSource, MetricTable};

/// Trait for export source adapters
pub trait MetricSourceAdapter {
    /// Source this adapter extracts
    fn source(&self) -> MetricSource;

    /// Read the source out of `export_root` and normalize it to one row per date
    fn extract(&self, export_root: &Path) -> Result<MetricTable, ComputeError>;
}

/// Adapters for every source, in merge order
pub fn all_adapters() -> Vec<Box<dyn MetricSourceAdapter>> {
    vec![
        Box::new(ActivityAdapter),
        Box::new(HrvAdapter),
        Box::new(Spo2Adapter),
        Box::new(SleepScoreAdapter),
        Box::new(StressScoreAdapter),
    ]
}

/// List files in `dir` whose names pass `accept`, sorted by name.
///
/// Rejected files are never opened.
pub(crate) fn list_files<F>(dir: &Path, accept: F) -> Result<Vec<PathBuf>, ComputeError>
where
    F: Fn(&str) -> bool,
{
    let entries = fs::read_dir(dir).map_err(|e| not_found_or_io(e, dir))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let accepted = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(&accept);
        if accepted {
            files.push(path);
        } else {
            tracing::trace!(file = %path.display(), "skipping file");
        }
    }

    files.sort();
    Ok(files)
}

/// Deserialize every record of a CSV file after checking its header
pub(crate) fn read_records<T>(path: &Path, required: &[&str]) -> Result<Vec<T>, ComputeError>
where
    T: DeserializeOwned,
{
    let file = fs::File::open(path).map_err(|e| not_found_or_io(e, path))?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader.headers()?.clone();
    for column in required {
        if !headers.iter().any(|h| h == *column) {
            return Err(ComputeError::MissingColumn(format!(
                "{} in {}",
                column,
                path.display()
            )));
        }
    }

    let mut records = Vec::new();
    for result in reader.deserialize() {
        records.push(result?);
    }

    tracing::debug!(file = %path.display(), rows = records.len(), "read export file");
    Ok(records)
}

/// Parse a timestamp or date string to its calendar day, discarding time of day.
///
/// Timestamps carrying an offset keep the local calendar day they were
/// written in.
pub fn parse_day(raw: &str) -> Result<NaiveDate, ComputeError> {
    let raw = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.date_naive());
    }
    for format in ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%dT%H:%M:%S%.f%z"] {
        if let Ok(ts) = DateTime::parse_from_str(raw, format) {
            return Ok(ts.date_naive());
        }
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%m/%d/%y %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
    ] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(ts.date());
        }
    }
    for format in ["%m/%d/%y", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Ok(date);
        }
    }

    Err(ComputeError::DateParseError(format!(
        "unrecognized date '{}'",
        raw
    )))
}

/// Parse a boolean flag column the way exports write it
pub(crate) fn parse_flag(raw: &str) -> Result<bool, ComputeError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" | "" => Ok(false),
        other => Err(ComputeError::ParseError(format!(
            "invalid boolean flag '{}'",
            other
        ))),
    }
}

fn not_found_or_io(err: io::Error, path: &Path) -> ComputeError {
    if err.kind() == io::ErrorKind::NotFound {
        ComputeError::FileNotFound(path.to_path_buf())
    } else {
        ComputeError::Io(err)
    }
}
