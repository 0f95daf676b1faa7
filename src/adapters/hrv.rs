//! Heart rate variability adapter
//!
//! Reads the daily HRV summaries (RMSSD, non-REM heart rate, entropy).

use serde::Deserialize;
use std::path::Path;

use super::{list_files, parse_day, read_records, MetricSourceAdapter};
use crate::error::ComputeError;
use crate::types::{MetricSource, MetricTable};

/// Export subdirectory holding HRV files
pub const HRV_DIR: &str = "Heart Rate Variability";

/// Only files with this prefix carry one row per day
pub const HRV_FILE_PREFIX: &str = "Daily Heart Rate Variability Summary";

/// Heart rate variability adapter
pub struct HrvAdapter;

impl MetricSourceAdapter for HrvAdapter {
    fn source(&self) -> MetricSource {
        MetricSource::HeartRateVariability
    }

    fn extract(&self, export_root: &Path) -> Result<MetricTable, ComputeError> {
        let dir = export_root.join(HRV_DIR);
        let mut table = MetricTable::for_source(self.source());

        let files = list_files(&dir, |name| {
            name.starts_with(HRV_FILE_PREFIX) && name.ends_with("csv")
        })?;
        for file in files {
            let rows: Vec<HrvRow> =
                read_records(&file, &["timestamp", "rmssd", "nremhr", "entropy"])?;
            for row in rows {
                let date = parse_day(&row.timestamp)?;
                table.insert(date, vec![row.rmssd, row.nremhr, row.entropy])?;
            }
        }

        tracing::debug!(source = %self.source(), days = table.len(), "extracted hrv summaries");
        Ok(table)
    }
}

#[derive(Debug, Deserialize)]
struct HrvRow {
    timestamp: String,
    rmssd: f64,
    nremhr: f64,
    entropy: f64,
}
