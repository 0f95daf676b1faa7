//! Active Zone Minutes adapter
//!
//! Sums `total_minutes` per calendar day across every file of the AZM export.

use serde::Deserialize;
use std::path::Path;

use super::{list_files, parse_day, read_records, MetricSourceAdapter};
use crate::error::ComputeError;
use crate::types::{MetricSource, MetricTable};

/// Export subdirectory holding the per-period AZM files
pub const ACTIVITY_DIR: &str = "Active Zone Minutes (AZM)";

/// Active Zone Minutes adapter
pub struct ActivityAdapter;

impl MetricSourceAdapter for ActivityAdapter {
    fn source(&self) -> MetricSource {
        MetricSource::Activity
    }

    fn extract(&self, export_root: &Path) -> Result<MetricTable, ComputeError> {
        let dir = export_root.join(ACTIVITY_DIR);
        let mut table = MetricTable::for_source(self.source());

        // A day split across two files is summed into one row.
        for file in list_files(&dir, |name| name.ends_with(".csv"))? {
            let rows: Vec<AzmRow> = read_records(&file, &["date_time", "total_minutes"])?;
            for row in rows {
                let date = parse_day(&row.date_time)?;
                table.accumulate(date, &[row.total_minutes])?;
            }
        }

        tracing::debug!(source = %self.source(), days = table.len(), "extracted activity minutes");
        Ok(table)
    }
}

#[derive(Debug, Deserialize)]
struct AzmRow {
    date_time: String,
    total_minutes: f64,
}
