//! Blood oxygen adapter

use serde::Deserialize;
use std::path::Path;

use super::{list_files, parse_day, read_records, MetricSourceAdapter};
use crate::error::ComputeError;
use crate::types::{MetricSource, MetricTable};

/// Export subdirectory holding SpO2 files
pub const SPO2_DIR: &str = "Oxygen Saturation (SpO2)";

/// Only files with this prefix carry daily averages
pub const SPO2_FILE_PREFIX: &str = "Daily SpO2 - ";

/// Blood oxygen adapter. Keeps the daily average and drops the
/// `lower_bound`/`upper_bound` confidence columns.
pub struct Spo2Adapter;

impl MetricSourceAdapter for Spo2Adapter {
    fn source(&self) -> MetricSource {
        MetricSource::BloodOxygen
    }

    fn extract(&self, export_root: &Path) -> Result<MetricTable, ComputeError> {
        let dir = export_root.join(SPO2_DIR);
        let mut table = MetricTable::for_source(self.source());

        for file in list_files(&dir, |name| name.starts_with(SPO2_FILE_PREFIX))? {
            let rows: Vec<Spo2Row> = read_records(&file, &["timestamp", "average_value"])?;
            for row in rows {
                let date = parse_day(&row.timestamp)?;
                table.insert(date, vec![row.average_value])?;
            }
        }

        tracing::debug!(source = %self.source(), days = table.len(), "extracted spo2 averages");
        Ok(table)
    }
}

#[derive(Debug, Deserialize)]
struct Spo2Row {
    timestamp: String,
    average_value: f64,
}
