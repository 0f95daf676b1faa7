//! Sleep score adapter
//!
//! Keeps the overall and revitalization scores, deep sleep minutes, resting
//! heart rate and restlessness. Composition score, duration score and the
//! sleep log entry id are dropped.

use serde::Deserialize;
use std::path::Path;

use super::{parse_day, read_records, MetricSourceAdapter};
use crate::error::ComputeError;
use crate::types::{MetricSource, MetricTable};

/// Sleep score file, relative to the export root
pub const SLEEP_SCORE_FILE: &str = "Sleep Score/sleep_score.csv";

const REQUIRED_COLUMNS: [&str; 6] = [
    "timestamp",
    "overall_score",
    "revitalization_score",
    "deep_sleep_in_minutes",
    "resting_heart_rate",
    "restlessness",
];

/// Sleep score adapter
pub struct SleepScoreAdapter;

impl MetricSourceAdapter for SleepScoreAdapter {
    fn source(&self) -> MetricSource {
        MetricSource::SleepScore
    }

    fn extract(&self, export_root: &Path) -> Result<MetricTable, ComputeError> {
        let path = export_root.join(SLEEP_SCORE_FILE);
        let mut table = MetricTable::for_source(self.source());

        let rows: Vec<SleepScoreRow> = read_records(&path, &REQUIRED_COLUMNS)?;
        for row in rows {
            let date = parse_day(&row.timestamp)?;
            table.insert(
                date,
                vec![
                    row.overall_score,
                    row.revitalization_score,
                    row.deep_sleep_in_minutes,
                    row.resting_heart_rate,
                    row.restlessness,
                ],
            )?;
        }

        tracing::debug!(source = %self.source(), days = table.len(), "extracted sleep scores");
        Ok(table)
    }
}

#[derive(Debug, Deserialize)]
struct SleepScoreRow {
    timestamp: String,
    overall_score: f64,
    revitalization_score: f64,
    deep_sleep_in_minutes: f64,
    resting_heart_rate: f64,
    restlessness: f64,
}
