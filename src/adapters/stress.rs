//! Stress score adapter

use serde::Deserialize;
use std::path::Path;

use super::{parse_day, parse_flag, read_records, MetricSourceAdapter};
use crate::error::ComputeError;
use crate::types::{MetricSource, MetricTable};

/// Stress score file, relative to the export root
pub const STRESS_SCORE_FILE: &str = "Stress Score/Stress Score.csv";

/// Stress score adapter.
///
/// Rows flagged `CALCULATION_FAILED` are dropped before their score is read.
pub struct StressScoreAdapter;

impl MetricSourceAdapter for StressScoreAdapter {
    fn source(&self) -> MetricSource {
        MetricSource::StressScore
    }

    fn extract(&self, export_root: &Path) -> Result<MetricTable, ComputeError> {
        let path = export_root.join(STRESS_SCORE_FILE);
        let mut table = MetricTable::for_source(self.source());

        let rows: Vec<StressRow> =
            read_records(&path, &["DATE", "STRESS_SCORE", "CALCULATION_FAILED"])?;
        let mut failed = 0usize;
        for row in rows {
            if parse_flag(&row.calculation_failed)? {
                failed += 1;
                continue;
            }
            let date = parse_day(&row.date)?;
            let score: f64 = row.stress_score.parse().map_err(|_| {
                ComputeError::ParseError(format!(
                    "invalid STRESS_SCORE '{}' on {}",
                    row.stress_score, row.date
                ))
            })?;
            table.insert(date, vec![score])?;
        }

        tracing::debug!(
            source = %self.source(),
            days = table.len(),
            failed,
            "extracted stress scores"
        );
        Ok(table)
    }
}

#[derive(Debug, Deserialize)]
struct StressRow {
    #[serde(rename = "DATE")]
    date: String,
    #[serde(rename = "STRESS_SCORE")]
    stress_score: String,
    #[serde(rename = "CALCULATION_FAILED")]
    calculation_failed: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_support::write_file;
    use chrono::NaiveDate;

    const HEADER: &str = "DATE,UPDATED_AT,STRESS_SCORE,SLEEP_POINTS,MAX_SLEEP_POINTS,RESPONSIVENESS_POINTS,MAX_RESPONSIVENESS_POINTS,EXERTION_POINTS,MAX_EXERTION_POINTS,STATUS,CALCULATION_FAILED";

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, d).unwrap()
    }

    #[test]
    fn test_failed_calculations_are_excluded() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(
            tmp.path(),
            STRESS_SCORE_FILE,
            &format!(
                "{HEADER}\n\
                 2023-01-01T00:00:00,2023-01-01T09:12:00,75,25,30,25,30,25,40,READY,false\n\
                 2023-01-02T00:00:00,2023-01-02T09:12:00,40,0,30,0,30,0,40,READY,true\n"
            ),
        );

        let table = StressScoreAdapter.extract(tmp.path()).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&day(1)), Some(&[75.0][..]));
        assert!(!table.contains(&day(2)));
        assert_eq!(table.key(), "DATE");
    }

    #[test]
    fn test_failed_row_score_is_not_parsed() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(
            tmp.path(),
            STRESS_SCORE_FILE,
            &format!("{HEADER}\n2023-01-02,2023-01-02,,0,30,0,30,0,40,NOT_READY,True\n"),
        );

        let table = StressScoreAdapter.extract(tmp.path()).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_bad_score_is_parse_error() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(
            tmp.path(),
            STRESS_SCORE_FILE,
            &format!("{HEADER}\n2023-01-02,2023-01-02,high,0,30,0,30,0,40,READY,false\n"),
        );

        let err = StressScoreAdapter.extract(tmp.path()).unwrap_err();
        assert!(matches!(err, ComputeError::ParseError(_)));
    }
}
