//! Date-keyed merge and feature projection
//!
//! [`join`] inner-joins any number of metric tables on their date key. The
//! surviving row set is independent of table order; the column order follows
//! it. [`project`] then drops the key and yields fixed-width feature vectors.

use crate::error::ComputeError;
use crate::types::{FeatureMatrix, FeatureVector, MetricTable, FEATURE_COUNT};

/// Inner-join `tables` on their date column, renamed to `key`.
///
/// Fails with [`ComputeError::EmptyResult`] if no tables are given, if any
/// input table is empty, or if no date survives the join.
pub fn join(tables: &[MetricTable], key: &str) -> Result<MetricTable, ComputeError> {
    let (first, rest) = tables
        .split_first()
        .ok_or_else(|| ComputeError::EmptyResult("join of zero tables".to_string()))?;

    if let Some(empty) = tables.iter().find(|t| t.is_empty()) {
        return Err(ComputeError::EmptyResult(empty.name().to_string()));
    }

    let mut merged = first.clone();
    merged.rename_key(key);
    for right in rest {
        merged = join_pair(&merged, right, key)?;
    }

    if merged.is_empty() {
        return Err(ComputeError::EmptyResult("merge".to_string()));
    }

    tracing::debug!(
        tables = tables.len(),
        rows = merged.len(),
        columns = merged.columns().len(),
        "joined metric tables"
    );
    Ok(merged)
}

fn join_pair(left: &MetricTable, right: &MetricTable, key: &str) -> Result<MetricTable, ComputeError> {
    let columns = left
        .columns()
        .iter()
        .chain(right.columns())
        .cloned()
        .collect();
    let name = format!("{}+{}", left.name(), right.name());
    let mut out = MetricTable::new(name, key, columns);

    for (date, left_values) in left.rows() {
        if let Some(right_values) = right.get(date) {
            let mut values = Vec::with_capacity(left_values.len() + right_values.len());
            values.extend_from_slice(left_values);
            values.extend_from_slice(right_values);
            out.insert(*date, values)?;
        }
    }

    Ok(out)
}

/// Drop the key column and return one feature vector per row, ascending by date
pub fn project(table: &MetricTable) -> Result<FeatureMatrix, ComputeError> {
    if table.columns().len() != FEATURE_COUNT {
        return Err(ComputeError::ShapeError {
            expected: FEATURE_COUNT,
            actual: table.columns().len(),
        });
    }

    let mut matrix = FeatureMatrix::default();
    for (date, values) in table.rows() {
        matrix.push(*date, FeatureVector::try_from(values)?);
    }
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MetricSource, DATE_KEY, FEATURE_NAMES};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, d).unwrap()
    }

    fn table(source: MetricSource, days: &[u32], base: f64) -> MetricTable {
        let mut t = MetricTable::for_source(source);
        let width = source.columns().len();
        for d in days {
            let values = (0..width).map(|i| base + *d as f64 + i as f64 * 10.0).collect();
            t.insert(day(*d), values).unwrap();
        }
        t
    }

    fn five_tables() -> Vec<MetricTable> {
        vec![
            table(MetricSource::Activity, &[1, 2, 3, 4], 100.0),
            table(MetricSource::HeartRateVariability, &[2, 3, 4], 200.0),
            table(MetricSource::BloodOxygen, &[1, 2, 3], 300.0),
            table(MetricSource::SleepScore, &[2, 3, 5], 400.0),
            table(MetricSource::StressScore, &[3, 2, 6], 500.0),
        ]
    }

    #[test]
    fn test_join_keeps_dates_present_everywhere() {
        let merged = join(&five_tables(), DATE_KEY).unwrap();

        let dates: Vec<NaiveDate> = merged.dates().copied().collect();
        assert_eq!(dates, vec![day(2), day(3)]);
        assert_eq!(merged.key(), DATE_KEY);
        assert_eq!(merged.columns().to_vec(), FEATURE_NAMES.to_vec());
    }

    #[test]
    fn test_join_row_set_is_order_independent() {
        let tables = five_tables();
        let mut reversed = tables.clone();
        reversed.reverse();

        let forward = join(&tables, DATE_KEY).unwrap();
        let backward = join(&reversed, DATE_KEY).unwrap();

        let f: Vec<_> = forward.dates().collect();
        let b: Vec<_> = backward.dates().collect();
        assert_eq!(f, b);
        assert_ne!(forward.columns(), backward.columns());
    }

    #[test]
    fn test_join_values_line_up() {
        let merged = join(&five_tables(), DATE_KEY).unwrap();
        let row = merged.get(&day(2)).unwrap();

        assert_eq!(row[0], 102.0);
        assert_eq!(&row[1..4], &[202.0, 212.0, 222.0]);
        assert_eq!(row[4], 302.0);
        assert_eq!(row[10], 502.0);
    }

    #[test]
    fn test_empty_source_fails() {
        let mut tables = five_tables();
        tables[2] = MetricTable::for_source(MetricSource::BloodOxygen);

        let err = join(&tables, DATE_KEY).unwrap_err();
        assert!(matches!(err, ComputeError::EmptyResult(ref name) if name == "spo2"));
    }

    #[test]
    fn test_disjoint_dates_fail() {
        let tables = vec![
            table(MetricSource::Activity, &[1], 0.0),
            table(MetricSource::StressScore, &[2], 0.0),
        ];
        assert!(matches!(
            join(&tables, DATE_KEY),
            Err(ComputeError::EmptyResult(_))
        ));
    }

    #[test]
    fn test_no_tables_fail() {
        assert!(join(&[], DATE_KEY).is_err());
    }

    #[test]
    fn test_project_drops_key() {
        let merged = join(&five_tables(), DATE_KEY).unwrap();
        let matrix = project(&merged).unwrap();

        assert_eq!(matrix.len(), 2);
        assert_eq!(matrix.dates(), &[day(2), day(3)]);
        assert_eq!(matrix.rows()[1].as_slice(), merged.get(&day(3)).unwrap());
    }

    #[test]
    fn test_project_rejects_wrong_width() {
        let partial = join(&five_tables()[..2], DATE_KEY).unwrap();
        assert!(matches!(
            project(&partial),
            Err(ComputeError::ShapeError {
                expected: 11,
                actual: 4
            })
        ));
    }
}
