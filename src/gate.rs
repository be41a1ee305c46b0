//! Missing-data threshold gate.

use std::collections::BTreeMap;

use log::warn;

use crate::{data::TableSet, error::EtlError};

/// Row counts of the raw tables, captured before partitioning.
pub fn original_sizes(tables: &TableSet) -> BTreeMap<String, usize> {
    tables
        .iter()
        .map(|(name, table)| (name.clone(), table.len()))
        .collect()
}

/// Share of `original` rows that were missing. An empty original table has ratio 0.
pub fn missing_ratio(missing: usize, original: usize) -> f64 {
    if original == 0 {
        0.0
    } else {
        missing as f64 / original as f64
    }
}

/// Fails when any table's missing ratio is strictly above `threshold`.
pub fn enforce(
    missing: &TableSet,
    original_sizes: &BTreeMap<String, usize>,
    threshold: f64,
) -> Result<(), EtlError> {
    for (name, table) in missing {
        if table.is_empty() {
            continue;
        }
        let original = original_sizes.get(name).copied().ok_or_else(|| {
            EtlError::Configuration(format!("no original row count recorded for '{name}'"))
        })?;
        let ratio = missing_ratio(table.len(), original);
        warn!("Missing data proportion on {name}: {ratio}");
        if ratio > threshold {
            return Err(EtlError::ThresholdExceeded {
                table: name.clone(),
                ratio,
                threshold,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Table, Value};

    fn missing_rows(count: usize) -> Table {
        Table::new(
            vec!["Title".into()],
            (0..count)
                .map(|i| vec![Some(Value::Text(format!("row {i}")))])
                .collect(),
        )
    }

    fn run(missing: usize, original: usize, threshold: f64) -> Result<(), EtlError> {
        let missing = TableSet::from([("spending".to_string(), missing_rows(missing))]);
        let sizes = BTreeMap::from([("spending".to_string(), original)]);
        enforce(&missing, &sizes, threshold)
    }

    #[test]
    fn ratio_at_threshold_passes() {
        assert!(run(1, 10, 0.1).is_ok());
        assert!(run(1, 4, 0.25).is_ok());
    }

    #[test]
    fn ratio_above_threshold_fails_with_details() {
        match run(1, 10, 0.05) {
            Err(EtlError::ThresholdExceeded {
                table,
                ratio,
                threshold,
            }) => {
                assert_eq!(table, "spending");
                assert!((ratio - 0.1).abs() < f64::EPSILON);
                assert_eq!(threshold, 0.05);
            }
            other => panic!("expected threshold error, got {other:?}"),
        }
    }

    #[test]
    fn empty_original_table_never_fails() {
        assert_eq!(missing_ratio(3, 0), 0.0);
        assert!(run(3, 0, 0.0).is_ok());
    }

    #[test]
    fn no_missing_rows_pass_zero_threshold() {
        assert!(run(0, 10, 0.0).is_ok());
    }
}
