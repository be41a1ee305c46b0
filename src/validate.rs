//! Required-column completeness check.
//!
//! Splits each table into the rows that have a value in every required column
//! (`checked`) and the rows that lack at least one (`missing`). Both partitions
//! keep source order; the missing rows are retained for export.

use std::collections::BTreeMap;

use log::warn;

use crate::{
    data::{Row, Table, TableSet},
    error::EtlError,
};

pub type RequiredColumns = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    pub missing: TableSet,
    pub checked: TableSet,
}

impl Partition {
    pub fn missing_count(&self, name: &str) -> usize {
        self.missing.get(name).map(Table::len).unwrap_or(0)
    }
}

/// Partitions every table by its required columns.
///
/// Tables without an entry in `required` have no requirements and land wholly in
/// `checked`. An entry naming an unknown table, or a column absent from its
/// table, is a configuration error.
pub fn check(tables: &TableSet, required: &RequiredColumns) -> Result<Partition, EtlError> {
    if let Some(unknown) = required.keys().find(|name| !tables.contains_key(*name)) {
        return Err(EtlError::Configuration(format!(
            "required columns reference unknown table '{unknown}'"
        )));
    }

    let mut partition = Partition::default();
    for (name, table) in tables {
        let columns = required.get(name).map(Vec::as_slice).unwrap_or(&[]);
        let indices = resolve_indices(name, table, columns)?;
        let (missing, checked): (Vec<Row>, Vec<Row>) = table
            .rows
            .iter()
            .cloned()
            .partition(|row| lacks_any(row, &indices));
        if !missing.is_empty() {
            warn!("Null values found in {name} data ({} row(s))", missing.len());
        }
        partition.missing.insert(name.clone(), table.with_rows(missing));
        partition.checked.insert(name.clone(), table.with_rows(checked));
    }
    Ok(partition)
}

fn resolve_indices(name: &str, table: &Table, columns: &[String]) -> Result<Vec<usize>, EtlError> {
    columns
        .iter()
        .map(|column| {
            table.column_index(column).ok_or_else(|| {
                EtlError::Configuration(format!(
                    "required column '{column}' is not present in table '{name}'"
                ))
            })
        })
        .collect()
}

fn lacks_any(row: &Row, indices: &[usize]) -> bool {
    indices
        .iter()
        .any(|&idx| row.get(idx).is_none_or(|cell| cell.is_none()))
}
