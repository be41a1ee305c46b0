//! Sinks: CSV files and the relational store.
//!
//! The store load stages each table into `<schema>.<name>_temp` (replaced on
//! every run) and then appends it to `<schema>.<name>` with
//! `INSERT INTO .. SELECT ..`. The append does not deduplicate, so rerunning a
//! load against a populated target duplicates its rows.

use std::{collections::BTreeMap, path::PathBuf};

use log::{error, info};

use crate::{
    data::{Table, TableSet},
    error::{EtlError, StoreError},
    io_utils,
    kinds::TableKind,
    store::{RelationalStore, WriteMode, qualified_name, quote_ident},
};

/// Writes each table listed in `destinations` to its CSV path.
pub fn persist(
    tables: &TableSet,
    destinations: &BTreeMap<String, PathBuf>,
) -> Result<(), EtlError> {
    for (name, path) in destinations {
        let export_failure = |reason: String| EtlError::Export {
            table: name.clone(),
            path: path.clone(),
            reason,
        };
        let table = tables
            .get(name)
            .ok_or_else(|| export_failure("no such table in this run".to_string()))?;
        io_utils::write_table_to_path(path, table)
            .map_err(|err| export_failure(format!("{err:#}")))?;
        info!("{name} data exported successfully to {path:?}.");
    }
    Ok(())
}

/// Like [`persist`], but failures are logged and the remaining tables still written.
pub fn persist_lenient(
    tables: &TableSet,
    destinations: &BTreeMap<String, PathBuf>,
) -> Vec<EtlError> {
    destinations
        .iter()
        .filter_map(|(name, path)| {
            let single = BTreeMap::from([(name.clone(), path.clone())]);
            persist(tables, &single).err()
        })
        .inspect(|err| error!("{err}"))
        .collect()
}

/// Renames a table's headers to the kind's store columns. Unmapped headers are kept.
pub fn rename_for_store(kind: TableKind, table: &Table) -> Table {
    let headers = table
        .headers
        .iter()
        .map(|header| {
            kind.store_column(header)
                .map(str::to_string)
                .unwrap_or_else(|| header.clone())
        })
        .collect();
    Table::new(headers, table.rows.clone())
}

pub fn insert_sql(schema: &str, target: &str, staging: &str, columns: &[&str]) -> String {
    let column_list = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({column_list}) SELECT {column_list} FROM {}",
        qualified_name(schema, target),
        qualified_name(schema, staging)
    )
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub loaded: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Stages and appends every table into the store.
///
/// A staging failure stops the load with [`EtlError::Load`]; an append failure is
/// logged, recorded in the report and the next table is processed.
pub fn load_to_store(
    store: &mut dyn RelationalStore,
    tables: &TableSet,
    schema: &str,
) -> Result<LoadReport, EtlError> {
    let mut report = LoadReport::default();
    for (name, table) in tables {
        let load_failure = |err: StoreError| EtlError::Load {
            table: name.clone(),
            reason: err.to_string(),
        };
        let kind = TableKind::from_name(name)
            .ok_or_else(|| load_failure(StoreError::UnmappedTable(name.clone())))?;
        let staging = format!("{name}_temp");
        let renamed = rename_for_store(kind, table);
        if let Err(err) = store.write_table(&renamed, schema, &staging, WriteMode::Replace) {
            error!("An error occurred while creating the temporary table {staging}: {err}");
            return Err(load_failure(err));
        }
        info!("Temporary table {staging} created successfully.");

        let columns = kind.columns().iter().map(|c| c.store).collect::<Vec<_>>();
        let sql = insert_sql(schema, name, &staging, &columns);
        match store.execute(&sql) {
            Ok(rows) => {
                info!("{name} data loaded successfully ({rows} row(s)).");
                report.loaded.push(name.clone());
            }
            Err(err) => {
                error!("An error occurred while loading the {name} data: {err}");
                report.failed.push((name.clone(), err.to_string()));
            }
        }
    }
    Ok(report)
}

/// Creates the permanent tables for every known kind when they do not exist yet.
pub fn create_tables(store: &mut dyn RelationalStore, schema: &str) -> Result<(), EtlError> {
    for kind in TableKind::ALL {
        let column_defs = kind
            .columns()
            .iter()
            .map(|c| format!("{} {}", quote_ident(c.store), c.sql_type))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({column_defs})",
            qualified_name(schema, kind.name())
        );
        store.execute(&sql).map_err(|err| EtlError::Load {
            table: kind.name().to_string(),
            reason: err.to_string(),
        })?;
        info!("Table {schema}.{kind} is ready.");
    }
    Ok(())
}
