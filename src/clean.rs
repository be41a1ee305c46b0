//! Type coercion for the checked partition.
//!
//! Each known [`TableKind`] lists the columns to coerce. Individual cells that
//! cannot be coerced become [`Value::NoValue`] and are counted in the
//! [`CleanReport`]; they never abort the run. A structural failure, such as a
//! rule naming a column the table does not have, fails the whole run with
//! [`EtlError::Cleaning`] and no cleaned table is returned.

use std::collections::BTreeMap;

use log::{debug, info};

use crate::{
    data::{Table, TableSet, Value, parse_fallback_date, parse_naive_date, parse_number},
    error::EtlError,
    kinds::{Coercion, ColumnRule, TableKind},
};

/// Outcome of coercing one cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced {
    Value(Value),
    Sentinel,
}

impl Coerced {
    pub fn into_value(self) -> Value {
        match self {
            Coerced::Value(value) => value,
            Coerced::Sentinel => Value::NoValue,
        }
    }
}

pub fn coerce_date(value: &Value) -> Coerced {
    match value {
        Value::Date(_) => Coerced::Value(value.clone()),
        Value::Text(text) => parse_naive_date(text)
            .or_else(|| parse_fallback_date(text))
            .map(|date| Coerced::Value(Value::Date(date)))
            .unwrap_or(Coerced::Sentinel),
        _ => Coerced::Sentinel,
    }
}

pub fn coerce_numeric(value: &Value) -> Coerced {
    match value {
        Value::Integer(_) | Value::Float(_) => Coerced::Value(value.clone()),
        Value::Text(text) => parse_number(text)
            .map(Coerced::Value)
            .unwrap_or(Coerced::Sentinel),
        _ => Coerced::Sentinel,
    }
}

pub fn trim_text(value: &Value) -> Value {
    match value {
        Value::Text(text) => Value::Text(text.trim().to_string()),
        other => other.clone(),
    }
}

/// Sentinel cells per table and column produced by one cleaning pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanReport {
    sentinels: BTreeMap<(String, String), usize>,
}

impl CleanReport {
    fn record(&mut self, table: &str, column: &str) {
        *self
            .sentinels
            .entry((table.to_string(), column.to_string()))
            .or_insert(0) += 1;
    }

    pub fn sentinel_count(&self, table: &str, column: &str) -> usize {
        self.sentinels
            .get(&(table.to_string(), column.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.sentinels.values().sum()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, usize)> {
        self.sentinels
            .iter()
            .map(|((table, column), count)| (table.as_str(), column.as_str(), *count))
    }
}

/// Coerces every known table; unknown table names pass through unchanged.
pub fn clean(tables: &TableSet) -> Result<(TableSet, CleanReport), EtlError> {
    let mut report = CleanReport::default();
    let mut cleaned = TableSet::new();
    for (name, table) in tables {
        let output = match TableKind::from_name(name) {
            Some(kind) => clean_table(name, kind, table, &mut report)?,
            None => {
                debug!("No cleaning rules registered for '{name}'; passing through");
                table.clone()
            }
        };
        cleaned.insert(name.clone(), output);
    }
    for (table, column, count) in report.entries() {
        info!("{table}.{column}: {count} value(s) could not be coerced");
    }
    info!("Data cleaned successfully.");
    Ok((cleaned, report))
}

fn clean_table(
    name: &str,
    kind: TableKind,
    table: &Table,
    report: &mut CleanReport,
) -> Result<Table, EtlError> {
    let mut output = table.clone();
    for rule in kind.coercions() {
        let idx = output
            .column_index(rule.column)
            .ok_or_else(|| EtlError::Cleaning {
                table: name.to_string(),
                reason: format!("column '{}' not found", rule.column),
            })?;
        apply_rule(name, rule, idx, &mut output, report);
    }
    Ok(output)
}

fn apply_rule(
    name: &str,
    rule: &ColumnRule,
    idx: usize,
    table: &mut Table,
    report: &mut CleanReport,
) {
    for row in &mut table.rows {
        let Some(Some(cell)) = row.get_mut(idx) else {
            continue;
        };
        let next = match rule.coercion {
            Coercion::Date => coerce_date(cell),
            Coercion::Numeric => coerce_numeric(cell),
            Coercion::Trim => Coerced::Value(trim_text(cell)),
        };
        if next == Coerced::Sentinel {
            report.record(name, rule.column);
        }
        *cell = next.into_value();
    }
}
