//! Post-clean invariants.
//!
//! The cleaner tolerates bad cells by leaving sentinels behind; this stage is the
//! hard stop. It checks that coerced columns really hold their target type, that
//! range constraints hold, that no row is an exact duplicate of another and,
//! optionally, that sentinels do not exceed a share of a column.

use std::{collections::HashSet, fmt};

use log::info;

use crate::{
    data::{Table, TableSet, Value},
    error::EtlError,
    kinds::{Coercion, TableKind},
};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ValidationOptions {
    /// Largest tolerated share of sentinel cells in a coerced column.
    pub max_sentinel_ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    TypedColumn {
        column: &'static str,
        expected: Coercion,
    },
    NonNegative {
        column: &'static str,
    },
    NoDuplicateRows {
        duplicates: usize,
    },
    SentinelRatio {
        column: &'static str,
        ratio: f64,
        limit: f64,
    },
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::TypedColumn {
                column,
                expected: Coercion::Date,
            } => write!(f, "{column} column is not of type date"),
            Rule::TypedColumn { column, .. } => write!(f, "{column} column is not numeric"),
            Rule::NonNegative { column } => write!(f, "{column} column contains negative values"),
            Rule::NoDuplicateRows { duplicates } => {
                write!(f, "Data contains duplicate rows ({duplicates})")
            }
            Rule::SentinelRatio {
                column,
                ratio,
                limit,
            } => write!(
                f,
                "{column} column has too many uncoercible values ({ratio:.3} > {limit})"
            ),
        }
    }
}

/// Checks every table and hands the input back unchanged when all rules hold.
pub fn validate(tables: TableSet, options: &ValidationOptions) -> Result<TableSet, EtlError> {
    for (name, table) in &tables {
        if let Some(rule) = first_violation(name, table, options) {
            return Err(EtlError::Validation {
                table: name.clone(),
                rule: rule.to_string(),
            });
        }
    }
    info!("Data validated successfully.");
    Ok(tables)
}

fn first_violation(name: &str, table: &Table, options: &ValidationOptions) -> Option<Rule> {
    if let Some(kind) = TableKind::from_name(name) {
        for rule in kind.typed_columns() {
            let holds = table
                .column(rule.column)
                .is_some_and(|mut cells| cells.all(|cell| holds_type(cell, rule.coercion)));
            if !holds {
                return Some(Rule::TypedColumn {
                    column: rule.column,
                    expected: rule.coercion,
                });
            }
            if let Some(limit) = options.max_sentinel_ratio {
                let ratio = sentinel_ratio(table, rule.column);
                if ratio > limit {
                    return Some(Rule::SentinelRatio {
                        column: rule.column,
                        ratio,
                        limit,
                    });
                }
            }
        }
        for &column in kind.non_negative_columns() {
            let negative = table.column(column).is_some_and(|mut cells| {
                cells.any(|cell| cell.and_then(Value::as_f64).is_some_and(|v| v < 0.0))
            });
            if negative {
                return Some(Rule::NonNegative { column });
            }
        }
    }
    let duplicates = count_duplicates(table);
    if duplicates > 0 {
        return Some(Rule::NoDuplicateRows { duplicates });
    }
    None
}

fn holds_type(cell: Option<&Value>, expected: Coercion) -> bool {
    match cell {
        None | Some(Value::NoValue) => true,
        Some(value) => match expected {
            Coercion::Date => matches!(value, Value::Date(_)),
            Coercion::Numeric => value.is_numeric(),
            Coercion::Trim => true,
        },
    }
}

fn sentinel_ratio(table: &Table, column: &str) -> f64 {
    let sentinels = table
        .column(column)
        .map(|cells| cells.filter(|cell| cell.is_some_and(Value::is_sentinel)).count())
        .unwrap_or(0);
    crate::gate::missing_ratio(sentinels, table.len())
}

/// Rows equal to an earlier row.
pub fn count_duplicates(table: &Table) -> usize {
    let mut seen = HashSet::with_capacity(table.len());
    table.rows.iter().filter(|row| !seen.insert(*row)).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(d: u32) -> Option<Value> {
        Some(Value::Date(NaiveDate::from_ymd_opt(2023, 5, d).unwrap()))
    }

    fn places(nights: Vec<Option<Value>>) -> Table {
        Table::new(
            vec!["Arrival_Date".into(), "Nights".into()],
            nights
                .into_iter()
                .enumerate()
                .map(|(i, n)| vec![date(i as u32 + 1), n])
                .collect(),
        )
    }

    fn set(name: &str, table: Table) -> TableSet {
        TableSet::from([(name.to_string(), table)])
    }

    #[test]
    fn clean_tables_are_returned_unchanged() {
        let tables = set(
            "places",
            places(vec![Some(Value::Integer(2)), Some(Value::NoValue), None]),
        );
        let validated = validate(tables.clone(), &ValidationOptions::default()).unwrap();
        assert_eq!(validated, tables);
    }

    #[test]
    fn negative_nights_are_rejected() {
        let tables = set("places", places(vec![Some(Value::Integer(-1))]));
        let err = validate(tables, &ValidationOptions::default()).unwrap_err();
        assert!(err.to_string().contains("Nights column contains negative values"));
    }

    #[test]
    fn uncoerced_text_fails_type_rule() {
        let tables = set("places", places(vec![Some(Value::Text("2".into()))]));
        let err = validate(tables, &ValidationOptions::default()).unwrap_err();
        assert!(err.to_string().contains("Nights column is not numeric"));
    }

    #[test]
    fn duplicate_rows_fail_even_for_unknown_tables() {
        let row = vec![Some(Value::Text("a".into()))];
        let table = Table::new(vec!["Note".into()], vec![row.clone(), row]);
        match validate(set("notes", table), &ValidationOptions::default()) {
            Err(EtlError::Validation { table, rule }) => {
                assert_eq!(table, "notes");
                assert!(rule.contains("duplicate"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn signed_zeros_count_as_duplicates() {
        let table = Table::new(
            vec!["Amount".into()],
            vec![vec![Some(Value::Float(0.0))], vec![Some(Value::Float(-0.0))]],
        );
        assert_eq!(count_duplicates(&table), 1);
        let err = validate(set("notes", table), &ValidationOptions::default()).unwrap_err();
        assert!(err.to_string().contains("Data contains duplicate rows (1)"));
    }

    #[test]
    fn sentinel_flood_is_caught_when_limited() {
        let table = places(vec![
            Some(Value::NoValue),
            Some(Value::NoValue),
            Some(Value::Integer(1)),
        ]);
        let lenient = ValidationOptions::default();
        assert!(validate(set("places", table.clone()), &lenient).is_ok());

        let strict = ValidationOptions {
            max_sentinel_ratio: Some(0.5),
        };
        let err = validate(set("places", table), &strict).unwrap_err();
        assert!(err.to_string().contains("too many uncoercible"));
    }
}
