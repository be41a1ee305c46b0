//! Aggregates over cleaned spending and places tables.

use std::collections::HashMap;

use anyhow::{Result, anyhow};
use itertools::Itertools;
use log::info;

use crate::data::{Table, Value};

pub const SPENDING_VALUE_COLUMN: &str = "In EUR";
pub const NIGHTS_COLUMN: &str = "Nights";
pub const CITY_COLUMN: &str = "City";

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ColumnSummary {
    pub count: usize,
    pub total: f64,
}

impl ColumnSummary {
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.total / self.count as f64)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub spending: ColumnSummary,
    pub nights: ColumnSummary,
    pub top_spending_cities: Vec<(String, f64)>,
    pub top_stay_cities: Vec<(String, f64)>,
}

/// Sum and count of the numeric cells of `column`; other cells are skipped.
pub fn summarize_column(table: &Table, column: &str) -> Result<ColumnSummary> {
    let cells = table
        .column(column)
        .ok_or_else(|| anyhow!("Column '{column}' not found"))?;
    Ok(cells
        .filter_map(|cell| cell.and_then(Value::as_f64))
        .fold(ColumnSummary::default(), |acc, value| ColumnSummary {
            count: acc.count + 1,
            total: acc.total + value,
        }))
}

/// The `n` groups with the largest sums, descending; ties ordered by group name.
pub fn top_groups(
    table: &Table,
    group_column: &str,
    value_column: &str,
    n: usize,
) -> Result<Vec<(String, f64)>> {
    let group_idx = table
        .column_index(group_column)
        .ok_or_else(|| anyhow!("Column '{group_column}' not found"))?;
    let value_idx = table
        .column_index(value_column)
        .ok_or_else(|| anyhow!("Column '{value_column}' not found"))?;

    let mut sums: HashMap<String, f64> = HashMap::new();
    for row in &table.rows {
        let Some(group) = row.get(group_idx).and_then(|c| c.as_ref()) else {
            continue;
        };
        let Some(value) = row
            .get(value_idx)
            .and_then(|c| c.as_ref())
            .and_then(Value::as_f64)
        else {
            continue;
        };
        *sums.entry(group.as_display()).or_insert(0.0) += value;
    }
    Ok(sums
        .into_iter()
        .sorted_by(|(a_name, a_sum), (b_name, b_sum)| {
            b_sum.total_cmp(a_sum).then_with(|| a_name.cmp(b_name))
        })
        .take(n)
        .collect())
}

pub fn summarize(spending: &Table, places: &Table, top: usize) -> Result<Analysis> {
    let analysis = Analysis {
        spending: summarize_column(spending, SPENDING_VALUE_COLUMN)?,
        nights: summarize_column(places, NIGHTS_COLUMN)?,
        top_spending_cities: top_groups(spending, CITY_COLUMN, SPENDING_VALUE_COLUMN, top)?,
        top_stay_cities: top_groups(places, CITY_COLUMN, NIGHTS_COLUMN, top)?,
    };
    info!("Total spending: {}", analysis.spending.total);
    info!("Total nights spent: {}", analysis.nights.total);
    Ok(analysis)
}

fn format_number(value: f64) -> String {
    Value::Float((value * 100.0).round() / 100.0).as_display()
}

fn format_mean(summary: &ColumnSummary) -> String {
    summary.mean().map(format_number).unwrap_or_default()
}

impl Analysis {
    /// Rows of `metric, value` pairs for [`crate::table::render_table`].
    pub fn render_rows(&self) -> Vec<Vec<String>> {
        let mut rows = vec![
            vec!["total_spending".to_string(), format_number(self.spending.total)],
            vec!["avg_spending".to_string(), format_mean(&self.spending)],
            vec!["total_nights".to_string(), format_number(self.nights.total)],
            vec!["avg_nights".to_string(), format_mean(&self.nights)],
        ];
        for (rank, (city, sum)) in self.top_spending_cities.iter().enumerate() {
            rows.push(vec![
                format!("top_spending_city_{}", rank + 1),
                format!("{city} ({})", format_number(*sum)),
            ]);
        }
        for (rank, (city, nights)) in self.top_stay_cities.iter().enumerate() {
            rows.push(vec![
                format!("top_stay_city_{}", rank + 1),
                format!("{city} ({})", format_number(*nights)),
            ]);
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
        Table::from_text_rows(
            headers,
            rows.iter()
                .map(|row| {
                    row.iter()
                        .map(|c| Some(c.to_string()))
                        .collect::<Vec<Option<String>>>()
                })
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn spending_and_nights_totals_and_means() {
        let spending = table(
            &["City", "In EUR"],
            &[&["Lyon", "10"], &["Paris", "20"], &["Lyon", "30"]],
        );
        let places = table(
            &["City", "Nights"],
            &[&["Lyon", "1"], &["Paris", "2"], &["Rome", "3"]],
        );
        let analysis = summarize(&spending, &places, 5).unwrap();
        assert_eq!(analysis.spending.total, 60.0);
        assert_eq!(analysis.spending.mean(), Some(20.0));
        assert_eq!(analysis.nights.total, 6.0);
        assert_eq!(analysis.nights.mean(), Some(2.0));
        assert_eq!(
            analysis.top_spending_cities,
            vec![("Lyon".to_string(), 40.0), ("Paris".to_string(), 20.0)]
        );
    }

    #[test]
    fn top_groups_breaks_ties_by_name_and_truncates() {
        let places = table(
            &["City", "Nights"],
            &[&["Rome", "2"], &["Lyon", "2"], &["Oslo", "1"]],
        );
        let top = top_groups(&places, "City", "Nights", 2).unwrap();
        assert_eq!(
            top,
            vec![("Lyon".to_string(), 2.0), ("Rome".to_string(), 2.0)]
        );
    }

    #[test]
    fn non_numeric_cells_are_skipped_and_empty_mean_is_absent() {
        let spending = table(&["City", "In EUR"], &[&["Lyon", "n/a"]]);
        let summary = summarize_column(&spending, "In EUR").unwrap();
        assert_eq!(summary.total, 0.0);
        assert_eq!(summary.mean(), None);
        assert!(summarize_column(&spending, "Amount").is_err());
    }
}
