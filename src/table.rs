//! Plain-text rendering of small result tables for the terminal.

use std::fmt::Write as _;

use crate::pipeline::RunSummary;

/// Renders left-aligned columns separated by two spaces, with a dashed rule
/// under the header. Tabs and newlines inside cells are flattened to spaces.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths = headers
        .iter()
        .map(|h| h.chars().count().max(3))
        .collect::<Vec<_>>();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(flatten(cell).chars().count());
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_line(headers, &widths));
    let rule = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_line(&rule, &widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_line(row, &widths));
    }
    output
}

fn format_line(cells: &[String], widths: &[usize]) -> String {
    let line = widths
        .iter()
        .enumerate()
        .map(|(idx, width)| {
            let cell = cells.get(idx).map(|c| flatten(c)).unwrap_or_default();
            format!("{cell:<width$}")
        })
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

fn flatten(cell: &str) -> String {
    cell.replace(['\n', '\r', '\t'], " ")
}

/// Per-table row counts of a finished run.
pub fn render_summary(summary: &RunSummary) -> String {
    let headers = ["table", "read", "missing", "cleaned"].map(String::from);
    let count = |map: &std::collections::BTreeMap<String, usize>, name: &str| {
        map.get(name).copied().unwrap_or(0).to_string()
    };
    let rows = summary
        .rows_read
        .keys()
        .map(|name| {
            vec![
                name.clone(),
                count(&summary.rows_read, name),
                count(&summary.rows_missing, name),
                count(&summary.rows_cleaned, name),
            ]
        })
        .collect::<Vec<_>>();
    render_table(&headers, &rows)
}
