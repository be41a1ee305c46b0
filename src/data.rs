//! In-memory tabular model shared by every stage.
//!
//! A [`Table`] is an ordered set of rows sharing one header list. Cells are
//! `Option<Value>`: `None` is a raw null as read from the source, while
//! [`Value::NoValue`] is the sentinel a cleaner leaves behind when coercion fails.

use std::{
    collections::BTreeMap,
    fmt,
    hash::{Hash, Hasher},
};

use chrono::{NaiveDate, NaiveDateTime};
pub const FALLBACK_DATE_FORMAT: &str = "%Y.%m.%d.";

// Ambiguous slash dates read month-first.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d/%m/%Y", "%d-%m-%Y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Date(NaiveDate),
    /// Coercion of the original cell failed.
    NoValue,
}

// Floats are only ever produced from finite parses, so equality is reflexive.
impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Text(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            // -0.0 == 0.0, so both must hash alike.
            Value::Float(f) if *f == 0.0 => 0.0f64.to_bits().hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Date(d) => d.hash(state),
            Value::NoValue => {}
        }
    }
}

impl Value {
    pub fn as_display(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => {
                if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                    (*f as i64).to_string()
                } else {
                    f.to_string()
                }
            }
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::NoValue => String::new(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Text(s) => parse_number(s).and_then(|v| v.as_f64()),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, Value::NoValue)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

pub type Row = Vec<Option<Value>>;

/// Tables of one run, keyed by table name.
pub type TableSet = BTreeMap<String, Table>;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self { headers, rows }
    }

    /// Builds a table from raw text rows, where `None` marks a null cell.
    pub fn from_text_rows<H, R>(headers: &[H], rows: R) -> Self
    where
        H: AsRef<str>,
        R: IntoIterator<Item = Vec<Option<String>>>,
    {
        let headers = headers.iter().map(|h| h.as_ref().to_string()).collect();
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|cell| cell.map(Value::Text)).collect())
            .collect();
        Self { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cells of one column in row order. Short rows yield `None`.
    pub fn column<'a>(
        &'a self,
        name: &str,
    ) -> Option<impl Iterator<Item = Option<&'a Value>> + use<'a>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| row.get(idx).and_then(|c| c.as_ref())))
    }

    /// New table with the same headers and the given rows.
    pub fn with_rows(&self, rows: Vec<Row>) -> Self {
        Self {
            headers: self.headers.clone(),
            rows,
        }
    }
}

pub fn parse_naive_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
                .map(|dt| dt.date())
        })
}

pub fn parse_fallback_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), FALLBACK_DATE_FORMAT).ok()
}

/// Parses integer text as [`Value::Integer`] and other finite numbers as [`Value::Float`].
pub fn parse_number(value: &str) -> Option<Value> {
    let trimmed = value.trim();
    if let Ok(parsed) = trimmed.parse::<i64>() {
        return Some(Value::Integer(parsed));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(Value::Float)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn parse_naive_date_supports_iso_and_slash_formats() {
        let expected = NaiveDate::from_ymd_opt(2023, 5, 10).unwrap();
        assert_eq!(parse_naive_date("2023-05-10"), Some(expected));
        assert_eq!(parse_naive_date("2023/05/10"), Some(expected));
        assert_eq!(parse_naive_date("2023-05-10 18:45:00"), Some(expected));
        assert_eq!(parse_naive_date("2023.05.10."), None);
    }

    #[test]
    fn fallback_date_requires_trailing_dot_format() {
        let expected = NaiveDate::from_ymd_opt(2023, 5, 10).unwrap();
        assert_eq!(parse_fallback_date("2023.05.10."), Some(expected));
        assert_eq!(parse_fallback_date("2023-05-10"), None);
    }

    #[test]
    fn parse_number_prefers_integers_and_rejects_non_finite() {
        assert_eq!(parse_number("4"), Some(Value::Integer(4)));
        assert_eq!(parse_number(" 12.50 "), Some(Value::Float(12.5)));
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("twelve"), None);
    }

    #[test]
    fn display_renders_whole_floats_without_fraction() {
        assert_eq!(Value::Float(3.0).as_display(), "3");
        assert_eq!(Value::Float(12.5).as_display(), "12.5");
        assert_eq!(Value::NoValue.as_display(), "");
    }

    #[test]
    fn equal_rows_hash_identically() {
        let row: Row = vec![Some(Value::Float(1.5)), None, Some(Value::NoValue)];
        let mut seen = HashSet::new();
        assert!(seen.insert(row.clone()));
        assert!(!seen.insert(row));
    }

    #[test]
    fn column_iterates_in_row_order() {
        let table = Table::from_text_rows(
            &["Title", "Amount"],
            vec![
                vec![Some("Coffee".into()), Some("3".into())],
                vec![Some("Bus".into())],
            ],
        );
        let amounts: Vec<_> = table.column("Amount").unwrap().collect();
        assert_eq!(amounts, vec![Some(&Value::Text("3".into())), None]);
        assert!(table.column("Missing").is_none());
    }
}
