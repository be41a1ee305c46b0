//! Relational store collaborator backed by SQLite.

use rusqlite::{Connection, params_from_iter, types::Value as SqlValue};

use crate::{
    data::{Table, Value},
    error::StoreError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Drop any existing relation first.
    Replace,
    /// Create the relation when absent, then add rows.
    Append,
}

pub trait RelationalStore {
    /// Writes `table` into `schema.target`, returning the number of rows written.
    fn write_table(
        &mut self,
        table: &Table,
        schema: &str,
        target: &str,
        mode: WriteMode,
    ) -> Result<usize, StoreError>;

    /// Executes one raw SQL statement, returning the number of affected rows.
    fn execute(&mut self, sql: &str) -> Result<usize, StoreError>;
}

pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

pub fn qualified_name(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens `sqlite::memory:`, `sqlite://<path>` or a bare file path.
    pub fn open(url: &str) -> Result<Self, StoreError> {
        let trimmed = url.trim();
        let conn = if trimmed == "sqlite::memory:" || trimmed == ":memory:" {
            Connection::open_in_memory()?
        } else if let Some(path) = trimmed.strip_prefix("sqlite://") {
            Connection::open(path)?
        } else if trimmed.is_empty() || trimmed.contains("://") {
            return Err(StoreError::UnsupportedUrl(trimmed.to_string()));
        } else {
            Connection::open(trimmed)?
        };
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Row count of `schema.table`.
    pub fn count_rows(&self, schema: &str, table: &str) -> Result<usize, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {}", qualified_name(schema, table));
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

impl RelationalStore for SqliteStore {
    fn write_table(
        &mut self,
        table: &Table,
        schema: &str,
        target: &str,
        mode: WriteMode,
    ) -> Result<usize, StoreError> {
        let qualified = qualified_name(schema, target);
        let column_defs = table
            .headers
            .iter()
            .enumerate()
            .map(|(idx, header)| {
                format!("{} {}", quote_ident(header), column_affinity(table, idx))
            })
            .collect::<Vec<_>>()
            .join(", ");
        let column_list = table
            .headers
            .iter()
            .map(|h| quote_ident(h))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=table.headers.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");

        let tx = self.conn.transaction()?;
        if mode == WriteMode::Replace {
            tx.execute(&format!("DROP TABLE IF EXISTS {qualified}"), [])?;
        }
        tx.execute(
            &format!("CREATE TABLE IF NOT EXISTS {qualified} ({column_defs})"),
            [],
        )?;
        let mut written = 0usize;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {qualified} ({column_list}) VALUES ({placeholders})"
            ))?;
            for row in &table.rows {
                let values = (0..table.headers.len())
                    .map(|idx| to_sql_value(row.get(idx).and_then(|c| c.as_ref())));
                written += stmt.execute(params_from_iter(values))?;
            }
        }
        tx.commit()?;
        Ok(written)
    }

    fn execute(&mut self, sql: &str) -> Result<usize, StoreError> {
        Ok(self.conn.execute(sql, [])?)
    }
}

fn to_sql_value(cell: Option<&Value>) -> SqlValue {
    match cell {
        None | Some(Value::NoValue) => SqlValue::Null,
        Some(Value::Integer(i)) => SqlValue::Integer(*i),
        Some(Value::Float(f)) => SqlValue::Real(*f),
        Some(other) => SqlValue::Text(other.as_display()),
    }
}

fn column_affinity(table: &Table, idx: usize) -> &'static str {
    let mut affinity = "INTEGER";
    let mut saw_value = false;
    let cells = table
        .rows
        .iter()
        .filter_map(|row| row.get(idx).and_then(|c| c.as_ref()));
    for cell in cells {
        match cell {
            Value::NoValue => continue,
            Value::Integer(_) => {}
            Value::Float(_) => affinity = "REAL",
            Value::Text(_) | Value::Date(_) => return "TEXT",
        }
        saw_value = true;
    }
    if saw_value { affinity } else { "TEXT" }
}
