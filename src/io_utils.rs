//! Delimited-text reading and writing shared by sources and sinks.
//!
//! - **Delimiter resolution**: `.tsv` → tab, everything else → comma, unless
//!   overridden.
//! - **Encoding**: input bytes are decoded with `encoding_rs` (UTF-8 default).
//! - **Null tokens**: cells whose trimmed text matches a configured token read as
//!   null, mirroring what spreadsheet readers treat as "not available".
//! - **Output**: tables are written as UTF-8 CSV with a header row.

use std::{
    fs::{self, File},
    io::{BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};

use crate::data::{Row, Table, Value};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub const DEFAULT_NULL_TOKENS: &[&str] = &[
    "", "#N/A", "N/A", "n/a", "NA", "<NA>", "NULL", "null", "NaN", "nan", "None",
];

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(location: &str, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| {
        match Path::new(location).extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
            _ => DEFAULT_CSV_DELIMITER,
        }
    })
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

pub fn is_null_token(value: &str, null_tokens: &[String]) -> bool {
    let trimmed = value.trim();
    null_tokens.iter().any(|token| token == trimmed)
}

/// Reads a whole delimited document into a raw [`Table`] of text cells.
///
/// Rows shorter than the header are padded with nulls; longer rows are an error.
pub fn read_table<R>(
    reader: R,
    delimiter: u8,
    encoding: &'static Encoding,
    null_tokens: &[String],
) -> Result<Table>
where
    R: Read,
{
    let mut reader = open_csv_reader(reader, delimiter);
    let headers = decode_record(reader.byte_headers()?, encoding)?
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect::<Vec<_>>();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(anyhow!("Input has no header row"));
    }

    let mut rows = Vec::new();
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
        let decoded = decode_record(&record, encoding)?;
        if decoded.len() > headers.len() {
            return Err(anyhow!(
                "Row {} has {} field(s) but the header declares {}",
                row_idx + 2,
                decoded.len(),
                headers.len()
            ));
        }
        let mut row: Row = decoded
            .into_iter()
            .map(|cell| {
                if is_null_token(&cell, null_tokens) {
                    None
                } else {
                    Some(Value::Text(cell))
                }
            })
            .collect();
        row.resize(headers.len(), None);
        rows.push(row);
    }
    Ok(Table::new(headers, rows))
}

/// Writes `table` as CSV. Nulls and sentinels become empty fields.
pub fn write_table<W>(writer: W, table: &Table) -> Result<()>
where
    W: Write,
{
    let mut writer = csv::WriterBuilder::new().from_writer(writer);
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(
            row.iter()
                .map(|cell| cell.as_ref().map(Value::as_display).unwrap_or_default()),
        )?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_table_to_path(path: &Path, table: &Table) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Creating directory {parent:?}"))?;
    }
    let file = File::create(path).with_context(|| format!("Creating output file {path:?}"))?;
    write_table(BufWriter::new(file), table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> Vec<String> {
        DEFAULT_NULL_TOKENS.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn delimiter_follows_extension_unless_overridden() {
        assert_eq!(resolve_input_delimiter("data/places.tsv", None), b'\t');
        assert_eq!(resolve_input_delimiter("data/places.csv", None), b',');
        assert_eq!(resolve_input_delimiter("raw/spending", None), b',');
        assert_eq!(resolve_input_delimiter("data/places.tsv", Some(b';')), b';');
    }

    #[test]
    fn read_table_maps_null_tokens_and_pads_short_rows() {
        let input = "Title,Amount,Comment\nCoffee,3.5,NA\nBus,,\nTaxi\n";
        let table = read_table(input.as_bytes(), b',', UTF_8, &tokens()).unwrap();
        assert_eq!(table.headers, vec!["Title", "Amount", "Comment"]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows[0][2], None);
        assert_eq!(table.rows[1][1], None);
        assert_eq!(table.rows[2], vec![Some(Value::Text("Taxi".into())), None, None]);
    }

    #[test]
    fn read_table_rejects_rows_wider_than_header() {
        let input = "Title,Amount\nCoffee,3.5,extra\n";
        let err = read_table(input.as_bytes(), b',', UTF_8, &tokens()).unwrap_err();
        assert!(err.to_string().contains("Row 2"));
    }

    #[test]
    fn write_table_renders_sentinel_as_empty() {
        let table = Table::new(
            vec!["Title".into(), "Amount".into()],
            vec![vec![Some(Value::Text("Coffee".into())), Some(Value::NoValue)]],
        );
        let mut buffer = Vec::new();
        write_table(&mut buffer, &table).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "Title,Amount\nCoffee,\n");
    }
}
