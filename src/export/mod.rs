//! CSV/TSV encoding and export
//!
//! Serializes a [`Dataset`] to delimited text. Column order comes from the
//! first row; header labels are mapped through the per-site header map when
//! one is configured. Comma output wraps every field in double quotes with
//! embedded quotes doubled; tab output emits raw values for clipboard-style
//! pasting.

use crate::error::Result;
use crate::table::{Dataset, Row};
use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Output delimiter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delimiter {
    /// Comma-separated, every field quoted
    #[default]
    Comma,
    /// Tab-separated, raw values
    Tab,
}

impl Delimiter {
    fn as_char(self) -> char {
        match self {
            Delimiter::Comma => ',',
            Delimiter::Tab => '\t',
        }
    }
}

/// Encode a dataset as delimited text.
///
/// The header line holds the first row's keys in order, renamed through
/// `headers` where a mapping exists. Rows missing a key emit an empty cell.
/// An empty dataset encodes to an empty string.
pub fn encode(dataset: &Dataset, delimiter: Delimiter, headers: &IndexMap<String, String>) -> String {
    let rows = dataset.rows();
    let Some(first) = rows.first() else {
        return String::new();
    };

    let keys: Vec<&str> = first.keys().collect();
    let sep = delimiter.as_char();
    let mut lines = Vec::with_capacity(rows.len() + 1);

    let header_line: Vec<String> = keys
        .iter()
        .map(|&key| {
            let label = headers.get(key).map(String::as_str).unwrap_or(key);
            encode_field(label, delimiter)
        })
        .collect();
    lines.push(header_line.join(&sep.to_string()));

    for row in rows {
        let cells: Vec<String> = keys
            .iter()
            .map(|&key| encode_field(row.get(key).unwrap_or(""), delimiter))
            .collect();
        lines.push(cells.join(&sep.to_string()));
    }

    lines.join("\n")
}

fn encode_field(value: &str, delimiter: Delimiter) -> String {
    match delimiter {
        Delimiter::Comma => format!("\"{}\"", value.replace('"', "\"\"")),
        Delimiter::Tab => value.to_string(),
    }
}

/// Parse delimited text back into rows.
///
/// The first record is taken as the header line and its labels become the
/// row keys. Tolerates quoted fields, doubled-quote escapes and CRLF line
/// endings.
pub fn decode(text: &str, delimiter: Delimiter) -> Vec<Row> {
    let records = parse_records(text, delimiter.as_char());
    let mut iter = records.into_iter();
    let Some(header) = iter.next() else {
        return Vec::new();
    };

    iter.map(|record| {
        header
            .iter()
            .enumerate()
            .map(|(i, key)| (key.clone(), record.get(i).cloned().unwrap_or_default()))
            .collect()
    })
    .collect()
}

/// Minimal quote- and CRLF-tolerant delimited-text parser
fn parse_records(text: &str, sep: char) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut saw_any = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                saw_any = true;
                if in_quotes {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                } else {
                    in_quotes = true;
                }
            }
            c if c == sep && !in_quotes => {
                record.push(std::mem::take(&mut field));
            }
            '\r' | '\n' if !in_quotes => {
                if ch == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
                saw_any = false;
            }
            _ => {
                saw_any = true;
                field.push(ch);
            }
        }
    }

    // Flush a trailing record with no final newline
    if saw_any || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    records
}

/// Tab-delimited text for pasting into spreadsheets
pub fn clipboard_text(dataset: &Dataset, headers: &IndexMap<String, String>) -> String {
    encode(dataset, Delimiter::Tab, headers)
}

/// Write the dataset as `<site>.csv` in `out_dir`, returning the file path
pub fn write_csv_file(
    dataset: &Dataset,
    headers: &IndexMap<String, String>,
    site: &str,
    out_dir: &Path,
) -> Result<PathBuf> {
    fs::create_dir_all(out_dir)?;
    let path = out_dir.join(format!("{site}.csv"));
    fs::write(&path, encode(dataset, Delimiter::Comma, headers))?;
    log::debug!("Wrote {} rows to {}", dataset.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_headers() -> IndexMap<String, String> {
        IndexMap::new()
    }

    #[test]
    fn test_encode_empty_dataset() {
        let dataset = Dataset::new();
        assert_eq!(encode(&dataset, Delimiter::Comma, &no_headers()), "");
    }

    #[test]
    fn test_encode_quotes_and_header_map() {
        let dataset = Dataset::from_rows([Row::from_pairs([("Name", "O'Brien"), ("City", "NY")])]);
        let mut headers = IndexMap::new();
        headers.insert("Name".to_string(), "Full Name".to_string());

        let csv = encode(&dataset, Delimiter::Comma, &headers);
        assert_eq!(csv, "\"Full Name\",\"City\"\n\"O'Brien\",\"NY\"");
    }

    #[test]
    fn test_encode_doubles_embedded_quotes() {
        let dataset = Dataset::from_rows([Row::from_pairs([("Quote", "say \"hi\"")])]);
        let csv = encode(&dataset, Delimiter::Comma, &no_headers());
        assert_eq!(csv, "\"Quote\"\n\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_encode_tab_is_raw() {
        let dataset = Dataset::from_rows([Row::from_pairs([("A", "x"), ("B", "y")])]);
        let tsv = encode(&dataset, Delimiter::Tab, &no_headers());
        assert_eq!(tsv, "A\tB\nx\ty");
    }

    #[test]
    fn test_encode_missing_key_is_empty() {
        let dataset = Dataset::from_rows([
            Row::from_pairs([("A", "1"), ("B", "2")]),
            Row::from_pairs([("A", "3")]),
        ]);
        let csv = encode(&dataset, Delimiter::Comma, &no_headers());
        assert_eq!(csv, "\"A\",\"B\"\n\"1\",\"2\"\n\"3\",\"\"");
    }

    #[test]
    fn test_round_trip_comma() {
        let rows = vec![
            Row::from_pairs([("Name", "O'Brien"), ("Note", "line\nbreak, and \"quotes\"")]),
            Row::from_pairs([("Name", "Ada"), ("Note", "")]),
        ];
        let dataset = Dataset::from_rows(rows.clone());

        let decoded = decode(&encode(&dataset, Delimiter::Comma, &no_headers()), Delimiter::Comma);
        assert_eq!(decoded, rows);
    }

    #[test]
    fn test_round_trip_tab() {
        let rows = vec![
            Row::from_pairs([("A", "plain"), ("B", "text")]),
            Row::from_pairs([("A", "more"), ("B", "cells")]),
        ];
        let dataset = Dataset::from_rows(rows.clone());

        let decoded = decode(&encode(&dataset, Delimiter::Tab, &no_headers()), Delimiter::Tab);
        assert_eq!(decoded, rows);
    }

    #[test]
    fn test_round_trip_keeps_values_under_renamed_headers() {
        let dataset = Dataset::from_rows([Row::from_pairs([("raw_key", "value")])]);
        let mut headers = IndexMap::new();
        headers.insert("raw_key".to_string(), "Display Key".to_string());

        let decoded = decode(&encode(&dataset, Delimiter::Comma, &headers), Delimiter::Comma);
        assert_eq!(decoded[0].get("Display Key"), Some("value"));
    }

    #[test]
    fn test_decode_crlf() {
        let rows = decode("\"A\",\"B\"\r\n\"1\",\"2\"\r\n", Delimiter::Comma);
        assert_eq!(rows, vec![Row::from_pairs([("A", "1"), ("B", "2")])]);
    }

    #[test]
    fn test_write_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = Dataset::from_rows([Row::from_pairs([("A", "1")])]);

        let path = write_csv_file(&dataset, &no_headers(), "example", dir.path()).unwrap();

        assert_eq!(path.file_name().unwrap(), "example.csv");
        assert_eq!(std::fs::read_to_string(path).unwrap(), "\"A\"\n\"1\"");
    }
}
