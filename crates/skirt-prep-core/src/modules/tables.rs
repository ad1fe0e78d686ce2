//! Whitespace-separated particle tables with `# column i: name (unit)` headers.

use super::serialization::{format_scientific, write_error, write_text_artifact};
use crate::domain::{PrepError, PrepResult, TableColumn};
use std::path::Path;

pub const TABLE_PRECISION: usize = 8;

pub fn table_header(columns: &[TableColumn]) -> Vec<String> {
    columns
        .iter()
        .enumerate()
        .map(|(index, column)| {
            format!("# column {}: {} ({})", index + 1, column.name, column.unit)
        })
        .collect()
}

pub fn render_table<'a, I>(columns: &[TableColumn], rows: I) -> String
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let mut content = String::new();
    for line in table_header(columns) {
        content.push_str(&line);
        content.push('\n');
    }
    for row in rows {
        let rendered: Vec<String> = row
            .iter()
            .map(|value| format_scientific(*value, TABLE_PRECISION))
            .collect();
        content.push_str(&rendered.join(" "));
        content.push('\n');
    }
    content
}

pub fn write_table<'a, I>(path: &Path, columns: &[TableColumn], rows: I) -> PrepResult<()>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    write_text_artifact(path, &render_table(columns, rows)).map_err(|source| write_error(path, source))
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TableParseError {
    #[error("line {line}: expected {expected} columns, found {found}")]
    ColumnCount {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: '{token}' is not a number")]
    InvalidNumber { line: usize, token: String },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl ParsedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, index: usize) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|row| row.get(index).copied())
            .collect()
    }
}

/// Parses a table, requiring exactly `expected_columns` values per data row.
///
/// Non-finite tokens such as `nan` or `inf` parse successfully; rejecting them
/// is left to the validator.
pub fn parse_table(source: &str, expected_columns: usize) -> Result<ParsedTable, TableParseError> {
    let mut table = ParsedTable::default();
    for (offset, raw) in source.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('#') {
            table.header.push(line.to_string());
            continue;
        }

        let row = line
            .split_whitespace()
            .map(|token| {
                token
                    .parse::<f64>()
                    .map_err(|_| TableParseError::InvalidNumber {
                        line: offset + 1,
                        token: token.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if row.len() != expected_columns {
            return Err(TableParseError::ColumnCount {
                line: offset + 1,
                expected: expected_columns,
                found: row.len(),
            });
        }
        table.rows.push(row);
    }
    Ok(table)
}

pub fn read_table(
    path: &Path,
    expected_columns: usize,
    placeholder: &'static str,
) -> PrepResult<ParsedTable> {
    let source = super::serialization::read_text_artifact(path, placeholder)?;
    parse_table(&source, expected_columns).map_err(|error| {
        PrepError::schema(placeholder, format!("'{}' {}", path.display(), error))
    })
}
