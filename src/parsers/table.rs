// ==============================================================================
// table.rs - Delimited Table Parser
// ==============================================================================
// Description: Parser for CSV/TSV laboratory exports and reference tables
// Author: Matt Barham
// Created: 2026-10-12
// Modified: 2026-10-15
// Version: 1.0.0
// ==============================================================================
// Format: Delimited text with a header row, optionally gzip compressed
// Example:
//   Origin,Gene,CDS change and protein change,VAF
//   Somatic,NRAS,c.181C>A;p.Gln61Lys,45
//   Germline,BRCA2,c.5946del;p.Ser1982fs,50
// ==============================================================================

use csv::ReaderBuilder;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

use crate::models::Cell;

/// Raw table as read from disk: header plus untyped rows
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// Table name (file stem unless set explicitly)
    pub name: String,

    /// Header row, in file order
    pub columns: Vec<String>,

    /// Data rows; every row has exactly `columns.len()` cells
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from string literals, inferring cell types
    pub fn from_rows(name: impl Into<String>, columns: &[&str], rows: &[&[&str]]) -> Self {
        let mut table = Self::new(name, columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            table.push_row(row.iter().map(|v| Cell::infer(v)).collect());
        }
        table
    }

    /// Append a row, padding or truncating it to the header width
    pub fn push_row(&mut self, mut cells: Vec<Cell>) {
        cells.resize(self.columns.len(), Cell::Missing);
        self.rows.push(cells);
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Errors that can occur during table parsing
#[derive(Error, Debug)]
pub enum TableParseError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Table has no header row: {0}")]
    MissingHeader(String),

    #[error("Duplicate column '{column}' in {table}")]
    DuplicateColumn { table: String, column: String },
}

/// Parser for delimited tables
#[derive(Debug, Clone, Default)]
pub struct TableParser;

impl TableParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a delimited file
    ///
    /// `.tsv`/`.txt` files are tab-delimited, everything else is comma-delimited.
    /// A trailing `.gz` is decompressed transparently.
    pub fn parse(&self, path: impl AsRef<Path>) -> Result<RawTable, TableParseError> {
        let path = path.as_ref();
        let name = table_name(path);
        let delimiter = detect_delimiter(path);

        let file = File::open(path)?;
        let reader: Box<dyn Read> = if is_gzip(path) {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };

        self.parse_reader(name, reader, delimiter)
    }

    /// Parse delimited text from any reader
    pub fn parse_reader<R: Read>(
        &self,
        name: impl Into<String>,
        reader: R,
        delimiter: u8,
    ) -> Result<RawTable, TableParseError> {
        let name = name.into();
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        if headers.is_empty() {
            return Err(TableParseError::MissingHeader(name));
        }

        let mut columns: Vec<String> = Vec::with_capacity(headers.len());
        for header in headers.iter() {
            let column = header.trim_start_matches('\u{feff}').trim().to_string();
            if columns.contains(&column) {
                return Err(TableParseError::DuplicateColumn {
                    table: name,
                    column,
                });
            }
            columns.push(column);
        }

        let mut table = RawTable::new(name, columns);
        for result in csv_reader.records() {
            let record = result?;
            // Skip fully blank lines
            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }
            table.push_row(record.iter().map(Cell::infer).collect());
        }

        Ok(table)
    }
}

fn is_gzip(path: &Path) -> bool {
    path.extension().map(|ext| ext == "gz").unwrap_or(false)
}

/// File stem without compression or table extensions
fn table_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let without_gz = file_name.strip_suffix(".gz").unwrap_or(&file_name);
    without_gz
        .rsplit_once('.')
        .map(|(stem, _)| stem.to_string())
        .unwrap_or_else(|| without_gz.to_string())
}

fn detect_delimiter(path: &Path) -> u8 {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let without_gz = file_name.strip_suffix(".gz").unwrap_or(&file_name);
    if without_gz.ends_with(".tsv") || without_gz.ends_with(".txt") {
        b'\t'
    } else {
        b','
    }
}
