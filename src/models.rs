// ==============================================================================
// models.rs - Variant Record Data Models
// ==============================================================================
// Description: Data structures for classified, annotated and projected variant rows
// Author: Matt Barham
// Created: 2026-10-12
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel written when a join key has no match in the reference table
pub const JOIN_MISS: &str = "-";

/// Sentinel for a panel row that exists but carries a blank annotation
pub const PANEL_BLANK: &str = "*";

/// Untyped scalar value of a single field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    /// Field is absent or empty in the source export
    Missing,
    Integer(i64),
    Float(f64),
    Text(String),
}

/// Tokens spreadsheet exports use for an absent value
pub const NA_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

impl Cell {
    /// Infer a scalar from raw text the way upstream spreadsheet exports do:
    /// empty or an NA token → missing, integral → integer, finite decimal →
    /// float, otherwise text.
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || NA_TOKENS.contains(&trimmed) {
            return Cell::Missing;
        }
        if let Ok(value) = trimmed.parse::<i64>() {
            return Cell::Integer(value);
        }
        // Plain decimal notation only; overflow to infinity stays text
        if trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
        {
            if let Ok(value) = trimmed.parse::<f64>() {
                if value.is_finite() {
                    return Cell::Float(value);
                }
            }
        }
        Cell::Text(raw.to_string())
    }

    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// Empty-string cell, distinct from `Missing`
    pub fn empty() -> Self {
        Cell::Text(String::new())
    }

    /// String form used for joins and string operations.
    /// Returns `None` for missing cells.
    pub fn as_key(&self) -> Option<String> {
        match self {
            Cell::Missing => None,
            Cell::Text(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Finite numeric view of the cell, parsing text when needed.
    /// NaN and infinities are not numbers here.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Cell::Missing => return None,
            Cell::Integer(i) => *i as f64,
            Cell::Float(f) => *f,
            Cell::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Missing => Ok(()),
            Cell::Integer(i) => write!(f, "{}", i),
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Integer(value)
    }
}

/// One input row: an ordered mapping of field name to value
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    /// 1-based data row number in the originating input file
    pub row: usize,

    fields: Vec<(String, Cell)>,
}

impl Record {
    pub fn new(row: usize) -> Self {
        Self {
            row,
            fields: Vec::new(),
        }
    }

    /// Build a record from (name, value) pairs, preserving order
    pub fn from_pairs<K, V>(row: usize, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Cell>,
    {
        let mut record = Self::new(row);
        for (name, value) in pairs {
            record.set(name, value.into());
        }
        record
    }

    pub fn get(&self, field: &str) -> Option<&Cell> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    /// Field value as text; missing or absent fields yield `None`
    pub fn get_str(&self, field: &str) -> Option<String> {
        self.get(field).and_then(Cell::as_key)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Overwrite an existing field in place, or append a new one
    pub fn set(&mut self, field: impl Into<String>, value: Cell) {
        let field = field.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((field, value)),
        }
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Classified variant stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StreamKind {
    Germline,
    SomaticSnv,
    Gain,
    Loss,
    Fusion,
}

impl StreamKind {
    pub const ALL: [StreamKind; 5] = [
        StreamKind::Germline,
        StreamKind::SomaticSnv,
        StreamKind::Gain,
        StreamKind::Loss,
        StreamKind::Fusion,
    ];

    /// Name the presentation layer uses for the stream's sheet
    pub fn sheet_name(&self) -> &'static str {
        match self {
            StreamKind::Germline => "Germline",
            StreamKind::SomaticSnv => "SNV",
            StreamKind::Gain => "Gain",
            StreamKind::Loss => "Loss",
            StreamKind::Fusion => "SV",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sheet_name())
    }
}

/// Normalized, sorted output batch for one stream.
/// Every cell is populated; missing values have been replaced with "".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportBatch {
    pub kind: StreamKind,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl ReportBatch {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Values of one column in row order
    pub fn column(&self, column: &str) -> Option<Vec<&Cell>> {
        let idx = self.column_index(column)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Single value lookup by row index and column name
    pub fn value(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }
}

/// Germline result: "no germline variants" is a valid report state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "batch", rename_all = "snake_case")]
pub enum GermlineReport {
    NoVariants,
    Variants(ReportBatch),
}

impl GermlineReport {
    pub fn batch(&self) -> Option<&ReportBatch> {
        match self {
            GermlineReport::NoVariants => None,
            GermlineReport::Variants(batch) => Some(batch),
        }
    }
}

/// The five normalized batches handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportBatches {
    pub germline: GermlineReport,
    pub somatic: ReportBatch,
    pub gain: ReportBatch,
    pub loss: ReportBatch,
    pub fusion: ReportBatch,
}

impl ReportBatches {
    /// Batch by stream; `None` for an empty germline stream
    pub fn get(&self, kind: StreamKind) -> Option<&ReportBatch> {
        match kind {
            StreamKind::Germline => self.germline.batch(),
            StreamKind::SomaticSnv => Some(&self.somatic),
            StreamKind::Gain => Some(&self.gain),
            StreamKind::Loss => Some(&self.loss),
            StreamKind::Fusion => Some(&self.fusion),
        }
    }
}
