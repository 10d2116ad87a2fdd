// ==============================================================================
// cell_source.rs - Report Cell Sources
// ==============================================================================
// Description: Cell-coordinate layouts whose values come from literals or from
//              tables supplied by the document extraction service
// Author: Matt Barham
// Created: 2026-10-15
// Modified: 2026-10-17
// Version: 1.0.0
// ==============================================================================
// Kinds:
//   Literal            fixed text (headers, formulas)
//   SingleJoin         one cell of an extracted table
//   ConcatenatedJoin   several formatted cells joined with a space
//   Computed           first cell matching a predicate, value taken by an extractor
// ==============================================================================

use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::models::Cell;
use crate::parsers::RawTable;

static TMB_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("Total number of somatic non-synonymous small variants per megabase")
        .expect("Invalid TMB label regex")
});

/// Address of one value in an extracted table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub table: String,
    /// 0-based data row
    pub row: usize,
    pub column: String,
}

impl TableRef {
    pub fn new(table: impl Into<String>, row: usize, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            row,
            column: column.into(),
        }
    }
}

/// Per-part formatting inside a concatenated value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Formatting {
    #[default]
    Plain,
    /// Text before the first comma
    Split,
    /// Wrapped in parentheses
    Parentheses,
}

impl Formatting {
    pub fn apply(&self, value: &str) -> String {
        match self {
            Formatting::Plain => value.to_string(),
            Formatting::Split => value.split(',').next().unwrap_or_default().trim().to_string(),
            Formatting::Parentheses => format!("({})", value),
        }
    }
}

/// Where a computed value is read relative to the matching cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extractor {
    /// Cell to the right of the match
    NextCell,
    /// Same column, next row
    CellBelow,
}

/// Value found by scanning every extracted table for a matching cell
#[derive(Debug, Clone)]
pub struct ComputedValue {
    pub predicate: Regex,
    pub extractor: Extractor,
}

impl ComputedValue {
    /// Value adjacent to the first cell whose text matches `label`
    pub fn labelled(label: &Regex) -> Self {
        Self {
            predicate: label.clone(),
            extractor: Extractor::NextCell,
        }
    }

    fn resolve(&self, tables: &ExtractedTables) -> Option<String> {
        for table in tables.iter_ordered() {
            // Header row first, then data rows
            let header: Vec<Cell> = table.columns.iter().map(|c| Cell::text(c.as_str())).collect();
            let grid = std::iter::once(&header).chain(table.rows.iter());
            let grid: Vec<&Vec<Cell>> = grid.collect();

            for (r, row) in grid.iter().enumerate() {
                for (c, cell) in row.iter().enumerate() {
                    let Some(text) = cell.as_key() else {
                        continue;
                    };
                    if !self.predicate.is_match(&text) {
                        continue;
                    }
                    let value = match self.extractor {
                        Extractor::NextCell => row.get(c + 1),
                        Extractor::CellBelow => grid.get(r + 1).and_then(|next| next.get(c)),
                    };
                    return Some(value.map(|v| v.to_string().trim().to_string()).unwrap_or_default());
                }
            }
        }
        None
    }
}

/// Source of one report cell
#[derive(Debug, Clone)]
pub enum CellSource {
    Literal(String),
    SingleJoin(TableRef),
    ConcatenatedJoin(Vec<(TableRef, Formatting)>),
    Computed(ComputedValue),
}

/// Tables supplied by the document extraction service, by name
#[derive(Debug, Clone, Default)]
pub struct ExtractedTables {
    tables: HashMap<String, RawTable>,
    order: Vec<String>,
}

impl ExtractedTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: RawTable) {
        if !self.tables.contains_key(&table.name) {
            self.order.push(table.name.clone());
        }
        self.tables.insert(table.name.clone(), table);
    }

    pub fn get(&self, name: &str) -> Option<&RawTable> {
        self.tables.get(name)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Tables in insertion order
    pub fn iter_ordered(&self) -> impl Iterator<Item = &RawTable> {
        self.order.iter().filter_map(|name| self.tables.get(name))
    }

    /// Value at `reference`, or `None` if the table, row or column is absent
    pub fn lookup(&self, reference: &TableRef) -> Option<String> {
        let table = self.tables.get(&reference.table)?;
        let column = table.column_index(&reference.column)?;
        let row = table.rows.get(reference.row)?;
        row.get(column).map(Cell::to_string)
    }
}

/// A resolved report cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedCell {
    pub row: u32,
    pub column: u32,
    pub value: String,
}

/// Ordered (row, column) → source layout of one report sheet
#[derive(Debug, Clone, Default)]
pub struct CellLayout {
    pub name: String,
    cells: Vec<((u32, u32), CellSource)>,
}

impl CellLayout {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: Vec::new(),
        }
    }

    pub fn cell(mut self, row: u32, column: u32, source: CellSource) -> Self {
        self.cells.push(((row, column), source));
        self
    }

    pub fn literal(self, row: u32, column: u32, text: &str) -> Self {
        self.cell(row, column, CellSource::Literal(text.to_string()))
    }

    pub fn join(self, row: u32, column: u32, table: &str, table_row: usize, table_column: &str) -> Self {
        self.cell(row, column, CellSource::SingleJoin(TableRef::new(table, table_row, table_column)))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Resolve every cell against `tables`
    ///
    /// Unresolvable references become empty strings and are logged; a
    /// missing extracted table never aborts the report.
    pub fn resolve(&self, tables: &ExtractedTables) -> Vec<ResolvedCell> {
        let resolved: Vec<ResolvedCell> = self
            .cells
            .iter()
            .map(|((row, column), source)| ResolvedCell {
                row: *row,
                column: *column,
                value: resolve_source(source, tables, (*row, *column)),
            })
            .collect();

        debug!("Resolved {} cells of layout '{}'", resolved.len(), self.name);
        resolved
    }
}

fn resolve_reference(reference: &TableRef, tables: &ExtractedTables, cell: (u32, u32)) -> String {
    tables.lookup(reference).unwrap_or_else(|| {
        warn!(
            "Cell {:?}: no value at '{}' row {} column '{}'",
            cell, reference.table, reference.row, reference.column
        );
        String::new()
    })
}

fn resolve_source(source: &CellSource, tables: &ExtractedTables, cell: (u32, u32)) -> String {
    match source {
        CellSource::Literal(text) => text.clone(),
        CellSource::SingleJoin(reference) => resolve_reference(reference, tables, cell),
        CellSource::ConcatenatedJoin(parts) => parts
            .iter()
            .map(|(reference, formatting)| formatting.apply(&resolve_reference(reference, tables, cell)))
            .collect::<Vec<_>>()
            .join(" "),
        CellSource::Computed(computed) => computed.resolve(tables).unwrap_or_else(|| {
            warn!("Cell {:?}: no cell matches '{}'", cell, computed.predicate.as_str());
            String::new()
        }),
    }
}

/// Layout of the QC sheet
pub fn qc_layout() -> CellLayout {
    let headers: [(u32, u32, &str); 8] = [
        (4, 1, "Diagnosis Date"),
        (4, 2, "Tumour Received"),
        (4, 3, "Tumour ID"),
        (4, 4, "Presentation"),
        (4, 5, "Diagnosis"),
        (4, 6, "Tumour Site"),
        (4, 7, "Tumour Type"),
        (4, 8, "Germline Sample"),
    ];
    let metrics: [(u32, u32, &str); 7] = [
        (7, 1, "Purity (Histo)"),
        (7, 2, "Purity (Calculated)"),
        (7, 3, "Ploidy"),
        (7, 4, "Total SNVs"),
        (7, 5, "Total Indels"),
        (7, 6, "Total SVs"),
        (7, 7, "TMB"),
    ];
    let sequencing: [(u32, &str, &str); 6] = [
        (1, "Sample type", "Sample type"),
        (2, "Mean depth, x", "Genome-wide coverage mean, x"),
        (3, "Mapped reads, %", "Mapped reads, %"),
        (4, "Chimeric DNA frag, %", "Chimeric DNA fragments, %"),
        (5, "Insert size, bp", "Insert size median, bp"),
        (6, "Unevenness, x", "Unevenness of local genome coverage, x"),
    ];

    let mut layout = CellLayout::new("QC");
    for (row, column, text) in headers.into_iter().chain(metrics) {
        layout = layout.literal(row, column, text);
    }

    layout = layout
        .join(5, 1, "Tumor info", 0, "Tumour Diagnosis Date")
        .join(5, 2, "Sample info", 0, "Clinical Sample Date Time")
        .join(5, 3, "Tumor info", 0, "Histopathology or SIHMDS LAB ID")
        .cell(
            5,
            4,
            CellSource::ConcatenatedJoin(vec![
                (TableRef::new("Tumor info", 0, "Presentation"), Formatting::Split),
                (TableRef::new("Tumor info", 0, "Primary or Metastatic"), Formatting::Parentheses),
            ]),
        )
        .join(5, 5, "Patient info", 0, "Clinical Indication")
        .join(5, 6, "Tumor info", 0, "Tumour Topography")
        .cell(
            5,
            7,
            CellSource::ConcatenatedJoin(vec![
                (TableRef::new("Sample info", 0, "Storage Medium"), Formatting::Plain),
                (TableRef::new("Sample info", 0, "Source"), Formatting::Plain),
            ]),
        )
        .cell(
            5,
            8,
            CellSource::ConcatenatedJoin(vec![
                (TableRef::new("Germline info", 0, "Storage Medium"), Formatting::Plain),
                (TableRef::new("Germline info", 0, "Source"), Formatting::Parentheses),
            ]),
        )
        .join(8, 1, "Sample info", 0, "Tumour Content")
        .join(8, 2, "Sample info", 0, "Calculated Tumour Content")
        .join(8, 3, "Sample info", 0, "Calculated Overall Ploidy")
        .join(8, 4, "Sequencing info", 1, "Total somatic SNVs")
        .join(8, 5, "Sequencing info", 1, "Total somatic indels")
        .join(8, 6, "Sequencing info", 1, "Total somatic SVs")
        .cell(8, 7, CellSource::Computed(ComputedValue::labelled(&TMB_LABEL)));

    for (column, header, source) in sequencing {
        layout = layout
            .literal(10, column, header)
            .join(11, column, "Sequencing info", 0, source)
            .join(12, column, "Sequencing info", 1, source);
    }

    layout
        .literal(1, 1, "=SOC!A2")
        .literal(2, 1, "=SOC!A3")
        .literal(1, 3, "=SOC!A5")
        .literal(2, 3, "=SOC!A6")
        .literal(1, 5, "=SOC!A9")
        .literal(15, 1, "QC alerts")
        .literal(16, 1, "None")
        .literal(15, 2, "Assessed purity")
        .literal(15, 3, "SNV TMB")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extracted() -> ExtractedTables {
        let mut tables = ExtractedTables::new();
        tables.insert(RawTable::from_rows(
            "Tumor info",
            &["Presentation", "Primary or Metastatic", "Tumour Topography"],
            &[&["Relapse, second line", "Metastatic", "Lung"]],
        ));
        tables.insert(RawTable::from_rows(
            "Germline info",
            &["Storage Medium", "Source"],
            &[&["EDTA", "Blood"]],
        ));
        tables.insert(RawTable::from_rows(
            "Metrics",
            &["Metric", "Value"],
            &[
                &["Total somatic SNVs", "10234"],
                &["Total number of somatic non-synonymous small variants per megabase", " 7.3 "],
            ],
        ));
        tables
    }

    #[test]
    fn test_formatting() {
        assert_eq!(Formatting::Split.apply("Relapse, second line"), "Relapse");
        assert_eq!(Formatting::Parentheses.apply("Metastatic"), "(Metastatic)");
        assert_eq!(Formatting::Plain.apply("EDTA"), "EDTA");
    }

    #[test]
    fn test_resolve_each_kind() {
        let tables = extracted();
        let layout = CellLayout::new("test")
            .literal(1, 1, "Header")
            .join(2, 1, "Tumor info", 0, "Tumour Topography")
            .cell(
                2,
                2,
                CellSource::ConcatenatedJoin(vec![
                    (TableRef::new("Tumor info", 0, "Presentation"), Formatting::Split),
                    (TableRef::new("Tumor info", 0, "Primary or Metastatic"), Formatting::Parentheses),
                ]),
            )
            .cell(2, 3, CellSource::Computed(ComputedValue::labelled(&TMB_LABEL)));

        let values: Vec<String> = layout.resolve(&tables).into_iter().map(|c| c.value).collect();
        assert_eq!(values, vec!["Header", "Lung", "Relapse (Metastatic)", "7.3"]);
    }

    #[test]
    fn test_cell_below_extractor() {
        let mut tables = ExtractedTables::new();
        tables.insert(RawTable::from_rows("Purity", &["Assessed purity"], &[&["60%"]]));
        let computed = ComputedValue {
            predicate: Regex::new("^Assessed purity$").unwrap(),
            extractor: Extractor::CellBelow,
        };
        let layout = CellLayout::new("test").cell(1, 1, CellSource::Computed(computed));
        assert_eq!(layout.resolve(&tables)[0].value, "60%");
    }

    #[test]
    fn test_unresolvable_references_are_empty() {
        let tables = extracted();
        let layout = CellLayout::new("test")
            .join(1, 1, "Sample info", 0, "Tumour Content")
            .join(1, 2, "Tumor info", 3, "Presentation")
            .join(1, 3, "Tumor info", 0, "Absent");

        assert!(layout.resolve(&tables).iter().all(|c| c.value.is_empty()));
    }

    #[test]
    fn test_qc_layout_covers_sheet() {
        let layout = qc_layout();
        let resolved = layout.resolve(&extracted());

        let germline = resolved.iter().find(|c| c.row == 5 && c.column == 8).unwrap();
        assert_eq!(germline.value, "EDTA (Blood)");

        let tmb = resolved.iter().find(|c| c.row == 8 && c.column == 7).unwrap();
        assert_eq!(tmb.value, "7.3");

        let header = resolved.iter().find(|c| c.row == 10 && c.column == 2).unwrap();
        assert_eq!(header.value, "Mean depth, x");
        assert_eq!(layout.len(), 8 + 8 + 7 + 7 + 18 + 9);
    }
}
