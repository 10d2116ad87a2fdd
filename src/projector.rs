// ==============================================================================
// projector.rs - Output Projector & Sorter
// ==============================================================================
// Description: Per-stream output schemas, numeric coercion, stable sorting and
//              final projection into report batches
// Author: Matt Barham
// Created: 2026-10-14
// Modified: 2026-10-17
// Version: 1.0.0
// ==============================================================================
// Sort orders (stable, missing values last):
//   SomaticSNV  Domain ↑, VAF ↓
//   Gain        Event domain ↑, Copy Number ↓
//   Loss        Event domain ↑, Copy Number ↑
//   Germline, Fusion   input order
// ==============================================================================

use std::cmp::Ordering;
use tracing::debug;

use crate::error::ProcessingError;
use crate::models::{Cell, Record, ReportBatch, StreamKind};
use crate::reference_panel::{CancerPanel, PANEL_VALUE_COLUMNS};

pub const GERMLINE_COLUMNS: &[&str] = &[
    "Gene",
    "GRCh38 coordinates;ref/alt allele",
    "CDS change and protein change",
    "Predicted consequences",
    "Genotype",
    "Variant Class",
    "Actionability",
    "Gene mode of action",
    "clnsigconf",
    "gnomAD",
];

/// Somatic columns before the panel columns, by source name
pub const SOMATIC_LEADING_COLUMNS: &[&str] = &[
    "Domain",
    "Gene",
    "GRCh38 coordinates;ref/alt allele",
    "Cyto",
    "CDS change and protein change",
    "Predicted consequences",
    "VAF",
    "LOH",
    "Error flag",
    "Alt allele/total read depth",
    "Gene mode of action",
    "Variant class",
    "TSG_NMD",
    "TSG_LOH",
    "Splice fs?",
    "SpliceAI",
    "REVEL",
    "OG_3' Ter",
    "Recurrence somatic database",
    "HS_Total",
    "HS_Sample",
    "HS_Tumour",
];

/// Somatic columns after the panel columns
pub const SOMATIC_TRAILING_COLUMNS: &[&str] = &["MTBP c.", "MTBP p."];

/// Source → output renames applied to somatic rows
pub const SOMATIC_RENAMES: &[(&str, &str)] = &[
    ("GRCh38 coordinates;ref/alt allele", "GRCh38 coordinates"),
    ("CDS change and protein change", "Variant"),
];

/// Gain/Loss columns before the panel columns
pub const COPY_NUMBER_COLUMNS: &[&str] = &[
    "Event domain",
    "Impacted transcript region",
    "Gene",
    "GRCh38 coordinates",
    "Type",
    "Copy Number",
    "Size",
    "Cyto 1",
    "Cyto 2",
    "Gene mode of action",
    "Variant class",
];

/// Curation columns the report leaves for manual entry
pub const SOMATIC_CURATION_COLUMNS: &[&str] = &[
    "Variant class",
    "TSG_NMD",
    "TSG_LOH",
    "Splice fs?",
    "SpliceAI",
    "REVEL",
    "OG_3' Ter",
    "Recurrence somatic database",
];

/// Ordered output columns of one stream: (source field, output name)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSchema {
    pub kind: StreamKind,
    columns: Vec<(String, String)>,
}

impl OutputSchema {
    pub fn new<S: AsRef<str>>(kind: StreamKind, sources: impl IntoIterator<Item = S>) -> Self {
        Self {
            kind,
            columns: sources
                .into_iter()
                .map(|s| (s.as_ref().to_string(), s.as_ref().to_string()))
                .collect(),
        }
    }

    pub fn with_renames(mut self, renames: &[(&str, &str)]) -> Self {
        for (source, output) in &mut self.columns {
            if let Some((_, renamed)) = renames.iter().find(|(from, _)| *from == source.as_str()) {
                *output = renamed.to_string();
            }
        }
        self
    }

    pub fn output_columns(&self) -> Vec<String> {
        self.columns.iter().map(|(_, output)| output.clone()).collect()
    }

    pub fn source_columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(source, _)| source.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Panel output columns, optionally suffixed with a gene position
fn panel_columns(position: Option<usize>) -> Vec<String> {
    let suffix = position.map(|p| format!("_{}", p)).unwrap_or_default();
    CancerPanel::ALL
        .iter()
        .flat_map(|panel| {
            let suffix = suffix.clone();
            PANEL_VALUE_COLUMNS
                .iter()
                .map(move |value| format!("{} {}{}", panel.column_prefix(), value, suffix))
        })
        .collect()
}

pub fn germline_schema() -> OutputSchema {
    OutputSchema::new(StreamKind::Germline, GERMLINE_COLUMNS)
}

pub fn somatic_schema() -> OutputSchema {
    let columns = SOMATIC_LEADING_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(panel_columns(None))
        .chain(SOMATIC_TRAILING_COLUMNS.iter().map(|c| c.to_string()));
    OutputSchema::new(StreamKind::SomaticSnv, columns).with_renames(SOMATIC_RENAMES)
}

/// Gain or Loss schema
pub fn copy_number_schema(kind: StreamKind) -> OutputSchema {
    let columns = COPY_NUMBER_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(panel_columns(None));
    OutputSchema::new(kind, columns)
}

/// Fusion schema for the discovered gene and fusion sub-columns
///
/// With no gene split the plain `Gene` column and unsuffixed panel columns
/// are used.
pub fn fusion_schema(gene_columns: &[String], fusion_columns: &[String]) -> OutputSchema {
    let mut columns: Vec<String> = vec!["Event domain".into(), "Impacted transcript region".into()];

    if gene_columns.is_empty() {
        columns.push("Gene".into());
    } else {
        columns.extend(gene_columns.iter().cloned());
    }

    columns.extend(["GRCh38 coordinates", "Chromosomal bands", "Type"].map(String::from));
    columns.extend(fusion_columns.iter().cloned());
    columns.extend(
        [
            "Size",
            "Paired reads",
            "Split reads",
            "Gene mode of action",
            "Variant class",
            "Actionability",
            "Comments",
        ]
        .map(String::from),
    );

    if gene_columns.is_empty() {
        columns.extend(panel_columns(None));
    } else {
        for position in 1..=gene_columns.len() {
            columns.extend(panel_columns(Some(position)));
        }
    }

    OutputSchema::new(StreamKind::Fusion, columns)
}

/// Render a number with thousands separators and no decimals
///
/// # Examples
/// ```
/// use variant_report_processor::projector::format_thousands;
///
/// assert_eq!(format_thousands(2_500_000.0), "2,500,000");
/// assert_eq!(format_thousands(999.6), "1,000");
/// assert_eq!(format_thousands(-12345.0), "-12,345");
/// ```
pub fn format_thousands(value: f64) -> String {
    let rounded = format!("{:.0}", value.abs());
    let mut grouped = String::with_capacity(rounded.len() + rounded.len() / 3);
    for (i, digit) in rounded.chars().enumerate() {
        if i > 0 && (rounded.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if value < 0.0 && rounded != "0" {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

fn numeric_value(
    record: &Record,
    field: &str,
    batch: StreamKind,
) -> Result<Option<f64>, ProcessingError> {
    match record.get(field) {
        None | Some(Cell::Missing) => Ok(None),
        Some(cell) => cell
            .as_f64()
            .map(Some)
            .ok_or_else(|| ProcessingError::data_format(batch.sheet_name(), record.row, field, cell.to_string())),
    }
}

/// `Size` → `"2,500,000"`; missing sizes stay blank
pub fn format_size(records: &mut [Record], batch: StreamKind) -> Result<(), ProcessingError> {
    for record in records.iter_mut() {
        let formatted = match numeric_value(record, "Size", batch)? {
            Some(size) => Cell::Text(format_thousands(size)),
            None => Cell::empty(),
        };
        record.set("Size", formatted);
    }
    Ok(())
}

/// `Copy Number` text from the `Type(N)` split → integer
pub fn coerce_copy_number(records: &mut [Record], batch: StreamKind) -> Result<(), ProcessingError> {
    for record in records.iter_mut() {
        let value = match record.get("Copy Number") {
            None | Some(Cell::Missing) => Cell::Missing,
            Some(Cell::Integer(n)) => Cell::Integer(*n),
            // Integral floats render without a fraction; anything else fails to parse
            Some(cell) => {
                let raw = cell.to_string();
                match raw.trim().parse::<i64>() {
                    Ok(n) => Cell::Integer(n),
                    Err(_) => {
                        return Err(ProcessingError::data_format(batch.sheet_name(), record.row, "Copy Number", raw));
                    }
                }
            }
        };
        record.set("Copy Number", value);
    }
    Ok(())
}

/// `VAF` (LOH suffix already removed) → float
pub fn coerce_vaf(records: &mut [Record], batch: StreamKind) -> Result<(), ProcessingError> {
    for record in records.iter_mut() {
        let value = numeric_value(record, "VAF", batch)?
            .map(Cell::Float)
            .unwrap_or(Cell::Missing);
        record.set("VAF", value);
    }
    Ok(())
}

fn compare_text(a: Option<String>, b: Option<String>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_numeric(a: Option<f64>, b: Option<f64>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if descending => b.total_cmp(&a),
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn numeric_key(record: &Record, field: &str) -> Option<f64> {
    record.get(field).and_then(Cell::as_f64)
}

/// Stable stream-specific sort
pub fn sort_records(records: &mut [Record], kind: StreamKind) {
    let (primary, secondary, descending) = match kind {
        StreamKind::SomaticSnv => ("Domain", "VAF", true),
        StreamKind::Gain => ("Event domain", "Copy Number", true),
        StreamKind::Loss => ("Event domain", "Copy Number", false),
        StreamKind::Germline | StreamKind::Fusion => return,
    };

    records.sort_by(|a, b| {
        compare_text(a.get_str(primary), b.get_str(primary)).then_with(|| {
            compare_numeric(numeric_key(a, secondary), numeric_key(b, secondary), descending)
        })
    });

    debug!("Sorted {} {} records by {}, {}", records.len(), kind, primary, secondary);
}

/// Project records onto `schema`; remaining missing cells become `""`
///
/// # Errors
/// `ProcessingError::Schema` if a record lacks a schema column.
pub fn project(records: &[Record], schema: &OutputSchema) -> Result<ReportBatch, ProcessingError> {
    let rows = records
        .iter()
        .map(|record| {
            schema
                .source_columns()
                .map(|column| match record.get(column) {
                    Some(Cell::Missing) => Ok(Cell::empty()),
                    Some(cell) => Ok(cell.clone()),
                    None => Err(ProcessingError::schema(schema.kind.sheet_name(), column)),
                })
                .collect::<Result<Vec<Cell>, ProcessingError>>()
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ReportBatch {
        kind: schema.kind,
        columns: schema.output_columns(),
        rows,
    })
}
