// ==============================================================================
// normalizer.rs - Input Normalizer
// ==============================================================================
// Description: Canonicalizes raw laboratory exports into ordered field records
// Author: Matt Barham
// Created: 2026-10-12
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

use tracing::debug;

use crate::error::ProcessingError;
use crate::models::{Cell, Record};
use crate::parsers::RawTable;

/// Fields holding record identifiers that must compare as strings
pub const IDENTIFIER_FIELDS: &[&str] = &["ClinVar ID"];

/// Columns the reported-variants export must provide
pub const REPORTED_VARIANT_FIELDS: &[&str] = &[
    "Origin",
    "Gene",
    "GRCh38 coordinates;ref/alt allele",
    "CDS change and protein change",
    "Predicted consequences",
    "VAF",
    "Genotype",
    "Gene mode of action",
    "ClinVar ID",
    "Population germline allele frequency (GE | gnomAD)",
    "Alt allele/total read depth",
    "Domain",
];

/// Columns the reported-structural-variants export must provide
pub const STRUCTURAL_VARIANT_FIELDS: &[&str] = &[
    "Type",
    "Event domain",
    "Impacted transcript region",
    "Gene",
    "GRCh38 coordinates",
    "Size",
    "Chromosomal bands",
    "Confidence/support",
    "Gene mode of action",
];

/// Alternative header spellings seen across export versions,
/// keyed by the canonical name
pub const HEADER_ALTERNATIVES: &[(&str, &[&str])] = &[
    (
        "GRCh38 coordinates;ref/alt allele",
        &["GRCh38 coordinates; ref/alt allele"],
    ),
    (
        "Population germline allele frequency (GE | gnomAD)",
        &["Population germline allele frequency (GE|gnomAD)"],
    ),
    ("Confidence/support", &["Confidence / support"]),
    ("Impacted transcript region", &["Impacted transcript regions"]),
    ("Chromosomal bands", &["Chromosomal band", "Cytobands"]),
    ("Alt allele/total read depth", &["Alt allele / total read depth"]),
];

/// Find the header under which `expected` is present in `available`,
/// trying the canonical name first and then its declared alternatives.
pub fn find_alternative_header<'a>(available: &'a [String], expected: &str) -> Option<&'a str> {
    if let Some(found) = available.iter().find(|c| *c == expected) {
        return Some(found.as_str());
    }

    HEADER_ALTERNATIVES
        .iter()
        .filter(|(canonical, _)| *canonical == expected)
        .flat_map(|(_, alternatives)| alternatives.iter())
        .find_map(|alt| available.iter().find(|c| c == alt).map(String::as_str))
}

/// Canonical string form of an identifier: numeric artifacts such as
/// `12345.0` become `"12345"`.
pub fn canonical_identifier(cell: &Cell) -> Cell {
    match cell {
        Cell::Missing => Cell::Missing,
        Cell::Integer(i) => Cell::Text(i.to_string()),
        Cell::Float(f) => Cell::Text(strip_float_artifact(&f.to_string())),
        Cell::Text(s) => Cell::Text(strip_float_artifact(s.trim())),
    }
}

fn strip_float_artifact(value: &str) -> String {
    value.strip_suffix(".0").unwrap_or(value).to_string()
}

/// Normalize a raw table into records
///
/// Alternative headers are renamed to their canonical names, every field in
/// `required` must then be present, and identifier fields are coerced to
/// canonical strings. No other value is modified.
///
/// # Errors
/// `ProcessingError::Schema` naming the first absent required column.
pub fn normalize(table: &RawTable, required: &[&str]) -> Result<Vec<Record>, ProcessingError> {
    let mut columns = table.columns.clone();

    for &(canonical, _) in HEADER_ALTERNATIVES {
        if columns.iter().any(|c| c == canonical) {
            continue;
        }
        if let Some(found) = find_alternative_header(&table.columns, canonical) {
            debug!("{}: using header '{}' for '{}'", table.name, found, canonical);
            if let Some(slot) = columns.iter_mut().find(|c| c.as_str() == found) {
                *slot = canonical.to_string();
            }
        }
    }

    for field in required {
        if !columns.iter().any(|c| c == field) {
            return Err(ProcessingError::schema(&table.name, *field));
        }
    }

    let records = table
        .rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let mut record = Record::new(idx + 1);
            for (column, cell) in columns.iter().zip(row.iter()) {
                let value = if IDENTIFIER_FIELDS.contains(&column.as_str()) {
                    canonical_identifier(cell)
                } else {
                    cell.clone()
                };
                record.set(column.clone(), value);
            }
            record
        })
        .collect::<Vec<_>>();

    debug!("Normalized {} rows from {}", records.len(), table.name);

    Ok(records)
}
