// ==============================================================================
// significance.rs - Clinical Significance Lookup
// ==============================================================================
// Description: Lookup seam for clinical-significance records by ClinVar ID
// Author: Matt Barham
// Created: 2026-10-14
// Modified: 2026-10-17
// Version: 1.0.0
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

use crate::error::ProcessingError;
use crate::models::{Cell, Record};
use crate::normalizer::{canonical_identifier, normalize};
use crate::parsers::RawTable;
use crate::reference_panel::{ReferenceTable, CLINVAR_TABLE};

/// Clinical significance of one ClinVar record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignificanceRecord {
    pub clinvar_id: String,
    /// Conflicting/aggregate clinical significance, human readable
    pub clnsigconf: String,
    /// Population allele frequency as `KEY=value`, empty when unknown
    pub allele_frequency: String,
}

/// Resolves clinical significance for a set of record identifiers
pub trait SignificanceLookup {
    /// Records for the requested identifiers. Unknown identifiers are
    /// simply absent from the result.
    fn find(&self, ids: &[String]) -> Result<Vec<SignificanceRecord>, ProcessingError>;
}

/// Distinct, non-missing `ClinVar ID` values in row order
pub fn collect_identifiers(records: &[Record]) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter_map(|r| r.get_str("ClinVar ID"))
        .filter(|id| !id.is_empty())
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Joinable reference table built from lookup results
pub fn significance_table(records: &[SignificanceRecord]) -> ReferenceTable {
    let rows = records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            Record::from_pairs(
                i + 1,
                [
                    ("ClinVar ID", Cell::text(&r.clinvar_id)),
                    ("clnsigconf", Cell::text(&r.clnsigconf)),
                    ("allele_frequency", Cell::text(&r.allele_frequency)),
                ],
            )
        })
        .collect();

    ReferenceTable::from_records(
        CLINVAR_TABLE,
        vec!["ClinVar ID".into(), "clnsigconf".into(), "allele_frequency".into()],
        rows,
    )
}

/// Lookup over an already-resolved significance table
/// (`ClinVar ID`, `clnsigconf`, optional `allele_frequency`)
#[derive(Debug, Clone, Default)]
pub struct TableSignificanceLookup {
    records: HashMap<String, SignificanceRecord>,
}

impl TableSignificanceLookup {
    pub fn new(records: impl IntoIterator<Item = SignificanceRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|r| (r.clinvar_id.clone(), r))
                .collect(),
        }
    }

    /// Build from a parsed table
    pub fn from_table(table: &RawTable) -> Result<Self, ProcessingError> {
        let rows = normalize(table, &["ClinVar ID", "clnsigconf"])?;
        let records: Vec<SignificanceRecord> = rows
            .iter()
            .filter_map(|row| {
                let id = row.get("ClinVar ID").map(canonical_identifier)?.as_key()?;
                Some(SignificanceRecord {
                    clinvar_id: id,
                    clnsigconf: row.get_str("clnsigconf").unwrap_or_default(),
                    allele_frequency: row.get_str("allele_frequency").unwrap_or_default(),
                })
            })
            .collect();

        info!("Loaded {} significance records from '{}'", records.len(), table.name);
        Ok(Self::new(records))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl SignificanceLookup for TableSignificanceLookup {
    fn find(&self, ids: &[String]) -> Result<Vec<SignificanceRecord>, ProcessingError> {
        let found: Vec<SignificanceRecord> = ids
            .iter()
            .filter_map(|id| self.records.get(id).cloned())
            .collect();
        debug!("Significance lookup: {}/{} identifiers resolved", found.len(), ids.len());
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_identifiers_distinct_in_order() {
        let records = vec![
            Record::from_pairs(1, [("ClinVar ID", Cell::text("200"))]),
            Record::from_pairs(2, [("ClinVar ID", Cell::Missing)]),
            Record::from_pairs(3, [("ClinVar ID", Cell::text("100"))]),
            Record::from_pairs(4, [("ClinVar ID", Cell::text("200"))]),
        ];
        assert_eq!(collect_identifiers(&records), vec!["200", "100"]);
    }

    #[test]
    fn test_table_lookup_strips_float_ids() {
        let raw = RawTable::from_rows(
            "clinvar",
            &["ClinVar ID", "clnsigconf"],
            &[&["12345.0", "Pathogenic"], &["777", "Benign"]],
        );
        let lookup = TableSignificanceLookup::from_table(&raw).unwrap();
        assert_eq!(lookup.len(), 2);

        let found = lookup
            .find(&["12345".to_string(), "404".to_string()])
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].clnsigconf, "Pathogenic");
        assert_eq!(found[0].allele_frequency, "");
    }

    #[test]
    fn test_significance_table_columns() {
        let table = significance_table(&[SignificanceRecord {
            clinvar_id: "12345".into(),
            clnsigconf: "Pathogenic".into(),
            allele_frequency: "AF_EXAC=0.001".into(),
        }]);
        assert_eq!(table.name, "clinvar");
        assert!(table.has_column("clnsigconf"));
        assert_eq!(table.rows[0].get_str("ClinVar ID").as_deref(), Some("12345"));
    }

    #[test]
    fn test_table_lookup_requires_columns() {
        let raw = RawTable::from_rows("clinvar", &["ClinVar ID"], &[&["1"]]);
        assert!(matches!(
            TableSignificanceLookup::from_table(&raw),
            Err(ProcessingError::Schema { .. })
        ));
    }
}
