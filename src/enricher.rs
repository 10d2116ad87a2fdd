// ==============================================================================
// enricher.rs - Record Enricher
// ==============================================================================
// Description: Declarative reference joins over classified variant streams
// Author: Matt Barham
// Created: 2026-10-13
// Modified: 2026-10-17
// Version: 1.0.0
// ==============================================================================
// Each JoinSpec writes one output column:
//   record[output_column] = index(table, key_column → value_column)[record[source_field]]
// Misses resolve to "-". Specs write disjoint columns, so their order never
// changes the result.
// ==============================================================================

use tracing::debug;

use crate::annotation_index::{DuplicateKeyPolicy, IndexCache};
use crate::error::ProcessingError;
use crate::models::Record;
use crate::reference_panel::{
    CancerPanel, ReferenceTables, CLINVAR_TABLE, CYTO_TABLE, HOTSPOTS_TABLE, PANEL_VALUE_COLUMNS,
};

/// One declared reference join
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSpec {
    pub output_column: String,
    pub source_field: String,
    pub table: String,
    pub key_column: String,
    pub value_column: String,
}

impl JoinSpec {
    pub fn new(
        output_column: impl Into<String>,
        source_field: impl Into<String>,
        table: impl Into<String>,
        key_column: impl Into<String>,
        value_column: impl Into<String>,
    ) -> Self {
        Self {
            output_column: output_column.into(),
            source_field: source_field.into(),
            table: table.into(),
            key_column: key_column.into(),
            value_column: value_column.into(),
        }
    }
}

/// Driver/Entities joins for all six panels, keyed on `source_field`
///
/// With `position` set, output columns carry a positional suffix
/// (`COSMIC Driver_2`) for per-gene fusion joins.
pub fn panel_join_specs(source_field: &str, position: Option<usize>) -> Vec<JoinSpec> {
    let suffix = position.map(|p| format!("_{}", p)).unwrap_or_default();

    CancerPanel::ALL
        .iter()
        .flat_map(|panel| {
            let suffix = suffix.clone();
            PANEL_VALUE_COLUMNS.iter().map(move |value| {
                JoinSpec::new(
                    format!("{} {}{}", panel.column_prefix(), value, suffix),
                    source_field,
                    panel.table_name(),
                    "Gene",
                    *value,
                )
            })
        })
        .collect()
}

/// Panel joins repeated once per gene sub-column
pub fn gene_position_join_specs(gene_columns: &[String]) -> Vec<JoinSpec> {
    gene_columns
        .iter()
        .enumerate()
        .flat_map(|(i, column)| panel_join_specs(column, Some(i + 1)))
        .collect()
}

/// Hotspot frequency joins on the truncated protein change
pub fn hotspot_join_specs(source_field: &str) -> Vec<JoinSpec> {
    vec![
        JoinSpec::new("HS_Total", source_field, HOTSPOTS_TABLE, "HS_PROTEIN_ID", "HS_Samples"),
        JoinSpec::new("HS_Sample", source_field, HOTSPOTS_TABLE, "HS_PROTEIN_ID", "HS_Samples"),
        JoinSpec::new(
            "HS_Tumour",
            source_field,
            HOTSPOTS_TABLE,
            "HS_PROTEIN_ID",
            "HS_Tumor Type Composition",
        ),
    ]
}

pub fn cyto_join_spec(source_field: &str) -> JoinSpec {
    JoinSpec::new("Cyto", source_field, CYTO_TABLE, "Gene", "Cyto")
}

/// Clinical significance join for germline rows
pub fn significance_join_spec() -> JoinSpec {
    JoinSpec::new("clnsigconf", "ClinVar ID", CLINVAR_TABLE, "ClinVar ID", "clnsigconf")
}

impl IndexCache {
    /// Build every index `specs` need, once, from `tables`
    pub fn build<'a>(
        tables: &ReferenceTables,
        specs: impl IntoIterator<Item = &'a JoinSpec>,
        policy: DuplicateKeyPolicy,
    ) -> Result<Self, ProcessingError> {
        let mut cache = IndexCache::new(policy);
        for spec in specs {
            cache.ensure(tables, &spec.table, &spec.key_column, &spec.value_column)?;
        }
        Ok(cache)
    }
}

/// Apply `specs` to every record, reading indices from `cache`
///
/// # Errors
/// `ProcessingError::MissingReference` if a join's index was never built.
pub fn enrich(records: &mut [Record], specs: &[JoinSpec], cache: &IndexCache) -> Result<(), ProcessingError> {
    for spec in specs {
        let index = cache
            .get(&spec.table, &spec.key_column, &spec.value_column)
            .ok_or_else(|| ProcessingError::MissingReference(spec.table.clone()))?;

        let mut hits = 0usize;
        for record in records.iter_mut() {
            let key = record.get_str(&spec.source_field);
            if key.as_deref().and_then(|k| index.lookup(k)).is_some() {
                hits += 1;
            }
            record.set(spec.output_column.clone(), index.resolve(key.as_deref()));
        }

        debug!(
            "Join {} ← {}.{} on {}: {}/{} matched",
            spec.output_column,
            spec.table,
            spec.value_column,
            spec.source_field,
            hits,
            records.len()
        );
    }
    Ok(())
}
