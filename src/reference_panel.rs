// ==============================================================================
// reference_panel.rs - Reference Annotation Tables
// ==============================================================================
// Description: Cancer gene-group panels, hotspot and cytogenetic band tables
// Author: Matt Barham
// Created: 2026-10-13
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::ProcessingError;
use crate::models::{Cell, Record, PANEL_BLANK};
use crate::normalizer::normalize;
use crate::parsers::RawTable;

/// Hotspot frequency table name
pub const HOTSPOTS_TABLE: &str = "hotspots";

/// Cytogenetic band table name
pub const CYTO_TABLE: &str = "cyto";

/// Clinical significance table built from the significance lookup
pub const CLINVAR_TABLE: &str = "clinvar";

/// Annotation columns every panel carries
pub const PANEL_VALUE_COLUMNS: [&str; 2] = ["Driver", "Entities"];

pub const HOTSPOT_COLUMNS: [&str; 3] = ["HS_PROTEIN_ID", "HS_Samples", "HS_Tumor Type Composition"];

pub const CYTO_COLUMNS: [&str; 2] = ["Gene", "Cyto"];

/// Cancer-subtype gene-group panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CancerPanel {
    Cosmic,
    Paediatric,
    Sarcoma,
    Neuro,
    Ovarian,
    Haematological,
}

impl CancerPanel {
    /// Report column order
    pub const ALL: [CancerPanel; 6] = [
        CancerPanel::Cosmic,
        CancerPanel::Paediatric,
        CancerPanel::Sarcoma,
        CancerPanel::Neuro,
        CancerPanel::Ovarian,
        CancerPanel::Haematological,
    ];

    /// Sheet/table name in the reference gene-group workbook
    pub fn table_name(&self) -> &'static str {
        match self {
            CancerPanel::Cosmic => "cosmic",
            CancerPanel::Paediatric => "paed",
            CancerPanel::Sarcoma => "sarc",
            CancerPanel::Neuro => "neuro",
            CancerPanel::Ovarian => "ovarian",
            CancerPanel::Haematological => "haem",
        }
    }

    /// Prefix of the panel's output columns (`COSMIC Driver`, `Paed Entities`, ...)
    pub fn column_prefix(&self) -> &'static str {
        match self {
            CancerPanel::Cosmic => "COSMIC",
            CancerPanel::Paediatric => "Paed",
            CancerPanel::Sarcoma => "Sarc",
            CancerPanel::Neuro => "Neuro",
            CancerPanel::Ovarian => "Ovary",
            CancerPanel::Haematological => "Haem",
        }
    }

    pub fn from_table_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.table_name() == name)
    }
}

/// Output columns contributed by all panels, in report order
pub fn panel_output_columns() -> Vec<String> {
    CancerPanel::ALL
        .iter()
        .flat_map(|panel| {
            PANEL_VALUE_COLUMNS
                .iter()
                .map(move |value| format!("{} {}", panel.column_prefix(), value))
        })
        .collect()
}

/// A named, loaded side table
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Record>,
}

impl ReferenceTable {
    /// Build a reference table from a raw table, requiring `required` columns
    pub fn from_raw(
        name: impl Into<String>,
        raw: &RawTable,
        required: &[&str],
    ) -> Result<Self, ProcessingError> {
        let name = name.into();
        let rows = normalize(raw, required).map_err(|err| match err {
            ProcessingError::Schema { column, .. } => ProcessingError::schema(&name, column),
            other => other,
        })?;
        let columns = rows
            .first()
            .map(|r| r.field_names().map(str::to_string).collect())
            .unwrap_or_else(|| raw.columns.clone());

        debug!("Loaded reference table '{}' ({} rows)", name, rows.len());

        Ok(Self {
            name,
            columns,
            rows,
        })
    }

    /// Build a reference table directly from records
    pub fn from_records(name: impl Into<String>, columns: Vec<String>, rows: Vec<Record>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows,
        }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Replace missing cells in `columns` with the panel blank sentinel
    pub fn fill_blank_cells(&mut self, columns: &[&str]) -> usize {
        let mut filled = 0;
        for row in &mut self.rows {
            for column in columns {
                if matches!(row.get(column), Some(Cell::Missing) | None) {
                    row.set(*column, Cell::text(PANEL_BLANK));
                    filled += 1;
                }
            }
        }
        filled
    }
}

/// All reference tables available to one pipeline run, by name
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    tables: HashMap<String, ReferenceTable>,
}

impl ReferenceTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: ReferenceTable) {
        self.tables.insert(table.name.clone(), table);
    }

    pub fn get(&self, name: &str) -> Option<&ReferenceTable> {
        self.tables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Load a gene-group panel. Blank `Driver`/`Entities` cells become `"*"`
    /// so a listed gene with no annotation differs from an unlisted gene.
    pub fn load_panel(&mut self, panel: CancerPanel, raw: &RawTable) -> Result<(), ProcessingError> {
        let mut table = ReferenceTable::from_raw(
            panel.table_name(),
            raw,
            &["Gene", PANEL_VALUE_COLUMNS[0], PANEL_VALUE_COLUMNS[1]],
        )?;
        let filled = table.fill_blank_cells(&PANEL_VALUE_COLUMNS);

        info!(
            "Loaded {} panel: {} genes ({} blank annotations marked)",
            panel.table_name(),
            table.rows.len(),
            filled
        );

        self.insert(table);
        Ok(())
    }

    pub fn load_hotspots(&mut self, raw: &RawTable) -> Result<(), ProcessingError> {
        let table = ReferenceTable::from_raw(HOTSPOTS_TABLE, raw, &HOTSPOT_COLUMNS)?;
        info!("Loaded hotspot table: {} protein positions", table.rows.len());
        self.insert(table);
        Ok(())
    }

    pub fn load_cyto(&mut self, raw: &RawTable) -> Result<(), ProcessingError> {
        let table = ReferenceTable::from_raw(CYTO_TABLE, raw, &CYTO_COLUMNS)?;
        info!("Loaded cytogenetic band table: {} genes", table.rows.len());
        self.insert(table);
        Ok(())
    }
}
