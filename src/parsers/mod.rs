// ==============================================================================
// parsers/mod.rs - File parser modules
// ==============================================================================
// Description: Parsers for laboratory export tables and ClinVar releases
// Author: Matt Barham
// Created: 2026-10-12
// Modified: 2026-10-14
// Version: 1.0.0
// ==============================================================================

pub mod clinvar;
pub mod table;

pub use clinvar::{ClinvarParseError, ClinvarVcfLookup};
pub use table::{RawTable, TableParseError, TableParser};
