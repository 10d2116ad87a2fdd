// ==============================================================================
// error.rs - Pipeline Error Types
// ==============================================================================
// Description: Errors raised by the variant normalization and annotation pipeline
// Author: Matt Barham
// Created: 2026-10-12
// Modified: 2026-10-14
// Version: 1.0.0
// ==============================================================================

use thiserror::Error;

/// Errors that abort a pipeline run
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessingError {
    #[error("Schema error in {batch}: required column '{column}' is absent")]
    Schema { batch: String, column: String },

    #[error("Data format error in {batch}, row {row}: field '{field}' has non-numeric value '{value}'")]
    DataFormat {
        batch: String,
        row: usize,
        field: String,
        value: String,
    },

    #[error("Reference table '{0}' is not loaded")]
    MissingReference(String),

    #[error("Significance lookup failed: {0}")]
    Significance(String),
}

impl ProcessingError {
    pub fn schema(batch: impl Into<String>, column: impl Into<String>) -> Self {
        ProcessingError::Schema {
            batch: batch.into(),
            column: column.into(),
        }
    }

    pub fn data_format(
        batch: impl Into<String>,
        row: usize,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        ProcessingError::DataFormat {
            batch: batch.into(),
            row,
            field: field.into(),
            value: value.into(),
        }
    }
}
