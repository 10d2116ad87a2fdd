// ==============================================================================
// annotation_index.rs - Reference Annotation Index
// ==============================================================================
// Description: Exact-match lookup indices over reference tables, cached per
//              (table, key column, value column) for one pipeline run
// Author: Matt Barham
// Created: 2026-10-13
// Modified: 2026-10-17
// Version: 1.0.0
// ==============================================================================

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

use crate::error::ProcessingError;
use crate::models::{Cell, JOIN_MISS};
use crate::reference_panel::{ReferenceTable, ReferenceTables};

/// Which row wins when a reference table repeats a join key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateKeyPolicy {
    /// Last-loaded row wins
    #[default]
    #[value(alias = "last-wins")]
    Last,
    /// First-loaded row wins
    #[value(alias = "first-wins")]
    First,
}

impl fmt::Display for DuplicateKeyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicateKeyPolicy::Last => f.write_str("last"),
            DuplicateKeyPolicy::First => f.write_str("first"),
        }
    }
}

/// Identity of an index within one run
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexKey {
    pub table: String,
    pub key_column: String,
    pub value_column: String,
}

impl IndexKey {
    pub fn new(table: &str, key_column: &str, value_column: &str) -> Self {
        Self {
            table: table.to_string(),
            key_column: key_column.to_string(),
            value_column: value_column.to_string(),
        }
    }
}

/// Exact-string lookup from a key column to a value column
#[derive(Debug, Clone)]
pub struct AnnotationIndex {
    key: IndexKey,
    entries: HashMap<String, Cell>,
    collisions: Vec<String>,
}

impl AnnotationIndex {
    /// Build an index over `table`
    ///
    /// Rows with a missing key are skipped. Repeated keys are resolved by
    /// `policy` and reported as join-ambiguity warnings.
    ///
    /// # Errors
    /// `ProcessingError::Schema` when the key or value column is absent.
    pub fn build(
        table: &ReferenceTable,
        key_column: &str,
        value_column: &str,
        policy: DuplicateKeyPolicy,
    ) -> Result<Self, ProcessingError> {
        for column in [key_column, value_column] {
            if !table.has_column(column) {
                return Err(ProcessingError::schema(&table.name, column));
            }
        }

        let mut entries: HashMap<String, Cell> = HashMap::with_capacity(table.rows.len());
        let mut collisions = Vec::new();

        for row in &table.rows {
            let Some(key) = row.get_str(key_column) else {
                continue;
            };
            let value = row.get(value_column).cloned().unwrap_or(Cell::Missing);

            if let Some(existing) = entries.get(&key) {
                warn!(
                    "Join ambiguity in '{}': key '{}' repeated in column '{}' ({} value {:?}, {} value {:?}); {} row wins",
                    table.name,
                    key,
                    key_column,
                    value_column,
                    existing.to_string(),
                    value_column,
                    value.to_string(),
                    policy
                );
                if !collisions.contains(&key) {
                    collisions.push(key.clone());
                }
                if policy == DuplicateKeyPolicy::First {
                    continue;
                }
            }
            entries.insert(key, value);
        }

        debug!(
            "Built index {}[{} → {}] with {} keys",
            table.name,
            key_column,
            value_column,
            entries.len()
        );

        Ok(Self {
            key: IndexKey::new(&table.name, key_column, value_column),
            entries,
            collisions,
        })
    }

    /// Raw lookup: `None` is a join miss
    pub fn lookup(&self, key: &str) -> Option<&Cell> {
        self.entries.get(key)
    }

    /// Value to write for `key`; misses and missing values resolve to `"-"`
    pub fn resolve(&self, key: Option<&str>) -> Cell {
        match key.and_then(|k| self.lookup(k)) {
            Some(Cell::Missing) | None => Cell::text(JOIN_MISS),
            Some(value) => value.clone(),
        }
    }

    /// Keys that appeared more than once in the key column
    pub fn collisions(&self) -> &[String] {
        &self.collisions
    }

    pub fn key(&self) -> &IndexKey {
        &self.key
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Indices built once per run and shared read-only across streams
#[derive(Debug, Clone, Default)]
pub struct IndexCache {
    policy: DuplicateKeyPolicy,
    indices: HashMap<IndexKey, AnnotationIndex>,
}

impl IndexCache {
    pub fn new(policy: DuplicateKeyPolicy) -> Self {
        Self {
            policy,
            indices: HashMap::new(),
        }
    }

    /// Build the index for `(table, key_column, value_column)` unless it
    /// already exists, and return it
    pub fn ensure(
        &mut self,
        tables: &ReferenceTables,
        table: &str,
        key_column: &str,
        value_column: &str,
    ) -> Result<&AnnotationIndex, ProcessingError> {
        let key = IndexKey::new(table, key_column, value_column);
        if !self.indices.contains_key(&key) {
            let reference = tables
                .get(table)
                .ok_or_else(|| ProcessingError::MissingReference(table.to_string()))?;
            let index = AnnotationIndex::build(reference, key_column, value_column, self.policy)?;
            self.indices.insert(key.clone(), index);
        }
        self.indices
            .get(&key)
            .ok_or_else(|| ProcessingError::MissingReference(table.to_string()))
    }

    /// Add an index built outside the reference tables, e.g. from the
    /// significance lookup
    pub fn insert(&mut self, index: AnnotationIndex) {
        self.indices.insert(index.key().clone(), index);
    }

    pub fn get(&self, table: &str, key_column: &str, value_column: &str) -> Option<&AnnotationIndex> {
        self.indices.get(&IndexKey::new(table, key_column, value_column))
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}
