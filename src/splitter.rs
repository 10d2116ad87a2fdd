// ==============================================================================
// splitter.rs - Compound Field Splitter
// ==============================================================================
// Description: Splits delimited compound fields into fixed or discovered sub-columns
// Author: Matt Barham
// Created: 2026-10-13
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================
// Two modes:
//   Fixed       value → exactly two target columns (c./p., VAF/LOH, bands)
//   Discovered  pass 1: k = max delimiter count over the batch
//               pass 2: every value → k+1 parts, short splits padded with ""
// ==============================================================================

use tracing::{debug, warn};

use crate::models::{Cell, Record};

/// Delimiter used to split a compound field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// A literal separator such as ";" or "|"
    Literal(&'static str),
    /// Any of several characters, e.g. the parentheses in "GAIN(4)"
    AnyOf(&'static [char]),
}

impl Delimiter {
    /// Number of delimiter occurrences in `value`
    pub fn count(&self, value: &str) -> usize {
        match self {
            Delimiter::Literal(sep) => value.matches(sep).count(),
            Delimiter::AnyOf(chars) => value.chars().filter(|c| chars.contains(c)).count(),
        }
    }

    /// Split on every occurrence
    pub fn split<'a>(&self, value: &'a str) -> Vec<&'a str> {
        match self {
            Delimiter::Literal(sep) => value.split(sep).collect(),
            Delimiter::AnyOf(chars) => value.split(|c: char| chars.contains(&c)).collect(),
        }
    }

    /// Re-join parts; `AnyOf` uses its first character
    pub fn join(&self, parts: &[&str]) -> String {
        match self {
            Delimiter::Literal(sep) => parts.join(*sep),
            Delimiter::AnyOf(chars) => {
                let sep = chars.first().map(|c| c.to_string()).unwrap_or_default();
                parts.join(&sep)
            }
        }
    }
}

/// Naming of the sub-columns produced by a discovered split
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubColumns {
    /// `Gene` → `Gene_1 .. Gene_{k+1}`; the source field is left untouched
    Positional(&'static str),
    /// `Type` keeps the first part, the rest go to `Fusion_1 .. Fusion_k`
    HeadAndTail(&'static str),
}

/// Split `field` into exactly two target columns
///
/// Literal delimiters split at the first occurrence only, so the second
/// target receives the remainder. Character-set delimiters keep the first two
/// pieces. Values without a delimiter put a missing value in the second
/// target; a missing source leaves both targets missing. `targets[0]` may be
/// the source field itself.
pub fn split_fixed(records: &mut [Record], field: &str, delimiter: Delimiter, targets: [&str; 2]) {
    for record in records.iter_mut() {
        let Some(value) = record.get_str(field) else {
            record.set(targets[0], Cell::Missing);
            record.set(targets[1], Cell::Missing);
            continue;
        };

        let (first, second) = match delimiter {
            Delimiter::Literal(sep) => match value.split_once(sep) {
                Some((head, tail)) => (head.to_string(), Some(tail.to_string())),
                None => (value.clone(), None),
            },
            Delimiter::AnyOf(_) => {
                let parts = delimiter.split(&value);
                if parts.iter().skip(2).any(|p| !p.trim().is_empty()) {
                    warn!(
                        "Row {}: '{}' value {:?} has more than two parts, extra parts dropped",
                        record.row, field, value
                    );
                }
                (
                    parts[0].to_string(),
                    parts.get(1).map(|p| p.to_string()),
                )
            }
        };

        record.set(targets[0], Cell::Text(first));
        record.set(targets[1], second.map(Cell::Text).unwrap_or(Cell::Missing));
    }
}

/// First pass of a discovered split: the maximum delimiter count `k`
/// across all records. Missing values count as zero.
pub fn discover_cardinality(records: &[Record], field: &str, delimiter: Delimiter) -> usize {
    records
        .iter()
        .filter_map(|record| record.get_str(field))
        .map(|value| delimiter.count(&value))
        .max()
        .unwrap_or(0)
}

/// Names of the sub-columns a discovered split with cardinality `k` creates
pub fn sub_column_names(naming: SubColumns, k: usize) -> Vec<String> {
    if k == 0 {
        return Vec::new();
    }
    match naming {
        SubColumns::Positional(prefix) => (1..=k + 1).map(|i| format!("{}_{}", prefix, i)).collect(),
        SubColumns::HeadAndTail(prefix) => (1..=k).map(|i| format!("{}_{}", prefix, i)).collect(),
    }
}

/// Second pass of a discovered split
///
/// Splits every record's `field` into `k + 1` parts, where `k` comes from
/// [`discover_cardinality`]. Records with fewer delimiters get empty strings
/// in their trailing sub-columns. `k == 0` means nothing needs splitting and
/// no columns are created.
///
/// Returns the names of the created sub-columns.
pub fn split_discovered(
    records: &mut [Record],
    field: &str,
    delimiter: Delimiter,
    naming: SubColumns,
) -> Vec<String> {
    let k = discover_cardinality(records, field, delimiter);
    let names = sub_column_names(naming, k);
    if k == 0 {
        debug!("'{}' has no '{:?}' delimiters, no split needed", field, delimiter);
        return names;
    }

    debug!("'{}' discovered cardinality {} ({} sub-columns)", field, k + 1, names.len());

    for record in records.iter_mut() {
        let parts: Vec<Cell> = match record.get_str(field) {
            Some(value) => {
                let mut parts: Vec<Cell> = delimiter
                    .split(&value)
                    .into_iter()
                    .map(|p| Cell::Text(p.to_string()))
                    .collect();
                parts.resize(k + 1, Cell::empty());
                parts
            }
            None => vec![Cell::Missing; k + 1],
        };

        match naming {
            SubColumns::Positional(_) => {
                for (name, part) in names.iter().zip(parts) {
                    record.set(name.clone(), part);
                }
            }
            SubColumns::HeadAndTail(_) => {
                let mut parts = parts.into_iter();
                if let Some(head) = parts.next() {
                    record.set(field, head);
                }
                for (name, part) in names.iter().zip(parts) {
                    record.set(name.clone(), part);
                }
            }
        }
    }

    names
}

/// Paired-read and split-read counts from a `Confidence/support` value
/// such as `"PR: 12; SR: 5"`, with the `PR`/`SR` prefixes removed.
pub fn split_read_support(value: &Cell) -> (Cell, Cell) {
    let Some(text) = value.as_key() else {
        return (Cell::empty(), Cell::empty());
    };

    let mut paired = Cell::empty();
    let mut split = Cell::empty();

    for part in text.split([';', ',']) {
        let part = part.trim();
        let upper = part.to_uppercase();
        if let Some(rest) = strip_read_prefix(part, &upper, "PR") {
            paired = Cell::Text(rest);
        } else if let Some(rest) = strip_read_prefix(part, &upper, "SR") {
            split = Cell::Text(rest);
        }
    }

    (paired, split)
}

fn strip_read_prefix(part: &str, upper: &str, prefix: &str) -> Option<String> {
    if !upper.starts_with(prefix) {
        return None;
    }
    let rest = part[prefix.len()..].trim_start_matches([':', '=', ' ', '-']);
    Some(rest.trim().to_string())
}
