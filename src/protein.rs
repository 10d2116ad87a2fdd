// ==============================================================================
// protein.rs - HGVS Protein Notation Helpers
// ==============================================================================
// Description: CDS/protein change splitting, amino acid code conversion and
//              hotspot key truncation
// Author: Matt Barham
// Created: 2026-10-13
// Modified: 2026-10-15
// Version: 1.0.0
// ==============================================================================
// Examples:
//   "c.181C>A;p.Gln61Lys"  → ("c.181C>A", Some("p.Gln61Lys"))
//   "p.Gln61Lys"           → "p.Q61K"
//   "NRAS:p.Q61K"          → "NRAS:p.Q61"   (hotspot lookup key)
// Unknown three-letter codes pass through unchanged.
// ==============================================================================

use regex::Regex;
use std::sync::LazyLock;

/// Three-letter → one-letter amino acid codes
const AMINO_ACIDS: &[(&str, &str)] = &[
    ("Ala", "A"),
    ("Arg", "R"),
    ("Asn", "N"),
    ("Asp", "D"),
    ("Cys", "C"),
    ("Gln", "Q"),
    ("Glu", "E"),
    ("Gly", "G"),
    ("His", "H"),
    ("Ile", "I"),
    ("Leu", "L"),
    ("Lys", "K"),
    ("Met", "M"),
    ("Phe", "F"),
    ("Pro", "P"),
    ("Ser", "S"),
    ("Thr", "T"),
    ("Trp", "W"),
    ("Tyr", "Y"),
    ("Val", "V"),
    ("Sec", "U"),
    ("Pyl", "O"),
    ("Ter", "*"),
];

static THREE_LETTER_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z][a-z]{2}").expect("Invalid amino acid regex"));

/// Gene-qualified protein change up to the end of the first position digits
static HOTSPOT_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":p\.[A-Za-z*]+[0-9]+").expect("Invalid hotspot regex"));

/// One-letter code for a three-letter amino acid code
pub fn one_letter_code(code: &str) -> Option<&'static str> {
    AMINO_ACIDS
        .iter()
        .find(|(three, _)| *three == code)
        .map(|(_, one)| *one)
}

/// Convert every recognised three-letter amino acid code in a protein
/// change to its one-letter form
///
/// # Examples
/// ```
/// use variant_report_processor::protein::convert_three_to_one;
///
/// assert_eq!(convert_three_to_one("p.Gln61Lys"), "p.Q61K");
/// assert_eq!(convert_three_to_one("p.Arg213Ter"), "p.R213*");
/// assert_eq!(convert_three_to_one("p.Leu858Arg"), "p.L858R");
/// // Unknown codes are left as they are
/// assert_eq!(convert_three_to_one("p.Xyz12Ala"), "p.Xyz12A");
/// ```
pub fn convert_three_to_one(protein_change: &str) -> String {
    THREE_LETTER_CODE
        .replace_all(protein_change, |caps: &regex::Captures| {
            let code = &caps[0];
            one_letter_code(code).unwrap_or(code).to_string()
        })
        .into_owned()
}

/// Split a `CDS change and protein change` value at the first `;p`
///
/// Returns the c. part and, when present, the p. part without its
/// leading separator.
pub fn split_cds_protein(value: &str) -> (String, Option<String>) {
    match value.find(";p") {
        Some(idx) => (value[..idx].to_string(), Some(value[idx + 1..].to_string())),
        None => (value.to_string(), None),
    }
}

/// Truncate a gene-qualified protein change after its first position,
/// e.g. `NRAS:p.Gln61Arg` → `NRAS:p.Gln61`. Values not matching the
/// pattern are returned unchanged.
pub fn hotspot_key(protein_change: &str) -> String {
    match HOTSPOT_PREFIX.find(protein_change) {
        Some(m) => protein_change[..m.end()].to_string(),
        None => protein_change.to_string(),
    }
}
