// ==============================================================================
// parsers/clinvar.rs - ClinVar VCF reader
// ==============================================================================
// Description: Resolves clinical significance for ClinVar IDs from a ClinVar
//              VCF release using noodles-vcf
// Author: Matt Barham
// Created: 2026-10-14
// Modified: 2026-10-17
// Version: 1.0.0
// ==============================================================================
// References:
// - ClinVar VCF: https://www.ncbi.nlm.nih.gov/clinvar/docs/maintenance_use/
// - noodles-vcf: https://docs.rs/noodles-vcf/0.81.0/noodles_vcf/
// ==============================================================================
// INFO keys used:
//   CLNSIGCONF   conflicting interpretations (preferred)
//   CLNSIG       aggregate significance (fallback)
//   AF_EXAC, AF_TGP, AF_ESP   population allele frequency, first present wins
// ==============================================================================

use noodles_vcf as vcf;
use noodles_vcf::variant::record::Ids;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::ProcessingError;
use crate::significance::{SignificanceLookup, SignificanceRecord};

const ALLELE_FREQUENCY_KEYS: [&str; 3] = ["AF_EXAC", "AF_TGP", "AF_ESP"];

/// ClinVar VCF parsing errors
#[derive(Error, Debug)]
pub enum ClinvarParseError {
    #[error("Failed to open ClinVar VCF: {0}")]
    FileOpenError(String),

    #[error("Failed to read ClinVar VCF header: {0}")]
    HeaderError(String),

    #[error("Too many unreadable ClinVar records ({0})")]
    TooManyErrors(usize),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Significance lookup backed by a ClinVar VCF (.vcf or bgzipped .vcf.gz)
#[derive(Debug, Clone)]
pub struct ClinvarVcfLookup {
    path: PathBuf,

    /// Maximum number of unreadable records before failing
    max_errors: usize,
}

impl ClinvarVcfLookup {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_errors: 1000,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Scan the VCF and return records whose ID is in `wanted`
    pub fn scan(&self, wanted: &HashSet<&str>) -> Result<Vec<SignificanceRecord>, ClinvarParseError> {
        let mut reader = vcf::io::reader::Builder::default()
            .build_from_path(&self.path)
            .map_err(|e| ClinvarParseError::FileOpenError(format!("{}: {}", self.path.display(), e)))?;

        reader
            .read_header()
            .map_err(|e| ClinvarParseError::HeaderError(e.to_string()))?;

        let mut found = Vec::new();
        let mut resolved: HashSet<String> = HashSet::new();
        let mut error_count = 0usize;

        for (line_num, result) in reader.records().enumerate() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    warn!("ClinVar line {}: failed to read record: {}", line_num + 1, e);
                    error_count += 1;
                    if error_count > self.max_errors {
                        return Err(ClinvarParseError::TooManyErrors(error_count));
                    }
                    continue;
                }
            };

            let ids = record.ids();
            let Some(id) = ids
                .iter()
                .find(|id| wanted.contains(id) && !resolved.contains(*id))
            else {
                continue;
            };

            // First record per ID wins
            resolved.insert(id.to_string());
            let (clnsigconf, allele_frequency) = parse_info(record.info().as_ref());
            found.push(SignificanceRecord {
                clinvar_id: id.to_string(),
                clnsigconf,
                allele_frequency,
            });

            if resolved.len() == wanted.len() {
                debug!("All {} ClinVar IDs resolved, stopping scan", wanted.len());
                break;
            }
        }

        Ok(found)
    }
}

impl SignificanceLookup for ClinvarVcfLookup {
    fn find(&self, ids: &[String]) -> Result<Vec<SignificanceRecord>, ProcessingError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let found = self
            .scan(&wanted)
            .map_err(|e| ProcessingError::Significance(e.to_string()))?;

        info!(
            "Resolved {}/{} ClinVar IDs from {}",
            found.len(),
            wanted.len(),
            self.path.display()
        );
        Ok(found)
    }
}

/// Clinical significance and allele frequency from a raw INFO string
pub fn parse_info(info: &str) -> (String, String) {
    let mut clnsigconf = None;
    let mut clnsig = None;
    let mut frequencies: Vec<(&str, &str)> = Vec::new();

    for field in info.split(';') {
        let Some((key, value)) = field.split_once('=') else {
            continue;
        };
        match key {
            "CLNSIGCONF" => clnsigconf = Some(value),
            "CLNSIG" => clnsig = Some(value),
            k if ALLELE_FREQUENCY_KEYS.contains(&k) => frequencies.push((k, value)),
            _ => {}
        }
    }

    let significance = clnsigconf
        .or(clnsig)
        .map(decode_info_value)
        .unwrap_or_default();

    let allele_frequency = ALLELE_FREQUENCY_KEYS
        .iter()
        .find_map(|wanted| frequencies.iter().find(|(k, _)| k == wanted))
        .map(|(k, v)| format!("{}={}", k, v))
        .unwrap_or_default();

    (significance, allele_frequency)
}

/// Undo VCF INFO escaping and underscores used in place of spaces
fn decode_info_value(value: &str) -> String {
    value
        .replace("%3B", ";")
        .replace("%2C", ",")
        .replace("%3D", "=")
        .replace('_', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_parse_info_prefers_conflicts() {
        let (sig, af) = parse_info(
            "ALLELEID=1;CLNSIG=Conflicting_interpretations_of_pathogenicity;CLNSIGCONF=Pathogenic(2)%2CUncertain_significance(1);AF_TGP=0.01;AF_EXAC=0.002",
        );
        assert_eq!(sig, "Pathogenic(2),Uncertain significance(1)");
        assert_eq!(af, "AF_EXAC=0.002");
    }

    #[test]
    fn test_parse_info_falls_back_to_clnsig() {
        let (sig, af) = parse_info("CLNSIG=Likely_pathogenic;AF_ESP=0.5");
        assert_eq!(sig, "Likely pathogenic");
        assert_eq!(af, "AF_ESP=0.5");

        let (sig, af) = parse_info(".");
        assert_eq!(sig, "");
        assert_eq!(af, "");
    }

    fn write_vcf() -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(".vcf").tempfile().unwrap();
        writeln!(file, "##fileformat=VCFv4.1").unwrap();
        writeln!(file, "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO").unwrap();
        writeln!(file, "1\t115256529\t13900\tT\tG\t.\t.\tCLNSIG=Pathogenic;AF_TGP=0.0002").unwrap();
        writeln!(file, "17\t7673802\t12347\tG\tA\t.\t.\tCLNSIG=Benign").unwrap();
        writeln!(file, "17\t7674220\t376651\tC\tT\t.\t.\tCLNSIG=Conflicting_interpretations_of_pathogenicity;CLNSIGCONF=Pathogenic(3)%2CLikely_pathogenic(1)").unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_lookup_finds_requested_ids() {
        let file = write_vcf();
        let lookup = ClinvarVcfLookup::new(file.path());

        let found = lookup
            .find(&["376651".to_string(), "13900".to_string(), "999".to_string()])
            .unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].clinvar_id, "13900");
        assert_eq!(found[0].clnsigconf, "Pathogenic");
        assert_eq!(found[0].allele_frequency, "AF_TGP=0.0002");
        assert_eq!(found[1].clinvar_id, "376651");
        assert_eq!(found[1].clnsigconf, "Pathogenic(3),Likely pathogenic(1)");
    }

    #[test]
    fn test_duplicate_id_rows_do_not_end_scan_early() {
        let mut file = Builder::new().suffix(".vcf").tempfile().unwrap();
        writeln!(file, "##fileformat=VCFv4.1").unwrap();
        writeln!(file, "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO").unwrap();
        writeln!(file, "1\t100\t13900\tT\tG\t.\t.\tCLNSIG=Pathogenic").unwrap();
        writeln!(file, "1\t101\t13900\tT\tC\t.\t.\tCLNSIG=Benign").unwrap();
        writeln!(file, "17\t200\t12347\tG\tA\t.\t.\tCLNSIG=Likely_benign").unwrap();
        file.flush().unwrap();

        let lookup = ClinvarVcfLookup::new(file.path());
        let found = lookup.find(&["13900".to_string(), "12347".to_string()]).unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].clinvar_id, "13900");
        assert_eq!(found[0].clnsigconf, "Pathogenic");
        assert_eq!(found[1].clinvar_id, "12347");
        assert_eq!(found[1].clnsigconf, "Likely benign");
    }

    #[test]
    fn test_lookup_with_no_ids_does_not_open_file() {
        let lookup = ClinvarVcfLookup::new("/nonexistent/clinvar.vcf.gz");
        assert!(lookup.find(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_is_significance_error() {
        let lookup = ClinvarVcfLookup::new("/nonexistent/clinvar.vcf.gz");
        let result = lookup.find(&["1".to_string()]);
        assert!(matches!(result, Err(ProcessingError::Significance(_))));
    }
}
