// ==============================================================================
// validator.rs - Input File Validation
// ==============================================================================
// Description: Validates laboratory exports and reference files before parsing
//              (size, type, format) and fingerprints them with SHA-256
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-10-16
// Version: 2.0.0
// Security: Allowlist-only file types, magic number verification
// ==============================================================================

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::{debug, info};

const MAX_FILE_SIZE: u64 = 500 * 1024 * 1024; // 500 MB

const GZIP_MAGIC: [u8; 3] = [0x1f, 0x8b, 0x08];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedFile {
    pub original_name: String,
    pub extension: String,
    pub size: u64,
    pub hash_sha256: String,
}

pub struct FileValidator {
    max_file_size: u64,
    allowed_types: HashMap<&'static str, &'static [u8]>,
}

impl FileValidator {
    pub fn new() -> Self {
        let mut allowed_types: HashMap<&'static str, &'static [u8]> = HashMap::new();

        // Laboratory exports and reference tables (plain text, no magic number)
        allowed_types.insert("csv", &[]);
        allowed_types.insert("tsv", &[]);
        allowed_types.insert("txt", &[]);
        allowed_types.insert("vcf", &[]);

        // Gzip/BGZF compressed variants
        allowed_types.insert("csv.gz", &GZIP_MAGIC);
        allowed_types.insert("tsv.gz", &GZIP_MAGIC);
        allowed_types.insert("txt.gz", &GZIP_MAGIC);
        allowed_types.insert("vcf.gz", &GZIP_MAGIC);

        Self {
            max_file_size: MAX_FILE_SIZE,
            allowed_types,
        }
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn validate(&self, file_path: &Path) -> Result<ValidatedFile> {
        let file_name = file_path
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("Invalid file path: {}", file_path.display()))?
            .to_string_lossy()
            .to_string();

        info!("Validating file: {}", file_name);

        // 1. Size check
        let metadata = std::fs::metadata(file_path)
            .with_context(|| format!("Failed to get file metadata for {}", file_path.display()))?;
        let size = metadata.len();

        if size > self.max_file_size {
            anyhow::bail!(
                "File too large: {} bytes (max: {} bytes)",
                size,
                self.max_file_size
            );
        }
        debug!("Size check passed: {} bytes", size);

        // 2. Extension check (allowlist)
        let ext = self.get_extension(&file_name)?;
        let expected_magic = self
            .allowed_types
            .get(ext.as_str())
            .ok_or_else(|| anyhow::anyhow!("Invalid file type: {}", ext))?;
        debug!("Extension check passed: {}", ext);

        // 3. Magic number verification
        if !expected_magic.is_empty() {
            let actual_magic = self.read_magic_number(file_path)?;
            if !self.verify_magic_number(expected_magic, &actual_magic) {
                anyhow::bail!("Magic number mismatch for .{} file", ext);
            }
            debug!("Magic number check passed");
        }

        // 4. Content validation (basic format check)
        self.validate_content(file_path, &ext)
            .with_context(|| format!("Content check failed for {}", file_name))?;
        debug!("Content validation passed");

        // 5. Compute SHA-256 hash
        let hash = self.compute_sha256(file_path)?;
        debug!("SHA-256: {}", hash);

        Ok(ValidatedFile {
            original_name: file_name,
            extension: ext,
            size,
            hash_sha256: hash,
        })
    }

    fn get_extension(&self, filename: &str) -> Result<String> {
        let lower = filename.to_lowercase();

        // Compound extensions like .vcf.gz
        if let Some(stem) = lower.strip_suffix(".gz") {
            let inner = stem
                .rsplit_once('.')
                .map(|(_, ext)| ext)
                .ok_or_else(|| anyhow::anyhow!("No file extension found before .gz"))?;
            return Ok(format!("{}.gz", inner));
        }

        lower
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_string())
            .ok_or_else(|| anyhow::anyhow!("No file extension found"))
    }

    fn read_magic_number(&self, path: &Path) -> Result<Vec<u8>> {
        let mut file = File::open(path)?;
        let mut buffer = vec![0u8; 4];
        file.read_exact(&mut buffer)
            .context("File too short to carry a magic number")?;
        Ok(buffer)
    }

    fn verify_magic_number(&self, expected: &[u8], actual: &[u8]) -> bool {
        expected.len() <= actual.len()
            && expected.iter().zip(actual.iter()).all(|(e, a)| e == a)
    }

    fn validate_content(&self, path: &Path, ext: &str) -> Result<()> {
        let file = File::open(path)?;
        let reader: Box<dyn BufRead> = if ext.ends_with(".gz") {
            Box::new(BufReader::new(GzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };

        match ext.trim_end_matches(".gz") {
            "vcf" => self.validate_vcf_format(reader),
            _ => self.validate_table_format(reader),
        }
    }

    /// First non-empty line must be a header naming at least two columns
    fn validate_table_format(&self, reader: Box<dyn BufRead>) -> Result<()> {
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if !line.contains(',') && !line.contains('\t') {
                anyhow::bail!("Invalid table format: header has a single column");
            }
            return Ok(());
        }
        anyhow::bail!("Table file is empty")
    }

    fn validate_vcf_format(&self, reader: Box<dyn BufRead>) -> Result<()> {
        let mut lines = reader.lines();

        // First line should be ##fileformat=VCFv4.x
        let first_line = lines
            .next()
            .ok_or_else(|| anyhow::anyhow!("VCF file is empty"))??;

        if !first_line.starts_with("##fileformat=VCFv4.") {
            anyhow::bail!("Invalid VCF format: missing fileformat header");
        }

        Ok(())
    }

    fn compute_sha256(&self, path: &Path) -> Result<String> {
        let mut file = File::open(path)?;
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; 8192];

        loop {
            let n = file.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        Ok(format!("{:x}", hasher.finalize()))
    }
}

impl Default for FileValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_get_extension() {
        let validator = FileValidator::new();

        assert_eq!(validator.get_extension("clinvar.vcf.gz").unwrap(), "vcf.gz");
        assert_eq!(validator.get_extension("Reported_Variants.CSV").unwrap(), "csv");
        assert_eq!(validator.get_extension("bands.tsv.gz").unwrap(), "tsv.gz");
        assert!(validator.get_extension("README").is_err());
    }

    #[test]
    fn test_validate_csv() {
        let validator = FileValidator::new();

        let mut temp_file = Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(temp_file, "Gene,Driver,Entities").unwrap();
        writeln!(temp_file, "TP53,Yes,Many").unwrap();
        temp_file.flush().unwrap();

        let validated = validator.validate(temp_file.path()).unwrap();
        assert_eq!(validated.extension, "csv");
        assert_eq!(validated.hash_sha256.len(), 64);
    }

    #[test]
    fn test_rejects_disallowed_extension() {
        let validator = FileValidator::new();
        let mut temp_file = Builder::new().suffix(".xlsx").tempfile().unwrap();
        writeln!(temp_file, "binary").unwrap();

        let err = validator.validate(temp_file.path()).unwrap_err();
        assert!(err.to_string().contains("Invalid file type"));
    }

    #[test]
    fn test_rejects_fake_gzip() {
        let validator = FileValidator::new();
        let mut temp_file = Builder::new().suffix(".vcf.gz").tempfile().unwrap();
        writeln!(temp_file, "##fileformat=VCFv4.2").unwrap();
        temp_file.flush().unwrap();

        let err = validator.validate(temp_file.path()).unwrap_err();
        assert!(err.to_string().contains("Magic number mismatch"));
    }

    #[test]
    fn test_validate_gzipped_vcf() {
        let validator = FileValidator::new();
        let temp_file = Builder::new().suffix(".vcf.gz").tempfile().unwrap();
        let mut encoder = GzEncoder::new(temp_file.reopen().unwrap(), Compression::default());
        writeln!(encoder, "##fileformat=VCFv4.1").unwrap();
        encoder.finish().unwrap();

        assert!(validator.validate(temp_file.path()).is_ok());
    }

    #[test]
    fn test_size_limit() {
        let validator = FileValidator::new().with_max_file_size(4);
        let mut temp_file = Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(temp_file, "Gene,Cyto").unwrap();
        temp_file.flush().unwrap();

        assert!(validator.validate(temp_file.path()).is_err());
    }
}
