// ==============================================================================
// processor.rs - Report Processing Job
// ==============================================================================
// Description: Validates and loads laboratory exports and reference files,
//              runs the normalization pipeline and writes the report outputs
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-10-17
// Version: 3.0.0
// ==============================================================================

use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::annotation_index::DuplicateKeyPolicy;
use crate::cell_source::{qc_layout, ExtractedTables};
use crate::output::{row_counts, InputFingerprint, OutputFormat, OutputGenerator, OutputMetadata, ReportOutput};
use crate::parsers::{ClinvarVcfLookup, RawTable, TableParser};
use crate::pipeline::{Pipeline, PipelineInputs};
use crate::reference_panel::{CancerPanel, ReferenceTables};
use crate::significance::{SignificanceLookup, TableSignificanceLookup};
use crate::validator::{FileValidator, ValidatedFile};

/// Table file extensions probed when looking up a named reference table
const TABLE_EXTENSIONS: [&str; 6] = ["csv", "tsv", "txt", "csv.gz", "tsv.gz", "txt.gz"];

/// Everything one processing job needs
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub reported_variants: PathBuf,
    pub structural_variants: PathBuf,
    /// Directory holding one table per cancer gene group
    pub panel_dir: PathBuf,
    pub hotspots: PathBuf,
    pub cyto_bands: PathBuf,
    /// ClinVar VCF (`.vcf`/`.vcf.gz`) or a pre-resolved significance table
    pub significance: PathBuf,
    /// Directory of extracted QC tables, when a QC sheet is wanted
    pub qc_dir: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub output_prefix: String,
    pub formats: Vec<OutputFormat>,
    pub policy: DuplicateKeyPolicy,
}

/// Where clinical significance comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignificanceSource {
    ClinvarVcf(PathBuf),
    Table(PathBuf),
}

impl SignificanceSource {
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if name.ends_with(".vcf") || name.ends_with(".vcf.gz") {
            SignificanceSource::ClinvarVcf(path.to_path_buf())
        } else {
            SignificanceSource::Table(path.to_path_buf())
        }
    }
}

/// Result of a finished job
#[derive(Debug, Clone)]
pub struct ProcessingOutcome {
    pub row_counts: BTreeMap<String, usize>,
    pub files: HashMap<OutputFormat, Vec<PathBuf>>,
}

pub struct ReportProcessor {
    config: ProcessorConfig,
    validator: FileValidator,
    parser: TableParser,
}

impl ReportProcessor {
    pub fn new(config: ProcessorConfig) -> Self {
        Self {
            config,
            validator: FileValidator::new(),
            parser: TableParser::new(),
        }
    }

    pub fn with_validator(mut self, validator: FileValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Main processing job
    pub fn process(&self) -> Result<ProcessingOutcome> {
        info!("Starting report processing: {}", self.config.output_prefix);
        info!("Duplicate key policy: {}", self.config.policy);

        // 1. Validate and fingerprint every input
        let mut fingerprints = BTreeMap::new();

        let reported = self.validate("reported_variants", &self.config.reported_variants, &mut fingerprints)?;
        let structural = self.validate("structural_variants", &self.config.structural_variants, &mut fingerprints)?;
        debug!("Inputs validated: {} and {}", reported.original_name, structural.original_name);

        // 2. Load the laboratory exports
        let inputs = PipelineInputs {
            reported_variants: self.load_table(&self.config.reported_variants)?,
            structural_variants: self.load_table(&self.config.structural_variants)?,
        };

        // 3. Load reference tables
        let references = self.load_references(&mut fingerprints)?;
        info!("Loaded {} reference tables", references.len());

        // 4. Open the significance source
        self.validate("significance", &self.config.significance, &mut fingerprints)?;
        let significance: Box<dyn SignificanceLookup> = match SignificanceSource::from_path(&self.config.significance) {
            SignificanceSource::ClinvarVcf(path) => {
                info!("Resolving clinical significance from ClinVar VCF: {:?}", path);
                Box::new(ClinvarVcfLookup::new(path))
            }
            SignificanceSource::Table(path) => {
                info!("Resolving clinical significance from table: {:?}", path);
                let table = self.load_table(&path)?;
                Box::new(
                    TableSignificanceLookup::from_table(&table)
                        .with_context(|| format!("Invalid significance table {}", path.display()))?,
                )
            }
        };

        // 5. Run the pipeline
        let batches = Pipeline::new(&references, significance.as_ref())
            .with_policy(self.config.policy)
            .run(&inputs)
            .context("Report pipeline failed")?;

        let counts = row_counts(&batches);
        info!("Pipeline complete: {:?}", counts);

        // 6. Resolve the QC sheet
        let metadata = OutputMetadata {
            report_name: self.config.output_prefix.clone(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            duplicate_key_policy: self.config.policy.to_string(),
            input_files: fingerprints,
            row_counts: counts.clone(),
        };
        let mut output = ReportOutput::new(metadata, batches);

        if let Some(qc_dir) = &self.config.qc_dir {
            let tables = self.load_extracted_tables(qc_dir)?;
            output.qc_cells = qc_layout().resolve(&tables);
            info!("Resolved {} QC cells from {} tables", output.qc_cells.len(), tables.len());
        }

        // 7. Write outputs
        let generator = OutputGenerator::new(&self.config.output_dir, &self.config.output_prefix);
        let files = generator
            .generate(&output, &self.config.formats)
            .context("Failed to write report outputs")?;

        info!("Processing complete, outputs in {:?}", self.config.output_dir);
        Ok(ProcessingOutcome {
            row_counts: counts,
            files,
        })
    }

    fn validate(
        &self,
        role: &str,
        path: &Path,
        fingerprints: &mut BTreeMap<String, InputFingerprint>,
    ) -> Result<ValidatedFile> {
        let validated = self
            .validator
            .validate(path)
            .with_context(|| format!("Validation failed for {} file {}", role, path.display()))?;
        fingerprints.insert(role.to_string(), InputFingerprint::from(&validated));
        Ok(validated)
    }

    fn load_table(&self, path: &Path) -> Result<RawTable> {
        let table = self
            .parser
            .parse(path)
            .with_context(|| format!("Failed to parse table {}", path.display()))?;
        debug!("Parsed {} rows from {:?}", table.rows.len(), path);
        Ok(table)
    }

    fn load_references(&self, fingerprints: &mut BTreeMap<String, InputFingerprint>) -> Result<ReferenceTables> {
        let mut references = ReferenceTables::new();

        for panel in CancerPanel::ALL {
            let Some(path) = find_table_file(&self.config.panel_dir, panel.table_name()) else {
                warn!(
                    "No {} gene group table in {:?}; joins against it will fail",
                    panel.table_name(),
                    self.config.panel_dir
                );
                continue;
            };
            self.validate(&format!("panel:{}", panel.table_name()), &path, fingerprints)?;
            let raw = self.load_table(&path)?;
            references
                .load_panel(panel, &raw)
                .with_context(|| format!("Invalid gene group table {}", path.display()))?;
        }

        self.validate("hotspots", &self.config.hotspots, fingerprints)?;
        let hotspots = self.load_table(&self.config.hotspots)?;
        references
            .load_hotspots(&hotspots)
            .with_context(|| format!("Invalid hotspots table {}", self.config.hotspots.display()))?;

        self.validate("cyto_bands", &self.config.cyto_bands, fingerprints)?;
        let cyto = self.load_table(&self.config.cyto_bands)?;
        references
            .load_cyto(&cyto)
            .with_context(|| format!("Invalid cytogenetic band table {}", self.config.cyto_bands.display()))?;

        Ok(references)
    }

    /// Every table file in `dir`, named by file stem, in file name order
    fn load_extracted_tables(&self, dir: &Path) -> Result<ExtractedTables> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read QC table directory {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && table_stem(path).is_some())
            .collect();
        paths.sort();

        let mut tables = ExtractedTables::new();
        for path in paths {
            let mut table = self.load_table(&path)?;
            if let Some(stem) = table_stem(&path) {
                table.name = stem;
            }
            tables.insert(table);
        }
        Ok(tables)
    }
}

/// File name without its table extension, if it carries one
fn table_stem(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy().to_string();
    TABLE_EXTENSIONS
        .iter()
        .rev()
        .find_map(|ext| name.strip_suffix(&format!(".{}", ext)).map(str::to_string))
}

/// `<dir>/<stem>.<ext>` for the first table extension that exists
fn find_table_file(dir: &Path, stem: &str) -> Option<PathBuf> {
    TABLE_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", stem, ext)))
        .find(|path| path.is_file())
}
