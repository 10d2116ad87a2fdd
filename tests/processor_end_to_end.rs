// ==============================================================================
// processor_end_to_end.rs - Processor Integration Tests
// ==============================================================================
// Description: File-driven runs from exports on disk to written outputs
// Author: Matt Barham
// Created: 2026-10-17
// Modified: 2026-10-17
// Version: 1.0.0
// ==============================================================================

mod common;

use std::io::Write;
use std::path::Path;

use common::{Fixture, COSMIC, CYTO, EMPTY_PANEL, HOTSPOTS, REPORTED_VARIANTS, SIGNIFICANCE, STRUCTURAL_VARIANTS};
use variant_report_processor::annotation_index::DuplicateKeyPolicy;
use variant_report_processor::output::OutputFormat;
use variant_report_processor::processor::{ProcessorConfig, ReportProcessor};
use variant_report_processor::reference_panel::CancerPanel;

const QC_SUMMARY: Fixture = Fixture {
    name: "summary",
    columns: &["Metric", "Value"],
    rows: &[
        &["Sample type", "Tumour"],
        &["Total number of somatic non-synonymous small variants per megabase (coding region)", "7.4"],
    ],
};

fn write_inputs(dir: &Path, significance: &str) -> ProcessorConfig {
    let panel_dir = dir.join("panels");
    std::fs::create_dir_all(&panel_dir).unwrap();
    for panel in CancerPanel::ALL {
        let fixture = if panel == CancerPanel::Cosmic { &COSMIC } else { &EMPTY_PANEL };
        fixture.write_csv(&panel_dir, &format!("{}.csv", panel.table_name()));
    }

    ProcessorConfig {
        reported_variants: REPORTED_VARIANTS.write_csv(dir, "Reported_Variants.csv"),
        structural_variants: STRUCTURAL_VARIANTS.write_csv(dir, "Reported_Structural_Variants.csv"),
        panel_dir,
        hotspots: HOTSPOTS.write_csv(dir, "hotspots.csv"),
        cyto_bands: CYTO.write_csv(dir, "cyto.csv"),
        significance: dir.join(significance),
        qc_dir: None,
        output_dir: dir.join("out"),
        output_prefix: "patient1".into(),
        formats: vec![OutputFormat::Json, OutputFormat::Csv],
        policy: DuplicateKeyPolicy::Last,
    }
}

fn write_clinvar_vcf(path: &Path) {
    let mut file = std::fs::File::create(path).unwrap();
    writeln!(file, "##fileformat=VCFv4.1").unwrap();
    writeln!(file, "##INFO=<ID=CLNSIG,Number=.,Type=String,Description=\"Clinical significance\">").unwrap();
    writeln!(file, "##INFO=<ID=AF_EXAC,Number=1,Type=Float,Description=\"ExAC allele frequency\">").unwrap();
    writeln!(file, "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO").unwrap();
    writeln!(file, "13\t32340300\t12347\tC\tT\t.\t.\tAF_EXAC=0.00001;CLNSIG=Likely_pathogenic").unwrap();
}

#[test]
fn processes_exports_into_csv_and_json() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_inputs(dir.path(), "clinvar_subset.csv");
    SIGNIFICANCE.write_csv(dir.path(), "clinvar_subset.csv");

    let outcome = ReportProcessor::new(config).process().unwrap();

    assert_eq!(outcome.row_counts["Germline"], 1);
    assert_eq!(outcome.row_counts["SNV"], 3);
    assert_eq!(outcome.row_counts["Gain"], 1);
    assert_eq!(outcome.row_counts["Loss"], 1);
    assert_eq!(outcome.row_counts["SV"], 2);
    assert_eq!(outcome.files[&OutputFormat::Csv].len(), 5);

    let gain = std::fs::read_to_string(dir.path().join("out/patient1_gain.csv")).unwrap();
    assert!(gain.contains("\"2,500,000\""));

    let germline = std::fs::read_to_string(dir.path().join("out/patient1_germline.csv")).unwrap();
    assert!(germline.contains("Pathogenic"));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("out/patient1.json")).unwrap()).unwrap();
    assert_eq!(json["metadata"]["duplicate_key_policy"], "last");
    assert_eq!(json["batches"]["germline"]["status"], "variants");
    assert_eq!(json["metadata"]["input_files"]["reported_variants"]["sha256"].as_str().unwrap().len(), 64);
    assert!(json["metadata"]["input_files"]["panel:cosmic"].is_object());
}

#[test]
fn resolves_significance_from_clinvar_vcf() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_inputs(dir.path(), "clinvar.vcf");
    write_clinvar_vcf(&dir.path().join("clinvar.vcf"));

    ReportProcessor::new(config).process().unwrap();

    let germline = std::fs::read_to_string(dir.path().join("out/patient1_germline.csv")).unwrap();
    assert!(germline.contains("Likely pathogenic"));
}

#[test]
fn writes_qc_cells_when_tables_supplied() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = write_inputs(dir.path(), "clinvar_subset.csv");
    SIGNIFICANCE.write_csv(dir.path(), "clinvar_subset.csv");

    let qc_dir = dir.path().join("qc");
    std::fs::create_dir_all(&qc_dir).unwrap();
    QC_SUMMARY.write_csv(&qc_dir, "summary.csv");
    config.qc_dir = Some(qc_dir);

    let outcome = ReportProcessor::new(config).process().unwrap();
    assert_eq!(outcome.files[&OutputFormat::Csv].len(), 6);

    let qc = std::fs::read_to_string(dir.path().join("out/patient1_qc.csv")).unwrap();
    assert!(qc.starts_with("row,column,value"));
    assert!(qc.contains("7.4"));
}

#[test]
fn invalid_export_is_rejected_before_parsing() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = write_inputs(dir.path(), "clinvar_subset.csv");
    SIGNIFICANCE.write_csv(dir.path(), "clinvar_subset.csv");

    let bogus = dir.path().join("Reported_Variants.xlsx");
    std::fs::write(&bogus, b"PK\x03\x04").unwrap();
    config.reported_variants = bogus;

    let err = ReportProcessor::new(config).process().unwrap_err();
    assert!(format!("{:#}", err).contains("Invalid file type"));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn schema_error_aborts_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = write_inputs(dir.path(), "clinvar_subset.csv");
    SIGNIFICANCE.write_csv(dir.path(), "clinvar_subset.csv");

    let truncated = Fixture {
        name: "Reported_Variants",
        columns: &["Origin", "Gene"],
        rows: &[&["Somatic", "NRAS"]],
    };
    config.reported_variants = truncated.write_csv(dir.path(), "Truncated.csv");

    let err = ReportProcessor::new(config).process().unwrap_err();
    assert!(format!("{:#}", err).contains("required column"));
    assert!(!dir.path().join("out").exists());
}
