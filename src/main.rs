// ==============================================================================
// main.rs - Variant Report Processor Entry Point
// ==============================================================================
// Description: Command-line entry point for normalizing and annotating
//              laboratory variant exports into report batches
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-10-17
// Version: 2.0.0
// ==============================================================================

use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use variant_report_processor::annotation_index::DuplicateKeyPolicy;
use variant_report_processor::output::OutputFormat;
use variant_report_processor::processor::{ProcessorConfig, ReportProcessor};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Reported variants export (germline and somatic small variants)
    #[arg(long, env = "VRP_REPORTED_VARIANTS")]
    reported_variants: PathBuf,

    /// Reported structural variants export (gains, losses, fusions)
    #[arg(long, env = "VRP_STRUCTURAL_VARIANTS")]
    structural_variants: PathBuf,

    /// Directory of cancer gene group tables (cosmic, paed, sarc, neuro, ovarian, haem)
    #[arg(long, env = "VRP_PANEL_DIR", default_value = "/reference/panels")]
    panel_dir: PathBuf,

    /// Hotspot table
    #[arg(long, env = "VRP_HOTSPOTS", default_value = "/reference/hotspots.csv")]
    hotspots: PathBuf,

    /// Cytogenetic band table
    #[arg(long, env = "VRP_CYTO_BANDS", default_value = "/reference/cyto_bands.csv")]
    cyto_bands: PathBuf,

    /// ClinVar VCF or pre-resolved significance table
    #[arg(long, env = "VRP_CLINVAR", default_value = "/reference/clinvar.vcf.gz")]
    clinvar: PathBuf,

    /// Directory of extracted QC tables
    #[arg(long, env = "VRP_QC_DIR")]
    qc_dir: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, env = "VRP_OUTPUT_DIR", default_value = "./reports")]
    output_dir: PathBuf,

    /// Output file prefix (usually the sample or report name)
    #[arg(short, long, env = "VRP_OUTPUT_PREFIX", default_value = "report")]
    prefix: String,

    /// Output formats (json, csv, parquet, sqlite)
    #[arg(long, env = "VRP_FORMATS", value_delimiter = ',', default_value = "json,csv")]
    formats: Vec<OutputFormat>,

    /// Which row wins when a reference table repeats a key
    #[arg(long, env = "VRP_DUPLICATE_KEYS", value_enum, default_value_t = DuplicateKeyPolicy::Last)]
    duplicate_keys: DuplicateKeyPolicy,

    /// Log output format
    #[arg(long, env = "VRP_LOG_FORMAT", value_enum, default_value = "pretty")]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "variant_report_processor=info".into());
    match args.log_format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }

    info!("Variant Report Processor starting...");

    let config = ProcessorConfig {
        reported_variants: args.reported_variants,
        structural_variants: args.structural_variants,
        panel_dir: args.panel_dir,
        hotspots: args.hotspots,
        cyto_bands: args.cyto_bands,
        significance: args.clinvar,
        qc_dir: args.qc_dir,
        output_dir: args.output_dir,
        output_prefix: args.prefix,
        formats: args.formats,
        policy: args.duplicate_keys,
    };

    match ReportProcessor::new(config).process() {
        Ok(outcome) => {
            info!("Processing completed successfully: {:?}", outcome.row_counts);
            for (format, paths) in &outcome.files {
                info!("{} output: {:?}", format, paths);
            }
            Ok(())
        }
        Err(e) => {
            error!("Processing failed: {:#}", e);
            Err(e)
        }
    }
}
