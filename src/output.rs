// ==============================================================================
// output.rs - Report Batch Output
// ==============================================================================
// Description: Hands normalized report batches to the presentation layer as
//              JSON, CSV, Parquet and SQLite
// Author: Matt Barham
// Created: 2025-11-04
// Modified: 2026-10-17
// Version: 2.0.0
// ==============================================================================

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

// Apache Arrow/Parquet for columnar data
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;

// SQLite for queryable database
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};

use crate::cell_source::ResolvedCell;
use crate::models::{Cell, GermlineReport, ReportBatches, StreamKind};
use crate::projector::germline_schema;
use crate::validator::ValidatedFile;

/// Supported hand-off formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Single JSON document (best for web APIs and JavaScript)
    Json,
    /// One CSV file per stream
    Csv,
    /// One Apache Parquet file per stream (best for data science: Python, R, Spark)
    Parquet,
    /// SQLite database with one table per stream
    Sqlite,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::Json,
        OutputFormat::Csv,
        OutputFormat::Parquet,
        OutputFormat::Sqlite,
    ];

    /// Get file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
            OutputFormat::Sqlite => "db",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "parquet" => Ok(OutputFormat::Parquet),
            "sqlite" | "db" => Ok(OutputFormat::Sqlite),
            other => Err(format!("Unknown output format '{}'", other)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Sqlite => f.write_str("sqlite"),
            other => f.write_str(other.extension()),
        }
    }
}

/// Run metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputMetadata {
    pub report_name: String,
    pub tool_version: String,
    pub duplicate_key_policy: String,
    /// Validated input files with their SHA-256 fingerprints, by role
    pub input_files: BTreeMap<String, InputFingerprint>,
    /// Rows per stream sheet
    pub row_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputFingerprint {
    pub file_name: String,
    pub size: u64,
    pub sha256: String,
}

impl From<&ValidatedFile> for InputFingerprint {
    fn from(file: &ValidatedFile) -> Self {
        Self {
            file_name: file.original_name.clone(),
            size: file.size,
            sha256: file.hash_sha256.clone(),
        }
    }
}

/// Everything handed to the presentation layer for one report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportOutput {
    pub metadata: OutputMetadata,
    pub batches: ReportBatches,
    /// Resolved QC sheet cells, when extracted tables were supplied
    #[serde(default, skip_serializing_if = "Vec::is_empty", skip_deserializing)]
    pub qc_cells: Vec<ResolvedCell>,
}

impl ReportOutput {
    pub fn new(metadata: OutputMetadata, batches: ReportBatches) -> Self {
        Self {
            metadata,
            batches,
            qc_cells: Vec::new(),
        }
    }
}

/// Rows per stream, keyed by sheet name
pub fn row_counts(batches: &ReportBatches) -> BTreeMap<String, usize> {
    StreamKind::ALL
        .iter()
        .map(|kind| {
            let count = batches.get(*kind).map(|b| b.len()).unwrap_or(0);
            (kind.sheet_name().to_string(), count)
        })
        .collect()
}

const NO_ROWS: &[Vec<Cell>] = &[];

/// Column names and rows of one stream; an empty germline stream yields its
/// schema with no rows
fn stream_table(batches: &ReportBatches, kind: StreamKind) -> (Vec<String>, &[Vec<Cell>]) {
    match (kind, &batches.germline) {
        (StreamKind::Germline, GermlineReport::NoVariants) => (germline_schema().output_columns(), NO_ROWS),
        _ => match batches.get(kind) {
            Some(batch) => (batch.columns.clone(), batch.rows.as_slice()),
            None => (Vec::new(), NO_ROWS),
        },
    }
}

/// Storage type of one output column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnType {
    Integer,
    Float,
    Text,
}

/// Integer if every non-blank cell is an integer, float if every non-blank
/// cell is numeric, text otherwise. Blank columns are text.
fn infer_column_type(rows: &[Vec<Cell>], idx: usize) -> ColumnType {
    let mut column_type = None;
    for cell in rows.iter().map(|row| &row[idx]) {
        let cell_type = match cell {
            Cell::Missing => continue,
            Cell::Text(s) if s.is_empty() => continue,
            Cell::Integer(_) => ColumnType::Integer,
            Cell::Float(_) => ColumnType::Float,
            Cell::Text(_) => return ColumnType::Text,
        };
        column_type = Some(match (column_type, cell_type) {
            (None, t) => t,
            (Some(ColumnType::Integer), ColumnType::Integer) => ColumnType::Integer,
            _ => ColumnType::Float,
        });
    }
    column_type.unwrap_or(ColumnType::Text)
}

fn is_blank(cell: &Cell) -> bool {
    match cell {
        Cell::Missing => true,
        Cell::Text(s) => s.is_empty(),
        _ => false,
    }
}

/// SQLite/file-safe identifier for a stream
fn table_name(kind: StreamKind) -> String {
    kind.sheet_name().to_lowercase()
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Writes report output files into one directory
pub struct OutputGenerator {
    output_dir: PathBuf,
    prefix: String,
}

impl OutputGenerator {
    pub fn new(output_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            prefix: prefix.into(),
        }
    }

    fn path_for(&self, suffix: &str, format: OutputFormat) -> PathBuf {
        self.output_dir
            .join(format!("{}{}.{}", self.prefix, suffix, format.extension()))
    }

    /// Write `output` in every requested format
    ///
    /// Returns the files written per format.
    pub fn generate(
        &self,
        output: &ReportOutput,
        formats: &[OutputFormat],
    ) -> Result<HashMap<OutputFormat, Vec<PathBuf>>> {
        std::fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("Failed to create output directory {}", self.output_dir.display())
        })?;

        let mut written = HashMap::new();
        for format in formats {
            let paths = match format {
                OutputFormat::Json => vec![self.generate_json(&self.path_for("", *format), output)?],
                OutputFormat::Csv => self.generate_csv(output)?,
                OutputFormat::Parquet => self.generate_parquet(output)?,
                OutputFormat::Sqlite => vec![self.generate_sqlite(&self.path_for("", *format), output)?],
            };
            written.insert(*format, paths);
        }
        Ok(written)
    }

    /// Generate JSON output (one document, explicit `no_variants` germline marker)
    fn generate_json(&self, path: &Path, output: &ReportOutput) -> Result<PathBuf> {
        info!("Generating JSON output: {:?}", path);

        let file = std::fs::File::create(path).context("Failed to create JSON output file")?;

        serde_json::to_writer_pretty(file, output).context("Failed to write JSON output")?;

        info!("JSON output complete: {:?}", output.metadata.row_counts);
        Ok(path.to_path_buf())
    }

    /// Generate CSV output (one file per stream, header-only when empty)
    fn generate_csv(&self, output: &ReportOutput) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();

        for kind in StreamKind::ALL {
            let path = self.path_for(&format!("_{}", table_name(kind)), OutputFormat::Csv);
            let (columns, rows) = stream_table(&output.batches, kind);

            let mut writer = csv::WriterBuilder::new()
                .from_path(&path)
                .with_context(|| format!("Failed to create CSV file {}", path.display()))?;
            writer
                .write_record(&columns)
                .context("Failed to write CSV header")?;
            for row in rows {
                writer
                    .write_record(row.iter().map(|cell| cell.to_string()))
                    .context("Failed to write CSV row")?;
            }
            writer.flush().context("Failed to flush CSV output")?;

            info!("CSV output complete: {} ({} rows)", path.display(), rows.len());
            paths.push(path);
        }

        if !output.qc_cells.is_empty() {
            let path = self.path_for("_qc", OutputFormat::Csv);
            let mut writer = csv::WriterBuilder::new()
                .from_path(&path)
                .with_context(|| format!("Failed to create CSV file {}", path.display()))?;
            writer.write_record(["row", "column", "value"])?;
            for cell in &output.qc_cells {
                writer.write_record([cell.row.to_string(), cell.column.to_string(), cell.value.clone()])?;
            }
            writer.flush().context("Failed to flush QC CSV output")?;
            paths.push(path);
        }

        Ok(paths)
    }

    /// Generate Parquet output (one file per stream, numeric columns typed)
    fn generate_parquet(&self, output: &ReportOutput) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();

        for kind in StreamKind::ALL {
            let path = self.path_for(&format!("_{}", table_name(kind)), OutputFormat::Parquet);
            info!("Generating Parquet output: {:?}", path);

            let (columns, rows) = stream_table(&output.batches, kind);
            let mut fields = Vec::with_capacity(columns.len());
            let mut arrays: Vec<ArrayRef> = Vec::with_capacity(columns.len());

            for (idx, name) in columns.iter().enumerate() {
                let (data_type, array): (DataType, ArrayRef) = match infer_column_type(rows, idx) {
                    ColumnType::Integer => (
                        DataType::Int64,
                        Arc::new(Int64Array::from(
                            rows.iter()
                                .map(|row| match &row[idx] {
                                    Cell::Integer(i) => Some(*i),
                                    _ => None,
                                })
                                .collect::<Vec<_>>(),
                        )),
                    ),
                    ColumnType::Float => (
                        DataType::Float64,
                        Arc::new(Float64Array::from(
                            rows.iter()
                                .map(|row| if is_blank(&row[idx]) { None } else { row[idx].as_f64() })
                                .collect::<Vec<_>>(),
                        )),
                    ),
                    ColumnType::Text => (
                        DataType::Utf8,
                        Arc::new(StringArray::from(
                            rows.iter().map(|row| row[idx].to_string()).collect::<Vec<_>>(),
                        )),
                    ),
                };
                fields.push(Field::new(name.as_str(), data_type, true));
                arrays.push(array);
            }

            let schema = Arc::new(Schema::new(fields));
            let batch = RecordBatch::try_new(schema.clone(), arrays)
                .context("Failed to create Arrow RecordBatch")?;

            // Write to Parquet file with compression
            let file = std::fs::File::create(&path).context("Failed to create Parquet file")?;
            let props = WriterProperties::builder()
                .set_compression(parquet::basic::Compression::SNAPPY)
                .build();

            let mut writer = ArrowWriter::try_new(file, schema, Some(props))
                .context("Failed to create Parquet writer")?;
            writer.write(&batch).context("Failed to write Parquet data")?;
            writer.close().context("Failed to close Parquet writer")?;

            info!("Parquet output complete: {} rows", rows.len());
            paths.push(path);
        }

        Ok(paths)
    }

    /// Generate SQLite output (one table per stream plus metadata)
    fn generate_sqlite(&self, path: &Path, output: &ReportOutput) -> Result<PathBuf> {
        info!("Generating SQLite output: {:?}", path);

        if path.exists() {
            std::fs::remove_file(path).context("Failed to replace existing SQLite database")?;
        }
        let mut conn = Connection::open(path).context("Failed to create SQLite database")?;

        conn.execute(
            "CREATE TABLE metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create metadata table")?;

        let mut metadata_items = vec![
            ("report_name".to_string(), output.metadata.report_name.clone()),
            ("tool_version".to_string(), output.metadata.tool_version.clone()),
            (
                "duplicate_key_policy".to_string(),
                output.metadata.duplicate_key_policy.clone(),
            ),
            (
                "germline_status".to_string(),
                match output.batches.germline {
                    GermlineReport::NoVariants => "no_variants".to_string(),
                    GermlineReport::Variants(_) => "variants".to_string(),
                },
            ),
        ];
        for (role, file) in &output.metadata.input_files {
            metadata_items.push((format!("sha256:{}", role), file.sha256.clone()));
        }

        for (key, value) in &metadata_items {
            conn.execute(
                "INSERT INTO metadata (key, value) VALUES (?1, ?2)",
                params![key, value],
            )
            .context("Failed to insert metadata")?;
        }

        for kind in StreamKind::ALL {
            let (columns, rows) = stream_table(&output.batches, kind);
            let types: Vec<ColumnType> = (0..columns.len()).map(|idx| infer_column_type(rows, idx)).collect();

            let definitions: Vec<String> = columns
                .iter()
                .zip(&types)
                .map(|(name, column_type)| {
                    let affinity = match column_type {
                        ColumnType::Integer => "INTEGER",
                        ColumnType::Float => "REAL",
                        ColumnType::Text => "TEXT",
                    };
                    format!("{} {}", quote_identifier(name), affinity)
                })
                .collect();

            let table = table_name(kind);
            conn.execute(
                &format!("CREATE TABLE {} (row_order INTEGER PRIMARY KEY, {})", table, definitions.join(", ")),
                [],
            )
            .with_context(|| format!("Failed to create {} table", table))?;

            let placeholders: Vec<String> = (1..=columns.len() + 1).map(|i| format!("?{}", i)).collect();
            let quoted: Vec<String> = columns.iter().map(|c| quote_identifier(c)).collect();
            let insert = format!(
                "INSERT INTO {} (row_order, {}) VALUES ({})",
                table,
                quoted.join(", "),
                placeholders.join(", ")
            );

            let tx = conn.transaction().context("Failed to start transaction")?;
            {
                let mut stmt = tx
                    .prepare(&insert)
                    .with_context(|| format!("Failed to prepare {} insert statement", table))?;

                for (order, row) in rows.iter().enumerate() {
                    let values = std::iter::once(Value::Integer(order as i64)).chain(
                        row.iter().zip(&types).map(|(cell, column_type)| match cell {
                            Cell::Integer(i) => Value::Integer(*i),
                            Cell::Float(f) => Value::Real(*f),
                            c if is_blank(c) && *column_type != ColumnType::Text => Value::Null,
                            other => Value::Text(other.to_string()),
                        }),
                    );
                    stmt.execute(params_from_iter(values))
                        .with_context(|| format!("Failed to insert {} row", table))?;
                }
            }
            tx.commit().with_context(|| format!("Failed to commit {} rows", table))?;
        }

        if !output.qc_cells.is_empty() {
            conn.execute(
                "CREATE TABLE qc_cells (
                    row INTEGER NOT NULL,
                    col INTEGER NOT NULL,
                    value TEXT NOT NULL,
                    PRIMARY KEY (row, col)
                )",
                [],
            )
            .context("Failed to create qc_cells table")?;

            let tx = conn.transaction().context("Failed to start QC transaction")?;
            {
                let mut stmt = tx
                    .prepare("INSERT OR REPLACE INTO qc_cells (row, col, value) VALUES (?1, ?2, ?3)")
                    .context("Failed to prepare qc_cells insert")?;
                for cell in &output.qc_cells {
                    stmt.execute(params![cell.row, cell.column, cell.value])
                        .context("Failed to insert QC cell")?;
                }
            }
            tx.commit().context("Failed to commit QC cells")?;
        }

        info!("SQLite output complete: {:?}", output.metadata.row_counts);
        Ok(path.to_path_buf())
    }
}
