// ==============================================================================
// pipeline.rs - Variant Normalization & Annotation Pipeline
// ==============================================================================
// Description: Single-pass transform from raw laboratory exports and reference
//              tables to the five normalized report batches
// Author: Matt Barham
// Created: 2026-10-14
// Modified: 2026-10-17
// Version: 1.0.0
// ==============================================================================
// Stages:
//   1. Normalize      reported variants + reported structural variants
//   2. Classify       Germline / SomaticSNV and Gain / Loss / Fusion
//   3. Derive         per-stream splits and derived columns
//   4. Index          one IndexCache for every join of the run
//   5. Enrich         JoinSpecs per stream
//   6. Project        coerce, sort and project onto the stream schema
// ==============================================================================

use tracing::info;

use crate::annotation_index::{AnnotationIndex, DuplicateKeyPolicy, IndexCache};
use crate::classifier::{classify_small_variants, classify_structural_variants};
use crate::enricher::{
    cyto_join_spec, enrich, gene_position_join_specs, hotspot_join_specs, panel_join_specs,
    significance_join_spec, JoinSpec,
};
use crate::error::ProcessingError;
use crate::models::{Cell, GermlineReport, Record, ReportBatch, ReportBatches, StreamKind};
use crate::normalizer::{normalize, REPORTED_VARIANT_FIELDS, STRUCTURAL_VARIANT_FIELDS};
use crate::parsers::RawTable;
use crate::projector::{
    coerce_copy_number, coerce_vaf, copy_number_schema, format_size, fusion_schema,
    germline_schema, project, somatic_schema, sort_records, SOMATIC_CURATION_COLUMNS,
};
use crate::protein::{convert_three_to_one, hotspot_key, split_cds_protein};
use crate::reference_panel::ReferenceTables;
use crate::significance::{collect_identifiers, significance_table, SignificanceLookup};
use crate::splitter::{split_discovered, split_fixed, split_read_support, Delimiter, SubColumns};

const GNOMAD_FIELD: &str = "Population germline allele frequency (GE | gnomAD)";
const CDS_PROTEIN_FIELD: &str = "CDS change and protein change";

/// Raw laboratory exports for one patient
#[derive(Debug, Clone)]
pub struct PipelineInputs {
    pub reported_variants: RawTable,
    pub structural_variants: RawTable,
}

/// Fusion records after derivation, with the discovered sub-columns
#[derive(Debug, Clone, PartialEq)]
pub struct FusionStream {
    pub records: Vec<Record>,
    pub gene_columns: Vec<String>,
    pub fusion_columns: Vec<String>,
}

impl FusionStream {
    pub fn join_specs(&self) -> Vec<JoinSpec> {
        if self.gene_columns.is_empty() {
            panel_join_specs("Gene", None)
        } else {
            gene_position_join_specs(&self.gene_columns)
        }
    }
}

/// Set `columns` to an empty string on every record
fn add_blank_columns(records: &mut [Record], columns: &[&str]) {
    for record in records.iter_mut() {
        for column in columns {
            record.set(*column, Cell::empty());
        }
    }
}

/// Split `field` into `[field, flag]` on ";" only when some record needs it;
/// otherwise `flag` is blank everywhere
fn split_optional_suffix(records: &mut [Record], field: &str, flag: &str) {
    let needs_split = records
        .iter()
        .filter_map(|r| r.get_str(field))
        .any(|value| value.contains(';'));

    if needs_split {
        split_fixed(records, field, Delimiter::Literal(";"), [field, flag]);
    } else {
        add_blank_columns(records, &[flag]);
    }
}

/// Germline derivations: `gnomAD` from the GE | gnomAD pair, blank curation columns
pub fn derive_germline(records: &mut [Record]) {
    split_fixed(records, GNOMAD_FIELD, Delimiter::Literal("|"), ["GE", "gnomAD"]);
    add_blank_columns(records, &["Variant Class", "Actionability"]);
}

/// Somatic derivations
///
/// Adds `c_dot`, `p_dot`, `MTBP c.`, `MTBP p.` (one-letter amino acids),
/// `HS p.` (hotspot key), `Error flag`, `LOH` and the blank curation columns.
pub fn derive_somatic(records: &mut [Record]) {
    for record in records.iter_mut() {
        let gene = record.get_str("Gene").unwrap_or_default();
        let (c_dot, p_dot) = match record.get_str(CDS_PROTEIN_FIELD) {
            Some(value) => {
                let (c, p) = split_cds_protein(&value);
                (Some(c), p)
            }
            None => (None, None),
        };

        let mtbp_c = c_dot
            .as_ref()
            .map(|c| Cell::Text(format!("{}:{}", gene, c)))
            .unwrap_or(Cell::Missing);
        let mtbp_p = p_dot
            .as_ref()
            .map(|p| format!("{}:{}", gene, convert_three_to_one(p)))
            .unwrap_or_default();
        let hs_p = hotspot_key(&mtbp_p);

        record.set("c_dot", c_dot.map(Cell::Text).unwrap_or(Cell::Missing));
        record.set("p_dot", p_dot.map(Cell::Text).unwrap_or(Cell::Missing));
        record.set("MTBP c.", mtbp_c);
        record.set("MTBP p.", Cell::Text(mtbp_p));
        record.set("HS p.", Cell::Text(hs_p));
    }

    split_optional_suffix(records, "Predicted consequences", "Error flag");
    split_optional_suffix(records, "VAF", "LOH");
    add_blank_columns(records, SOMATIC_CURATION_COLUMNS);
}

pub fn somatic_join_specs() -> Vec<JoinSpec> {
    let mut specs = panel_join_specs("Gene", None);
    specs.extend(hotspot_join_specs("HS p."));
    specs.push(cyto_join_spec("Gene"));
    specs
}

/// Gain/Loss derivations: `Type(N)` → `Type`, `Copy Number`; bands → `Cyto 1`, `Cyto 2`
pub fn derive_copy_number(records: &mut [Record]) {
    split_fixed(records, "Type", Delimiter::AnyOf(&['(', ')']), ["Type", "Copy Number"]);
    split_fixed(records, "Chromosomal bands", Delimiter::Literal(";"), ["Cyto 1", "Cyto 2"]);
    add_blank_columns(records, &["Variant class"]);
}

/// Fusion derivations: discovered `Fusion_k` and `Gene_k` sub-columns, read support
pub fn derive_fusion(mut records: Vec<Record>) -> FusionStream {
    let fusion_columns = split_discovered(
        &mut records,
        "Type",
        Delimiter::Literal(";"),
        SubColumns::HeadAndTail("Fusion"),
    );

    for record in records.iter_mut() {
        let support = record.get("Confidence/support").cloned().unwrap_or(Cell::Missing);
        let (paired, split) = split_read_support(&support);
        record.set("Paired reads", paired);
        record.set("Split reads", split);
    }

    let gene_columns = split_discovered(
        &mut records,
        "Gene",
        Delimiter::Literal(";"),
        SubColumns::Positional("Gene"),
    );
    add_blank_columns(&mut records, &["Variant class", "Actionability", "Comments"]);

    FusionStream {
        records,
        gene_columns,
        fusion_columns,
    }
}

/// The variant normalization and annotation-join pipeline
///
/// Pure and deterministic: the same inputs and reference tables always
/// produce the same batches.
pub struct Pipeline<'a> {
    references: &'a ReferenceTables,
    significance: &'a dyn SignificanceLookup,
    policy: DuplicateKeyPolicy,
}

impl<'a> Pipeline<'a> {
    pub fn new(references: &'a ReferenceTables, significance: &'a dyn SignificanceLookup) -> Self {
        Self {
            references,
            significance,
            policy: DuplicateKeyPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: DuplicateKeyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run every stage over one patient's exports
    ///
    /// # Errors
    /// Schema and data format errors abort the whole run, as does a join
    /// against a reference table that was never loaded.
    pub fn run(&self, inputs: &PipelineInputs) -> Result<ReportBatches, ProcessingError> {
        let reported = normalize(&inputs.reported_variants, REPORTED_VARIANT_FIELDS)?;
        let structural = normalize(&inputs.structural_variants, STRUCTURAL_VARIANT_FIELDS)?;
        info!(
            "Normalized {} reported variants and {} structural variants",
            reported.len(),
            structural.len()
        );

        let small = classify_small_variants(reported);
        let sv = classify_structural_variants(structural);

        let mut germline = small.germline;
        let mut somatic = small.somatic;
        let mut gain = sv.gain;
        let mut loss = sv.loss;

        derive_germline(&mut germline);
        derive_somatic(&mut somatic);
        derive_copy_number(&mut gain);
        derive_copy_number(&mut loss);
        let mut fusion = derive_fusion(sv.fusion);

        let somatic_specs = somatic_join_specs();
        let copy_number_specs = panel_join_specs("Gene", None);
        let fusion_specs = fusion.join_specs();

        let mut required: Vec<&JoinSpec> = Vec::new();
        if !somatic.is_empty() {
            required.extend(&somatic_specs);
        }
        if !gain.is_empty() || !loss.is_empty() {
            required.extend(&copy_number_specs);
        }
        if !fusion.records.is_empty() {
            required.extend(&fusion_specs);
        }

        let mut cache = IndexCache::build(self.references, required, self.policy)?;
        if !germline.is_empty() {
            cache.insert(self.significance_index(&germline)?);
        }
        info!("Built {} annotation indices", cache.len());

        let germline = if germline.is_empty() {
            info!("No germline variants reported");
            GermlineReport::NoVariants
        } else {
            enrich(&mut germline, &[significance_join_spec()], &cache)?;
            GermlineReport::Variants(project(&germline, &germline_schema())?)
        };

        let somatic = self.finish_somatic(somatic, &somatic_specs, &cache)?;
        let gain = self.finish_copy_number(gain, StreamKind::Gain, &copy_number_specs, &cache)?;
        let loss = self.finish_copy_number(loss, StreamKind::Loss, &copy_number_specs, &cache)?;

        if !fusion.records.is_empty() {
            enrich(&mut fusion.records, &fusion_specs, &cache)?;
        }
        format_size(&mut fusion.records, StreamKind::Fusion)?;
        let fusion = project(
            &fusion.records,
            &fusion_schema(&fusion.gene_columns, &fusion.fusion_columns),
        )?;

        info!(
            "Report batches: germline {}, somatic {}, gain {}, loss {}, fusion {}",
            germline.batch().map(ReportBatch::len).unwrap_or(0),
            somatic.len(),
            gain.len(),
            loss.len(),
            fusion.len()
        );

        Ok(ReportBatches {
            germline,
            somatic,
            gain,
            loss,
            fusion,
        })
    }

    /// Index of `clnsigconf` by ClinVar ID for the germline identifiers
    fn significance_index(&self, germline: &[Record]) -> Result<AnnotationIndex, ProcessingError> {
        let ids = collect_identifiers(germline);
        let found = self.significance.find(&ids)?;
        info!("Significance lookup resolved {}/{} ClinVar IDs", found.len(), ids.len());

        let table = significance_table(&found);
        AnnotationIndex::build(&table, "ClinVar ID", "clnsigconf", self.policy)
    }

    fn finish_somatic(
        &self,
        mut records: Vec<Record>,
        specs: &[JoinSpec],
        cache: &IndexCache,
    ) -> Result<ReportBatch, ProcessingError> {
        if !records.is_empty() {
            enrich(&mut records, specs, cache)?;
        }
        coerce_vaf(&mut records, StreamKind::SomaticSnv)?;
        sort_records(&mut records, StreamKind::SomaticSnv);
        project(&records, &somatic_schema())
    }

    fn finish_copy_number(
        &self,
        mut records: Vec<Record>,
        kind: StreamKind,
        specs: &[JoinSpec],
        cache: &IndexCache,
    ) -> Result<ReportBatch, ProcessingError> {
        if !records.is_empty() {
            enrich(&mut records, specs, cache)?;
        }
        coerce_copy_number(&mut records, kind)?;
        format_size(&mut records, kind)?;
        sort_records(&mut records, kind);
        project(&records, &copy_number_schema(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn somatic_row(consequences: &str, vaf: &str, cds: &str) -> Record {
        Record::from_pairs(
            1,
            [
                ("Origin", Cell::text("Somatic")),
                ("Gene", Cell::text("NRAS")),
                (CDS_PROTEIN_FIELD, Cell::text(cds)),
                ("Predicted consequences", Cell::text(consequences)),
                ("VAF", Cell::infer(vaf)),
            ],
        )
    }

    #[test]
    fn test_derive_somatic_protein_columns() {
        let mut records = vec![somatic_row("missense_variant", "45", "c.181C>A;p.Gln61Lys")];
        derive_somatic(&mut records);

        let r = &records[0];
        assert_eq!(r.get_str("c_dot").as_deref(), Some("c.181C>A"));
        assert_eq!(r.get_str("p_dot").as_deref(), Some("p.Gln61Lys"));
        assert_eq!(r.get_str("MTBP c.").as_deref(), Some("NRAS:c.181C>A"));
        assert_eq!(r.get_str("MTBP p.").as_deref(), Some("NRAS:p.Q61K"));
        assert_eq!(r.get_str("HS p.").as_deref(), Some("NRAS:p.Q61"));
        assert_eq!(r.get_str("Error flag").as_deref(), Some(""));
        assert_eq!(r.get_str("LOH").as_deref(), Some(""));
    }

    #[test]
    fn test_derive_somatic_splits_flags_when_present() {
        let mut records = vec![
            somatic_row("missense_variant;splice_region_variant", "45;LOH", "c.181C>A;p.Gln61Lys"),
            somatic_row("missense_variant", "12", "c.35G>A;p.Gly12Asp"),
        ];
        derive_somatic(&mut records);

        assert_eq!(records[0].get_str("Predicted consequences").as_deref(), Some("missense_variant"));
        assert_eq!(records[0].get_str("Error flag").as_deref(), Some("splice_region_variant"));
        assert_eq!(records[0].get_str("VAF").as_deref(), Some("45"));
        assert_eq!(records[0].get_str("LOH").as_deref(), Some("LOH"));
        assert_eq!(records[1].get("Error flag"), Some(&Cell::Missing));
        assert_eq!(records[1].get_str("VAF").as_deref(), Some("12"));
    }

    #[test]
    fn test_derive_somatic_without_protein_change() {
        let mut records = vec![somatic_row("splice_acceptor_variant", "30", "c.1234-2A>G")];
        derive_somatic(&mut records);
        assert_eq!(records[0].get("p_dot"), Some(&Cell::Missing));
        assert_eq!(records[0].get_str("MTBP p.").as_deref(), Some(""));
        assert_eq!(records[0].get_str("HS p.").as_deref(), Some(""));
    }

    #[test]
    fn test_derive_copy_number() {
        let mut records = vec![Record::from_pairs(
            1,
            [("Type", "GAIN(4)"), ("Chromosomal bands", "8q24.21;8q24.3")],
        )];
        derive_copy_number(&mut records);
        assert_eq!(records[0].get_str("Type").as_deref(), Some("GAIN"));
        assert_eq!(records[0].get_str("Copy Number").as_deref(), Some("4"));
        assert_eq!(records[0].get_str("Cyto 2").as_deref(), Some("8q24.3"));
        assert_eq!(records[0].get_str("Variant class").as_deref(), Some(""));
    }

    #[test]
    fn test_derive_fusion_discovers_columns() {
        let records = vec![
            Record::from_pairs(
                1,
                [("Type", "BCR-ABL1;fusion"), ("Gene", "BCR;ABL1"), ("Confidence/support", "PR: 10; SR: 4")],
            ),
            Record::from_pairs(2, [("Type", "EML4-ALK"), ("Gene", "EML4"), ("Confidence/support", "PR: 3")]),
        ];
        let fusion = derive_fusion(records);

        assert_eq!(fusion.gene_columns, vec!["Gene_1", "Gene_2"]);
        assert_eq!(fusion.fusion_columns, vec!["Fusion_1"]);
        assert_eq!(fusion.records[1].get_str("Gene_2").as_deref(), Some(""));
        assert_eq!(fusion.records[0].get_str("Paired reads").as_deref(), Some("10"));
        assert_eq!(fusion.records[1].get_str("Split reads").as_deref(), Some(""));
        assert_eq!(fusion.join_specs().len(), 24);
    }
}
