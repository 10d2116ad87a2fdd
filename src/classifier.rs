// ==============================================================================
// classifier.rs - Variant Classifier
// ==============================================================================
// Description: Partitions reported variant batches into disjoint variant streams
// Author: Matt Barham
// Created: 2026-10-12
// Modified: 2026-10-15
// Version: 1.0.0
// ==============================================================================
// Predicates (case-insensitive):
//   Germline   Origin == "germline"
//   SomaticSNV Origin contains "somatic"
//   Gain       Type contains "gain"
//   Loss       Type contains "loss" or "loh"
//   Fusion     everything else in the structural-variant batch
// ==============================================================================

use tracing::{info, warn};

use crate::models::{Record, StreamKind};

/// Small-variant streams from the reported-variants batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SmallVariantStreams {
    pub germline: Vec<Record>,
    pub somatic: Vec<Record>,
    /// Rows whose Origin matched neither stream
    pub unclassified: Vec<Record>,
}

/// Structural-variant streams from the reported-structural-variants batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuralVariantStreams {
    pub gain: Vec<Record>,
    pub loss: Vec<Record>,
    pub fusion: Vec<Record>,
}

/// Stream for a small variant, or `None` when the Origin is unrecognised
pub fn classify_origin(record: &Record) -> Option<StreamKind> {
    let origin = record.get_str("Origin")?.to_lowercase();
    if origin == "germline" {
        Some(StreamKind::Germline)
    } else if origin.contains("somatic") {
        Some(StreamKind::SomaticSnv)
    } else {
        None
    }
}

/// Stream for a structural variant. Gain is tested before loss, so a
/// type mentioning both lands in exactly one stream.
pub fn classify_type(record: &Record) -> StreamKind {
    let sv_type = record.get_str("Type").unwrap_or_default().to_lowercase();
    if sv_type.contains("gain") {
        StreamKind::Gain
    } else if sv_type.contains("loss") || sv_type.contains("loh") {
        StreamKind::Loss
    } else {
        StreamKind::Fusion
    }
}

/// Split the reported-variants batch into germline and somatic streams
pub fn classify_small_variants(records: Vec<Record>) -> SmallVariantStreams {
    let mut streams = SmallVariantStreams::default();

    for record in records {
        match classify_origin(&record) {
            Some(StreamKind::Germline) => streams.germline.push(record),
            Some(_) => streams.somatic.push(record),
            None => {
                warn!(
                    "Row {}: unrecognised Origin {:?}, row not reported",
                    record.row,
                    record.get_str("Origin")
                );
                streams.unclassified.push(record);
            }
        }
    }

    info!(
        "Classified reported variants: {} germline, {} somatic, {} unclassified",
        streams.germline.len(),
        streams.somatic.len(),
        streams.unclassified.len()
    );

    streams
}

/// Split the reported-structural-variants batch into gain, loss and fusion streams
pub fn classify_structural_variants(records: Vec<Record>) -> StructuralVariantStreams {
    let mut streams = StructuralVariantStreams::default();

    for record in records {
        match classify_type(&record) {
            StreamKind::Gain => streams.gain.push(record),
            StreamKind::Loss => streams.loss.push(record),
            _ => streams.fusion.push(record),
        }
    }

    info!(
        "Classified structural variants: {} gain, {} loss, {} fusion",
        streams.gain.len(),
        streams.loss.len(),
        streams.fusion.len()
    );

    streams
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn small(row: usize, origin: &str) -> Record {
        Record::from_pairs(row, [("Origin", origin), ("Gene", "TP53")])
    }

    fn structural(row: usize, sv_type: &str) -> Record {
        Record::from_pairs(row, [("Type", sv_type), ("Gene", "MYC")])
    }

    #[test]
    fn test_origin_predicates_are_case_insensitive() {
        assert_eq!(classify_origin(&small(1, "Germline")), Some(StreamKind::Germline));
        assert_eq!(classify_origin(&small(1, "GERMLINE")), Some(StreamKind::Germline));
        assert_eq!(classify_origin(&small(1, "Somatic")), Some(StreamKind::SomaticSnv));
        assert_eq!(classify_origin(&small(1, "somatic (LOH)")), Some(StreamKind::SomaticSnv));
        // Germline is an exact match, not a substring match
        assert_eq!(classify_origin(&small(1, "germline?")), None);
    }

    #[test]
    fn test_type_predicates() {
        assert_eq!(classify_type(&structural(1, "GAIN(4)")), StreamKind::Gain);
        assert_eq!(classify_type(&structural(1, "LOSS(1)")), StreamKind::Loss);
        assert_eq!(classify_type(&structural(1, "LOH(2)")), StreamKind::Loss);
        assert_eq!(classify_type(&structural(1, "BCR-ABL1;fusion")), StreamKind::Fusion);
        assert_eq!(classify_type(&structural(1, "")), StreamKind::Fusion);
    }

    #[test]
    fn test_empty_germline_is_not_an_error() {
        let streams = classify_small_variants(vec![small(1, "Somatic"), small(2, "Somatic")]);
        assert!(streams.germline.is_empty());
        assert_eq!(streams.somatic.len(), 2);
    }

    fn origin_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("Germline".to_string()),
            Just("germline".to_string()),
            Just("Somatic".to_string()),
            Just("somatic".to_string()),
            Just("Unknown".to_string()),
            "[a-zA-Z ]{0,12}",
        ]
    }

    fn type_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("GAIN(3)".to_string()),
            Just("LOSS(1)".to_string()),
            Just("LOH(2)".to_string()),
            Just("GAIN/LOSS".to_string()),
            Just("EML4-ALK".to_string()),
            "[a-zA-Z0-9();-]{0,12}",
        ]
    }

    proptest! {
        /// Property: germline and somatic streams are disjoint and together
        /// equal the batch filtered by Origin
        #[test]
        fn prop_small_variant_partition(origins in prop::collection::vec(origin_strategy(), 0..40)) {
            let records: Vec<Record> = origins
                .iter()
                .enumerate()
                .map(|(i, o)| small(i + 1, o))
                .collect();
            let expected_classified: Vec<usize> = records
                .iter()
                .filter(|r| classify_origin(r).is_some())
                .map(|r| r.row)
                .collect();

            let streams = classify_small_variants(records);

            let mut rows: Vec<usize> = streams
                .germline
                .iter()
                .chain(streams.somatic.iter())
                .map(|r| r.row)
                .collect();
            rows.sort_unstable();
            let before_dedup = rows.len();
            rows.dedup();

            prop_assert_eq!(before_dedup, rows.len());
            prop_assert_eq!(rows, expected_classified);
        }

        /// Property: gain, loss and fusion are pairwise disjoint and exhaustive
        #[test]
        fn prop_structural_partition(types in prop::collection::vec(type_strategy(), 0..40)) {
            let total = types.len();
            let records: Vec<Record> = types
                .iter()
                .enumerate()
                .map(|(i, t)| structural(i + 1, t))
                .collect();

            let streams = classify_structural_variants(records);

            let mut rows: Vec<usize> = streams
                .gain
                .iter()
                .chain(streams.loss.iter())
                .chain(streams.fusion.iter())
                .map(|r| r.row)
                .collect();
            rows.sort_unstable();
            rows.dedup();

            prop_assert_eq!(rows, (1..=total).collect::<Vec<_>>());
        }
    }
}
