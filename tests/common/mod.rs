// ==============================================================================
// common/mod.rs - Shared Test Fixtures
// ==============================================================================
// Description: One patient's laboratory exports and a small reference set
// Author: Matt Barham
// Created: 2026-10-17
// Modified: 2026-10-17
// Version: 1.0.0
// ==============================================================================

#![allow(dead_code)]

use std::path::Path;

use variant_report_processor::parsers::RawTable;
use variant_report_processor::reference_panel::{CancerPanel, ReferenceTables};
use variant_report_processor::significance::{SignificanceRecord, TableSignificanceLookup};

pub struct Fixture {
    pub name: &'static str,
    pub columns: &'static [&'static str],
    pub rows: &'static [&'static [&'static str]],
}

impl Fixture {
    pub fn table(&self) -> RawTable {
        RawTable::from_rows(self.name, self.columns, self.rows)
    }

    /// Write as `<dir>/<file_name>` (comma-delimited)
    pub fn write_csv(&self, dir: &Path, file_name: &str) -> std::path::PathBuf {
        let path = dir.join(file_name);
        let mut writer = csv::Writer::from_path(&path).unwrap();
        writer.write_record(self.columns).unwrap();
        for row in self.rows {
            writer.write_record(*row).unwrap();
        }
        writer.flush().unwrap();
        path
    }
}

pub const REPORTED_VARIANTS: Fixture = Fixture {
    name: "Reported_Variants",
    columns: &[
        "Origin",
        "Gene",
        "GRCh38 coordinates;ref/alt allele",
        "CDS change and protein change",
        "Predicted consequences",
        "VAF",
        "Genotype",
        "Gene mode of action",
        "ClinVar ID",
        "Population germline allele frequency (GE | gnomAD)",
        "Alt allele/total read depth",
        "Domain",
    ],
    rows: &[
        &[
            "Germline", "BRCA2", "13:32340300;C/T", "c.5946del;p.Ser1982fs", "frameshift_variant",
            "50", "Het", "LoF", "12347", "0.001|0.0002", "20/40", "1",
        ],
        &[
            "Somatic", "TP53", "17:7674220;C/T", "c.743G>A;p.Arg248Gln", "missense_variant",
            "30", "", "LoF", "", "", "30/100", "1",
        ],
        &[
            "Somatic", "KRAS", "12:25245350;C/T", "c.35G>A;p.Gly12Asp", "missense_variant",
            "60", "", "GoF", "", "", "60/100", "2",
        ],
        &[
            "Somatic", "NRAS", "1:114713908;T/G", "c.181C>A;p.Gln61Lys", "missense_variant",
            "45", "", "GoF", "", "", "45/100", "1",
        ],
    ],
};

pub const STRUCTURAL_VARIANTS: Fixture = Fixture {
    name: "Reported_Structural_Variants",
    columns: &[
        "Type",
        "Event domain",
        "Impacted transcript region",
        "Gene",
        "GRCh38 coordinates",
        "Size",
        "Chromosomal bands",
        "Confidence/support",
        "Gene mode of action",
    ],
    rows: &[
        &[
            "GAIN(4)", "1", "whole gene", "MYC", "8:127735434-130235434", "2500000",
            "8q24.21;8q24.3", "", "GoF",
        ],
        &[
            "LOSS(1)", "2", "whole gene", "CDKN2A", "9:21967752-21995301", "27550", "9p21.3", "", "LoF",
        ],
        &[
            "BCR-ABL1;fusion", "1", "intron", "BCR;ABL1", "22:23180000-9:130714000", "",
            "22q11.23;9q34.12", "PR: 10; SR: 4", "GoF",
        ],
        &[
            "EML4-ALK", "2", "intron", "EML4", "2:42396490-2:29223528", "", "2p21", "PR: 3", "GoF",
        ],
    ],
};

pub const COSMIC: Fixture = Fixture {
    name: "cosmic",
    columns: &["Gene", "Driver", "Entities"],
    rows: &[
        &["NRAS", "Yes", "Melanoma"],
        &["TP53", "Yes", ""],
        &["MYC", "Yes", "Many"],
        &["BCR", "Yes", "CML"],
        &["ABL1", "Yes", "CML"],
    ],
};

pub const EMPTY_PANEL: Fixture = Fixture {
    name: "panel",
    columns: &["Gene", "Driver", "Entities"],
    rows: &[],
};

pub const HOTSPOTS: Fixture = Fixture {
    name: "hotspots",
    columns: &["HS_PROTEIN_ID", "HS_Samples", "HS_Tumor Type Composition"],
    rows: &[
        &["NRAS:p.Q61", "500", "melanoma:200|thyroid:100"],
        &["KRAS:p.G12", "3000", "pancreas:1500|colorectal:900"],
    ],
};

pub const CYTO: Fixture = Fixture {
    name: "cyto",
    columns: &["Gene", "Cyto"],
    rows: &[&["NRAS", "1p13.2"], &["KRAS", "12p12.1"], &["MYC", "8q24.21"]],
};

pub const SIGNIFICANCE: Fixture = Fixture {
    name: "clinvar_subset",
    columns: &["ClinVar ID", "clnsigconf", "allele_frequency"],
    rows: &[&["12347", "Pathogenic", "AF_EXAC=0.00001"]],
};

/// Every reference table: COSMIC populated, the other panels empty
pub fn references() -> ReferenceTables {
    let mut references = ReferenceTables::new();
    for panel in CancerPanel::ALL {
        let raw = if panel == CancerPanel::Cosmic {
            COSMIC.table()
        } else {
            EMPTY_PANEL.table()
        };
        references.load_panel(panel, &raw).unwrap();
    }
    references.load_hotspots(&HOTSPOTS.table()).unwrap();
    references.load_cyto(&CYTO.table()).unwrap();
    references
}

pub fn significance() -> TableSignificanceLookup {
    TableSignificanceLookup::new([SignificanceRecord {
        clinvar_id: "12347".into(),
        clnsigconf: "Pathogenic".into(),
        allele_frequency: "AF_EXAC=0.00001".into(),
    }])
}
