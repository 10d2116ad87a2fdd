// ==============================================================================
// lib.rs - Variant Report Processor Library
// ==============================================================================
// Description: Library interface for variant normalization, annotation joins
//              and report batch output
// Author: Matt Barham
// Created: 2025-11-03
// Modified: 2026-10-17
// Version: 2.0.0
// ==============================================================================

pub mod models;
pub mod error;
pub mod parsers;
pub mod validator;
pub mod normalizer;
pub mod classifier;
pub mod splitter;
pub mod protein;
pub mod reference_panel;
pub mod annotation_index;
pub mod significance;
pub mod enricher;
pub mod projector;
pub mod pipeline;
pub mod cell_source;
pub mod processor;
pub mod output;
