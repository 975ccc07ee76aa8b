//! Domain types for layout parsing.
//!
//! This module contains the label policy tables and the region, page and
//! document types produced by the pipeline.

pub mod labels;
pub mod structure;

pub use labels::{
    LayoutLabelConfig, LayoutTaskType, PRESERVE_LABELS, RecognitionTask, RegionKind,
    region_kind_for_label, task_type_for_label,
};
pub use structure::{BlockListItem, Document, Page, ProcessedRegion};
