//! Deterministic processing stages of the layout pipeline.
//!
//! # Modules
//!
//! * `geometry` - Normalized boxes, IoU and containment
//! * `layout_postprocess` - NMS, containment merging, reading order and unclipping
//! * `result_formatter` - Content normalization, cross-region merges and Markdown

pub mod geometry;
pub mod layout_postprocess;
pub mod result_formatter;

pub use geometry::{
    NormalizedBBox, NormalizedPoint, PixelRect, UnclipRatio, iou, is_contained,
};
pub use layout_postprocess::{
    LayoutPostProcess, LayoutPostprocessOptions, MergeBboxMode, PostprocessOutput, RawDetections,
    default_merge_mode_by_class_id,
};
pub use result_formatter::{FormattedDocument, LayoutResultFormatter};
