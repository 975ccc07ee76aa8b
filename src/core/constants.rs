//! Constants used throughout the layout pipeline.
//!
//! This module defines the fixed values shared by the geometry primitives,
//! the detection postprocessor, the dispatcher and the result formatter.

/// Upper bound of the normalized coordinate space.
///
/// Boxes and polygons are expressed as integers in `[0, NORMALIZED_COORD_MAX]`
/// with a top-left origin.
pub const NORMALIZED_COORD_MAX: i32 = 1000;

/// Intersection-over-inner-area ratio at which a box counts as contained.
pub const CONTAINMENT_THRESHOLD: f64 = 0.8;

/// Default IoU threshold for suppressing overlapping detections of the same class.
pub const DEFAULT_IOU_SAME_CLASS: f32 = 0.6;

/// Default IoU threshold for suppressing overlapping detections of different classes.
pub const DEFAULT_IOU_DIFFERENT_CLASS: f32 = 0.98;

/// Default score threshold for the first layout detection pass.
pub const DEFAULT_LAYOUT_SCORE_THRESHOLD: f32 = 0.3;

/// Default ceiling on concurrent recognizer invocations.
pub const DEFAULT_RECOGNITION_HARD_CAP: usize = 2;

/// Physical memory below which the automatic concurrency policy runs one worker.
pub const DEFAULT_LOW_MEMORY_THRESHOLD_BYTES: u64 = 24 * 1024 * 1024 * 1024;

/// Maximum horizontal drift between bullet-aligned neighbours.
pub const BULLET_ALIGNMENT_TOLERANCE: i32 = 10;

/// Longest word the hyphenation merge will reconstruct.
pub const MAX_HYPHENATED_WORD_LEN: usize = 64;

/// The default page count at or below which pages are formatted sequentially.
pub const DEFAULT_PAGE_PARALLEL_THRESHOLD: usize = 4;

/// Default filename prefix for cropped Markdown images.
pub const DEFAULT_CROP_PREFIX: &str = "cropped";
