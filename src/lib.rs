//! # OAR OCR Layout
//!
//! Layout-first document parsing. A layout detector proposes regions on a
//! page; this crate turns those raw detections into an ordered, deduplicated
//! region list, recognizes each region with bounded concurrency, and renders
//! the result as a structured document and Markdown.
//!
//! Model inference is not part of this crate. Detectors and recognizers are
//! supplied by the caller through the [`LayoutDetector`](pipeline::LayoutDetector)
//! and [`RegionRecognizer`](pipeline::RegionRecognizer) traits.
//!
//! ## Features
//!
//! - Deterministic post-processing: NMS, containment merging, reading order, unclipping
//! - Bounded-concurrency region recognition that preserves reading order
//! - Cooperative cancellation with no partial page output
//! - Markdown rendering with titles, formulas, lists and image placeholders
//! - Block-list JSON export and an opt-in image cropping post-pass
//!
//! ## Modules
//!
//! * [`core`] - Errors, configuration, constants and cancellation
//! * [`domain`] - Label policy and document structure types
//! * [`pipeline`] - Document parser, region dispatcher and page selection
//! * [`processors`] - Geometry, layout post-processing and result formatting
//! * [`utils`] - Cropping, text helpers, Markdown image post-pass and logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use oar_ocr_layout::prelude::*;
//! use async_trait::async_trait;
//! use image::RgbImage;
//! use std::sync::Arc;
//!
//! struct MyDetector;
//!
//! #[async_trait]
//! impl LayoutDetector for MyDetector {
//!     async fn detect(&self, _image: &RgbImage, _score_threshold: f32) -> OcrResult<RawDetections> {
//!         // Run a PP-DocLayout model here.
//!         Ok(RawDetections::default())
//!     }
//! }
//!
//! struct MyRecognizer;
//!
//! #[async_trait]
//! impl RegionRecognizer for MyRecognizer {
//!     async fn recognize(&self, _image: RgbImage, _task: RecognitionTask) -> OcrResult<String> {
//!         // Run a text/table/formula recognition model here.
//!         Ok(String::new())
//!     }
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let parser = DocParser::new(
//!     Arc::new(MyDetector),
//!     Arc::new(MyRecognizer),
//!     LayoutLabelConfig::pp_doclayout_v3(),
//!     DocParserConfig::default(),
//! )?;
//!
//! let page = image::open("page.png")?.to_rgb8();
//! let parsed = parser.parse_page(0, page, &CancellationToken::new()).await?;
//! println!("{}", parsed.markdown);
//! println!("{}", parsed.document.to_block_list_json(true)?);
//! # Ok(())
//! # }
//! ```

// Core modules
pub mod core;
pub mod domain;
pub mod pipeline;
pub mod processors;
pub mod utils;

/// Prelude module for convenient imports.
///
/// Bring the essentials into scope with a single use statement:
///
/// ```rust
/// use oar_ocr_layout::prelude::*;
/// ```
///
/// Included items focus on the most common tasks:
/// - Parser and collaborator traits (`DocParser`, `LayoutDetector`, `RegionRecognizer`)
/// - Configuration (`DocParserConfig`, `LayoutLabelConfig`)
/// - Results (`ParsedDocument`, `Document`, `ProcessedRegion`)
/// - Essential error and result types (`OCRError`, `OcrResult`)
///
/// For lower-level pieces (post-processing options, formatter helpers,
/// geometry), import directly from `oar_ocr_layout::processors`.
pub mod prelude {
    // Pipeline (essential)
    pub use crate::pipeline::{
        DocParser, DocParserConfig, LayoutDetector, PageSelection, ParsedDocument,
        RegionRecognizer,
    };

    // Domain types
    pub use crate::domain::{
        Document, LayoutLabelConfig, Page, ProcessedRegion, RecognitionTask,
    };
    pub use crate::processors::{NormalizedBBox, RawDetections};

    // Error Handling and cancellation (essential)
    pub use crate::core::{CancellationToken, OCRError, OcrResult};
}
