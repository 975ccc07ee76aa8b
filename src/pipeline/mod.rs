//! The layout parsing pipeline.
//!
//! [`DocParser`] runs detection, post-processing, region recognition and
//! formatting for pages and documents. [`RegionDispatcher`] is the
//! bounded-concurrency recognition stage and can be used on its own.

pub mod dispatcher;
pub mod pages;
pub mod parser;

pub use dispatcher::{RegionDispatcher, RegionRecognizer};
pub use pages::{PageSelection, PageSelectionError};
pub use parser::{DocParser, DocParserConfig, LayoutDetector, ParsedDocument};
