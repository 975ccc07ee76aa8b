//! Utility functions for the layout pipeline.
//!
//! This module provides region cropping, text normalization helpers used by the
//! formatter, the Markdown image post-pass and logging setup.

pub mod crop;
pub mod markdown;
pub mod text;

pub use crop::crop_region;
pub use markdown::{CroppedMarkdown, MarkdownImageRef, crop_and_replace_images, extract_image_refs};

/// Initializes the tracing subscriber for logging.
///
/// This function sets up the tracing subscriber with environment filter and formatting layer.
/// It's typically called at the start of an application to enable logging.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}
