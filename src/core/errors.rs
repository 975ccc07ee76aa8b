//! Error types for the layout parsing pipeline.
//!
//! This module defines the error taxonomy used throughout the crate:
//! input-contract violations from the detector, policy violations surfaced at
//! dispatch time, collaborator failures (detector/recognizer), cancellation,
//! and the usual configuration and IO errors. It also provides helper
//! constructors for creating these errors with appropriate context.

use thiserror::Error;

/// Errors produced while cropping a region out of a page image.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageCropError {
    /// The page image has no pixels.
    #[error("page image is empty ({width}x{height})")]
    EmptyImage {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
    },

    /// The normalized bbox violates `0 <= x1 < x2 <= 1000` / `0 <= y1 < y2 <= 1000`.
    #[error("invalid normalized bbox [{x1}, {y1}, {x2}, {y2}]")]
    InvalidBBox {
        /// Left edge.
        x1: i32,
        /// Top edge.
        y1: i32,
        /// Right edge.
        x2: i32,
        /// Bottom edge.
        y2: i32,
    },

    /// The bbox maps to an empty pixel rectangle after intersecting with the image.
    #[error("crop rectangle is empty after clamping to the image")]
    EmptyCropRect,
}

/// A display-only error, used to wrap foreign errors that are not `std::error::Error`.
#[derive(Debug)]
pub struct OpaqueError(String);

impl OpaqueError {
    /// Wraps anything printable as an error.
    pub fn from_display(value: impl std::fmt::Display) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for OpaqueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for OpaqueError {}

/// Enum representing the errors that can occur in the layout parsing pipeline.
#[derive(Error, Debug)]
pub enum OCRError {
    /// The detector returned parallel arrays of different lengths.
    #[error(
        "invalid raw detection counts: scores={scores}, labels={labels}, boxes={boxes}"
    )]
    InvalidRawCounts {
        /// Number of scores.
        scores: usize,
        /// Number of class labels.
        labels: usize,
        /// Number of boxes.
        boxes: usize,
    },

    /// A region whose label maps to the `abandon` task reached the dispatcher.
    #[error("unexpected abandon region at index {index} (label '{label}')")]
    UnexpectedAbandonRegion {
        /// Reading-order index of the offending region.
        index: usize,
        /// Native label of the offending region.
        label: String,
    },

    /// Cooperative cancellation was observed.
    #[error("cancelled: {context}")]
    Cancelled {
        /// Where the cancellation was observed.
        context: String,
    },

    /// A single region failed to crop or recognize, failing its whole page.
    #[error("page {page_index}: region {region_index} ('{label}') failed")]
    RegionFailed {
        /// Page index of the region.
        page_index: usize,
        /// Reading-order index of the region.
        region_index: usize,
        /// Native label of the region.
        label: String,
        /// The underlying failure.
        #[source]
        source: Box<OCRError>,
    },

    /// A model collaborator (detector or recognizer) failed.
    #[error("inference failed in '{model_name}': {context}")]
    Inference {
        /// Name of the model collaborator.
        model_name: String,
        /// Additional context about the error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Region cropping failed.
    #[error("crop")]
    Crop(#[from] ImageCropError),

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// A page selection string could not be parsed or resolved.
    #[error("page selection")]
    PageSelection(#[from] crate::pipeline::pages::PageSelectionError),

    /// A worker task panicked or could not be joined.
    #[error("task join")]
    TaskJoin(#[from] tokio::task::JoinError),

    /// Error occurred while decoding or encoding an image.
    #[error("image codec")]
    Image(#[from] image::ImageError),

    /// JSON (de)serialization error.
    #[error("serialization")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

impl OCRError {
    /// Creates an OCRError for a failing model collaborator.
    ///
    /// # Arguments
    ///
    /// * `model_name` - The collaborator that failed (e.g. `layout_detection`).
    /// * `context` - Additional context about the error.
    /// * `error` - The underlying error that caused this error.
    pub fn inference_error(
        model_name: impl Into<String>,
        context: impl Into<String>,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Inference {
            model_name: model_name.into(),
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Creates an OCRError for invalid input.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates an OCRError for configuration errors.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Creates an OCRError for configuration errors with context.
    ///
    /// # Arguments
    ///
    /// * `field` - The field where the error occurred.
    /// * `value` - The value of the field.
    /// * `reason` - The reason for the error.
    pub fn config_error_with_context(field: &str, value: &str, reason: &str) -> Self {
        Self::ConfigError {
            message: format!(
                "Configuration error in field '{}' with value '{}': {}",
                field, value, reason
            ),
        }
    }

    /// Creates a cancellation error.
    pub fn cancelled(context: impl Into<String>) -> Self {
        Self::Cancelled {
            context: context.into(),
        }
    }

    /// Wraps a failure of a single region so the page-level error identifies it.
    pub fn region_failed(
        page_index: usize,
        region_index: usize,
        label: impl Into<String>,
        error: OCRError,
    ) -> Self {
        Self::RegionFailed {
            page_index,
            region_index,
            label: label.into(),
            source: Box::new(error),
        }
    }

    /// Returns true when this error (or the region failure it wraps) is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled { .. } => true,
            Self::RegionFailed { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

/// Convenient result alias for pipeline operations.
pub type OcrResult<T> = Result<T, OCRError>;
