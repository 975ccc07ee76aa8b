//! The core module of the layout pipeline.
//!
//! This module contains the fundamental components shared by every stage:
//! - Cooperative cancellation
//! - Configuration policies
//! - Constants used throughout the pipeline
//! - Error handling

pub mod cancel;
pub mod config;
pub mod constants;
pub mod errors;

pub use cancel::CancellationToken;
pub use config::{ConcurrencyPolicy, ParallelPolicy, RegionConcurrency};
pub use constants::*;
pub use errors::{ImageCropError, OCRError, OcrResult, OpaqueError};
