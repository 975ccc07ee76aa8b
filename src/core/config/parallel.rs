//! Shared parallel processing configuration types.

use crate::core::constants::DEFAULT_PAGE_PARALLEL_THRESHOLD;
use crate::core::errors::{OCRError, OcrResult};
use serde::{Deserialize, Serialize};

/// Configuration for the data-parallel parts of the pipeline.
///
/// Formatting is a pure function per page, so large documents are fanned out
/// over the rayon pool. Small inputs stay sequential to avoid pool overhead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParallelPolicy {
    /// Maximum number of threads for the formatter fan-out.
    /// If None, rayon will use the default thread pool size (typically number of CPU cores).
    /// Default: None (use rayon's default)
    #[serde(default)]
    pub max_threads: Option<usize>,

    /// Threshold for number of pages to format sequentially (<= this uses sequential)
    /// Default: 4
    #[serde(default = "ParallelPolicy::default_page_threshold")]
    pub page_threshold: usize,
}

impl ParallelPolicy {
    /// Create a new ParallelPolicy with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of threads.
    pub fn with_max_threads(mut self, max_threads: Option<usize>) -> Self {
        self.max_threads = max_threads;
        self
    }

    /// Set the page formatting threshold.
    pub fn with_page_threshold(mut self, threshold: usize) -> Self {
        self.page_threshold = threshold;
        self
    }

    /// Returns true when `page_count` pages should be formatted in parallel.
    pub fn use_parallel_for_pages(&self, page_count: usize) -> bool {
        page_count > self.page_threshold
    }

    /// Validates the policy.
    pub fn validate(&self) -> OcrResult<()> {
        if self.max_threads == Some(0) {
            return Err(OCRError::config_error_with_context(
                "max_threads",
                "0",
                "must be at least 1 when set",
            ));
        }
        Ok(())
    }

    /// Default value for page threshold.
    fn default_page_threshold() -> usize {
        DEFAULT_PAGE_PARALLEL_THRESHOLD
    }
}

impl Default for ParallelPolicy {
    fn default() -> Self {
        Self {
            max_threads: None,
            page_threshold: Self::default_page_threshold(),
        }
    }
}
