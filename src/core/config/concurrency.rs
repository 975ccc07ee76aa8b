//! Recognition concurrency policy.
//!
//! The dispatcher bounds in-flight recognizer calls, not the total number of
//! work items. The bound is resolved once per run from this policy.

use crate::core::constants::{DEFAULT_LOW_MEMORY_THRESHOLD_BYTES, DEFAULT_RECOGNITION_HARD_CAP};
use crate::core::errors::{OCRError, OcrResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How many recognizer calls may run at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyPolicy {
    /// One worker on low-memory hosts, two otherwise.
    #[default]
    Auto,
    /// A fixed number of workers.
    Fixed(usize),
}

/// Concurrency configuration for region recognition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConcurrency {
    /// Worker-count policy.
    #[serde(default)]
    pub policy: ConcurrencyPolicy,

    /// Safety ceiling applied after the policy.
    /// Default: 2
    #[serde(default = "RegionConcurrency::default_hard_cap")]
    pub hard_cap: usize,

    /// Physical memory (bytes) below which `Auto` picks a single worker.
    /// Default: 24 GiB
    #[serde(default = "RegionConcurrency::default_low_memory_threshold_bytes")]
    pub low_memory_threshold_bytes: u64,
}

impl RegionConcurrency {
    /// Create a new RegionConcurrency with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker-count policy.
    pub fn with_policy(mut self, policy: ConcurrencyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the hard cap.
    pub fn with_hard_cap(mut self, hard_cap: usize) -> Self {
        self.hard_cap = hard_cap;
        self
    }

    /// Set the low-memory threshold.
    pub fn with_low_memory_threshold_bytes(mut self, bytes: u64) -> Self {
        self.low_memory_threshold_bytes = bytes;
        self
    }

    /// Resolves the worker count for a host with `physical_memory` bytes of RAM.
    ///
    /// The result is always within `[1, max(1, hard_cap)]`.
    pub fn resolve(&self, physical_memory: u64) -> usize {
        let base = match self.policy {
            ConcurrencyPolicy::Auto => {
                if physical_memory < self.low_memory_threshold_bytes {
                    1
                } else {
                    2
                }
            }
            ConcurrencyPolicy::Fixed(n) => n,
        };
        base.max(1).min(self.hard_cap.max(1))
    }

    /// Resolves the worker count using the physical memory of the current host.
    pub fn resolve_for_host(&self) -> usize {
        let physical_memory = host_physical_memory();
        let resolved = self.resolve(physical_memory);
        debug!(
            physical_memory,
            policy = ?self.policy,
            hard_cap = self.hard_cap,
            resolved,
            "resolved recognition concurrency"
        );
        resolved
    }

    /// Validates the configuration.
    pub fn validate(&self) -> OcrResult<()> {
        if self.hard_cap == 0 {
            return Err(OCRError::config_error_with_context(
                "hard_cap",
                "0",
                "must be at least 1",
            ));
        }
        if self.policy == ConcurrencyPolicy::Fixed(0) {
            return Err(OCRError::config_error_with_context(
                "policy",
                "fixed(0)",
                "fixed concurrency must be at least 1",
            ));
        }
        Ok(())
    }

    fn default_hard_cap() -> usize {
        DEFAULT_RECOGNITION_HARD_CAP
    }

    fn default_low_memory_threshold_bytes() -> u64 {
        DEFAULT_LOW_MEMORY_THRESHOLD_BYTES
    }
}

impl Default for RegionConcurrency {
    fn default() -> Self {
        Self {
            policy: ConcurrencyPolicy::default(),
            hard_cap: Self::default_hard_cap(),
            low_memory_threshold_bytes: Self::default_low_memory_threshold_bytes(),
        }
    }
}

/// Total physical memory of the host in bytes.
fn host_physical_memory() -> u64 {
    let mut system = sysinfo::System::new();
    system.refresh_memory();
    system.total_memory()
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIB: u64 = 1024 * 1024 * 1024;

    #[test]
    fn test_auto_depends_on_memory() {
        let config = RegionConcurrency::new();
        assert_eq!(config.resolve(8 * GIB), 1);
        assert_eq!(config.resolve(24 * GIB), 2);
        assert_eq!(config.resolve(64 * GIB), 2);
    }

    #[test]
    fn test_fixed_is_clamped_to_hard_cap() {
        let config = RegionConcurrency::new().with_policy(ConcurrencyPolicy::Fixed(8));
        assert_eq!(config.resolve(0), 2);

        let config = config.with_hard_cap(16);
        assert_eq!(config.resolve(0), 8);

        let config = RegionConcurrency::new()
            .with_policy(ConcurrencyPolicy::Fixed(0))
            .with_hard_cap(0);
        assert_eq!(config.resolve(0), 1);
    }

    #[test]
    fn test_auto_with_cap_of_one() {
        let config = RegionConcurrency::new().with_hard_cap(1);
        assert_eq!(config.resolve(128 * GIB), 1);
    }

    #[test]
    fn test_validate() {
        assert!(RegionConcurrency::new().validate().is_ok());
        assert!(RegionConcurrency::new().with_hard_cap(0).validate().is_err());
        assert!(
            RegionConcurrency::new()
                .with_policy(ConcurrencyPolicy::Fixed(0))
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_host_resolution_is_within_bounds() {
        let resolved = RegionConcurrency::new().resolve_for_host();
        assert!((1..=2).contains(&resolved));
    }

    #[test]
    fn test_deserialize_fixed_policy() {
        let config: RegionConcurrency =
            serde_json::from_str(r#"{"policy":{"fixed":3},"hard_cap":4}"#).unwrap();
        assert_eq!(config.policy, ConcurrencyPolicy::Fixed(3));
        assert_eq!(config.resolve(0), 3);
        assert_eq!(config.low_memory_threshold_bytes, 24 * GIB);
    }
}
