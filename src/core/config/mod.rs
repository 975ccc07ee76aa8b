//! Configuration management for the layout pipeline.
//!
//! This module provides the shared policy types; component-specific options
//! live next to the component that consumes them.

pub mod concurrency;
pub mod parallel;

pub use concurrency::{ConcurrencyPolicy, RegionConcurrency};
pub use parallel::ParallelPolicy;
