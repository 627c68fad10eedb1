//! # Observability
//!
//! Metrics for the controller itself.

pub mod metrics;

pub use metrics::*;
