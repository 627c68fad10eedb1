//! Observability Controller Library
//!
//! Reconciles a managed Prometheus deployment from the Observability
//! custom resource and externally hosted repository indexes.
//! Tests are included in the module files.

pub mod constants;
pub mod controller;
pub mod crd;
pub mod monitoring;
pub mod observability;
pub mod server;

pub use controller::reconciler::{ControllerConfig, PrometheusReconciler, ReconcilerError};
pub use crd::{Observability, ObservabilitySpec, ObservabilityStatus, RepositoryIndex};
pub use monitoring::{Prometheus, PrometheusSpec};
