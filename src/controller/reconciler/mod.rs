//! # Prometheus Reconciler
//!
//! Turns the Observability custom resource plus the discovered repository
//! indexes into a managed Prometheus instance.
//!
//! ## Reconciliation Flow
//!
//! 1. Discover repository indexes from labeled config maps
//! 2. Aggregate federation match patterns across indexes
//! 3. Resolve openshift-monitoring credentials
//! 4. Resolve remote-write targets per index
//! 5. Assemble the complete desired state
//! 6. Apply it, writing only what actually changed
//! 7. Record status

pub mod apply;
pub mod assemble;
pub mod credentials;
pub mod federation;
pub mod reconcile;
pub mod remote_write;
pub mod status;
pub mod storage;
pub mod types;
pub mod validation;

pub use reconcile::{error_policy, reconcile};
pub use types::{ControllerConfig, PrometheusReconciler, ReconcilerError};
