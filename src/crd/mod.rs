//! # Custom Resource Definitions
//!
//! CRD types consumed and produced by the controller.
//!
//! - `observability.rs` - the `Observability` custom resource owned by this
//!   operator (retention, storage, self-contained overrides)
//! - `index.rs` - repository index documents contributed by tenants, plus
//!   the remote-write document fetched per index

mod index;
mod observability;

pub use index::{
    AuthType, ObservatoriumIndex, PrometheusIndex, RemoteWriteIndex, RepositoryConfig,
    RepositoryIndex,
};
pub use observability::{
    Observability, ObservabilitySpec, ObservabilityStatus, SelfContained, Storage,
};

/// Schema hook for fields typed with upstream Kubernetes structs.
///
/// `k8s-openapi` types do not implement `JsonSchema`, so these fields are
/// published as `x-kubernetes-preserve-unknown-fields` in the generated CRD.
pub fn preserve_arbitrary(_generator: &mut schemars::SchemaGenerator) -> schemars::Schema {
    schemars::json_schema!({
        "x-kubernetes-preserve-unknown-fields": true
    })
}
