//! # Observability Custom Resource
//!
//! The single custom resource owned by this operator. Carries the knobs a
//! cluster admin may set (retention, storage, scheduling) plus an optional
//! self-contained section that replaces external repository index sync
//! with values supplied directly on the resource.

use crate::monitoring::StorageSpec;
use k8s_openapi::api::core::v1::{Affinity, Toleration};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "observability.redhat.com",
    version = "v1",
    kind = "Observability",
    plural = "observabilities",
    namespaced,
    status = "ObservabilityStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ObservabilitySpec {
    /// Retention for the time series database, e.g. "45d".
    /// Invalid values silently fall back to the default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention: Option<String>,
    /// Explicit storage override. Always wins over index-provided sizes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<Storage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "crate::crd::preserve_arbitrary")]
    pub tolerations: Option<Vec<Toleration>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "crate::crd::preserve_arbitrary")]
    pub affinity: Option<Affinity>,
    /// When set, external repository index sync is disabled and the values
    /// below replace what would have been fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_contained: Option<SelfContained>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Storage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prometheus: Option<StorageSpec>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SelfContained {
    /// Federation match patterns used instead of fetched pattern documents
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub federated_metrics: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prometheus_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_observatorium: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_blackbox_exporter: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "crate::crd::preserve_arbitrary")]
    pub pod_monitor_label_selector: Option<LabelSelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "crate::crd::preserve_arbitrary")]
    pub pod_monitor_namespace_selector: Option<LabelSelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "crate::crd::preserve_arbitrary")]
    pub service_monitor_label_selector: Option<LabelSelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "crate::crd::preserve_arbitrary")]
    pub service_monitor_namespace_selector: Option<LabelSelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "crate::crd::preserve_arbitrary")]
    pub rule_label_selector: Option<LabelSelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "crate::crd::preserve_arbitrary")]
    pub rule_namespace_selector: Option<LabelSelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "crate::crd::preserve_arbitrary")]
    pub probe_label_selector: Option<LabelSelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "crate::crd::preserve_arbitrary")]
    pub probe_namespace_selector: Option<LabelSelector>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObservabilityStatus {
    /// Cluster id attached to all samples via the cluster_id external label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced: Option<String>,
}

impl Observability {
    /// External repository index sync is disabled when the resource is
    /// self-contained.
    pub fn external_sync_disabled(&self) -> bool {
        self.spec.self_contained.is_some()
    }

    /// No remote-write targets are created when observatorium is disabled.
    pub fn observatorium_disabled(&self) -> bool {
        self.spec
            .self_contained
            .as_ref()
            .and_then(|sc| sc.disable_observatorium)
            .unwrap_or(false)
    }

    pub fn blackbox_exporter_disabled(&self) -> bool {
        self.spec
            .self_contained
            .as_ref()
            .and_then(|sc| sc.disable_blackbox_exporter)
            .unwrap_or(false)
    }

    /// Federation patterns supplied directly on the resource
    pub fn self_contained_federated_metrics(&self) -> Vec<String> {
        self.spec
            .self_contained
            .as_ref()
            .map(|sc| sc.federated_metrics.clone())
            .unwrap_or_default()
    }

    pub fn prometheus_version_override(&self) -> Option<&str> {
        self.spec
            .self_contained
            .as_ref()
            .and_then(|sc| sc.prometheus_version.as_deref())
    }

    pub fn namespace_or_default(&self) -> &str {
        self.metadata.namespace.as_deref().unwrap_or("default")
    }

    pub fn name_or_unknown(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or("unknown")
    }

    pub fn cluster_id(&self) -> &str {
        self.status
            .as_ref()
            .and_then(|s| s.cluster_id.as_deref())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cr_from_spec(spec: ObservabilitySpec) -> Observability {
        Observability::new("observability-stack", spec)
    }

    #[test]
    fn sync_disabled_only_when_self_contained() {
        let cr = cr_from_spec(ObservabilitySpec::default());
        assert!(!cr.external_sync_disabled());

        let cr = cr_from_spec(ObservabilitySpec {
            self_contained: Some(SelfContained::default()),
            ..ObservabilitySpec::default()
        });
        assert!(cr.external_sync_disabled());
    }

    #[test]
    fn disable_flags_default_to_enabled() {
        let cr = cr_from_spec(ObservabilitySpec {
            self_contained: Some(SelfContained::default()),
            ..ObservabilitySpec::default()
        });
        assert!(!cr.observatorium_disabled());
        assert!(!cr.blackbox_exporter_disabled());

        let cr = cr_from_spec(ObservabilitySpec {
            self_contained: Some(SelfContained {
                disable_observatorium: Some(true),
                disable_blackbox_exporter: Some(true),
                ..SelfContained::default()
            }),
            ..ObservabilitySpec::default()
        });
        assert!(cr.observatorium_disabled());
        assert!(cr.blackbox_exporter_disabled());
    }
}
