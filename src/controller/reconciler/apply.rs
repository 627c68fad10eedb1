//! # Idempotent Apply
//!
//! Writes the assembled desired state into the cluster. Every object is
//! read first and only replaced when the owned content differs, so a
//! steady-state reconcile performs no writes.

use crate::controller::model;
use crate::controller::reconciler::assemble::DesiredState;
use crate::controller::reconciler::types::{PrometheusReconciler, ReconcilerError};
use crate::crd::Observability;
use crate::monitoring::{Prometheus, PrometheusSpec};
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use k8s_openapi::ByteString;
use kube::api::{ObjectMeta, PostParams};
use kube::Api;
use std::collections::BTreeMap;
use tracing::info;

/// Apply the desired state to the cluster, namespace of the custom
/// resource.
pub async fn apply(
    ctx: &PrometheusReconciler,
    cr: &Observability,
    desired: &DesiredState,
) -> Result<(), ReconcilerError> {
    let namespace = cr.namespace_or_default();

    apply_scrape_config_secret(ctx, namespace, &desired.additional_scrape_config).await?;
    apply_black_box_config_map(ctx, namespace, &desired.black_box_config).await?;
    apply_prometheus(ctx, namespace, &desired.prometheus).await?;

    Ok(())
}

async fn apply_scrape_config_secret(
    ctx: &PrometheusReconciler,
    namespace: &str,
    scrape_config: &str,
) -> Result<(), ReconcilerError> {
    let api: Api<Secret> = Api::namespaced(ctx.client.clone(), namespace);

    let mut data = BTreeMap::new();
    data.insert(
        model::ADDITIONAL_SCRAPE_CONFIG_KEY.to_string(),
        ByteString(scrape_config.as_bytes().to_vec()),
    );

    match api.get_opt(model::ADDITIONAL_SCRAPE_CONFIG_SECRET).await? {
        None => {
            let secret = Secret {
                metadata: ObjectMeta {
                    name: Some(model::ADDITIONAL_SCRAPE_CONFIG_SECRET.to_string()),
                    namespace: Some(namespace.to_string()),
                    ..ObjectMeta::default()
                },
                type_: Some("Opaque".to_string()),
                data: Some(data),
                ..Secret::default()
            };
            info!("creating scrape config secret");
            api.create(&PostParams::default(), &secret).await?;
        }
        Some(mut existing) => {
            if existing.data.as_ref() != Some(&data) {
                existing.data = Some(data);
                info!("updating scrape config secret");
                api.replace(
                    model::ADDITIONAL_SCRAPE_CONFIG_SECRET,
                    &PostParams::default(),
                    &existing,
                )
                .await?;
            }
        }
    }

    Ok(())
}

async fn apply_black_box_config_map(
    ctx: &PrometheusReconciler,
    namespace: &str,
    config: &str,
) -> Result<(), ReconcilerError> {
    let api: Api<ConfigMap> = Api::namespaced(ctx.client.clone(), namespace);

    let mut data = BTreeMap::new();
    data.insert(model::BLACK_BOX_CONFIG_KEY.to_string(), config.to_string());

    match api.get_opt(model::BLACK_BOX_CONFIG_MAP).await? {
        None => {
            let config_map = ConfigMap {
                metadata: ObjectMeta {
                    name: Some(model::BLACK_BOX_CONFIG_MAP.to_string()),
                    namespace: Some(namespace.to_string()),
                    ..ObjectMeta::default()
                },
                data: Some(data),
                ..ConfigMap::default()
            };
            info!("creating black-box exporter config map");
            api.create(&PostParams::default(), &config_map).await?;
        }
        Some(mut existing) => {
            if existing.data.as_ref() != Some(&data) {
                existing.data = Some(data);
                info!("updating black-box exporter config map");
                api.replace(
                    model::BLACK_BOX_CONFIG_MAP,
                    &PostParams::default(),
                    &existing,
                )
                .await?;
            }
        }
    }

    Ok(())
}

async fn apply_prometheus(
    ctx: &PrometheusReconciler,
    namespace: &str,
    desired: &PrometheusSpec,
) -> Result<(), ReconcilerError> {
    let api: Api<Prometheus> = Api::namespaced(ctx.client.clone(), namespace);

    match api.get_opt(model::PROMETHEUS_NAME).await? {
        None => {
            let mut prometheus = Prometheus::new(model::PROMETHEUS_NAME, desired.clone());
            prometheus.metadata.namespace = Some(namespace.to_string());
            prometheus.metadata.labels = Some(
                [("app".to_string(), "prometheus".to_string())]
                    .into_iter()
                    .collect(),
            );
            info!("creating prometheus");
            api.create(&PostParams::default(), &prometheus).await?;
        }
        Some(mut existing) => {
            let merged = merge_spec(&existing.spec, desired);
            if existing.spec != merged {
                existing.spec = merged;
                info!("updating prometheus");
                api.replace(model::PROMETHEUS_NAME, &PostParams::default(), &existing)
                    .await?;
            }
        }
    }

    Ok(())
}

/// Overlay the owned fields onto an existing spec.
///
/// Passthrough fields survive verbatim, and an absent storage,
/// tolerations or affinity stanza leaves whatever is already there
/// untouched.
fn merge_spec(existing: &PrometheusSpec, desired: &PrometheusSpec) -> PrometheusSpec {
    let mut merged = desired.clone();
    merged.additional = existing.additional.clone();
    if merged.storage.is_none() {
        merged.storage = existing.storage.clone();
    }
    if merged.tolerations.is_none() {
        merged.tolerations = existing.tolerations.clone();
    }
    if merged.affinity.is_none() {
        merged.affinity = existing.affinity.clone();
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::StorageSpec;
    use serde_json::json;

    #[test]
    fn merge_preserves_passthrough_fields() {
        let mut existing = PrometheusSpec {
            retention: Some("10d".to_string()),
            ..PrometheusSpec::default()
        };
        existing
            .additional
            .insert("scrapeInterval".to_string(), json!("30s"));

        let desired = PrometheusSpec {
            retention: Some("45d".to_string()),
            ..PrometheusSpec::default()
        };

        let merged = merge_spec(&existing, &desired);
        assert_eq!(merged.retention.as_deref(), Some("45d"));
        assert_eq!(merged.additional["scrapeInterval"], json!("30s"));
    }

    #[test]
    fn merge_keeps_existing_storage_when_unmanaged() {
        let existing = PrometheusSpec {
            storage: Some(StorageSpec::default()),
            ..PrometheusSpec::default()
        };
        let desired = PrometheusSpec::default();

        let merged = merge_spec(&existing, &desired);
        assert!(merged.storage.is_some());
    }

    #[test]
    fn merge_is_a_no_op_at_steady_state() {
        let desired = PrometheusSpec {
            retention: Some("45d".to_string()),
            image: Some("quay.io/prometheus/prometheus:v2.24.0".to_string()),
            ..PrometheusSpec::default()
        };
        let merged = merge_spec(&desired, &desired);
        assert_eq!(merged, desired);
    }
}
