//! # Status Updates
//!
//! Records the cluster id and the last successful sync time on the
//! Observability resource after each pass.

use crate::controller::reconciler::types::PrometheusReconciler;
use crate::crd::{Observability, ObservabilityStatus};
use anyhow::Result;
use kube::api::{ApiResource, DynamicObject, GroupVersionKind, Patch, PatchParams};
use kube::{Api, Client};
use tracing::debug;

/// Cluster id from the OpenShift ClusterVersion object. Best effort, the
/// external label stays empty on clusters without it.
pub async fn fetch_cluster_id(client: Client) -> Option<String> {
    let gvk = GroupVersionKind::gvk("config.openshift.io", "v1", "ClusterVersion");
    let resource = ApiResource::from_gvk(&gvk);
    let api: Api<DynamicObject> = Api::all_with(client, &resource);

    match api.get_opt("version").await {
        Ok(Some(version)) => version.data["spec"]["clusterID"].as_str().map(str::to_string),
        Ok(None) => {
            debug!("no ClusterVersion object found");
            None
        }
        Err(err) => {
            debug!("cluster id lookup failed: {}", err);
            None
        }
    }
}

/// Patch the resource status after a successful pass
pub async fn update_status(ctx: &PrometheusReconciler, cr: &Observability) -> Result<()> {
    let api: Api<Observability> =
        Api::namespaced(ctx.client.clone(), cr.namespace_or_default());

    let cluster_id = match cr.status.as_ref().and_then(|s| s.cluster_id.clone()) {
        Some(id) => Some(id),
        None => fetch_cluster_id(ctx.client.clone()).await,
    };

    let status = ObservabilityStatus {
        cluster_id,
        last_synced: Some(chrono::Utc::now().to_rfc3339()),
    };

    api.patch_status(
        cr.name_or_unknown(),
        &PatchParams::apply("observability-controller"),
        &Patch::Merge(serde_json::json!({ "status": status })),
    )
    .await?;

    Ok(())
}
