//! # Route Host Resolution
//!
//! Best-effort lookup of the externally reachable hostname for the
//! Prometheus UI. The OpenShift Route type is not part of the core API,
//! so it is read as a dynamic object. A missing or not-yet-admitted
//! route is an expected transient state and yields no host, never an
//! error.

use crate::controller::model;
use kube::api::{ApiResource, DynamicObject, GroupVersionKind};
use kube::{Api, Client};
use serde_json::Value;
use tracing::debug;

/// Hostname of the Prometheus route, or `None` while the route is not
/// ready.
pub async fn prometheus_host(client: Client, namespace: &str) -> Option<String> {
    let gvk = GroupVersionKind::gvk("route.openshift.io", "v1", "Route");
    let resource = ApiResource::from_gvk(&gvk);
    let api: Api<DynamicObject> = Api::namespaced_with(client, namespace, &resource);

    let route = match api.get_opt(model::PROMETHEUS_NAME).await {
        Ok(Some(route)) => route,
        Ok(None) => {
            debug!("prometheus route not found yet");
            return None;
        }
        Err(err) => {
            debug!("prometheus route lookup failed: {}", err);
            return None;
        }
    };

    if !route_is_admitted(&route.data) {
        debug!("prometheus route not admitted yet");
        return None;
    }

    route.data["spec"]["host"].as_str().map(str::to_string)
}

fn route_is_admitted(data: &Value) -> bool {
    let Some(ingresses) = data["status"]["ingress"].as_array() else {
        return false;
    };
    ingresses.iter().any(|ingress| {
        ingress["conditions"]
            .as_array()
            .is_some_and(|conditions| {
                conditions
                    .iter()
                    .any(|c| c["type"] == "Admitted" && c["status"] == "True")
            })
    })
}
