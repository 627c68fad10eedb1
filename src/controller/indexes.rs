//! # Repository Index Discovery
//!
//! Repository indexes are registered by tenants as config maps in the
//! custom resource namespace, labeled for this operator and carrying the
//! index document under `index.json`. Discovery failures are fatal for
//! the reconcile pass; a malformed individual document is skipped with a
//! warning so one tenant cannot block everyone else.

use crate::constants;
use crate::crd::RepositoryIndex;
use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::ListParams;
use kube::{Api, Client};
use tracing::warn;

/// List repository indexes registered in the given namespace.
///
/// Order follows the list response (name order) so the aggregate output
/// is stable across passes.
pub async fn discover_indexes(client: Client, namespace: &str) -> Result<Vec<RepositoryIndex>> {
    let api: Api<ConfigMap> = Api::namespaced(client, namespace);
    let params = ListParams::default().labels(constants::INDEX_CONFIG_MAP_LABEL);
    let config_maps = api
        .list(&params)
        .await
        .context("failed to list repository index config maps")?;

    let mut indexes = Vec::new();
    for cm in config_maps {
        let name = cm.metadata.name.as_deref().unwrap_or("unknown").to_string();
        let Some(raw) = cm
            .data
            .as_ref()
            .and_then(|d| d.get(constants::INDEX_CONFIG_MAP_KEY))
        else {
            warn!("config map {} has no {} key, skipping", name, constants::INDEX_CONFIG_MAP_KEY);
            continue;
        };

        match serde_json::from_str::<RepositoryIndex>(raw) {
            Ok(index) => indexes.push(index),
            Err(err) => {
                warn!("config map {} has a malformed index document: {}", name, err);
            }
        }
    }

    Ok(indexes)
}
