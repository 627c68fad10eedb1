//! # Repository Index Types
//!
//! A repository index is an externally hosted document describing the
//! monitoring configuration contributed by one tenant. Indexes are
//! discovered from labeled config maps and are immutable for the duration
//! of a reconcile pass.

use crate::monitoring::{QueueConfig, RelabelConfig};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One tenant's contribution to the monitoring configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryIndex {
    pub id: String,
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<RepositoryConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prometheus: Option<PrometheusIndex>,
    /// Observatorium instances this tenant may reference by id
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub observatoria: Vec<ObservatoriumIndex>,
}

/// Prometheus section of a repository index
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrometheusIndex {
    /// Relative path to the federation pattern document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub federation: Option<String>,
    /// Relative path to the remote-write document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_write: Option<String>,
    /// Id of the observatorium config to send remote-write traffic to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observatorium: Option<String>,
    /// Requested storage size for the time series database, e.g. "50Gi"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_size: Option<String>,
}

/// An external Observatorium gateway referenced from an index
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObservatoriumIndex {
    pub id: String,
    #[serde(default)]
    pub gateway: String,
    #[serde(default)]
    pub tenant: String,
    #[serde(default)]
    pub auth_type: AuthType,
}

/// Authentication strategy for remote-write traffic.
///
/// Closed set: anything the document author wrote that is not recognized
/// deserializes to `Unknown` and is rejected with a typed error at
/// dispatch time instead of falling through silently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    /// Direct bearer-token authentication against the gateway
    Dex,
    /// Proxying through the token-refresher sidecar
    Redhat,
    #[default]
    #[serde(other)]
    Unknown,
}

impl RepositoryIndex {
    /// Prometheus section, if the index declares one
    pub fn prometheus(&self) -> Option<&PrometheusIndex> {
        self.config.as_ref().and_then(|c| c.prometheus.as_ref())
    }

    /// Look up an observatorium config by id
    pub fn observatorium(&self, id: &str) -> Option<&ObservatoriumIndex> {
        self.config
            .as_ref()
            .and_then(|c| c.observatoria.iter().find(|o| o.id == id))
    }
}

/// Remote-write document fetched per index. Not persisted.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoteWriteIndex {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_timeout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_relabel_configs: Option<Vec<RelabelConfig>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_config: Option<QueueConfig>,
}
