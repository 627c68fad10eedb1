//! # Reconciler Context and Errors

use crate::constants;
use crate::controller::fetcher::{FetchError, IndexFetcher};
use kube::Client;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by the reconciliation pipeline.
///
/// Fatal variants abort the pass and are retried by the controller's
/// error policy. Per-index variants are caught inside the assembler,
/// logged, and the offending index is skipped.
#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("index document fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("failed to parse index document: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("grafana datasource secret not found under any known name")]
    DatasourceSecretMissing,
    #[error("datasource secret is not usable: {0}")]
    DatasourceSecretInvalid(String),
    #[error("no observatorium config found for {0}")]
    MissingObservatoriumConfig(String),
    #[error("unknown auth type for observatorium {0}")]
    UnknownAuthType(String),
    #[error("invalid storage quantity {quantity:?}: {reason}")]
    InvalidStorageQuantity { quantity: String, reason: String },
    #[error(transparent)]
    Kube(#[from] kube::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Values that used to be process-wide constants, injected so tests can
/// substitute their own.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub prometheus_base_image: String,
    pub default_prometheus_version: String,
    pub default_retention: String,
    pub oauth_proxy_image: String,
    pub blackbox_exporter_image: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            prometheus_base_image: constants::PROMETHEUS_BASE_IMAGE.to_string(),
            default_prometheus_version: constants::PROMETHEUS_DEFAULT_VERSION.to_string(),
            default_retention: constants::PROMETHEUS_DEFAULT_RETENTION.to_string(),
            oauth_proxy_image: constants::OAUTH_PROXY_IMAGE.to_string(),
            blackbox_exporter_image: constants::BLACKBOX_EXPORTER_IMAGE.to_string(),
        }
    }
}

/// Shared context handed to every reconcile invocation
#[derive(Clone)]
pub struct PrometheusReconciler {
    pub client: Client,
    pub fetcher: Arc<dyn IndexFetcher>,
    pub config: ControllerConfig,
}

impl PrometheusReconciler {
    pub fn new(client: Client, fetcher: Arc<dyn IndexFetcher>, config: ControllerConfig) -> Self {
        PrometheusReconciler {
            client,
            fetcher,
            config,
        }
    }
}

impl std::fmt::Debug for PrometheusReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusReconciler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
