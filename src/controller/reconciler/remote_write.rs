//! # Remote-Write Resolution
//!
//! Builds one remote-write target per repository index that declares a
//! remote-write document, dispatching on the auth type of the referenced
//! observatorium config.

use crate::controller::fetcher::IndexFetcher;
use crate::controller::model;
use crate::controller::reconciler::types::ReconcilerError;
use crate::crd::{AuthType, Observability, ObservatoriumIndex, RemoteWriteIndex, RepositoryIndex};
use crate::monitoring::{RemoteWriteSpec, TlsConfig};

/// A resolved remote-write target and, for direct bearer-token auth, the
/// name of the secret whose token must be mounted into the pods.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRemoteWrite {
    pub spec: RemoteWriteSpec,
    pub token_secret: Option<String>,
}

/// Resolve the remote-write target for one index.
///
/// Returns `Ok(None)` when the index declares no remote-write document.
/// Fetch, parse and dispatch failures are returned to the caller, which
/// skips the index and continues with the rest.
pub async fn resolve_remote_write(
    fetcher: &dyn IndexFetcher,
    cr: &Observability,
    index: &RepositoryIndex,
) -> Result<Option<ResolvedRemoteWrite>, ReconcilerError> {
    let Some(prometheus) = index.prometheus() else {
        return Ok(None);
    };
    let Some(path) = prometheus.remote_write.as_deref() else {
        return Ok(None);
    };

    let url = format!("{}/{}", index.base_url, path);
    let bytes = fetcher
        .fetch(&url, index.tag.as_deref(), index.access_token.as_deref())
        .await?;
    let document: RemoteWriteIndex = serde_yaml::from_slice(&bytes)?;

    let observatorium_id = prometheus.observatorium.as_deref().unwrap_or_default();
    let observatorium = index.observatorium(observatorium_id).ok_or_else(|| {
        ReconcilerError::MissingObservatoriumConfig(index.id.clone())
    })?;

    get_remote_write_spec(cr, index, observatorium, &document).map(Some)
}

fn get_remote_write_spec(
    cr: &Observability,
    index: &RepositoryIndex,
    observatorium: &ObservatoriumIndex,
    document: &RemoteWriteIndex,
) -> Result<ResolvedRemoteWrite, ReconcilerError> {
    match observatorium.auth_type {
        AuthType::Dex => {
            let token_secret = model::observatorium_token_secret_name(index);
            let spec = RemoteWriteSpec {
                url: format!(
                    "{}/api/metrics/v1/{}/api/v1/receive",
                    observatorium.gateway, observatorium.tenant
                ),
                name: Some(index.id.clone()),
                bearer_token_file: Some(format!(
                    "/etc/prometheus/secrets/{token_secret}/token"
                )),
                tls_config: Some(TlsConfig::insecure()),
                ..copy_document_fields(document)
            };
            Ok(ResolvedRemoteWrite {
                spec,
                token_secret: Some(token_secret),
            })
        }
        AuthType::Redhat => {
            let refresher = model::token_refresher_name(
                &observatorium.id,
                model::METRICS_TOKEN_REFRESHER,
            );
            // Plain http, the refresher only listens inside the cluster
            let spec = RemoteWriteSpec {
                url: format!(
                    "http://{refresher}.{}.svc.cluster.local",
                    cr.namespace_or_default()
                ),
                name: Some(index.id.clone()),
                tls_config: Some(TlsConfig::insecure()),
                ..copy_document_fields(document)
            };
            Ok(ResolvedRemoteWrite {
                spec,
                token_secret: None,
            })
        }
        AuthType::Unknown => Err(ReconcilerError::UnknownAuthType(observatorium.id.clone())),
    }
}

fn copy_document_fields(document: &RemoteWriteIndex) -> RemoteWriteSpec {
    RemoteWriteSpec {
        remote_timeout: document.remote_timeout.clone(),
        write_relabel_configs: document.write_relabel_configs.clone(),
        proxy_url: document.proxy_url.clone(),
        queue_config: document.queue_config.clone(),
        ..RemoteWriteSpec::default()
    }
}
