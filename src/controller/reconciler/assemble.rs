//! # Desired-State Assembly
//!
//! Computes the complete desired configuration for one reconcile pass
//! before anything is written to the cluster. Assembly is read-only; the
//! applier performs the writes.

use crate::controller::fetcher::IndexFetcher;
use crate::controller::model;
use crate::controller::reconciler::credentials;
use crate::controller::reconciler::federation;
use crate::controller::reconciler::remote_write::{self, ResolvedRemoteWrite};
use crate::controller::reconciler::storage::{self, StorageResolution};
use crate::controller::reconciler::types::{ControllerConfig, PrometheusReconciler, ReconcilerError};
use crate::controller::reconciler::validation;
use crate::controller::{routes, selectors};
use crate::crd::{Observability, RepositoryIndex};
use crate::monitoring::{
    AlertingSpec, AlertmanagerEndpoints, PrometheusSpec, RemoteWriteSpec, TlsConfig,
};
use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, Container, ContainerPort, EnvVar, SecretKeySelector, Volume,
    VolumeMount,
};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;
use tracing::warn;

const SERVICE_ACCOUNT_TOKEN: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
const SERVICE_ACCOUNT_CA: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";
const SERVICE_CA_BUNDLE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/service-ca.crt";

/// Everything one reconcile pass wants the cluster to look like
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredState {
    pub prometheus: PrometheusSpec,
    pub additional_scrape_config: String,
    pub black_box_config: String,
}

/// Assemble the desired state from the custom resource and the discovered
/// repository indexes.
pub async fn assemble(
    ctx: &PrometheusReconciler,
    cr: &Observability,
    indexes: &[RepositoryIndex],
) -> Result<DesiredState, ReconcilerError> {
    let patterns = federation::fetch_federation_configs(ctx.fetcher.as_ref(), cr, indexes).await?;
    let creds = credentials::get_openshift_monitoring_credentials(ctx.client.clone()).await?;
    let additional_scrape_config =
        model::federation_scrape_config(&creds.user, &creds.password, &patterns)?;

    let (black_box_config, config_hash) = model::black_box_config();

    let host = routes::prometheus_host(ctx.client.clone(), cr.namespace_or_default()).await;

    let (remote_writes, secrets) =
        collect_remote_writes(ctx.fetcher.as_ref(), cr, indexes).await;

    let resolved_storage = storage::resolve_storage(cr, indexes);

    let prometheus = build_prometheus_spec(
        &ctx.config,
        cr,
        indexes,
        remote_writes,
        secrets,
        host.as_deref(),
        &config_hash,
        resolved_storage,
    );

    Ok(DesiredState {
        prometheus,
        additional_scrape_config,
        black_box_config,
    })
}

/// Resolve remote-write targets across all indexes.
///
/// A resolution failure drops only that index's target, every other
/// index still contributes. Returns the target list plus the
/// deduplicated secret names that must be mounted into the pods.
pub async fn collect_remote_writes(
    fetcher: &dyn IndexFetcher,
    cr: &Observability,
    indexes: &[RepositoryIndex],
) -> (Vec<RemoteWriteSpec>, Vec<String>) {
    let mut remote_writes = Vec::new();
    let mut secrets = vec![
        model::PROMETHEUS_PROXY_SECRET.to_string(),
        model::PROMETHEUS_TLS_SECRET.to_string(),
    ];

    if cr.observatorium_disabled() {
        return (remote_writes, secrets);
    }

    for index in indexes {
        match remote_write::resolve_remote_write(fetcher, cr, index).await {
            Ok(Some(resolved)) => push_remote_write(&mut remote_writes, &mut secrets, resolved),
            Ok(None) => {}
            Err(err) => {
                warn!(index = %index.id, "skipping remote-write target: {}", err);
            }
        }
    }

    (remote_writes, secrets)
}

fn push_remote_write(
    remote_writes: &mut Vec<RemoteWriteSpec>,
    secrets: &mut Vec<String>,
    resolved: ResolvedRemoteWrite,
) {
    remote_writes.push(resolved.spec);
    if let Some(secret) = resolved.token_secret {
        if !secrets.contains(&secret) {
            secrets.push(secret);
        }
    }
}

/// Deterministic construction of the Prometheus spec. Pure so the same
/// inputs always produce the same spec.
#[allow(clippy::too_many_arguments)]
pub fn build_prometheus_spec(
    config: &ControllerConfig,
    cr: &Observability,
    indexes: &[RepositoryIndex],
    remote_writes: Vec<RemoteWriteSpec>,
    secrets: Vec<String>,
    host: Option<&str>,
    config_hash: &str,
    resolved_storage: StorageResolution,
) -> PrometheusSpec {
    let version = model::prometheus_version(cr, &config.default_prometheus_version);

    let mut external_labels = BTreeMap::new();
    external_labels.insert("cluster_id".to_string(), cr.cluster_id().to_string());

    let mut containers = vec![oauth_proxy_container(config)];
    let mut volumes = Vec::new();
    if !cr.blackbox_exporter_disabled() {
        containers.push(blackbox_exporter_container(config, config_hash));
        volumes.push(Volume {
            name: model::BLACK_BOX_CONFIG_MAP.to_string(),
            config_map: Some(ConfigMapVolumeSource {
                name: model::BLACK_BOX_CONFIG_MAP.to_string(),
                ..ConfigMapVolumeSource::default()
            }),
            ..Volume::default()
        });
    }

    let mut spec = PrometheusSpec {
        image: Some(format!("{}:{}", config.prometheus_base_image, version)),
        version: Some(version),
        priority_class_name: Some(model::PRIORITY_CLASS_NAME.to_string()),
        service_account_name: Some(model::PROMETHEUS_SERVICE_ACCOUNT.to_string()),
        retention: Some(validation::resolve_retention(
            cr.spec.retention.as_deref(),
            &config.default_retention,
        )),
        external_url: Some(
            host.map(|h| format!("https://{h}")).unwrap_or_default(),
        ),
        external_labels: Some(external_labels),
        additional_scrape_configs: Some(SecretKeySelector {
            name: model::ADDITIONAL_SCRAPE_CONFIG_SECRET.to_string(),
            key: model::ADDITIONAL_SCRAPE_CONFIG_KEY.to_string(),
            ..SecretKeySelector::default()
        }),
        volumes: Some(volumes),
        pod_monitor_selector: Some(selectors::pod_monitor_label_selector(cr, indexes)),
        pod_monitor_namespace_selector: Some(selectors::pod_monitor_namespace_selector(cr)),
        service_monitor_selector: Some(selectors::service_monitor_label_selector(cr, indexes)),
        service_monitor_namespace_selector: Some(selectors::service_monitor_namespace_selector(
            cr,
        )),
        rule_selector: Some(selectors::rule_label_selector(cr, indexes)),
        rule_namespace_selector: Some(selectors::rule_namespace_selector(cr)),
        probe_selector: Some(selectors::probe_label_selector(cr, indexes)),
        probe_namespace_selector: Some(selectors::probe_namespace_selector(cr)),
        remote_write: Some(remote_writes),
        alerting: Some(alerting_spec(cr)),
        secrets: Some(secrets),
        containers: Some(containers),
        resources: Some(model::prometheus_resource_requirements()),
        ..PrometheusSpec::default()
    };

    match resolved_storage {
        StorageResolution::Specified(storage) => spec.storage = Some(storage),
        StorageResolution::Unmanaged => {}
        StorageResolution::Invalid { quantity, reason } => {
            warn!(%quantity, "ignoring requested storage size: {}", reason);
        }
    }

    if let Some(tolerations) = cr.spec.tolerations.clone() {
        spec.tolerations = Some(tolerations);
    }
    if let Some(affinity) = cr.spec.affinity.clone() {
        spec.affinity = Some(affinity);
    }

    spec
}

fn alerting_spec(cr: &Observability) -> AlertingSpec {
    let namespace = cr.namespace_or_default();
    AlertingSpec {
        alertmanagers: vec![AlertmanagerEndpoints {
            namespace: namespace.to_string(),
            name: model::ALERTMANAGER_NAME.to_string(),
            port: IntOrString::String("web".to_string()),
            scheme: Some("https".to_string()),
            tls_config: Some(TlsConfig {
                ca_file: Some(SERVICE_CA_BUNDLE.to_string()),
                server_name: Some(format!("{}.{namespace}.svc", model::ALERTMANAGER_SERVICE)),
                insecure_skip_verify: None,
            }),
            bearer_token_file: Some(SERVICE_ACCOUNT_TOKEN.to_string()),
        }],
    }
}

fn oauth_proxy_container(config: &ControllerConfig) -> Container {
    Container {
        name: "oauth-proxy".to_string(),
        image: Some(config.oauth_proxy_image.to_string()),
        args: Some(vec![
            "-provider=openshift".to_string(),
            "-https-address=:9091".to_string(),
            "-http-address=".to_string(),
            "-email-domain=*".to_string(),
            "-upstream=http://localhost:9090".to_string(),
            format!(
                "-openshift-service-account={}",
                model::PROMETHEUS_SERVICE_ACCOUNT
            ),
            r#"-openshift-sar={"resource": "namespaces", "verb": "get"}"#.to_string(),
            r#"-openshift-delegate-urls={"/": {"resource": "namespaces", "verb": "get"}}"#
                .to_string(),
            "-tls-cert=/etc/tls/private/tls.crt".to_string(),
            "-tls-key=/etc/tls/private/tls.key".to_string(),
            format!("-client-secret-file={SERVICE_ACCOUNT_TOKEN}"),
            "-cookie-secret-file=/etc/proxy/secrets/session_secret".to_string(),
            "-openshift-ca=/etc/pki/tls/cert.pem".to_string(),
            format!("-openshift-ca={SERVICE_ACCOUNT_CA}"),
            "-skip-auth-regex=^/metrics".to_string(),
        ]),
        // Proxy env vars are forced empty so cluster-wide proxy settings
        // never route the login flow through an egress proxy
        env: Some(vec![
            empty_env("HTTP_PROXY"),
            empty_env("HTTPS_PROXY"),
            empty_env("NO_PROXY"),
        ]),
        ports: Some(vec![ContainerPort {
            name: Some("proxy".to_string()),
            container_port: 9091,
            ..ContainerPort::default()
        }]),
        volume_mounts: Some(vec![
            VolumeMount {
                name: format!("secret-{}", model::PROMETHEUS_TLS_SECRET),
                mount_path: "/etc/tls/private".to_string(),
                ..VolumeMount::default()
            },
            VolumeMount {
                name: format!("secret-{}", model::PROMETHEUS_PROXY_SECRET),
                mount_path: "/etc/proxy/secrets".to_string(),
                ..VolumeMount::default()
            },
        ]),
        ..Container::default()
    }
}

fn blackbox_exporter_container(config: &ControllerConfig, config_hash: &str) -> Container {
    Container {
        name: "blackbox-exporter".to_string(),
        image: Some(config.blackbox_exporter_image.to_string()),
        args: Some(vec![format!(
            "--config.file=/opt/config/{}",
            model::BLACK_BOX_CONFIG_KEY
        )]),
        // Changing the hash forces a pod restart on config change
        env: Some(vec![EnvVar {
            name: "CONFIG_HASH".to_string(),
            value: Some(config_hash.to_string()),
            ..EnvVar::default()
        }]),
        ports: Some(vec![ContainerPort {
            name: Some("http".to_string()),
            container_port: 9115,
            ..ContainerPort::default()
        }]),
        volume_mounts: Some(vec![
            VolumeMount {
                name: model::BLACK_BOX_CONFIG_MAP.to_string(),
                mount_path: "/opt/config/".to_string(),
                ..VolumeMount::default()
            },
            VolumeMount {
                name: format!("secret-{}", model::PROMETHEUS_TLS_SECRET),
                mount_path: "/etc/tls/private".to_string(),
                ..VolumeMount::default()
            },
        ]),
        ..Container::default()
    }
}

fn empty_env(name: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(String::new()),
        ..EnvVar::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::fetcher::testing::StaticFetcher;
    use crate::crd::{
        AuthType, ObservabilitySpec, ObservatoriumIndex, PrometheusIndex, RepositoryConfig,
        SelfContained,
    };

    fn cr() -> Observability {
        let mut cr = Observability::new(
            "o",
            ObservabilitySpec {
                retention: Some("30d".to_string()),
                ..ObservabilitySpec::default()
            },
        );
        cr.metadata.namespace = Some("observability".to_string());
        cr
    }

    fn base_inputs() -> (ControllerConfig, Vec<RepositoryIndex>) {
        (ControllerConfig::default(), Vec::new())
    }

    #[test]
    fn spec_construction_is_idempotent() {
        let (config, indexes) = base_inputs();
        let build = || {
            build_prometheus_spec(
                &config,
                &cr(),
                &indexes,
                vec![RemoteWriteSpec::default()],
                vec!["s1".to_string()],
                Some("prometheus.apps.example.com"),
                "abc123",
                StorageResolution::Unmanaged,
            )
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn image_retention_and_url_are_wired_through() {
        let (config, indexes) = base_inputs();
        let spec = build_prometheus_spec(
            &config,
            &cr(),
            &indexes,
            vec![],
            vec![],
            Some("prometheus.apps.example.com"),
            "abc123",
            StorageResolution::Unmanaged,
        );
        assert_eq!(
            spec.image.as_deref(),
            Some("quay.io/prometheus/prometheus:v2.24.0")
        );
        assert_eq!(spec.retention.as_deref(), Some("30d"));
        assert_eq!(
            spec.external_url.as_deref(),
            Some("https://prometheus.apps.example.com")
        );
        assert!(spec.storage.is_none());
    }

    #[test]
    fn missing_route_yields_empty_external_url() {
        let (config, indexes) = base_inputs();
        let spec = build_prometheus_spec(
            &config,
            &cr(),
            &indexes,
            vec![],
            vec![],
            None,
            "abc123",
            StorageResolution::Unmanaged,
        );
        assert_eq!(spec.external_url.as_deref(), Some(""));
    }

    #[test]
    fn invalid_storage_degrades_to_unmanaged() {
        let (config, indexes) = base_inputs();
        let spec = build_prometheus_spec(
            &config,
            &cr(),
            &indexes,
            vec![],
            vec![],
            None,
            "abc123",
            StorageResolution::Invalid {
                quantity: "50Gx".to_string(),
                reason: "not a valid resource quantity".to_string(),
            },
        );
        assert!(spec.storage.is_none());
    }

    #[test]
    fn blackbox_sidecar_is_omitted_when_disabled() {
        let (config, indexes) = base_inputs();
        let mut cr = cr();
        cr.spec.self_contained = Some(SelfContained {
            disable_blackbox_exporter: Some(true),
            ..SelfContained::default()
        });

        let spec = build_prometheus_spec(
            &config,
            &cr,
            &indexes,
            vec![],
            vec![],
            None,
            "abc123",
            StorageResolution::Unmanaged,
        );
        let containers = spec.containers.unwrap();
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0].name, "oauth-proxy");
        assert!(spec.volumes.unwrap().is_empty());
    }

    #[test]
    fn sidecars_and_mounts_are_present_by_default() {
        let (config, indexes) = base_inputs();
        let spec = build_prometheus_spec(
            &config,
            &cr(),
            &indexes,
            vec![],
            vec![
                model::PROMETHEUS_PROXY_SECRET.to_string(),
                model::PROMETHEUS_TLS_SECRET.to_string(),
                "observatorium-token-tenant-a".to_string(),
            ],
            None,
            "abc123",
            StorageResolution::Unmanaged,
        );

        let containers = spec.containers.unwrap();
        assert_eq!(containers.len(), 2);
        assert_eq!(containers[1].name, "blackbox-exporter");
        let env = containers[1].env.as_ref().unwrap();
        assert_eq!(env[0].name, "CONFIG_HASH");
        assert_eq!(env[0].value.as_deref(), Some("abc123"));

        let mounts = containers[1].volume_mounts.as_ref().unwrap();
        assert_eq!(
            containers[1].ports.as_ref().unwrap()[0].name.as_deref(),
            Some("http")
        );
        assert_eq!(mounts.len(), 2);
        assert_eq!(mounts[1].name, "secret-prometheus-k8s-tls");
        assert_eq!(mounts[1].mount_path, "/etc/tls/private");

        let secrets = spec.secrets.unwrap();
        assert!(secrets.contains(&"observatorium-token-tenant-a".to_string()));

        let alerting = spec.alerting.unwrap();
        let endpoint = &alerting.alertmanagers[0];
        assert_eq!(endpoint.namespace, "observability");
        assert_eq!(endpoint.name, "observability-alertmanager");
        assert_eq!(endpoint.scheme.as_deref(), Some("https"));
        assert_eq!(
            endpoint.tls_config.as_ref().unwrap().server_name.as_deref(),
            Some("observability-alertmanager-service.observability.svc")
        );
    }

    fn remote_write_index(id: &str, auth_type: AuthType) -> RepositoryIndex {
        RepositoryIndex {
            id: id.to_string(),
            base_url: format!("https://{id}"),
            config: Some(RepositoryConfig {
                prometheus: Some(PrometheusIndex {
                    remote_write: Some("remote-write.yaml".to_string()),
                    observatorium: Some("production".to_string()),
                    ..PrometheusIndex::default()
                }),
                observatoria: vec![ObservatoriumIndex {
                    id: "production".to_string(),
                    gateway: "https://gateway".to_string(),
                    tenant: id.to_string(),
                    auth_type,
                }],
            }),
            ..RepositoryIndex::default()
        }
    }

    #[tokio::test]
    async fn failing_index_drops_only_its_own_remote_write_target() {
        let fetcher = StaticFetcher::default()
            .with("https://tenant-a/remote-write.yaml", "remoteTimeout: 30s\n")
            .with("https://tenant-b/remote-write.yaml", "remoteTimeout: 30s\n");

        let indexes = vec![
            remote_write_index("tenant-a", AuthType::Dex),
            remote_write_index("tenant-b", AuthType::Unknown),
        ];

        let (remote_writes, secrets) = collect_remote_writes(&fetcher, &cr(), &indexes).await;

        assert_eq!(remote_writes.len(), 1);
        assert_eq!(remote_writes[0].name.as_deref(), Some("tenant-a"));
        assert!(secrets.contains(&"observatorium-token-tenant-a".to_string()));
        assert!(!secrets.iter().any(|s| s.contains("tenant-b")));
    }

    #[tokio::test]
    async fn disabled_observatorium_yields_no_remote_write_targets() {
        let fetcher = StaticFetcher::default()
            .with("https://tenant-a/remote-write.yaml", "remoteTimeout: 30s\n");

        let mut cr = cr();
        cr.spec.self_contained = Some(SelfContained {
            disable_observatorium: Some(true),
            ..SelfContained::default()
        });

        let indexes = vec![remote_write_index("tenant-a", AuthType::Dex)];
        let (remote_writes, secrets) = collect_remote_writes(&fetcher, &cr, &indexes).await;

        assert!(remote_writes.is_empty());
        assert_eq!(
            secrets,
            vec![
                model::PROMETHEUS_PROXY_SECRET.to_string(),
                model::PROMETHEUS_TLS_SECRET.to_string()
            ]
        );
    }
}
