//! # Resource Model
//!
//! Deterministic names for every object this subsystem touches, plus the
//! rendered configuration payloads (federation scrape config, black-box
//! exporter config). Names are fixed per namespace: the control loop
//! guarantees at most one Observability resource is reconciled at a time.

use crate::crd::{Observability, RepositoryIndex};
use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::ResourceRequirements;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use serde_json::json;
use std::collections::BTreeMap;

/// Name of the managed Prometheus object and its route
pub const PROMETHEUS_NAME: &str = "observability-prometheus";

/// Service account the Prometheus pods run as
pub const PROMETHEUS_SERVICE_ACCOUNT: &str = "observability-prometheus";

/// Secret holding the oauth-proxy session secret
pub const PROMETHEUS_PROXY_SECRET: &str = "observability-prometheus-proxy";

/// TLS secret for the proxy, maintained by the service CA operator
pub const PROMETHEUS_TLS_SECRET: &str = "prometheus-k8s-tls";

/// Secret carrying the generated federation scrape configuration
pub const ADDITIONAL_SCRAPE_CONFIG_SECRET: &str = "additional-scrape-configs";

/// Key inside the scrape config secret
pub const ADDITIONAL_SCRAPE_CONFIG_KEY: &str = "additional-scrape-config.yaml";

/// Config map carrying the black-box exporter configuration
pub const BLACK_BOX_CONFIG_MAP: &str = "black-box-config";

/// Key inside the black-box config map
pub const BLACK_BOX_CONFIG_KEY: &str = "black-box-config.yaml";

/// Alertmanager object and service names
pub const ALERTMANAGER_NAME: &str = "observability-alertmanager";
pub const ALERTMANAGER_SERVICE: &str = "observability-alertmanager-service";

/// Priority class assigned to the Prometheus pods
pub const PRIORITY_CLASS_NAME: &str = "observability";

/// Role tag of the metrics token refresher
pub const METRICS_TOKEN_REFRESHER: &str = "metrics";

/// Name of the per-index secret holding the observatorium bearer token
pub fn observatorium_token_secret_name(index: &RepositoryIndex) -> String {
    format!("observatorium-token-{}", index.id)
}

/// In-cluster service name of the token refresher for an observatorium id
pub fn token_refresher_name(observatorium_id: &str, role: &str) -> String {
    format!("token-refresher-{role}-{observatorium_id}")
}

/// Prometheus version: self-contained override or the injected default
pub fn prometheus_version(cr: &Observability, default_version: &str) -> String {
    cr.prometheus_version_override()
        .unwrap_or(default_version)
        .to_string()
}

/// Custom storage size requested through the repository indexes.
/// First index that declares one wins.
pub fn prometheus_storage_size(indexes: &[RepositoryIndex]) -> Option<String> {
    indexes
        .iter()
        .filter_map(|index| index.prometheus().and_then(|p| p.storage_size.clone()))
        .find(|size| !size.is_empty())
}

/// Default resource requirements for the Prometheus pods
pub fn prometheus_resource_requirements() -> ResourceRequirements {
    let mut requests = BTreeMap::new();
    requests.insert("memory".to_string(), Quantity("250Mi".to_string()));
    ResourceRequirements {
        requests: Some(requests),
        ..ResourceRequirements::default()
    }
}

/// Render the additional scrape config used to federate from
/// openshift-monitoring. Expects the aggregated pattern list across all
/// indexes, already quoted and deduplicated.
pub fn federation_scrape_config(user: &str, password: &str, patterns: &[String]) -> Result<String> {
    let jobs = json!([{
        "job_name": "openshift-monitoring-federation",
        "honor_labels": true,
        "kubernetes_sd_configs": [{
            "role": "service",
            "namespaces": {
                "names": ["openshift-monitoring"]
            }
        }],
        "scrape_interval": "120s",
        "metrics_path": "/federate",
        "relabel_configs": [
            {
                "action": "keep",
                "source_labels": ["__meta_kubernetes_service_name"],
                "regex": "prometheus-k8s"
            },
            {
                "action": "keep",
                "source_labels": ["__meta_kubernetes_service_port_name"],
                "regex": "web"
            }
        ],
        "params": {
            "match[]": patterns
        },
        "scheme": "https",
        "basic_auth": {
            "username": user,
            "password": password
        },
        "tls_config": {
            "insecure_skip_verify": true
        }
    }]);

    serde_yaml::to_string(&jobs).context("failed to render federation scrape config")
}

/// Default black-box exporter configuration and its content hash.
///
/// The hash is exposed to the sidecar as an environment variable so a
/// content change forces a pod restart even though the mount path stays
/// the same.
pub fn black_box_config() -> (String, String) {
    let config = "\
modules:
  http_2xx:
    prober: http
    http:
      method: GET
      preferred_ip_protocol: ip4
  http_post_2xx:
    prober: http
    http:
      method: POST
      preferred_ip_protocol: ip4
";
    let hash = format!("{:x}", md5::compute(config.as_bytes()));
    (config.to_string(), hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{PrometheusIndex, RepositoryConfig};

    fn index_with_storage(id: &str, size: Option<&str>) -> RepositoryIndex {
        RepositoryIndex {
            id: id.to_string(),
            base_url: "https://example.com".to_string(),
            config: Some(RepositoryConfig {
                prometheus: Some(PrometheusIndex {
                    storage_size: size.map(str::to_string),
                    ..PrometheusIndex::default()
                }),
                observatoria: vec![],
            }),
            ..RepositoryIndex::default()
        }
    }

    #[test]
    fn token_refresher_name_is_deterministic() {
        assert_eq!(
            token_refresher_name("production", METRICS_TOKEN_REFRESHER),
            "token-refresher-metrics-production"
        );
    }

    #[test]
    fn first_declared_storage_size_wins() {
        let indexes = vec![
            index_with_storage("a", None),
            index_with_storage("b", Some("50Gi")),
            index_with_storage("c", Some("100Gi")),
        ];
        assert_eq!(prometheus_storage_size(&indexes).as_deref(), Some("50Gi"));
    }

    #[test]
    fn federation_scrape_config_carries_patterns_and_credentials() {
        let patterns = vec!["'kafka_.*'".to_string(), "'cpu_.*'".to_string()];
        let rendered = federation_scrape_config("user", "pass", &patterns).unwrap();
        assert!(rendered.contains("match[]"));
        assert!(rendered.contains("'kafka_.*'"));
        assert!(rendered.contains("username: user"));
        assert!(rendered.contains("/federate"));
    }

    #[test]
    fn black_box_config_hash_is_stable() {
        let (config_a, hash_a) = black_box_config();
        let (config_b, hash_b) = black_box_config();
        assert_eq!(config_a, config_b);
        assert_eq!(hash_a, hash_b);
        assert!(!hash_a.is_empty());
    }
}
