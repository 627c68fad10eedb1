//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! Image and retention defaults are injected into the reconciler via
//! [`crate::controller::reconciler::ControllerConfig`] rather than read
//! from here directly, so they can be overridden in tests.

/// Base image for the managed Prometheus instance
pub const PROMETHEUS_BASE_IMAGE: &str = "quay.io/prometheus/prometheus";

/// Default Prometheus version when the custom resource carries no override
pub const PROMETHEUS_DEFAULT_VERSION: &str = "v2.24.0";

/// Default retention when the custom resource value is absent or invalid
pub const PROMETHEUS_DEFAULT_RETENTION: &str = "45d";

/// Image for the authenticating reverse-proxy sidecar
pub const OAUTH_PROXY_IMAGE: &str = "quay.io/openshift/origin-oauth-proxy:4.8";

/// Image for the black-box exporter sidecar
pub const BLACKBOX_EXPORTER_IMAGE: &str = "quay.io/prometheus/blackbox-exporter:v0.19.0";

/// Namespace holding the grafana datasource credential secrets
pub const OPENSHIFT_MONITORING_NAMESPACE: &str = "openshift-monitoring";

/// Key inside the datasource secret. It says yaml but the payload is JSON.
pub const DATASOURCE_SECRET_KEY: &str = "prometheus.yaml";

/// Label used to discover repository index config maps in the CR namespace
pub const INDEX_CONFIG_MAP_LABEL: &str = "configures=observability-operator";

/// Key inside a repository index config map holding the index document
pub const INDEX_CONFIG_MAP_KEY: &str = "index.json";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Requeue interval after a successful reconcile (seconds)
pub const DEFAULT_RESYNC_SECS: u64 = 300;

/// Requeue interval for reconciliation errors (seconds)
pub const DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS: u64 = 60;

/// Timeout for index document fetches (seconds)
pub const INDEX_FETCH_TIMEOUT_SECS: u64 = 30;
