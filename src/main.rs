//! # Observability Controller
//!
//! Watches `Observability` resources and reconciles a managed Prometheus
//! deployment from externally hosted repository indexes.

use anyhow::Result;
use futures::StreamExt;
use kube::{Api, Client};
use kube_runtime::{watcher, Controller};
use observability_controller::constants;
use observability_controller::controller::fetcher::HttpIndexFetcher;
use observability_controller::controller::reconciler::{
    self, ControllerConfig, PrometheusReconciler,
};
use observability_controller::crd::Observability;
use observability_controller::observability::metrics;
use observability_controller::server::{start_server, ServerState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "observability_controller=info".into()),
        )
        .init();

    info!(
        "Starting Observability Controller (build {})",
        env!("BUILD_GIT_HASH")
    );

    metrics::register_metrics()?;

    let server_state = Arc::new(ServerState {
        is_ready: Arc::new(AtomicBool::new(false)),
    });

    let server_state_clone = server_state.clone();
    let server_port = std::env::var("METRICS_PORT")
        .unwrap_or_else(|_| constants::DEFAULT_METRICS_PORT.to_string())
        .parse::<u16>()
        .unwrap_or(constants::DEFAULT_METRICS_PORT);

    tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });

    let client = Client::try_default().await?;

    // Watch all namespaces, the resource itself pins the target namespace
    let resources: Api<Observability> = Api::all(client.clone());

    let fetcher = Arc::new(HttpIndexFetcher::new()?);
    let ctx = Arc::new(PrometheusReconciler::new(
        client,
        fetcher,
        ControllerConfig::default(),
    ));

    server_state.is_ready.store(true, Ordering::Relaxed);

    Controller::new(resources, watcher::Config::default())
        .shutdown_on_signal()
        .run(reconciler::reconcile, reconciler::error_policy, ctx)
        .for_each(|_| std::future::ready(()))
        .await;

    info!("Controller stopped");

    Ok(())
}
