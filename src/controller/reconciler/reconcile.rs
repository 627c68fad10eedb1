//! # Reconciliation Entry Point
//!
//! One pass: discover repository indexes, assemble the complete desired
//! state, apply it idempotently, then record status. Errors bubble to
//! `error_policy`, which requeues with a shorter interval.

use crate::constants;
use crate::controller::indexes;
use crate::controller::reconciler::apply;
use crate::controller::reconciler::assemble;
use crate::controller::reconciler::status;
use crate::controller::reconciler::types::{PrometheusReconciler, ReconcilerError};
use crate::crd::Observability;
use crate::observability;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

pub async fn reconcile(
    cr: Arc<Observability>,
    ctx: Arc<PrometheusReconciler>,
) -> Result<Action, ReconcilerError> {
    let start = Instant::now();
    let name = cr.name_or_unknown();
    info!("reconciling Observability: {}", name);
    observability::metrics::increment_reconciliations();

    let indexes = if cr.external_sync_disabled() {
        Vec::new()
    } else {
        indexes::discover_indexes(ctx.client.clone(), cr.namespace_or_default()).await?
    };
    info!("discovered {} repository indexes", indexes.len());

    let desired = assemble::assemble(&ctx, &cr, &indexes).await?;
    observability::metrics::set_remote_write_targets(
        desired
            .prometheus
            .remote_write
            .as_ref()
            .map_or(0, Vec::len) as i64,
    );

    apply::apply(&ctx, &cr, &desired).await?;

    if let Err(err) = status::update_status(&ctx, &cr).await {
        // The applied state is already correct, a failed status write is
        // not worth a short requeue
        error!("status update for {} failed: {}", name, err);
    }

    observability::metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());
    info!("reconciled Observability: {}", name);

    Ok(Action::requeue(Duration::from_secs(
        constants::DEFAULT_RESYNC_SECS,
    )))
}

pub fn error_policy(
    cr: Arc<Observability>,
    error: &ReconcilerError,
    _ctx: Arc<PrometheusReconciler>,
) -> Action {
    error!(
        "reconciliation of {} failed: {}",
        cr.name_or_unknown(),
        error
    );
    observability::metrics::increment_reconciliation_errors();
    Action::requeue(Duration::from_secs(
        constants::DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS,
    ))
}
