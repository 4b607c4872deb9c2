// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `Database` reconciler and controller.
//!
//! # Reconciliation Flow
//!
//! 1. List the nodes matching the declaration's selector (paginated, retried).
//! 2. Resolve the target services: the explicit one, or every service of the
//!    project for a wildcard declaration.
//! 3. Converge every service (see [`crate::reconcilers::convergence`]).
//! 4. Report the outcome in the `Ready` condition.
//!
//! # Triggers
//!
//! - any change to a `Database`
//! - any `Node` event, which enqueues every `Database`: a node leaving a
//!   selector through a label change must still shrink that selector's allowlist
//! - a periodic requeue that corrects drift in the remote allowlist
//!
//! # Deletion
//!
//! A finalizer holds the `Database` until every target service has been
//! released: owned entries removed, foreign entries kept.

use crate::address::NodeInfo;
use crate::constants::{DATABASE_FINALIZER, ERROR_REQUEUE_DURATION_SECS, KIND_DATABASE};
use crate::context::Context;
use crate::crd::{Database, LabelSelector};
use crate::errors::AllowlistError;
use crate::metrics;
use crate::reconcilers::convergence::{converge_services, release_services, target_services};
use crate::reconcilers::pagination::list_all_paginated;
use crate::reconcilers::status::{converged_status, failed_status, patch_database_status};
use crate::selector::render_label_selector;
use anyhow::{anyhow, Result};
use futures::StreamExt;
use k8s_openapi::api::core::v1::Node;
use kube::api::ListParams;
use kube::runtime::controller::{Action, Config as ControllerConfig};
use kube::runtime::finalizer;
use kube::runtime::reflector::ObjectRef;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client, ResourceExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Minimum delay between two reconciliations of the same `Database`, which
/// folds bursts of node events into one pass.
const NODE_EVENT_DEBOUNCE: Duration = Duration::from_secs(5);

/// Reconciliation error wrapper
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ReconcileError(#[from] anyhow::Error);

impl ReconcileError {
    /// Metric label of the underlying error kind.
    fn metric_label(&self) -> &'static str {
        self.0
            .downcast_ref::<AllowlistError>()
            .map_or("reconcile", AllowlistError::metric_label)
    }
}

impl From<AllowlistError> for ReconcileError {
    fn from(err: AllowlistError) -> Self {
        Self(err.into())
    }
}

/// List the nodes a selector picks, as allowlisting records.
///
/// # Errors
///
/// - [`AllowlistError::InvalidSelector`] if the selector cannot be rendered
/// - [`AllowlistError::Kube`] if listing fails after retries
pub async fn list_nodes(
    client: &Client,
    selector: Option<&LabelSelector>,
) -> Result<Vec<NodeInfo>, AllowlistError> {
    let api: Api<Node> = Api::all(client.clone());

    let mut params = ListParams::default();
    if let Some(labels) = render_label_selector(selector)? {
        params = params.labels(&labels);
    }

    let nodes = list_all_paginated(&api, params).await?;
    Ok(nodes.iter().map(NodeInfo::from_node).collect())
}

/// Converge every target service of a `Database`.
///
/// Returns the services that were converged.
///
/// # Errors
///
/// Returns the first error among node listing, wildcard expansion and the
/// service passes. All services are attempted before an error is returned.
pub async fn reconcile_database(
    ctx: &Context,
    database: &Database,
    resource_id: &str,
) -> Result<Vec<String>, AllowlistError> {
    let spec = &database.spec;

    let nodes = list_nodes(&ctx.client, spec.label_selector.as_ref()).await?;
    let services = target_services(
        ctx.cloud.as_ref(),
        &spec.project_id,
        spec.explicit_service_id(),
    )
    .await?;

    info!(
        database = %database.name_any(),
        project_id = %spec.project_id,
        nodes = nodes.len(),
        services = services.len(),
        "Converging database allowlists"
    );

    converge_services(
        ctx.cloud.as_ref(),
        ctx.egress_probe.as_ref(),
        &spec.project_id,
        &services,
        resource_id,
        &nodes,
        ctx.settings.pass_timeout,
    )
    .await?;

    if let Some(stale) = stale_targets(database, &services) {
        info!(
            database = %database.name_any(),
            project_id = %stale.project_id,
            services = ?stale.services,
            "Releasing services no longer targeted"
        );
        // Best effort: a stale service may have been deleted remotely.
        if let Err(e) = release_services(
            ctx.cloud.as_ref(),
            &stale.project_id,
            &stale.services,
            resource_id,
            ctx.settings.pass_timeout,
        )
        .await
        {
            warn!(
                database = %database.name_any(),
                error = %e,
                "Failed to release services no longer targeted"
            );
        }
    }

    Ok(services)
}

/// Services converged on an earlier pass that a `Database` no longer targets.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct StaleTargets {
    pub project_id: String,
    pub services: Vec<String>,
}

/// Compare the services recorded in the status with the current targets.
///
/// A changed project makes every recorded service stale.
pub(crate) fn stale_targets(database: &Database, current: &[String]) -> Option<StaleTargets> {
    let status = database.status.as_ref()?;
    let project_id = status
        .project_id
        .clone()
        .unwrap_or_else(|| database.spec.project_id.clone());
    let same_project = project_id == database.spec.project_id;

    let services: Vec<String> = status
        .services
        .iter()
        .filter(|service| !same_project || !current.contains(service))
        .cloned()
        .collect();

    if services.is_empty() {
        return None;
    }
    Some(StaleTargets {
        project_id,
        services,
    })
}

/// Release every target service of a deleted `Database`.
///
/// # Errors
///
/// Returns the first error among wildcard expansion and the release passes.
pub async fn cleanup_database(
    ctx: &Context,
    database: &Database,
    resource_id: &str,
) -> Result<(), AllowlistError> {
    let spec = &database.spec;

    let services = target_services(
        ctx.cloud.as_ref(),
        &spec.project_id,
        spec.explicit_service_id(),
    )
    .await?;

    info!(
        database = %database.name_any(),
        project_id = %spec.project_id,
        services = services.len(),
        "Releasing database allowlists"
    );

    release_services(
        ctx.cloud.as_ref(),
        &spec.project_id,
        &services,
        resource_id,
        ctx.settings.pass_timeout,
    )
    .await
}

fn resource_id(database: &Database) -> Result<String, ReconcileError> {
    database.uid().ok_or_else(|| {
        ReconcileError::from(anyhow!(
            "{KIND_DATABASE} {} has no uid",
            database.name_any()
        ))
    })
}

async fn apply_database(ctx: &Context, database: &Database) -> Result<Action, ReconcileError> {
    let resource_id = resource_id(database)?;
    let result = reconcile_database(ctx, database, &resource_id).await;

    let status = match &result {
        Ok(services) => converged_status(database, services),
        Err(e) => failed_status(database, e),
    };

    if let Err(e) = patch_database_status(&ctx.client, database, status).await {
        warn!(
            database = %database.name_any(),
            error = %e,
            "Failed to update Database status"
        );
        if result.is_ok() {
            return Err(AllowlistError::from(e).into());
        }
    }

    result?;
    info!("Successfully reconciled {KIND_DATABASE}: {}", database.name_any());
    Ok(Action::requeue(ctx.settings.requeue_interval))
}

/// Delay before retrying a failed reconciliation.
///
/// Transient failures retry after [`ERROR_REQUEUE_DURATION_SECS`]. Failures that
/// need a change to the cluster or the declaration (a node without the required
/// address, a malformed selector) fall back to the periodic requeue; `Database`
/// and `Node` events still trigger a pass right away.
pub(crate) fn requeue_after_error(err: &ReconcileError, requeue_interval: Duration) -> Duration {
    match err.0.downcast_ref::<AllowlistError>() {
        Some(kind) if !kind.is_transient() => requeue_interval,
        _ => Duration::from_secs(ERROR_REQUEUE_DURATION_SECS),
    }
}

/// Error policy for the `Database` controller.
#[allow(clippy::needless_pass_by_value)] // Signature required by kube::runtime::Controller
fn error_policy(database: Arc<Database>, err: &ReconcileError, ctx: Arc<Context>) -> Action {
    let retry_in = requeue_after_error(err, ctx.settings.requeue_interval);
    error!(
        error = %err,
        database = %database.name_any(),
        namespace = ?database.namespace(),
        retry_in = ?retry_in,
        "Reconciliation error, will retry"
    );
    Action::requeue(retry_in)
}

/// Reconciliation entry point with finalizer and metrics handling.
async fn reconcile_wrapper(
    database: Arc<Database>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    let namespace = database
        .namespace()
        .ok_or_else(|| ReconcileError::from(anyhow!("{KIND_DATABASE} has no namespace")))?;
    let api: Api<Database> = Api::namespaced(ctx.client.clone(), &namespace);

    let result = finalizer(&api, DATABASE_FINALIZER, database, |event| async {
        match event {
            finalizer::Event::Apply(db) => apply_database(&ctx, &db).await,
            finalizer::Event::Cleanup(db) => {
                let resource_id = resource_id(&db)?;
                cleanup_database(&ctx, &db, &resource_id).await?;
                info!(
                    "Released allowlists of deleted {KIND_DATABASE}: {}",
                    db.name_any()
                );
                Ok(Action::await_change())
            }
        }
    })
    .await
    .map_err(|e: finalizer::Error<ReconcileError>| match e {
        finalizer::Error::ApplyFailed(err) | finalizer::Error::CleanupFailed(err) => err,
        finalizer::Error::AddFinalizer(err) | finalizer::Error::RemoveFinalizer(err) => {
            ReconcileError::from(anyhow!("Finalizer error: {err}"))
        }
        finalizer::Error::UnnamedObject => {
            ReconcileError::from(anyhow!("{KIND_DATABASE} has no name"))
        }
        finalizer::Error::InvalidFinalizer => {
            ReconcileError::from(anyhow!("Invalid finalizer for {KIND_DATABASE}"))
        }
    });

    let duration = start.elapsed();
    match &result {
        Ok(_) => metrics::record_reconciliation_success(KIND_DATABASE, duration),
        Err(err) => {
            metrics::record_reconciliation_error(KIND_DATABASE, duration);
            metrics::record_error(KIND_DATABASE, err.metric_label());
        }
    }

    result
}

/// Run the `Database` controller.
///
/// Watches `Database` objects cluster-wide and every `Node`; a node event
/// enqueues every known `Database`.
///
/// # Errors
///
/// Returns an error if the controller stops unexpectedly.
pub async fn run_database_controller(context: Arc<Context>) -> Result<()> {
    info!("Starting {KIND_DATABASE} controller");

    let client = context.client.clone();
    let api = Api::<Database>::all(client.clone());
    let node_api = Api::<Node>::all(client);

    let controller = Controller::new(api, WatcherConfig::default())
        .with_config(ControllerConfig::default().debounce(NODE_EVENT_DEBOUNCE));
    let databases = controller.store();

    controller
        .watches(node_api, WatcherConfig::default(), move |_node: Node| {
            databases
                .state()
                .iter()
                .map(|database| ObjectRef::from_obj(database.as_ref()))
                .collect::<Vec<_>>()
        })
        .shutdown_on_signal()
        .run(reconcile_wrapper, error_policy, context)
        .for_each(|result| {
            if let Err(e) = result {
                warn!(error = %e, "Controller event error");
            }
            futures::future::ready(())
        })
        .await;

    info!("{KIND_DATABASE} controller stopped");
    Ok(())
}

#[cfg(test)]
#[path = "database_tests.rs"]
mod database_tests;
