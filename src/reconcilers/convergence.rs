// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Allowlist convergence for database services.
//!
//! One *pass* converges one service:
//!
//! ```text
//! FetchRemoteState -> ResolveAddresses -> (DetectGateway if public) -> Merge -> ApplyIfChanged
//! ```
//!
//! The remote state is read first because the network mode that drives address
//! resolution is an attribute of the service. Every step short-circuits on the
//! first error, and the full-state replace is the only remote mutation, issued at
//! most once and only after the desired allowlist is complete. A pass is bounded
//! by a timeout; expiry drops the in-flight future, so a replace that has not been
//! sent yet is never sent.
//!
//! Nothing here talks to Kubernetes: nodes are handed in by the caller, which
//! keeps the driver testable against in-memory fakes of [`DatabaseCloudApi`] and
//! [`EgressProbe`].

use crate::address::{resolve_addresses, NetworkMode, NodeInfo, OwnedAddresses};
use crate::allowlist::{is_converged, merge_allowlist, AllowlistChanges, IpRestriction};
use crate::errors::AllowlistError;
use crate::gateway::{detect_gateway, EgressProbe};
use crate::metrics;
use crate::ovh::{ClusterState, DatabaseCloudApi};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info};

/// Identity of one service pass.
#[derive(Clone, Copy, Debug)]
pub struct ServiceTarget<'a> {
    pub project_id: &'a str,
    pub service_id: &'a str,
    /// Uid of the declaring `Database`, embedded in ownership tags
    pub resource_id: &'a str,
}

/// Result of a successful pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassOutcome {
    /// Whether a replace request was issued
    pub replaced: bool,
    /// Owned entries in the allowlist after the pass
    pub owned_entries: usize,
    pub changes: AllowlistChanges,
}

/// Converge one service's allowlist with the given nodes.
///
/// # Errors
///
/// - [`AllowlistError::ClusterMisconfigured`] for a private service and a node
///   without internal address
/// - [`AllowlistError::RemoteUnavailable`] when fetching, probing or replacing
///   fails, or the pass exceeds `pass_timeout`
pub async fn converge_service(
    cloud: &dyn DatabaseCloudApi,
    probe: &dyn EgressProbe,
    target: ServiceTarget<'_>,
    nodes: &[NodeInfo],
    pass_timeout: Duration,
) -> Result<PassOutcome, AllowlistError> {
    let outcome = bounded(
        pass_timeout,
        "convergence pass",
        run_pass(cloud, probe, target, nodes),
    )
    .await?;

    metrics::record_allowlist_pass(target.service_id, outcome.replaced, outcome.owned_entries);
    Ok(outcome)
}

/// Remove every owned entry from one service's allowlist, keeping foreign entries.
///
/// # Errors
///
/// Returns [`AllowlistError::RemoteUnavailable`] when fetching or replacing fails,
/// or the pass exceeds `pass_timeout`.
pub async fn release_service(
    cloud: &dyn DatabaseCloudApi,
    target: ServiceTarget<'_>,
    pass_timeout: Duration,
) -> Result<PassOutcome, AllowlistError> {
    let outcome = bounded(pass_timeout, "release pass", async {
        let state = fetch_state(cloud, target).await?;
        let desired = merge_allowlist(
            &OwnedAddresses::new(),
            target.resource_id,
            &state.ip_restrictions,
        );
        apply_if_changed(cloud, target, &state, desired).await
    })
    .await?;

    metrics::clear_owned_entries(target.service_id);
    Ok(outcome)
}

/// Converge every service of a declaration.
///
/// Every service is attempted even after one fails; the first error is returned
/// once all services have been attempted.
///
/// # Errors
///
/// Returns the first error of any service's pass.
pub async fn converge_services(
    cloud: &dyn DatabaseCloudApi,
    probe: &dyn EgressProbe,
    project_id: &str,
    services: &[String],
    resource_id: &str,
    nodes: &[NodeInfo],
    pass_timeout: Duration,
) -> Result<(), AllowlistError> {
    let mut first_error = None;

    for service_id in services {
        let target = ServiceTarget {
            project_id,
            service_id,
            resource_id,
        };

        match converge_service(cloud, probe, target, nodes, pass_timeout).await {
            Ok(outcome) => debug!(
                project_id = %project_id,
                service_id = %service_id,
                replaced = outcome.replaced,
                "Service pass finished"
            ),
            Err(e) => {
                error!(
                    project_id = %project_id,
                    service_id = %service_id,
                    error = %e,
                    "Service pass failed"
                );
                first_error.get_or_insert(e);
            }
        }
    }

    first_error.map_or(Ok(()), Err)
}

/// Release every service of a declaration, with the same policy as [`converge_services`].
///
/// # Errors
///
/// Returns the first error of any service's release pass.
pub async fn release_services(
    cloud: &dyn DatabaseCloudApi,
    project_id: &str,
    services: &[String],
    resource_id: &str,
    pass_timeout: Duration,
) -> Result<(), AllowlistError> {
    let mut first_error = None;

    for service_id in services {
        let target = ServiceTarget {
            project_id,
            service_id,
            resource_id,
        };

        if let Err(e) = release_service(cloud, target, pass_timeout).await {
            error!(
                project_id = %project_id,
                service_id = %service_id,
                error = %e,
                "Release pass failed"
            );
            first_error.get_or_insert(e);
        }
    }

    first_error.map_or(Ok(()), Err)
}

/// Services a declaration targets: the explicit one, or every service of the project.
///
/// # Errors
///
/// Returns [`AllowlistError::WildcardExpansionFailed`] when listing fails.
pub async fn target_services(
    cloud: &dyn DatabaseCloudApi,
    project_id: &str,
    explicit_service_id: Option<&str>,
) -> Result<Vec<String>, AllowlistError> {
    if let Some(service_id) = explicit_service_id {
        return Ok(vec![service_id.to_string()]);
    }

    let services = cloud.list_services(project_id).await.map_err(|e| {
        AllowlistError::WildcardExpansionFailed {
            project_id: project_id.to_string(),
            reason: format!("{e:#}"),
        }
    })?;

    debug!(
        project_id = %project_id,
        services = services.len(),
        "Expanded wildcard declaration"
    );
    Ok(services)
}

async fn run_pass(
    cloud: &dyn DatabaseCloudApi,
    probe: &dyn EgressProbe,
    target: ServiceTarget<'_>,
    nodes: &[NodeInfo],
) -> Result<PassOutcome, AllowlistError> {
    let state = fetch_state(cloud, target).await?;

    let mut owned = resolve_addresses(
        nodes,
        state.network_mode,
        target.project_id,
        target.service_id,
    )?;

    // With no selected node there is nothing to reach the database from, gateway or not.
    // An empty selection never allowlists the egress address, even though it is
    // trivially absent from the (empty) node addresses.
    if state.network_mode == NetworkMode::Public && !nodes.is_empty() {
        let egress = probe
            .egress_address()
            .await
            .map_err(|e| AllowlistError::remote("probe egress address", e))?;
        owned = detect_gateway(owned, &egress);
    }

    let desired = merge_allowlist(&owned, target.resource_id, &state.ip_restrictions);
    apply_if_changed(cloud, target, &state, desired).await
}

async fn fetch_state(
    cloud: &dyn DatabaseCloudApi,
    target: ServiceTarget<'_>,
) -> Result<ClusterState, AllowlistError> {
    let state = cloud
        .get_cluster_state(target.project_id, target.service_id)
        .await
        .map_err(|e| AllowlistError::remote("fetch cluster state", e))?;

    debug!(
        project_id = %target.project_id,
        service_id = %target.service_id,
        engine = %state.engine,
        network_mode = %state.network_mode,
        current = ?state.ip_restrictions,
        "Fetched database state"
    );
    Ok(state)
}

async fn apply_if_changed(
    cloud: &dyn DatabaseCloudApi,
    target: ServiceTarget<'_>,
    state: &ClusterState,
    desired: Vec<IpRestriction>,
) -> Result<PassOutcome, AllowlistError> {
    let owned_entries = desired.iter().filter(|entry| entry.is_owned()).count();

    if is_converged(&desired, &state.ip_restrictions) {
        debug!(
            project_id = %target.project_id,
            service_id = %target.service_id,
            "Allowlist already converged"
        );
        return Ok(PassOutcome {
            replaced: false,
            owned_entries,
            changes: AllowlistChanges::default(),
        });
    }

    let changes = AllowlistChanges::between(&state.ip_restrictions, &desired);
    debug!(
        project_id = %target.project_id,
        service_id = %target.service_id,
        old = ?state.ip_restrictions,
        new = ?desired,
        "Allowlist differs from desired state"
    );

    cloud
        .replace_allowlist(
            target.project_id,
            target.service_id,
            &state.engine,
            &desired,
        )
        .await
        .map_err(|e| AllowlistError::remote("replace allowlist", e))?;

    info!(
        project_id = %target.project_id,
        service_id = %target.service_id,
        added = changes.added.len(),
        removed = changes.removed.len(),
        entries = desired.len(),
        "Allowlist replaced"
    );

    Ok(PassOutcome {
        replaced: true,
        owned_entries,
        changes,
    })
}

async fn bounded<T>(
    limit: Duration,
    operation: &str,
    pass: impl Future<Output = Result<T, AllowlistError>>,
) -> Result<T, AllowlistError> {
    tokio::time::timeout(limit, pass).await.map_err(|_| {
        AllowlistError::remote(operation, format!("timed out after {}s", limit.as_secs_f64()))
    })?
}

#[cfg(test)]
#[path = "convergence_tests.rs"]
mod convergence_tests;
