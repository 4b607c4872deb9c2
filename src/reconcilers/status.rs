// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status condition helpers for `Database` resources.
//!
//! A `Database` reports a single `Ready` condition:
//!
//! - `True` / `Converged` once every target service's allowlist matches the
//!   selected nodes;
//! - `False` with the error kind as reason (see [`crate::status_reasons`])
//!   when any service failed.
//!
//! # Condition Format
//!
//! - `type`: The aspect of the resource being reported (`Ready`)
//! - `status`: "True", "False", or "Unknown"
//! - `reason`: A programmatic identifier (CamelCase)
//! - `message`: A human-readable explanation
//! - `lastTransitionTime`: RFC3339 timestamp when the status value changed
//!
//! Status patches that would not change anything but timestamps are skipped, so
//! a status write never re-triggers reconciliation in a tight loop.

use crate::constants::{CONDITION_STATUS_FALSE, CONDITION_STATUS_TRUE, CONDITION_TYPE_READY};
use crate::crd::{Condition, Database, DatabaseStatus};
use crate::errors::AllowlistError;
use crate::status_reasons::REASON_CONVERGED;
use chrono::Utc;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use serde_json::json;
use tracing::debug;

/// Create a new Kubernetes condition with the current timestamp.
///
/// # Example
///
/// ```rust,no_run
/// # use dbfence::reconcilers::status::create_condition;
/// let condition = create_condition("Ready", "True", "Converged", "2 services converged");
/// assert_eq!(condition.r#type, "Ready");
/// assert_eq!(condition.status, "True");
/// ```
#[must_use]
pub fn create_condition(
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        last_transition_time: Some(Utc::now().to_rfc3339()),
    }
}

/// Find a condition by type in a list of conditions.
#[must_use]
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

/// Update or add a condition in a conditions list (in-memory, no API call).
///
/// The `lastTransitionTime` is preserved when the status value is unchanged.
pub fn update_condition_in_memory(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == condition_type) {
        let last_transition_time = if existing.status == status {
            existing
                .last_transition_time
                .clone()
                .unwrap_or_else(|| Utc::now().to_rfc3339())
        } else {
            Utc::now().to_rfc3339()
        };

        existing.status = status.to_string();
        existing.reason = Some(reason.to_string());
        existing.message = Some(message.to_string());
        existing.last_transition_time = Some(last_transition_time);
    } else {
        conditions.push(create_condition(condition_type, status, reason, message));
    }
}

/// Compare two condition lists ignoring `lastTransitionTime`.
#[must_use]
pub fn conditions_equal(current: &[Condition], new: &[Condition]) -> bool {
    current.len() == new.len()
        && new.iter().all(|new_cond| {
            find_condition(current, &new_cond.r#type).is_some_and(|curr_cond| {
                curr_cond.status == new_cond.status
                    && curr_cond.reason == new_cond.reason
                    && curr_cond.message == new_cond.message
            })
        })
}

/// Status after every target service converged.
#[must_use]
pub fn converged_status(database: &Database, services: &[String]) -> DatabaseStatus {
    let previous = database.status.clone().unwrap_or_default();
    let mut conditions = previous.conditions;

    let message = match services {
        [] => "No database service to converge".to_string(),
        [service] => format!("Allowlist of {service} converged"),
        _ => format!("Allowlists of {} services converged", services.len()),
    };
    update_condition_in_memory(
        &mut conditions,
        CONDITION_TYPE_READY,
        CONDITION_STATUS_TRUE,
        REASON_CONVERGED,
        &message,
    );

    let mut services = services.to_vec();
    services.sort();

    DatabaseStatus {
        conditions,
        observed_generation: database.metadata.generation,
        project_id: Some(database.spec.project_id.clone()),
        services,
        last_synced_at: previous.last_synced_at,
    }
}

/// Status after a failed pass.
///
/// The services of the last successful pass are kept.
#[must_use]
pub fn failed_status(database: &Database, error: &AllowlistError) -> DatabaseStatus {
    let previous = database.status.clone().unwrap_or_default();
    let mut conditions = previous.conditions;

    update_condition_in_memory(
        &mut conditions,
        CONDITION_TYPE_READY,
        CONDITION_STATUS_FALSE,
        error.reason(),
        &error.to_string(),
    );

    DatabaseStatus {
        conditions,
        observed_generation: database.metadata.generation,
        project_id: previous.project_id,
        services: previous.services,
        last_synced_at: previous.last_synced_at,
    }
}

/// Whether `new` differs from `current` in anything but timestamps.
#[must_use]
pub fn status_changed(current: Option<&DatabaseStatus>, new: &DatabaseStatus) -> bool {
    let Some(current) = current else {
        return true;
    };

    current.observed_generation != new.observed_generation
        || current.project_id != new.project_id
        || current.services != new.services
        || !conditions_equal(&current.conditions, &new.conditions)
}

/// Patch the status subresource of a `Database` if it changed.
///
/// `lastSyncedAt` is stamped on every write.
///
/// # Errors
///
/// Returns an error if the Kubernetes API call fails.
pub async fn patch_database_status(
    client: &Client,
    database: &Database,
    mut status: DatabaseStatus,
) -> Result<(), kube::Error> {
    if !status_changed(database.status.as_ref(), &status) {
        debug!(
            database = %database.name_any(),
            "Status unchanged, skipping update"
        );
        return Ok(());
    }

    status.last_synced_at = Some(Utc::now().to_rfc3339());

    let namespace = database.namespace().unwrap_or_default();
    let api: Api<Database> = Api::namespaced(client.clone(), &namespace);
    let patch = json!({ "status": status });

    api.patch_status(
        &database.name_any(),
        &PatchParams::default(),
        &Patch::Merge(&patch),
    )
    .await?;

    debug!(
        database = %database.name_any(),
        namespace = %namespace,
        "Updated Database status"
    );
    Ok(())
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
