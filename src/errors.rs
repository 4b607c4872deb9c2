// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for allowlist convergence.
//!
//! Every kind aborts only the convergence pass of the service it occurred on and
//! is surfaced to the controller, which requeues the declaration. No remote state
//! is ever committed on error: the single full-state replace is the only mutation
//! point and is issued only after the desired allowlist has been computed.

use crate::status_reasons::{
    REASON_CLUSTER_MISCONFIGURED, REASON_INVALID_SELECTOR, REASON_KUBERNETES_API_ERROR,
    REASON_REMOTE_UNAVAILABLE, REASON_WILDCARD_EXPANSION_FAILED,
};
use thiserror::Error;

/// Errors that can occur while converging a database allowlist.
#[derive(Error, Debug)]
pub enum AllowlistError {
    /// A node selected for a private-network database has no internal address.
    ///
    /// The database and the cluster are in incompatible network topologies. This is
    /// fatal for the whole service's pass, not a per-node skip.
    #[error(
        "Kubernetes cluster seems to be public but managed database {service_id} (project {project_id}) is private: node '{node}' has no internal address"
    )]
    ClusterMisconfigured {
        /// Cloud project of the database
        project_id: String,
        /// Database service identifier
        service_id: String,
        /// Node lacking an internal address
        node: String,
    },

    /// Fetching state, replacing the allowlist or probing the egress address failed.
    #[error("{operation} failed: {reason}")]
    RemoteUnavailable {
        /// The remote operation that failed (e.g., "fetch cluster state")
        operation: String,
        /// Underlying failure
        reason: String,
    },

    /// Listing the services of a project for a wildcard declaration failed.
    #[error("failed to list database services of project {project_id}: {reason}")]
    WildcardExpansionFailed {
        /// Cloud project whose services could not be listed
        project_id: String,
        /// Underlying failure
        reason: String,
    },

    /// The declaration's node selector cannot be rendered (unknown operator,
    /// missing values).
    #[error("invalid label selector: {reason}")]
    InvalidSelector {
        /// What is wrong with the selector
        reason: String,
    },

    /// A Kubernetes API call (node listing, status update) failed.
    #[error("kubernetes api error: {0}")]
    Kube(#[from] kube::Error),
}

impl AllowlistError {
    /// Build a `RemoteUnavailable` from an operation name and any displayable error.
    ///
    /// The alternate formatter is used so `anyhow` context chains are kept.
    pub fn remote(operation: &str, err: impl std::fmt::Display) -> Self {
        Self::RemoteUnavailable {
            operation: operation.to_string(),
            reason: format!("{err:#}"),
        }
    }

    /// Whether retrying after a backoff may succeed without any change to the cluster.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            Self::ClusterMisconfigured { .. } | Self::InvalidSelector { .. }
        )
    }

    /// Condition reason reported on the `Database` status for this error.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::ClusterMisconfigured { .. } => REASON_CLUSTER_MISCONFIGURED,
            Self::RemoteUnavailable { .. } => REASON_REMOTE_UNAVAILABLE,
            Self::WildcardExpansionFailed { .. } => REASON_WILDCARD_EXPANSION_FAILED,
            Self::InvalidSelector { .. } => REASON_INVALID_SELECTOR,
            Self::Kube(_) => REASON_KUBERNETES_API_ERROR,
        }
    }

    /// Short label used for the `error_type` metric dimension.
    #[must_use]
    pub fn metric_label(&self) -> &'static str {
        match self {
            Self::ClusterMisconfigured { .. } => "cluster_misconfigured",
            Self::RemoteUnavailable { .. } => "remote_unavailable",
            Self::WildcardExpansionFailed { .. } => "wildcard_expansion_failed",
            Self::InvalidSelector { .. } => "invalid_selector",
            Self::Kube(_) => "kubernetes_api",
        }
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
