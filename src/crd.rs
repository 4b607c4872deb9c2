// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions (CRDs) for database allowlist management.
//!
//! # Resource Types
//!
//! - [`Database`] - Declares which cluster nodes may reach one (or every)
//!   managed database service of a cloud project.
//!
//! # Example
//!
//! ```rust,no_run
//! use dbfence::crd::{DatabaseSpec, LabelSelector};
//! use std::collections::BTreeMap;
//!
//! let spec = DatabaseSpec {
//!     project_id: "0123456789abcdef".to_string(),
//!     service_id: Some("a1b2c3d4-0000-1111-2222-333344445555".to_string()),
//!     label_selector: Some(LabelSelector {
//!         match_labels: Some(BTreeMap::from([(
//!             "nodepool".to_string(),
//!             "workers".to_string(),
//!         )])),
//!         match_expressions: None,
//!     }),
//! };
//! ```

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label selector to match Kubernetes resources.
///
/// A label selector is a label query over a set of resources. The result of matchLabels and
/// matchExpressions are `ANDed`. An empty label selector matches all objects.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    /// Map of {key,value} pairs. A single {key,value} in the matchLabels map is equivalent
    /// to an element of matchExpressions, whose key field is "key", the operator is "In",
    /// and the values array contains only "value". All requirements must be satisfied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_labels: Option<BTreeMap<String, String>>,

    /// List of label selector requirements. All requirements must be satisfied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_expressions: Option<Vec<LabelSelectorRequirement>>,
}

/// A label selector requirement is a selector that contains values, a key, and an operator
/// that relates the key and values.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct LabelSelectorRequirement {
    /// The label key that the selector applies to.
    pub key: String,

    /// Operator represents a key's relationship to a set of values.
    /// Valid operators are In, `NotIn`, Exists and `DoesNotExist`.
    pub operator: String,

    /// An array of string values. If the operator is In or `NotIn`,
    /// the values array must be non-empty. If the operator is Exists or `DoesNotExist`,
    /// the values array must be empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
}

/// Condition represents an observation of a resource's current state.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition. Only `Ready` is reported.
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// `Database` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Project of [`Self::services`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    /// Database services whose allowlist was converged on the last successful pass.
    #[serde(default)]
    pub services: Vec<String>,

    /// When a pass last changed the reported status (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<String>,
}

/// `Database` declares which cluster nodes are allowed to reach a managed database.
///
/// The operator keeps the database's remote IP restriction list in sync with the
/// addresses of the selected nodes. Entries added outside the operator are preserved.
///
/// # Example
///
/// ```yaml
/// apiVersion: cloud.ovh.net/v1alpha1
/// kind: Database
/// metadata:
///   name: orders-db
///   namespace: default
/// spec:
///   projectId: 0123456789abcdef
///   serviceId: a1b2c3d4-0000-1111-2222-333344445555
///   labelSelector:
///     matchLabels:
///       nodepool: workers
/// ```
///
/// Leaving `serviceId` empty targets every database service of the project.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "cloud.ovh.net",
    version = "v1alpha1",
    kind = "Database",
    namespaced,
    doc = "Database keeps the IP restriction list of a managed database in sync with the addresses of selected Kubernetes nodes."
)]
#[kube(status = "DatabaseStatus")]
#[kube(
    printcolumn = r#"{"name":"Project","type":"string","jsonPath":".spec.projectId"}"#,
    printcolumn = r#"{"name":"Service","type":"string","jsonPath":".spec.serviceId"}"#,
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSpec {
    /// Cloud project holding the database service(s).
    #[schemars(length(min = 1))]
    pub project_id: String,

    /// Database service identifier. Empty or absent selects every service of the project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,

    /// Nodes whose addresses should be allowed. Absent selects every node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_selector: Option<LabelSelector>,
}

impl DatabaseSpec {
    /// The explicit service id, or `None` when the declaration is a wildcard.
    #[must_use]
    pub fn explicit_service_id(&self) -> Option<&str> {
        self.service_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
