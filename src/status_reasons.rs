// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Standard Kubernetes status condition reasons for `Database` resources.
//!
//! Reasons are programmatic identifiers in CamelCase that explain why the
//! `Ready` condition has a particular status.
//!
//! # Example Status
//!
//! ```yaml
//! status:
//!   conditions:
//!     - type: Ready
//!       status: "False"
//!       reason: ClusterMisconfigured
//!       message: "Kubernetes cluster seems to be public but managed database ... is private"
//! ```

/// Every target service's allowlist matches the selected nodes.
pub const REASON_CONVERGED: &str = "Converged";

/// A private-network database is targeted by nodes without an internal address.
pub const REASON_CLUSTER_MISCONFIGURED: &str = "ClusterMisconfigured";

/// The cloud API or the egress probe could not be reached.
pub const REASON_REMOTE_UNAVAILABLE: &str = "RemoteUnavailable";

/// The database services of a wildcard declaration could not be listed.
pub const REASON_WILDCARD_EXPANSION_FAILED: &str = "WildcardExpansionFailed";

/// The declaration's node selector is malformed.
pub const REASON_INVALID_SELECTOR: &str = "InvalidSelector";

/// A Kubernetes API call failed.
pub const REASON_KUBERNETES_API_ERROR: &str = "KubernetesApiError";
