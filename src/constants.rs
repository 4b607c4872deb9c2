// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the dbfence operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// Kind name for `Database` resource
pub const KIND_DATABASE: &str = "Database";

/// Finalizer placed on every `Database` so owned entries are released on deletion
pub const DATABASE_FINALIZER: &str = "databases.cloud.ovh.net/finalizer";

// ============================================================================
// Allowlist Ownership Constants
// ============================================================================

/// Literal token that marks a remote allowlist entry as owned by this operator.
///
/// Entries whose description does not start with this token followed by
/// [`OWNER_TAG_SEPARATOR`] are foreign and are never rewritten or removed.
pub const OWNER_TAG_PREFIX: &str = "K8S-CDB-Operator";

/// Separator between the fields of an ownership tag
pub const OWNER_TAG_SEPARATOR: char = '_';

/// Pseudo node name used when the cluster egresses through a shared gateway.
///
/// Kubernetes node names are DNS subdomains (lowercase only), so this name can
/// never collide with a real node.
pub const GATEWAY_NODE_NAME: &str = "kubeGW";

/// Exact-host mask appended to bare IPv4 addresses
pub const IPV4_HOST_MASK: &str = "/32";

/// Exact-host mask appended to bare IPv6 addresses
pub const IPV6_HOST_MASK: &str = "/128";

/// Node address type carrying the in-cluster address
pub const NODE_ADDRESS_INTERNAL: &str = "InternalIP";

/// Node address type carrying the externally routable address
pub const NODE_ADDRESS_EXTERNAL: &str = "ExternalIP";

// ============================================================================
// Remote API Constants
// ============================================================================

/// Prefix of every cloud project endpoint
pub const OVH_PROJECT_PREFIX: &str = "/cloud/project";

/// Path segment listing database services of a project
pub const OVH_DATABASE_SERVICE_PATH: &str = "database/service";

/// Unauthenticated endpoint returning the API server clock
pub const OVH_AUTH_TIME_PATH: &str = "/auth/time";

/// Signature version prefix required by the OVHcloud API
pub const OVH_SIGNATURE_VERSION: &str = "$1$";

/// Default OVHcloud API endpoint alias
pub const DEFAULT_OVH_ENDPOINT: &str = "ovh-eu";

/// Default address echo service used to discover the cluster egress address
pub const DEFAULT_EGRESS_PROBE_URL: &str = "https://ifconfig.io";

// ============================================================================
// Controller Timing Constants
// ============================================================================

/// Requeue interval after a successful pass (5 minutes)
pub const DEFAULT_REQUEUE_SECS: u64 = 300;

/// Requeue interval after a failed pass (30 seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Per-request HTTP timeout
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Upper bound on one service's convergence pass
pub const DEFAULT_PASS_TIMEOUT_SECS: u64 = 60;

/// Default bind address of the metrics and health endpoint
pub const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:8080";

/// Page size for Kubernetes list calls
pub const KUBE_LIST_PAGE_SIZE: u32 = 100;

// ============================================================================
// Status Condition Constants
// ============================================================================

/// Condition type reported on every `Database`
pub const CONDITION_TYPE_READY: &str = "Ready";

/// Condition status for a healthy resource
pub const CONDITION_STATUS_TRUE: &str = "True";

/// Condition status for a failing resource
pub const CONDITION_STATUS_FALSE: &str = "False";
