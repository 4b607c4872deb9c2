// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes reconciliation for `Database` resources.
//!
//! # Reconciliation Architecture
//!
//! dbfence follows the standard Kubernetes controller pattern:
//!
//! 1. **Watch** - `Database` objects and cluster `Node`s
//! 2. **Reconcile** - Compute each target service's desired allowlist from the
//!    selected nodes and its current remote allowlist
//! 3. **Update** - Replace the remote allowlist when it differs
//! 4. **Status** - Report the outcome in the `Ready` condition
//!
//! # Modules
//!
//! - [`convergence`] - Per-service convergence and release passes
//! - [`database`] - `Database` reconciler and controller
//! - [`pagination`] - Paginated Kubernetes list calls
//! - [`retry`] - Exponential backoff for Kubernetes and HTTP calls
//! - [`status`] - Condition helpers and status patching

pub mod convergence;
pub mod database;
pub mod pagination;
pub mod retry;
pub mod status;

pub use database::{
    cleanup_database, list_nodes, reconcile_database, run_database_controller, ReconcileError,
};
