// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # dbfence - Managed Database Allowlist Operator for Kubernetes
//!
//! dbfence keeps the IP restriction list of OVHcloud managed databases in sync
//! with the addresses of the Kubernetes nodes that need to reach them.
//!
//! ## Overview
//!
//! A [`crd::Database`] declares a cloud project, an optional service id (absent
//! means every database service of the project) and a node label selector. For
//! every target service the operator:
//!
//! - resolves the selected nodes' internal (private network) or external
//!   (public network) addresses
//! - on public networks, detects a shared egress gateway and allowlists it in
//!   place of the nodes
//! - merges the owned entries with the entries it does not own, which are kept
//!   byte-identical
//! - replaces the remote allowlist in a single request when it differs
//!
//! ## Modules
//!
//! - [`address`] - Node address resolution
//! - [`gateway`] - Egress gateway detection
//! - [`ownership`] - Ownership tags carried in entry descriptions
//! - [`allowlist`] - Desired allowlist computation
//! - [`ovh`] - OVHcloud API client
//! - [`reconcilers`] - Convergence passes and the `Database` controller
//!
//! ## Example
//!
//! ```rust
//! use dbfence::address::{resolve_addresses, AddressKind, NetworkMode, NodeAddress, NodeInfo};
//! use dbfence::allowlist::merge_allowlist;
//!
//! let nodes = vec![NodeInfo {
//!     name: "node1".to_string(),
//!     uid: "node-uid".to_string(),
//!     addresses: vec![NodeAddress {
//!         kind: AddressKind::Internal,
//!         value: "10.0.0.5".to_string(),
//!     }],
//! }];
//!
//! let owned = resolve_addresses(&nodes, NetworkMode::Private, "project", "service").unwrap();
//! let desired = merge_allowlist(&owned, "resource-uid", &[]);
//!
//! assert_eq!(desired[0].ip, "10.0.0.5/32");
//! assert_eq!(desired[0].description, "K8S-CDB-Operator_node1_resource-uid_node-uid");
//! ```

pub mod address;
pub mod allowlist;
pub mod config;
pub mod constants;
pub mod context;
pub mod crd;
pub mod errors;
pub mod gateway;
pub mod metrics;
pub mod ovh;
pub mod ownership;
pub mod reconcilers;
pub mod selector;
pub mod server;
pub mod status_reasons;
