// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Address resolution for selected cluster nodes.
//!
//! Turns a set of node records and the database's network mode into the set of
//! addresses this operator owns on the remote allowlist, each mapped to the node
//! (or the egress gateway) it originates from.
//!
//! # Network Modes
//!
//! - **private** - every node must expose an `InternalIP`; a node without one means
//!   the database and the cluster live in incompatible network topologies and the
//!   whole pass fails with [`AllowlistError::ClusterMisconfigured`].
//! - **public** - every `ExternalIP` of every node is used; nodes without one are
//!   invisible to the database and simply contribute nothing.
//!
//! All addresses are normalized with an exact-host mask so that `10.0.0.5` and
//! `10.0.0.5/32` compare equal.

use crate::constants::{
    IPV4_HOST_MASK, IPV6_HOST_MASK, NODE_ADDRESS_EXTERNAL, NODE_ADDRESS_INTERNAL,
};
use crate::errors::AllowlistError;
use k8s_openapi::api::core::v1::Node;
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

/// Network placement of a managed database service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetworkMode {
    /// Reachable only from a private network; node internal addresses apply.
    Private,
    /// Reachable from the internet; node external addresses (or the gateway) apply.
    Public,
}

impl NetworkMode {
    /// Parse the `networkType` reported by the cloud API.
    ///
    /// Anything other than `private` is treated as public.
    #[must_use]
    pub fn from_network_type(network_type: &str) -> Self {
        if network_type.eq_ignore_ascii_case("private") {
            Self::Private
        } else {
            Self::Public
        }
    }
}

impl fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Private => f.write_str("private"),
            Self::Public => f.write_str("public"),
        }
    }
}

/// Kind of a node address relevant to allowlisting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressKind {
    Internal,
    External,
}

/// One typed address of a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeAddress {
    pub kind: AddressKind,
    pub value: String,
}

/// The parts of a cluster node that matter for allowlisting.
///
/// Built fresh for every pass and immutable for its duration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeInfo {
    pub name: String,
    pub uid: String,
    pub addresses: Vec<NodeAddress>,
}

impl NodeInfo {
    /// Extract name, uid and internal/external addresses from a Kubernetes `Node`.
    ///
    /// Address types other than `InternalIP` and `ExternalIP` are ignored.
    #[must_use]
    pub fn from_node(node: &Node) -> Self {
        let addresses = node
            .status
            .as_ref()
            .and_then(|status| status.addresses.as_ref())
            .map(|addresses| {
                addresses
                    .iter()
                    .filter_map(|address| {
                        let kind = match address.type_.as_str() {
                            NODE_ADDRESS_INTERNAL => AddressKind::Internal,
                            NODE_ADDRESS_EXTERNAL => AddressKind::External,
                            _ => return None,
                        };
                        Some(NodeAddress {
                            kind,
                            value: address.address.clone(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            name: node.name_any(),
            uid: node.uid().unwrap_or_default(),
            addresses,
        }
    }

    fn addresses_of(&self, kind: AddressKind) -> impl Iterator<Item = &str> {
        self.addresses
            .iter()
            .filter(move |address| address.kind == kind)
            .map(|address| address.value.as_str())
    }
}

/// Origin of an owned allowlist address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AddressOwner {
    /// A real cluster node.
    Node { name: String, uid: String },
    /// The shared egress gateway the whole cluster is observed behind.
    Gateway { address: String },
}

/// Owned addresses, normalized, mapped to their origin.
pub type OwnedAddresses = BTreeMap<String, AddressOwner>;

/// Append the exact-host mask to a bare address.
///
/// Addresses that already carry a mask are returned unchanged (apart from
/// surrounding whitespace). IPv6 addresses get `/128`; everything else `/32`.
#[must_use]
pub fn normalize_address(address: &str) -> String {
    let address = address.trim();
    if address.contains('/') {
        return address.to_string();
    }
    match address.parse::<IpAddr>() {
        Ok(IpAddr::V6(_)) => format!("{address}{IPV6_HOST_MASK}"),
        _ => format!("{address}{IPV4_HOST_MASK}"),
    }
}

/// Compute the owned addresses for a set of nodes under a network mode.
///
/// When two nodes report the same address the first one keeps ownership.
///
/// # Errors
///
/// Returns [`AllowlistError::ClusterMisconfigured`] in private mode when any node
/// has no internal address.
pub fn resolve_addresses(
    nodes: &[NodeInfo],
    mode: NetworkMode,
    project_id: &str,
    service_id: &str,
) -> Result<OwnedAddresses, AllowlistError> {
    let mut owned = OwnedAddresses::new();

    for node in nodes {
        let owner = || AddressOwner::Node {
            name: node.name.clone(),
            uid: node.uid.clone(),
        };

        match mode {
            NetworkMode::Private => {
                let Some(address) = node.addresses_of(AddressKind::Internal).next() else {
                    return Err(AllowlistError::ClusterMisconfigured {
                        project_id: project_id.to_string(),
                        service_id: service_id.to_string(),
                        node: node.name.clone(),
                    });
                };
                owned
                    .entry(normalize_address(address))
                    .or_insert_with(owner);
            }
            NetworkMode::Public => {
                for address in node.addresses_of(AddressKind::External) {
                    owned
                        .entry(normalize_address(address))
                        .or_insert_with(owner);
                }
            }
        }
    }

    Ok(owned)
}

#[cfg(test)]
#[path = "address_tests.rs"]
mod address_tests;
