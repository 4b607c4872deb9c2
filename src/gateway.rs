// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Egress gateway detection for public-network databases.
//!
//! When the cluster's outbound traffic is NATed through a shared gateway, the
//! database observes the gateway address rather than the nodes' external
//! addresses, so allowlisting the nodes is ineffective. The operator runs inside
//! the cluster, so asking an address echo service which source address it sees
//! tells us which case applies:
//!
//! - the echoed address is one of the nodes' external addresses: no gateway, keep
//!   the per-node entries;
//! - otherwise: a gateway is present, replace every per-node entry with a single
//!   entry for the echoed address owned by the gateway pseudo-node.
//!
//! There is no cached fallback when the probe fails; the pass aborts.

use crate::address::{normalize_address, AddressOwner, OwnedAddresses};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use std::net::IpAddr;
use tracing::{debug, info};

/// Source of the cluster's observed egress address.
#[async_trait]
pub trait EgressProbe: Send + Sync {
    /// Return the source address remote services see for traffic from this cluster.
    async fn egress_address(&self) -> Result<String>;
}

/// Egress probe backed by a plain-text address echo service (e.g., `ifconfig.io`).
#[derive(Clone, Debug)]
pub struct HttpEgressProbe {
    client: HttpClient,
    url: String,
}

impl HttpEgressProbe {
    pub fn new(client: HttpClient, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl EgressProbe for HttpEgressProbe {
    async fn egress_address(&self) -> Result<String> {
        debug!(url = %self.url, "Probing cluster egress address");

        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "text/plain")
            .send()
            .await
            .with_context(|| format!("Failed to send egress probe to {}", self.url))?;

        let status = response.status();
        if !status.is_success() {
            bail!("Egress probe {} returned HTTP {status}", self.url);
        }

        let body = response
            .text()
            .await
            .context("Failed to read egress probe response body")?;
        let address = body.trim();

        if address.parse::<IpAddr>().is_err() {
            bail!(
                "Egress probe {} did not return an IP address (got {} bytes)",
                self.url,
                body.len()
            );
        }

        debug!(url = %self.url, address = %address, "Egress address observed");
        Ok(address.to_string())
    }
}

/// Decide between per-node entries and a single gateway entry.
///
/// `owned` are the per-node external addresses; `egress_address` is the probe
/// result (bare or masked).
#[must_use]
pub fn detect_gateway(owned: OwnedAddresses, egress_address: &str) -> OwnedAddresses {
    let egress = normalize_address(egress_address);

    if owned.contains_key(&egress) {
        debug!(
            egress = %egress,
            "Egress address belongs to a node, nodes are individually reachable"
        );
        return owned;
    }

    info!(
        egress = %egress,
        node_addresses = owned.len(),
        "Egress address matches no node, allowlisting the shared gateway instead"
    );
    OwnedAddresses::from([(
        egress.clone(),
        AddressOwner::Gateway { address: egress },
    )])
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod gateway_tests;
