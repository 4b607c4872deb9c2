// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Desired allowlist computation.
//!
//! Combines freshly computed owned entries with the foreign entries currently
//! present on the remote allowlist. The merge is a pure function of its inputs,
//! which makes convergence idempotent: merging against an already converged
//! remote state yields a set equal to that state.
//!
//! # Rules
//!
//! 1. Foreign entries (no ownership tag) are carried over byte-identical.
//! 2. Every owned address gets an entry with a freshly encoded description.
//! 3. Previously owned entries whose address is no longer owned are dropped.
//! 4. A foreign entry covering an address wins over the owned candidate for it.

use crate::address::{normalize_address, OwnedAddresses};
use crate::ownership::{is_owned, owner_tag_for};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One entry of a database's remote IP restriction list.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IpRestriction {
    /// Address, possibly masked (e.g., `10.0.0.5/32`)
    pub ip: String,
    /// Free-text description; carries the ownership tag for owned entries
    #[serde(default)]
    pub description: String,
}

impl IpRestriction {
    pub fn new(ip: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            description: description.into(),
        }
    }

    /// Whether this entry was created by this operator.
    #[must_use]
    pub fn is_owned(&self) -> bool {
        is_owned(&self.description)
    }
}

/// Compute the allowlist that should be applied.
///
/// The result is sorted so that equal inputs always produce identical output.
#[must_use]
pub fn merge_allowlist(
    owned: &OwnedAddresses,
    resource_id: &str,
    current: &[IpRestriction],
) -> Vec<IpRestriction> {
    let mut desired: Vec<IpRestriction> = current
        .iter()
        .filter(|entry| !entry.is_owned())
        .cloned()
        .collect();

    let foreign_addresses: BTreeSet<String> = desired
        .iter()
        .map(|entry| normalize_address(&entry.ip))
        .collect();

    desired.extend(
        owned
            .iter()
            .filter(|(address, _)| !foreign_addresses.contains(*address))
            .map(|(address, owner)| {
                IpRestriction::new(address.clone(), owner_tag_for(owner, resource_id))
            }),
    );

    desired.sort();
    desired
}

/// Set equality between the desired and current allowlists.
#[must_use]
pub fn is_converged(desired: &[IpRestriction], current: &[IpRestriction]) -> bool {
    let desired: BTreeSet<&IpRestriction> = desired.iter().collect();
    let current: BTreeSet<&IpRestriction> = current.iter().collect();
    desired == current
}

/// Entries added and removed when going from `current` to `desired`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AllowlistChanges {
    pub added: Vec<IpRestriction>,
    pub removed: Vec<IpRestriction>,
}

impl AllowlistChanges {
    #[must_use]
    pub fn between(current: &[IpRestriction], desired: &[IpRestriction]) -> Self {
        let current: BTreeSet<&IpRestriction> = current.iter().collect();
        let desired: BTreeSet<&IpRestriction> = desired.iter().collect();

        Self {
            added: desired.difference(&current).map(|e| (*e).clone()).collect(),
            removed: current.difference(&desired).map(|e| (*e).clone()).collect(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[cfg(test)]
#[path = "allowlist_tests.rs"]
mod allowlist_tests;
