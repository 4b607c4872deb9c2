// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ownership tags for remote allowlist entries.
//!
//! The remote allowlist has no metadata field, so ownership is carried in the
//! free-text description: `K8S-CDB-Operator_<node name>_<resource uid>_<node uid>`.
//! Decoding only answers "is this entry ours"; it never needs the encoded triple back.

use crate::address::AddressOwner;
use crate::constants::{GATEWAY_NODE_NAME, OWNER_TAG_PREFIX, OWNER_TAG_SEPARATOR};

/// Encode the description of an owned entry.
///
/// The resource uid keeps declarations with overlapping node sets apart, and the
/// node uid makes a re-created node produce a fresh tag.
#[must_use]
pub fn encode_owner_tag(node_name: &str, resource_id: &str, node_id: &str) -> String {
    format!(
        "{OWNER_TAG_PREFIX}{OWNER_TAG_SEPARATOR}{node_name}{OWNER_TAG_SEPARATOR}{resource_id}{OWNER_TAG_SEPARATOR}{node_id}"
    )
}

/// Encode the description for an owned address given its origin.
///
/// The gateway pseudo-node uses the gateway address in place of a node uid.
#[must_use]
pub fn owner_tag_for(owner: &AddressOwner, resource_id: &str) -> String {
    match owner {
        AddressOwner::Node { name, uid } => encode_owner_tag(name, resource_id, uid),
        AddressOwner::Gateway { address } => {
            encode_owner_tag(GATEWAY_NODE_NAME, resource_id, address)
        }
    }
}

/// Whether a description marks its entry as owned by this operator.
///
/// Pure prefix test: the prefix token must be followed by the separator, so a
/// description such as `K8S-CDB-Operator-legacy` stays foreign.
#[must_use]
pub fn is_owned(description: &str) -> bool {
    description
        .strip_prefix(OWNER_TAG_PREFIX)
        .is_some_and(|rest| rest.starts_with(OWNER_TAG_SEPARATOR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_owner_tag() {
        assert_eq!(
            encode_owner_tag("node1", "res-uid", "node-uid"),
            "K8S-CDB-Operator_node1_res-uid_node-uid"
        );
    }

    #[test]
    fn test_encoded_tag_is_owned() {
        assert!(is_owned(&encode_owner_tag("n", "r", "u")));
    }

    #[test]
    fn test_foreign_descriptions() {
        assert!(!is_owned(""));
        assert!(!is_owned("office VPN"));
        assert!(!is_owned("K8S-CDB-Operator"));
        assert!(!is_owned("K8S-CDB-Operator-legacy"));
        assert!(!is_owned(" K8S-CDB-Operator_node1_r_u"));
        assert!(!is_owned("k8s-cdb-operator_node1_r_u"));
    }

    #[test]
    fn test_gateway_tag_uses_pseudo_node() {
        let owner = AddressOwner::Gateway {
            address: "198.51.100.1/32".to_string(),
        };
        assert_eq!(
            owner_tag_for(&owner, "res-uid"),
            "K8S-CDB-Operator_kubeGW_res-uid_198.51.100.1/32"
        );
    }

    #[test]
    fn test_distinct_resources_produce_distinct_tags() {
        let owner = AddressOwner::Node {
            name: "node1".to_string(),
            uid: "u1".to_string(),
        };
        assert_ne!(owner_tag_for(&owner, "res-a"), owner_tag_for(&owner, "res-b"));
    }
}
