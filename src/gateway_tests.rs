// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `gateway.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::address::{resolve_addresses, AddressKind, NetworkMode, NodeAddress, NodeInfo};
    use crate::allowlist::merge_allowlist;

    fn public_node(name: &str, external: &str) -> NodeInfo {
        NodeInfo {
            name: name.to_string(),
            uid: format!("{name}-uid"),
            addresses: vec![NodeAddress {
                kind: AddressKind::External,
                value: external.to_string(),
            }],
        }
    }

    fn two_public_nodes() -> OwnedAddresses {
        resolve_addresses(
            &[
                public_node("node1", "203.0.113.1"),
                public_node("node2", "203.0.113.2"),
            ],
            NetworkMode::Public,
            "p1",
            "svc",
        )
        .unwrap()
    }

    #[test]
    fn test_egress_matching_a_node_keeps_per_node_entries() {
        let owned = two_public_nodes();

        let result = detect_gateway(owned.clone(), "203.0.113.1");

        assert_eq!(result, owned);
    }

    #[test]
    fn test_masked_egress_matching_a_node_keeps_per_node_entries() {
        let owned = two_public_nodes();

        let result = detect_gateway(owned.clone(), "203.0.113.2/32");

        assert_eq!(result, owned);
    }

    #[test]
    fn test_unknown_egress_collapses_to_gateway_entry() {
        let result = detect_gateway(two_public_nodes(), "198.51.100.77\n");

        assert_eq!(result.len(), 1);
        assert_eq!(
            result.get("198.51.100.77/32"),
            Some(&AddressOwner::Gateway {
                address: "198.51.100.77/32".to_string(),
            })
        );
    }

    #[test]
    fn test_gateway_merge_produces_single_owned_entry() {
        let owned = detect_gateway(two_public_nodes(), "198.51.100.77");

        let desired = merge_allowlist(&owned, "res-uid", &[]);

        assert_eq!(desired.len(), 1);
        assert_eq!(desired[0].ip, "198.51.100.77/32");
        assert!(desired[0].description.starts_with("K8S-CDB-Operator_kubeGW_res-uid_"));
    }

    #[test]
    fn test_no_gateway_merge_produces_per_node_entries() {
        let owned = detect_gateway(two_public_nodes(), "203.0.113.1");

        let desired = merge_allowlist(&owned, "res-uid", &[]);

        let ips: Vec<&str> = desired.iter().map(|e| e.ip.as_str()).collect();
        assert_eq!(ips, vec!["203.0.113.1/32", "203.0.113.2/32"]);
    }

    #[test]
    fn test_no_external_addresses_means_gateway() {
        let result = detect_gateway(OwnedAddresses::new(), "198.51.100.77");

        assert_eq!(result.len(), 1);
        assert!(result.contains_key("198.51.100.77/32"));
    }
}
