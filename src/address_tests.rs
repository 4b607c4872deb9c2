// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `address.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use k8s_openapi::api::core::v1::{NodeAddress as K8sNodeAddress, NodeStatus};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn node(name: &str, internal: Option<&str>, external: &[&str]) -> NodeInfo {
        let mut addresses = Vec::new();
        if let Some(ip) = internal {
            addresses.push(NodeAddress {
                kind: AddressKind::Internal,
                value: ip.to_string(),
            });
        }
        for ip in external {
            addresses.push(NodeAddress {
                kind: AddressKind::External,
                value: (*ip).to_string(),
            });
        }
        NodeInfo {
            name: name.to_string(),
            uid: format!("{name}-uid"),
            addresses,
        }
    }

    #[test]
    fn test_normalize_bare_ipv4() {
        assert_eq!(normalize_address("10.0.0.5"), "10.0.0.5/32");
    }

    #[test]
    fn test_normalize_keeps_existing_mask() {
        assert_eq!(normalize_address("10.0.0.5/32"), "10.0.0.5/32");
        assert_eq!(normalize_address("10.0.0.0/24"), "10.0.0.0/24");
    }

    #[test]
    fn test_normalize_trims_whitespace() {
        assert_eq!(normalize_address(" 203.0.113.7\n"), "203.0.113.7/32");
    }

    #[test]
    fn test_normalize_ipv6() {
        assert_eq!(normalize_address("2001:db8::1"), "2001:db8::1/128");
    }

    #[test]
    fn test_network_mode_parsing() {
        assert_eq!(NetworkMode::from_network_type("private"), NetworkMode::Private);
        assert_eq!(NetworkMode::from_network_type("PRIVATE"), NetworkMode::Private);
        assert_eq!(NetworkMode::from_network_type("public"), NetworkMode::Public);
        assert_eq!(NetworkMode::from_network_type(""), NetworkMode::Public);
    }

    #[test]
    fn test_private_mode_uses_internal_address() {
        let nodes = vec![
            node("node1", Some("10.0.0.5"), &["203.0.113.5"]),
            node("node2", Some("10.0.0.6"), &[]),
        ];

        let owned = resolve_addresses(&nodes, NetworkMode::Private, "p1", "svc").unwrap();

        assert_eq!(owned.len(), 2);
        assert_eq!(
            owned.get("10.0.0.5/32"),
            Some(&AddressOwner::Node {
                name: "node1".to_string(),
                uid: "node1-uid".to_string(),
            })
        );
        assert!(owned.contains_key("10.0.0.6/32"));
        assert!(!owned.contains_key("203.0.113.5/32"));
    }

    #[test]
    fn test_private_mode_node_without_internal_address_fails() {
        let nodes = vec![
            node("node1", Some("10.0.0.5"), &[]),
            node("edge", None, &["203.0.113.9"]),
        ];

        let err = resolve_addresses(&nodes, NetworkMode::Private, "p1", "svc-1").unwrap_err();

        match err {
            AllowlistError::ClusterMisconfigured {
                project_id,
                service_id,
                node,
            } => {
                assert_eq!(project_id, "p1");
                assert_eq!(service_id, "svc-1");
                assert_eq!(node, "edge");
            }
            other => panic!("expected ClusterMisconfigured, got {other:?}"),
        }
    }

    #[test]
    fn test_public_mode_collects_every_external_address() {
        let nodes = vec![
            node("node1", Some("10.0.0.5"), &["203.0.113.5", "203.0.113.50"]),
            node("node2", Some("10.0.0.6"), &["203.0.113.6"]),
        ];

        let owned = resolve_addresses(&nodes, NetworkMode::Public, "p1", "svc").unwrap();

        let keys: Vec<&str> = owned.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["203.0.113.5/32", "203.0.113.50/32", "203.0.113.6/32"]
        );
    }

    #[test]
    fn test_public_mode_skips_nodes_without_external_address() {
        let nodes = vec![
            node("node1", Some("10.0.0.5"), &[]),
            node("node2", None, &["203.0.113.6"]),
        ];

        let owned = resolve_addresses(&nodes, NetworkMode::Public, "p1", "svc").unwrap();

        assert_eq!(owned.len(), 1);
        assert!(owned.contains_key("203.0.113.6/32"));
    }

    #[test]
    fn test_duplicate_addresses_collapse() {
        let nodes = vec![
            node("node1", Some("10.0.0.5"), &[]),
            node("node1-clone", Some("10.0.0.5/32"), &[]),
        ];

        let owned = resolve_addresses(&nodes, NetworkMode::Private, "p1", "svc").unwrap();

        assert_eq!(owned.len(), 1);
        assert_eq!(
            owned.get("10.0.0.5/32"),
            Some(&AddressOwner::Node {
                name: "node1".to_string(),
                uid: "node1-uid".to_string(),
            })
        );
    }

    #[test]
    fn test_empty_node_set_resolves_to_nothing() {
        let owned = resolve_addresses(&[], NetworkMode::Private, "p1", "svc").unwrap();
        assert!(owned.is_empty());
    }

    #[test]
    fn test_from_node_extracts_typed_addresses() {
        let k8s_node = Node {
            metadata: ObjectMeta {
                name: Some("worker-1".to_string()),
                uid: Some("0000-1111".to_string()),
                ..Default::default()
            },
            spec: None,
            status: Some(NodeStatus {
                addresses: Some(vec![
                    K8sNodeAddress {
                        type_: "Hostname".to_string(),
                        address: "worker-1".to_string(),
                    },
                    K8sNodeAddress {
                        type_: "InternalIP".to_string(),
                        address: "10.1.0.4".to_string(),
                    },
                    K8sNodeAddress {
                        type_: "ExternalIP".to_string(),
                        address: "198.51.100.4".to_string(),
                    },
                ]),
                ..Default::default()
            }),
        };

        let info = NodeInfo::from_node(&k8s_node);

        assert_eq!(info.name, "worker-1");
        assert_eq!(info.uid, "0000-1111");
        assert_eq!(
            info.addresses,
            vec![
                NodeAddress {
                    kind: AddressKind::Internal,
                    value: "10.1.0.4".to_string(),
                },
                NodeAddress {
                    kind: AddressKind::External,
                    value: "198.51.100.4".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_from_node_without_status() {
        let k8s_node = Node {
            metadata: ObjectMeta {
                name: Some("bare".to_string()),
                ..Default::default()
            },
            spec: None,
            status: None,
        };

        let info = NodeInfo::from_node(&k8s_node);
        assert!(info.addresses.is_empty());
        assert_eq!(info.uid, "");
    }
}
