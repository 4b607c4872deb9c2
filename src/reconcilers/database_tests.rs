// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `database.rs`

#[cfg(test)]
mod tests {
    use super::super::{requeue_after_error, stale_targets, ReconcileError, StaleTargets};
    use crate::crd::{Database, DatabaseSpec, DatabaseStatus};
    use crate::errors::AllowlistError;
    use anyhow::anyhow;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::time::Duration;

    const REQUEUE: Duration = Duration::from_secs(300);
    const ERROR_RETRY: Duration = Duration::from_secs(30);

    fn database(project_id: &str, status: Option<DatabaseStatus>) -> Database {
        Database {
            metadata: ObjectMeta {
                name: Some("orders-db".to_string()),
                namespace: Some("default".to_string()),
                ..Default::default()
            },
            spec: DatabaseSpec {
                project_id: project_id.to_string(),
                service_id: None,
                label_selector: None,
            },
            status,
        }
    }

    fn status(project_id: Option<&str>, services: &[&str]) -> DatabaseStatus {
        DatabaseStatus {
            project_id: project_id.map(str::to_string),
            services: services.iter().map(|s| (*s).to_string()).collect(),
            ..Default::default()
        }
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_transient_errors_retry_quickly() {
        let remote = ReconcileError::from(AllowlistError::remote("fetch cluster state", "HTTP 503"));
        assert_eq!(requeue_after_error(&remote, REQUEUE), ERROR_RETRY);

        let wildcard = ReconcileError::from(AllowlistError::WildcardExpansionFailed {
            project_id: "p1".to_string(),
            reason: "HTTP 500".to_string(),
        });
        assert_eq!(requeue_after_error(&wildcard, REQUEUE), ERROR_RETRY);
    }

    #[test]
    fn test_misconfiguration_waits_for_periodic_requeue() {
        let misconfigured = ReconcileError::from(AllowlistError::ClusterMisconfigured {
            project_id: "p1".to_string(),
            service_id: "s1".to_string(),
            node: "node1".to_string(),
        });
        assert_eq!(requeue_after_error(&misconfigured, REQUEUE), REQUEUE);

        let selector = ReconcileError::from(AllowlistError::InvalidSelector {
            reason: "unknown operator Near".to_string(),
        });
        assert_eq!(requeue_after_error(&selector, REQUEUE), REQUEUE);
    }

    #[test]
    fn test_untyped_errors_retry_quickly() {
        let err = ReconcileError::from(anyhow!("Database has no uid"));
        assert_eq!(requeue_after_error(&err, REQUEUE), ERROR_RETRY);
    }

    #[test]
    fn test_no_stale_targets_without_status() {
        let db = database("p1", None);
        assert_eq!(stale_targets(&db, &strings(&["s1"])), None);
    }

    #[test]
    fn test_no_stale_targets_when_unchanged() {
        let db = database("p1", Some(status(Some("p1"), &["s1", "s2"])));
        assert_eq!(stale_targets(&db, &strings(&["s2", "s1"])), None);
    }

    #[test]
    fn test_changed_service_id_leaves_previous_service_stale() {
        let db = database("p1", Some(status(Some("p1"), &["s-old"])));

        assert_eq!(
            stale_targets(&db, &strings(&["s-new"])),
            Some(StaleTargets {
                project_id: "p1".to_string(),
                services: strings(&["s-old"]),
            })
        );
    }

    #[test]
    fn test_changed_project_makes_every_service_stale() {
        let db = database("p2", Some(status(Some("p1"), &["s1", "s2"])));

        assert_eq!(
            stale_targets(&db, &strings(&["s1"])),
            Some(StaleTargets {
                project_id: "p1".to_string(),
                services: strings(&["s1", "s2"]),
            })
        );
    }

    #[test]
    fn test_status_without_project_uses_declared_project() {
        let db = database("p1", Some(status(None, &["s1", "s2"])));

        assert_eq!(
            stale_targets(&db, &strings(&["s1"])),
            Some(StaleTargets {
                project_id: "p1".to_string(),
                services: strings(&["s2"]),
            })
        );
    }
}
