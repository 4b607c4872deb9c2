// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `status.rs`

#[cfg(test)]
mod tests {
    use crate::crd::{Condition, Database, DatabaseSpec, DatabaseStatus};
    use crate::errors::AllowlistError;
    use crate::reconcilers::status::{
        conditions_equal, converged_status, create_condition, failed_status, find_condition,
        status_changed, update_condition_in_memory,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    const CONDITION_TYPE_READY: &str = "Ready";
    const STATUS_TRUE: &str = "True";
    const STATUS_FALSE: &str = "False";

    fn database(status: Option<DatabaseStatus>) -> Database {
        Database {
            metadata: ObjectMeta {
                name: Some("orders-db".to_string()),
                namespace: Some("default".to_string()),
                generation: Some(3),
                ..Default::default()
            },
            spec: DatabaseSpec {
                project_id: "p1".to_string(),
                service_id: None,
                label_selector: None,
            },
            status,
        }
    }

    fn old_condition(status: &str, reason: &str) -> Condition {
        Condition {
            r#type: CONDITION_TYPE_READY.to_string(),
            status: status.to_string(),
            reason: Some(reason.to_string()),
            message: Some("old".to_string()),
            last_transition_time: Some("2025-01-01T00:00:00+00:00".to_string()),
        }
    }

    #[test]
    fn test_create_condition_basic() {
        let condition = create_condition(CONDITION_TYPE_READY, STATUS_TRUE, "Converged", "done");

        assert_eq!(condition.r#type, CONDITION_TYPE_READY);
        assert_eq!(condition.status, STATUS_TRUE);
        assert_eq!(condition.reason, Some("Converged".to_string()));
        assert_eq!(condition.message, Some("done".to_string()));
        assert!(condition.last_transition_time.is_some());
    }

    #[test]
    fn test_update_condition_preserves_transition_time_when_status_unchanged() {
        let mut conditions = vec![old_condition(STATUS_TRUE, "Converged")];

        update_condition_in_memory(
            &mut conditions,
            CONDITION_TYPE_READY,
            STATUS_TRUE,
            "Converged",
            "new message",
        );

        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].message, Some("new message".to_string()));
        assert_eq!(
            conditions[0].last_transition_time.as_deref(),
            Some("2025-01-01T00:00:00+00:00")
        );
    }

    #[test]
    fn test_update_condition_resets_transition_time_when_status_flips() {
        let mut conditions = vec![old_condition(STATUS_TRUE, "Converged")];

        update_condition_in_memory(
            &mut conditions,
            CONDITION_TYPE_READY,
            STATUS_FALSE,
            "RemoteUnavailable",
            "boom",
        );

        assert_eq!(conditions[0].status, STATUS_FALSE);
        assert_ne!(
            conditions[0].last_transition_time.as_deref(),
            Some("2025-01-01T00:00:00+00:00")
        );
    }

    #[test]
    fn test_conditions_equal_ignores_timestamps() {
        let a = vec![old_condition(STATUS_TRUE, "Converged")];
        let mut b = a.clone();
        b[0].last_transition_time = None;

        assert!(conditions_equal(&a, &b));

        b[0].reason = Some("Other".to_string());
        assert!(!conditions_equal(&a, &b));
        assert!(!conditions_equal(&a, &[]));
    }

    #[test]
    fn test_converged_status() {
        let db = database(None);
        let status = converged_status(&db, &["svc-b".to_string(), "svc-a".to_string()]);

        assert_eq!(status.observed_generation, Some(3));
        assert_eq!(status.project_id.as_deref(), Some("p1"));
        assert_eq!(status.services, vec!["svc-a", "svc-b"]);

        let ready = find_condition(&status.conditions, CONDITION_TYPE_READY).unwrap();
        assert_eq!(ready.status, STATUS_TRUE);
        assert_eq!(ready.reason.as_deref(), Some("Converged"));
        assert!(ready.message.as_deref().unwrap().contains("2 services"));
    }

    #[test]
    fn test_failed_status_keeps_previous_services() {
        let db = database(Some(DatabaseStatus {
            conditions: vec![old_condition(STATUS_TRUE, "Converged")],
            observed_generation: Some(2),
            project_id: Some("p0".to_string()),
            services: vec!["svc-a".to_string()],
            last_synced_at: Some("2025-01-01T00:00:00+00:00".to_string()),
        }));
        let err = AllowlistError::remote("fetch cluster state", "HTTP 503");

        let status = failed_status(&db, &err);

        assert_eq!(status.services, vec!["svc-a"]);
        assert_eq!(status.project_id.as_deref(), Some("p0"));
        assert_eq!(status.observed_generation, Some(3));
        let ready = find_condition(&status.conditions, CONDITION_TYPE_READY).unwrap();
        assert_eq!(ready.status, STATUS_FALSE);
        assert_eq!(ready.reason.as_deref(), Some("RemoteUnavailable"));
        assert!(ready.message.as_deref().unwrap().contains("HTTP 503"));
    }

    #[test]
    fn test_status_changed() {
        let db = database(None);
        let status = converged_status(&db, &["svc-a".to_string()]);

        assert!(status_changed(None, &status));

        let mut same = status.clone();
        same.last_synced_at = Some("2030-01-01T00:00:00+00:00".to_string());
        assert!(!status_changed(Some(&status), &same));

        let mut more_services = status.clone();
        more_services.services.push("svc-b".to_string());
        assert!(status_changed(Some(&status), &more_services));

        let mut other_project = status.clone();
        other_project.project_id = Some("p2".to_string());
        assert!(status_changed(Some(&status), &other_project));
    }

    #[test]
    fn test_repeated_converged_status_is_unchanged() {
        let first = converged_status(&database(None), &["svc-a".to_string()]);
        let db = database(Some(first.clone()));

        let second = converged_status(&db, &["svc-a".to_string()]);

        assert!(!status_changed(db.status.as_ref(), &second));
    }
}
