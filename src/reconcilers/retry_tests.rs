// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `retry.rs`

#[cfg(test)]
mod tests {
    use super::super::{
        is_retryable_error, is_retryable_http_status, kube_backoff, retry_api_call,
        BackoffProfile, ExponentialBackoff,
    };
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn api_error(code: u16) -> kube::Error {
        kube::Error::Api(
            kube::core::Status::failure(&format!("HTTP {code}"), "Test")
                .with_code(code)
                .boxed(),
        )
    }

    #[test]
    fn test_backoff_profiles() {
        let kube = kube_backoff();
        assert_eq!(kube.profile(), &BackoffProfile::KUBE_API);
        assert_eq!(kube.current_interval, Duration::from_millis(100));

        let cloud = ExponentialBackoff::new(BackoffProfile::CLOUD_API);
        assert_eq!(cloud.profile().max_interval, Duration::from_secs(5));
        assert_eq!(cloud.profile().max_elapsed_time, Duration::from_secs(30));
        assert!(cloud.profile().max_elapsed_time < Duration::from_secs(60));
    }

    #[test]
    fn test_exhausted_budget_stops_backoff() {
        let mut backoff = ExponentialBackoff::new(BackoffProfile {
            max_elapsed_time: Duration::ZERO,
            ..BackoffProfile::CLOUD_API
        });

        assert!(backoff.next_backoff().is_none());
    }

    #[test]
    fn test_zero_jitter_is_exact() {
        let mut backoff = ExponentialBackoff::new(BackoffProfile {
            jitter: 0.0,
            ..BackoffProfile::KUBE_API
        });

        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(100)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(200)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(400)));
    }

    #[test]
    fn test_next_backoff_grows_and_caps() {
        let mut backoff = ExponentialBackoff::new(BackoffProfile::CLOUD_API);

        let first = backoff.next_backoff().unwrap();
        assert!(first >= Duration::from_millis(180) && first <= Duration::from_millis(220));

        let second = backoff.next_backoff().unwrap();
        assert!(second >= Duration::from_millis(360) && second <= Duration::from_millis(440));

        for _ in 0..10 {
            backoff.next_backoff();
        }
        assert_eq!(backoff.current_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_retryable_kube_errors() {
        assert!(is_retryable_error(&api_error(429)));
        assert!(is_retryable_error(&api_error(500)));
        assert!(is_retryable_error(&api_error(503)));
        assert!(!is_retryable_error(&api_error(400)));
        assert!(!is_retryable_error(&api_error(403)));
        assert!(!is_retryable_error(&api_error(404)));

        let service_error: Box<dyn std::error::Error + Send + Sync> = Box::new(
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "Connection failed"),
        );
        assert!(is_retryable_error(&kube::Error::Service(service_error)));
    }

    #[test]
    fn test_retryable_http_statuses() {
        assert!(is_retryable_http_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_http_status(StatusCode::BAD_GATEWAY));
        assert!(is_retryable_http_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_retryable_http_status(StatusCode::GATEWAY_TIMEOUT));
        assert!(!is_retryable_http_status(StatusCode::BAD_REQUEST));
        assert!(!is_retryable_http_status(StatusCode::FORBIDDEN));
        assert!(!is_retryable_http_status(StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn test_retry_api_call_recovers_from_transient_error() {
        let calls = AtomicUsize::new(0);

        let result = retry_api_call(
            || {
                let attempt = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 0 {
                        Err(api_error(503))
                    } else {
                        Ok(42)
                    }
                }
            },
            "test call",
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_api_call_fails_fast_on_client_error() {
        let calls = AtomicUsize::new(0);

        let result: Result<(), kube::Error> = retry_api_call(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(api_error(403)) }
            },
            "test call",
        )
        .await;

        assert!(matches!(result, Err(kube::Error::Api(ref e)) if e.code == 403));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
