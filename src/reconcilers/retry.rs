// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Retry logic with exponential backoff for Kubernetes and cloud API calls.
//!
//! This module provides utilities for retrying transient API errors (429, 5xx)
//! with exponential backoff, while failing fast on permanent errors (4xx client errors).

use rand::Rng;
use reqwest::StatusCode;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Tuning of an [`ExponentialBackoff`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffProfile {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    /// Give up once this much time has passed since the first attempt
    pub max_elapsed_time: Duration,
    pub multiplier: f64,
    /// Jitter applied to every interval, as a fraction (0.1 is ±10%)
    pub jitter: f64,
}

impl BackoffProfile {
    /// Kubernetes API calls: 100ms doubling up to 10s, for at most a minute.
    pub const KUBE_API: Self = Self {
        initial_interval: Duration::from_millis(100),
        max_interval: Duration::from_secs(10),
        max_elapsed_time: Duration::from_secs(60),
        multiplier: 2.0,
        jitter: 0.1,
    };

    /// OVHcloud API calls: 200ms doubling up to 5s, for at most 30 seconds.
    ///
    /// The budget stays below the default pass timeout so a pass fails with
    /// the underlying HTTP error rather than a bare timeout.
    pub const CLOUD_API: Self = Self {
        initial_interval: Duration::from_millis(200),
        max_interval: Duration::from_secs(5),
        max_elapsed_time: Duration::from_secs(30),
        multiplier: 2.0,
        jitter: 0.1,
    };
}

/// Exponential backoff with jitter, bounded by a total elapsed time.
pub struct ExponentialBackoff {
    profile: BackoffProfile,
    /// Interval the next call to [`Self::next_backoff`] will jitter and return
    pub current_interval: Duration,
    started: Instant,
}

impl ExponentialBackoff {
    #[must_use]
    pub fn new(profile: BackoffProfile) -> Self {
        Self {
            profile,
            current_interval: profile.initial_interval,
            started: Instant::now(),
        }
    }

    #[must_use]
    pub fn profile(&self) -> &BackoffProfile {
        &self.profile
    }

    /// Next interval to wait, or `None` once the elapsed-time budget is spent.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self.started.elapsed() >= self.profile.max_elapsed_time {
            return None;
        }

        let interval = self.current_interval;
        let grown = interval.as_secs_f64() * self.profile.multiplier;
        self.current_interval = Duration::from_secs_f64(grown).min(self.profile.max_interval);

        Some(self.jittered(interval))
    }

    fn jittered(&self, interval: Duration) -> Duration {
        if self.profile.jitter == 0.0 {
            return interval;
        }

        let secs = interval.as_secs_f64();
        let spread = secs * self.profile.jitter;
        let value = rand::rng().random_range((secs - spread)..=(secs + spread));

        Duration::from_secs_f64(value.max(0.0))
    }
}

#[must_use]
pub fn kube_backoff() -> ExponentialBackoff {
    ExponentialBackoff::new(BackoffProfile::KUBE_API)
}

/// Determine if an HTTP status code is retryable.
///
/// 429, 500, 502, 503 and 504 are transient; everything else is permanent.
#[must_use]
pub fn is_retryable_http_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Retry a Kubernetes API call with exponential backoff.
///
/// Retries on HTTP 429, 5xx and transport errors; fails immediately on other errors.
/// When the backoff budget runs out the last error is returned.
///
/// # Errors
///
/// Returns the last `kube::Error` once retrying is no longer possible.
pub async fn retry_api_call<T, F, Fut>(mut operation: F, operation_name: &str) -> Result<T, kube::Error>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, kube::Error>>,
{
    let mut backoff = kube_backoff();
    let start_time = Instant::now();
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempt = attempt,
                        elapsed = ?start_time.elapsed(),
                        "Kubernetes API call succeeded after retries"
                    );
                }
                return Ok(value);
            }
            Err(e) => {
                if !is_retryable_error(&e) {
                    error!(
                        operation = operation_name,
                        error = %e,
                        "Non-retryable Kubernetes API error, failing immediately"
                    );
                    return Err(e);
                }

                let Some(duration) = backoff.next_backoff() else {
                    error!(
                        operation = operation_name,
                        attempt = attempt,
                        elapsed = ?start_time.elapsed(),
                        error = %e,
                        "Backoff exhausted, giving up"
                    );
                    return Err(e);
                };

                warn!(
                    operation = operation_name,
                    attempt = attempt,
                    retry_after = ?duration,
                    error = %e,
                    "Retryable Kubernetes API error, will retry"
                );
                tokio::time::sleep(duration).await;
            }
        }
    }
}

/// Determine if a Kubernetes error is retryable.
///
/// Rate limiting (429), server errors (5xx) and service/transport errors are
/// retryable; everything else is not.
fn is_retryable_error(err: &kube::Error) -> bool {
    match err {
        kube::Error::Api(api_err) => {
            api_err.code == 429 || (api_err.code >= 500 && api_err.code < 600)
        }
        kube::Error::Service(_) => true,
        _ => false,
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
