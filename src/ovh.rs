// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! OVHcloud Public Cloud Databases API client.
//!
//! The convergence driver only depends on the [`DatabaseCloudApi`] trait; [`OvhClient`]
//! is the production implementation over `reqwest`.
//!
//! # Endpoints
//!
//! | Operation | Request |
//! |-----------|---------|
//! | Cluster state | `GET /cloud/project/{project}/database/service/{service}` |
//! | Replace allowlist | `PUT /cloud/project/{project}/database/{engine}/{service}` |
//! | List services | `GET /cloud/project/{project}/database/service` |
//!
//! # Authentication
//!
//! Every request carries the application key, consumer key, a timestamp aligned on
//! the API server clock and a SHA1 signature over secret, consumer key, method,
//! URL, body and timestamp.

use crate::address::NetworkMode;
use crate::allowlist::IpRestriction;
use crate::constants::{
    OVH_AUTH_TIME_PATH, OVH_DATABASE_SERVICE_PATH, OVH_PROJECT_PREFIX, OVH_SIGNATURE_VERSION,
};
use crate::reconcilers::retry::{is_retryable_http_status, BackoffProfile, ExponentialBackoff};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client as HttpClient, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fmt;
use std::time::Instant;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};
use url::Url;

/// Remote state of one managed database service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterState {
    /// Database engine (e.g., `postgresql`, `mysql`); part of the replace endpoint
    pub engine: String,
    pub network_mode: NetworkMode,
    /// Current IP restriction list
    pub ip_restrictions: Vec<IpRestriction>,
}

/// Operations the convergence driver needs from the cloud provider.
#[async_trait]
pub trait DatabaseCloudApi: Send + Sync {
    /// Fetch engine, network mode and current allowlist of a service.
    async fn get_cluster_state(&self, project_id: &str, service_id: &str) -> Result<ClusterState>;

    /// Replace the whole allowlist of a service in one request.
    async fn replace_allowlist(
        &self,
        project_id: &str,
        service_id: &str,
        engine: &str,
        entries: &[IpRestriction],
    ) -> Result<()>;

    /// List every database service id of a project.
    async fn list_services(&self, project_id: &str) -> Result<Vec<String>>;
}

/// Service payload returned by the API (only the fields we use).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceResponse {
    engine: String,
    #[serde(default)]
    network_type: String,
    #[serde(default)]
    ip_restrictions: Vec<IpRestriction>,
}

/// Body of the full-state replace request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AllowlistUpdate<'a> {
    ip_restrictions: &'a [IpRestriction],
}

/// HTTP error with status code for retry logic.
#[derive(Debug)]
struct HttpError {
    status: StatusCode,
    message: String,
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}: {}", self.status, self.message)
    }
}

impl std::error::Error for HttpError {}

/// API credentials created at `https://<region>.api.ovh.com/createToken`.
#[derive(Clone)]
pub struct OvhCredentials {
    pub application_key: String,
    pub application_secret: String,
    pub consumer_key: String,
}

impl fmt::Debug for OvhCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OvhCredentials")
            .field("application_key", &self.application_key)
            .field("application_secret", &"<redacted>")
            .field("consumer_key", &"<redacted>")
            .finish()
    }
}

/// Resolve an endpoint alias (`ovh-eu`, `ovh-ca`, `ovh-us`) or explicit URL to a base URL.
///
/// # Errors
///
/// Returns an error if the endpoint is neither a known alias nor a valid URL.
pub fn resolve_endpoint(endpoint: &str) -> Result<String> {
    let base = match endpoint {
        "ovh-eu" => "https://eu.api.ovh.com/1.0",
        "ovh-ca" => "https://ca.api.ovh.com/1.0",
        "ovh-us" => "https://api.us.ovhcloud.com/1.0",
        other => other,
    };
    Url::parse(base).with_context(|| format!("Invalid OVHcloud API endpoint '{endpoint}'"))?;
    Ok(base.trim_end_matches('/').to_string())
}

/// Compute the `X-Ovh-Signature` header value.
pub(crate) fn request_signature(
    credentials: &OvhCredentials,
    method: &Method,
    url: &str,
    body: &str,
    timestamp: i64,
) -> String {
    let payload = format!(
        "{}+{}+{}+{}+{}+{}",
        credentials.application_secret,
        credentials.consumer_key,
        method.as_str(),
        url,
        body,
        timestamp
    );
    format!("{OVH_SIGNATURE_VERSION}{:x}", Sha1::digest(payload.as_bytes()))
}

fn service_path(project_id: &str, service_id: &str) -> String {
    format!("{OVH_PROJECT_PREFIX}/{project_id}/{OVH_DATABASE_SERVICE_PATH}/{service_id}")
}

fn services_path(project_id: &str) -> String {
    format!("{OVH_PROJECT_PREFIX}/{project_id}/{OVH_DATABASE_SERVICE_PATH}")
}

fn engine_service_path(project_id: &str, engine: &str, service_id: &str) -> String {
    format!("{OVH_PROJECT_PREFIX}/{project_id}/database/{engine}/{service_id}")
}

/// Signed OVHcloud API client.
pub struct OvhClient {
    http: HttpClient,
    base_url: String,
    credentials: OvhCredentials,
    backoff: BackoffProfile,
    /// Server clock minus local clock, in seconds; fetched on first signed call
    time_delta: OnceCell<i64>,
}

impl fmt::Debug for OvhClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OvhClient")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl OvhClient {
    /// Create a client for an endpoint alias or base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint cannot be resolved.
    pub fn new(http: HttpClient, endpoint: &str, credentials: OvhCredentials) -> Result<Self> {
        Ok(Self {
            http,
            base_url: resolve_endpoint(endpoint)?,
            credentials,
            backoff: BackoffProfile::CLOUD_API,
            time_delta: OnceCell::new(),
        })
    }

    /// Replace the retry profile used for transient failures.
    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffProfile) -> Self {
        self.backoff = backoff;
        self
    }

    async fn timestamp(&self) -> Result<i64> {
        let delta = self
            .time_delta
            .get_or_try_init(|| async {
                let url = format!("{}{OVH_AUTH_TIME_PATH}", self.base_url);
                let response = self
                    .http
                    .get(&url)
                    .send()
                    .await
                    .with_context(|| format!("Failed to send HTTP request to {url}"))?;
                let status = response.status();
                if !status.is_success() {
                    bail!("Failed to read API server time: HTTP {status}");
                }
                let server_time: i64 = response
                    .text()
                    .await
                    .context("Failed to read API server time")?
                    .trim()
                    .parse()
                    .context("API server time is not an integer")?;
                let delta = server_time - chrono::Utc::now().timestamp();
                debug!(delta_secs = delta, "Aligned on API server clock");
                Ok::<i64, anyhow::Error>(delta)
            })
            .await?;

        Ok(chrono::Utc::now().timestamp() + delta)
    }

    /// Execute a signed request with automatic retry on transient failures.
    ///
    /// # Retry Behavior
    /// - Retries on HTTP 429, 500, 502, 503, 504 and on connect/timeout errors
    /// - Fails immediately on other 4xx errors
    async fn request(&self, method: Method, path: &str, body: Option<String>) -> Result<String> {
        let url = format!("{}{path}", self.base_url);
        let mut backoff = ExponentialBackoff::new(self.backoff);
        let start_time = Instant::now();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let e = match self.request_once(&method, &url, body.as_deref()).await {
                Ok(text) => {
                    if attempt > 1 {
                        debug!(
                            method = %method,
                            url = %url,
                            attempt = attempt,
                            elapsed = ?start_time.elapsed(),
                            "HTTP API call succeeded after retries"
                        );
                    }
                    return Ok(text);
                }
                Err(e) => e,
            };

            let is_retryable = if let Some(http_err) = e.downcast_ref::<HttpError>() {
                is_retryable_http_status(http_err.status)
            } else if let Some(transport_err) = e.downcast_ref::<reqwest::Error>() {
                transport_err.is_connect() || transport_err.is_timeout()
            } else {
                false
            };

            if !is_retryable {
                error!(
                    method = %method,
                    url = %url,
                    error = %e,
                    "Non-retryable HTTP API error, failing immediately"
                );
                return Err(e);
            }

            let Some(duration) = backoff.next_backoff() else {
                error!(
                    method = %method,
                    url = %url,
                    attempt = attempt,
                    elapsed = ?start_time.elapsed(),
                    error = %e,
                    "Backoff exhausted, giving up"
                );
                // Surfaces in the Ready condition; keep it free of per-run counts.
                return Err(e.context("Retry budget exhausted"));
            };

            warn!(
                method = %method,
                url = %url,
                attempt = attempt,
                retry_after = ?duration,
                error = %e,
                "Retryable HTTP API error, will retry"
            );
            tokio::time::sleep(duration).await;
        }
    }

    async fn request_once(&self, method: &Method, url: &str, body: Option<&str>) -> Result<String> {
        let timestamp = self.timestamp().await?;
        let body_text = body.unwrap_or_default();

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            "X-Ovh-Application",
            HeaderValue::from_str(&self.credentials.application_key)
                .context("Invalid application key")?,
        );
        headers.insert(
            "X-Ovh-Consumer",
            HeaderValue::from_str(&self.credentials.consumer_key)
                .context("Invalid consumer key")?,
        );
        headers.insert("X-Ovh-Timestamp", HeaderValue::from(timestamp));
        headers.insert(
            "X-Ovh-Signature",
            HeaderValue::from_str(&request_signature(
                &self.credentials,
                method,
                url,
                body_text,
                timestamp,
            ))
            .context("Invalid request signature")?,
        );

        let mut request = self.http.request(method.clone(), url).headers(headers);
        if let Some(body) = body {
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(body.to_string());
        }

        debug!(method = %method, url = %url, "HTTP API request to OVHcloud");

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to send HTTP request to {url}"))?;
        let status = response.status();

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(HttpError { status, message }.into());
        }

        response
            .text()
            .await
            .context("Failed to read response body")
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let text = self.request(Method::GET, path, None).await?;
        serde_json::from_str(&text).with_context(|| format!("Unexpected response from GET {path}"))
    }
}

#[async_trait]
impl DatabaseCloudApi for OvhClient {
    async fn get_cluster_state(&self, project_id: &str, service_id: &str) -> Result<ClusterState> {
        let service: ServiceResponse = self
            .get_json(&service_path(project_id, service_id))
            .await
            .with_context(|| format!("Failed to get database service {service_id}"))?;

        Ok(ClusterState {
            engine: service.engine,
            network_mode: NetworkMode::from_network_type(&service.network_type),
            ip_restrictions: service.ip_restrictions,
        })
    }

    async fn replace_allowlist(
        &self,
        project_id: &str,
        service_id: &str,
        engine: &str,
        entries: &[IpRestriction],
    ) -> Result<()> {
        let body = serde_json::to_string(&AllowlistUpdate {
            ip_restrictions: entries,
        })?;

        self.request(
            Method::PUT,
            &engine_service_path(project_id, engine, service_id),
            Some(body),
        )
        .await
        .with_context(|| format!("Failed to update IP restrictions of {service_id}"))?;

        info!(
            project_id = %project_id,
            service_id = %service_id,
            engine = %engine,
            entries = entries.len(),
            "Replaced database IP restrictions"
        );
        Ok(())
    }

    async fn list_services(&self, project_id: &str) -> Result<Vec<String>> {
        self.get_json(&services_path(project_id))
            .await
            .with_context(|| format!("Failed to list database services of project {project_id}"))
    }
}

#[cfg(test)]
#[path = "ovh_tests.rs"]
mod ovh_tests;
