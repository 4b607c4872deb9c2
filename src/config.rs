// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Operator configuration from command-line flags and environment variables.
//!
//! Every flag falls back to an environment variable of the same name in
//! upper snake case, which is how the operator is usually configured when it
//! runs in a pod (credentials come from a `Secret` mounted as env vars).

use crate::constants::{
    DEFAULT_EGRESS_PROBE_URL, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_METRICS_ADDR,
    DEFAULT_OVH_ENDPOINT, DEFAULT_PASS_TIMEOUT_SECS, DEFAULT_REQUEUE_SECS,
};
use crate::ovh::OvhCredentials;
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

/// Keep managed database IP allowlists in sync with Kubernetes nodes.
#[derive(Parser, Clone, Debug)]
#[command(name = "dbfence", version, about)]
pub struct OperatorConfig {
    /// OVHcloud API endpoint alias (ovh-eu, ovh-ca, ovh-us) or base URL
    #[arg(long, env = "OVH_ENDPOINT", default_value = DEFAULT_OVH_ENDPOINT)]
    pub ovh_endpoint: String,

    /// OVHcloud application key
    #[arg(long, env = "OVH_APPLICATION_KEY")]
    pub ovh_application_key: String,

    /// OVHcloud application secret
    #[arg(long, env = "OVH_APPLICATION_SECRET", hide_env_values = true)]
    pub ovh_application_secret: String,

    /// OVHcloud consumer key
    #[arg(long, env = "OVH_CONSUMER_KEY", hide_env_values = true)]
    pub ovh_consumer_key: String,

    /// Plain-text echo service returning the cluster's egress address
    #[arg(long, env = "EGRESS_PROBE_URL", default_value = DEFAULT_EGRESS_PROBE_URL)]
    pub egress_probe_url: String,

    /// Timeout of a single outbound HTTP request, in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = DEFAULT_HTTP_TIMEOUT_SECS)]
    pub http_timeout_secs: u64,

    /// Upper bound of one service's convergence pass, in seconds
    #[arg(long, env = "PASS_TIMEOUT_SECS", default_value_t = DEFAULT_PASS_TIMEOUT_SECS)]
    pub pass_timeout_secs: u64,

    /// Interval between successful reconciliations, in seconds
    #[arg(long, env = "REQUEUE_SECS", default_value_t = DEFAULT_REQUEUE_SECS)]
    pub requeue_secs: u64,

    /// Listen address of the metrics and health endpoints
    #[arg(long, env = "METRICS_ADDR", default_value = DEFAULT_METRICS_ADDR)]
    pub metrics_addr: SocketAddr,
}

impl OperatorConfig {
    #[must_use]
    pub fn credentials(&self) -> OvhCredentials {
        OvhCredentials {
            application_key: self.ovh_application_key.clone(),
            application_secret: self.ovh_application_secret.clone(),
            consumer_key: self.ovh_consumer_key.clone(),
        }
    }

    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Reconciliation timing derived from the flags.
    #[must_use]
    pub fn settings(&self) -> Settings {
        Settings {
            pass_timeout: Duration::from_secs(self.pass_timeout_secs),
            requeue_interval: Duration::from_secs(self.requeue_secs),
        }
    }
}

/// Timing knobs used by the reconcilers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Bound on one service's convergence pass
    pub pass_timeout: Duration,
    /// Requeue delay after a successful reconciliation
    pub requeue_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pass_timeout: Duration::from_secs(DEFAULT_PASS_TIMEOUT_SECS),
            requeue_interval: Duration::from_secs(DEFAULT_REQUEUE_SECS),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
