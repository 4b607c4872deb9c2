// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for the `Database` controller.
//!
//! The controller receives an `Arc<Context>` holding:
//! - the Kubernetes client (node listing, status patches, finalizers)
//! - the cloud database API (cluster state, allowlist replace, service listing)
//! - the egress probe used for gateway detection
//! - timing settings
//!
//! The cloud API and the probe are trait objects so reconcilers can be driven
//! against in-memory fakes.

use crate::config::Settings;
use crate::gateway::EgressProbe;
use crate::ovh::DatabaseCloudApi;
use kube::Client;
use std::sync::Arc;

/// Shared context passed to the controller.
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client for API operations
    pub client: Client,

    /// Remote database API
    pub cloud: Arc<dyn DatabaseCloudApi>,

    /// Observed egress address source
    pub egress_probe: Arc<dyn EgressProbe>,

    pub settings: Settings,
}

impl Context {
    #[must_use]
    pub fn new(
        client: Client,
        cloud: Arc<dyn DatabaseCloudApi>,
        egress_probe: Arc<dyn EgressProbe>,
        settings: Settings,
    ) -> Self {
        Self {
            client,
            cloud,
            egress_probe,
            settings,
        }
    }
}
