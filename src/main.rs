// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context as _, Result};
use clap::Parser;
use dbfence::{
    config::OperatorConfig,
    context::Context,
    gateway::HttpEgressProbe,
    ovh::OvhClient,
    reconcilers::run_database_controller,
    server,
};
use kube::Client;
use std::sync::Arc;
use tracing::{debug, error, info};

fn main() -> Result<()> {
    let config = OperatorConfig::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("dbfence-controller")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

fn init_tracing() {
    // Respects RUST_LOG (default: info) and RUST_LOG_FORMAT (json | text)
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main(config: OperatorConfig) -> Result<()> {
    init_tracing();

    info!(
        ovh_endpoint = %config.ovh_endpoint,
        egress_probe_url = %config.egress_probe_url,
        "Starting dbfence Database allowlist controller"
    );

    // Several rustls backends may be linked in; pin the one this binary is built for.
    let _ = rustls::crypto::ring::default_provider().install_default();

    debug!("Initializing Kubernetes client");
    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let http_client = reqwest::Client::builder()
        .timeout(config.http_timeout())
        .build()
        .context("Failed to build HTTP client")?;

    let cloud = OvhClient::new(
        http_client.clone(),
        &config.ovh_endpoint,
        config.credentials(),
    )?;
    let egress_probe = HttpEgressProbe::new(http_client, config.egress_probe_url.clone());

    let context = Arc::new(Context::new(
        client,
        Arc::new(cloud),
        Arc::new(egress_probe),
        config.settings(),
    ));

    // The controller returns on SIGTERM/SIGINT; the metrics server should never return
    tokio::select! {
        result = run_database_controller(context) => {
            if let Err(e) = &result {
                error!("CRITICAL: Database controller exited with error: {e:?}");
            }
            result
        }
        result = server::serve(config.metrics_addr) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Metrics server exited unexpectedly without error")
        }
    }
}
