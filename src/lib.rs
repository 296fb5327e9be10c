//! capi-upgrade-gate library crate
//!
//! This module exports the upgrade gate, the `ClusterUpgrade` CRD, the
//! lifecycle hook server, and the health/metrics server.

pub mod client;
pub mod config;
pub mod controller;
pub mod crd;
pub mod health;
pub mod hooks;

pub use config::{ConfigError, ExtensionConfig};
pub use health::HealthState;
pub use hooks::{HookServerError, WEBHOOK_PORT, run_hook_server};

use std::sync::Arc;

use kube::Client;
use tracing::info;

use controller::context::build_kube_gate;
use hooks::{HookDispatcher, HookServerState};

/// Run the runtime extension hook server.
///
/// Builds the gate from `config`, marks the extension ready, and serves the
/// lifecycle hooks until the server exits.
pub async fn run_extension(
    client: Client,
    config: &ExtensionConfig,
    health_state: Option<Arc<HealthState>>,
) -> Result<(), HookServerError> {
    info!(
        machine_namespace = %config.machine_namespace,
        membership = %config.membership,
        reserved_subnet_prefix = %config.reserved_subnet_prefix,
        retry_after_seconds = config.retry_after_seconds,
        "Starting upgrade gate"
    );

    let gate = Arc::new(build_kube_gate(client, config, health_state.clone()));
    let state = Arc::new(HookServerState::new(
        HookDispatcher::new(gate),
        health_state.clone(),
    ));

    if let Some(ref health) = health_state {
        health.set_ready(true).await;
    }

    run_hook_server(state, config.webhook_port, &config.cert_dir).await
}
