//! Lifecycle hook dispatcher.
//!
//! Routes each hook either to an unconditional success or to the upgrade
//! gate, and turns every gate outcome into a structured response.

use std::sync::Arc;

use tracing::{info, warn};

use super::catalog::LifecycleHook;
use super::types::{HookRequest, HookResponse};
use crate::controller::error::Error;
use crate::controller::upgrade_gate::{GateDecision, UpgradeGate};

/// Maps lifecycle hooks onto the upgrade gate.
pub struct HookDispatcher {
    gate: Arc<UpgradeGate>,
}

impl HookDispatcher {
    pub fn new(gate: Arc<UpgradeGate>) -> Self {
        Self { gate }
    }

    /// Handle one hook invocation.
    pub async fn dispatch(&self, hook: LifecycleHook, request: &HookRequest) -> HookResponse {
        info!(
            hook = %hook,
            cluster = ?request.cluster_name(),
            namespace = %request.cluster_namespace(),
            "Lifecycle hook called"
        );

        match hook {
            LifecycleHook::BeforeClusterCreate
            | LifecycleHook::AfterControlPlaneInitialized
            | LifecycleHook::AfterControlPlaneUpgrade
            | LifecycleHook::BeforeClusterDelete => HookResponse::success(hook),
            LifecycleHook::BeforeClusterUpgrade => {
                into_response(hook, self.before_upgrade(request).await)
            }
            LifecycleHook::AfterClusterUpgrade => {
                into_response(hook, self.after_upgrade(request).await)
            }
        }
    }

    /// Gate on the version being upgraded to.
    async fn before_upgrade(&self, request: &HookRequest) -> Result<GateDecision, Error> {
        let (cluster, version) = gate_target(request, request.to_kubernetes_version.as_deref())?;
        self.gate
            .evaluate_before_upgrade(cluster, request.cluster_namespace(), version)
            .await
    }

    /// Close out the record for the version the cluster reached.
    async fn after_upgrade(&self, request: &HookRequest) -> Result<GateDecision, Error> {
        let (cluster, version) = gate_target(request, request.kubernetes_version.as_deref())?;
        self.gate
            .evaluate_after_upgrade(cluster, request.cluster_namespace(), version)
            .await
    }
}

/// Cluster name and version a gate-bound request must carry.
fn gate_target<'a>(
    request: &'a HookRequest,
    version: Option<&'a str>,
) -> Result<(&'a str, &'a str), Error> {
    let cluster = request
        .cluster_name()
        .ok_or_else(|| Error::InvalidRequest("cluster name is missing".to_string()))?;
    let version = version
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::InvalidRequest("kubernetes version is missing".to_string()))?;
    Ok((cluster, version))
}

fn into_response(hook: LifecycleHook, outcome: Result<GateDecision, Error>) -> HookResponse {
    match outcome {
        Ok(GateDecision::Proceed) => HookResponse::success(hook),
        Ok(GateDecision::RetryAfter(seconds)) => HookResponse::retry_after(hook, seconds),
        Err(e) => {
            warn!(hook = %hook, reason = e.reason(), error = %e, "Lifecycle hook failed");
            HookResponse::failure(hook, e.to_string())
        }
    }
}
