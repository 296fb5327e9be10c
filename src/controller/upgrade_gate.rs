//! Upgrade gate for the BeforeClusterUpgrade / AfterClusterUpgrade hooks.
//!
//! The gate keeps no state between invocations. Every decision is derived
//! from the `ClusterUpgrade` record for the (cluster, namespace, version)
//! triple, and the API server's per-name create semantics arbitrate
//! concurrent first-touch.

use std::sync::Arc;

use kube::ResourceExt;
use tracing::{debug, info, warn};

use crate::client::control_plane::ControlPlaneAddresses;
use crate::client::record_store::UpgradeRecordStore;
use crate::controller::error::{Error, Result};
use crate::crd::{ClusterUpgrade, record_name};
use crate::health::HealthState;

/// Seconds the orchestrator waits before re-invoking a blocked hook.
pub const DEFAULT_RETRY_AFTER_SECONDS: i32 = 30;

// ============================================================================
// Gate State
// ============================================================================

/// State of a triple as observed from the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// No record exists.
    None,
    /// Record exists, executor has not reported success.
    Pending,
    /// Record exists and carries a `Successful` condition.
    Ready,
    /// Record exists with `spec.upgraded == true`.
    Completed,
}

impl GateState {
    /// Classify an optional record.
    pub fn of(record: Option<&ClusterUpgrade>) -> Self {
        match record {
            None => GateState::None,
            Some(r) if r.spec.upgraded => GateState::Completed,
            Some(r) if r.is_successful() => GateState::Ready,
            Some(_) => GateState::Pending,
        }
    }
}

impl std::fmt::Display for GateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateState::None => write!(f, "None"),
            GateState::Pending => write!(f, "Pending"),
            GateState::Ready => write!(f, "Ready"),
            GateState::Completed => write!(f, "Completed"),
        }
    }
}

// ============================================================================
// Gate Decision
// ============================================================================

/// What the orchestrator should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Proceed now.
    Proceed,
    /// Hold and re-invoke the same hook after the given number of seconds.
    RetryAfter(i32),
}

impl GateDecision {
    /// Retry hint to put on the wire, if any.
    pub fn retry_after_seconds(&self) -> Option<i32> {
        match self {
            GateDecision::Proceed => None,
            GateDecision::RetryAfter(secs) => Some(*secs),
        }
    }
}

// ============================================================================
// Upgrade Gate
// ============================================================================

/// The upgrade gate.
///
/// Collaborators are injected; nothing is read from globals.
pub struct UpgradeGate {
    store: Arc<dyn UpgradeRecordStore>,
    addresses: Arc<ControlPlaneAddresses>,
    retry_after_seconds: i32,
    health_state: Option<Arc<HealthState>>,
}

impl UpgradeGate {
    pub fn new(store: Arc<dyn UpgradeRecordStore>, addresses: Arc<ControlPlaneAddresses>) -> Self {
        Self {
            store,
            addresses,
            retry_after_seconds: DEFAULT_RETRY_AFTER_SECONDS,
            health_state: None,
        }
    }

    /// Override the retry interval handed back while an upgrade is pending.
    pub fn with_retry_after(mut self, seconds: i32) -> Self {
        self.retry_after_seconds = seconds;
        self
    }

    /// Record gate metrics into the given health state.
    pub fn with_health_state(mut self, health_state: Arc<HealthState>) -> Self {
        self.health_state = Some(health_state);
        self
    }

    /// Current retry interval.
    pub fn retry_after_seconds(&self) -> i32 {
        self.retry_after_seconds
    }

    /// Read the record for a triple, tolerating unexpected duplicates.
    async fn find_record(
        &self,
        cluster_name: &str,
        namespace: &str,
        version: &str,
    ) -> Result<Option<ClusterUpgrade>> {
        let mut records = self.store.find(cluster_name, namespace, version).await?;
        if records.len() > 1 {
            warn!(
                cluster = %cluster_name,
                namespace = %namespace,
                version = %version,
                count = records.len(),
                "Multiple ClusterUpgrade records matched, using the first"
            );
        }
        Ok(if records.is_empty() {
            None
        } else {
            Some(records.swap_remove(0))
        })
    }

    /// Decide on a BeforeClusterUpgrade invocation.
    ///
    /// Creates the record on first touch and blocks until the executor
    /// reports `Successful`.
    pub async fn evaluate_before_upgrade(
        &self,
        cluster_name: &str,
        namespace: &str,
        target_version: &str,
    ) -> Result<GateDecision> {
        let record = self
            .find_record(cluster_name, namespace, target_version)
            .await?;
        let state = GateState::of(record.as_ref());

        debug!(
            cluster = %cluster_name,
            namespace = %namespace,
            version = %target_version,
            state = %state,
            "Evaluating before-upgrade"
        );

        match (state, record) {
            (GateState::Ready, _) => {
                info!(
                    cluster = %cluster_name,
                    version = %target_version,
                    "Upgrade reported successful, allowing"
                );
                Ok(GateDecision::Proceed)
            }
            (GateState::Pending, _) => Ok(self.block()),
            // The successful condition alone unblocks, upgraded or not.
            (GateState::Completed, Some(r)) if r.is_successful() => Ok(GateDecision::Proceed),
            (GateState::Completed, _) => Ok(self.block()),
            (GateState::None, _) => {
                self.create_record(cluster_name, namespace, target_version)
                    .await
            }
        }
    }

    fn block(&self) -> GateDecision {
        GateDecision::RetryAfter(self.retry_after_seconds)
    }

    async fn create_record(
        &self,
        cluster_name: &str,
        namespace: &str,
        target_version: &str,
    ) -> Result<GateDecision> {
        let addresses = self
            .addresses
            .list_control_plane_addresses(cluster_name)
            .await?;
        if addresses.is_empty() {
            warn!(
                cluster = %cluster_name,
                version = %target_version,
                "No control-plane addresses, not creating ClusterUpgrade"
            );
            return Err(Error::NoControlPlaneAddresses(cluster_name.to_string()));
        }

        let record = ClusterUpgrade::for_cluster(cluster_name, namespace, target_version, addresses);
        match self.store.create(&record).await {
            Ok(created) => {
                info!(
                    cluster = %cluster_name,
                    namespace = %namespace,
                    record = %created.name_any(),
                    "ClusterUpgrade created, blocking upgrade until it reports success"
                );
                if let Some(ref state) = self.health_state {
                    state.metrics.record_upgrade_created();
                }
                Ok(self.block())
            }
            // A concurrent invocation created it first.
            Err(Error::AlreadyExists(name)) => {
                debug!(
                    cluster = %cluster_name,
                    record = %name,
                    "ClusterUpgrade created concurrently, treating as pending"
                );
                Ok(self.block())
            }
            Err(e) => Err(e),
        }
    }

    /// Decide on an AfterClusterUpgrade invocation.
    ///
    /// Marks the record as upgraded; fails without a matching record.
    pub async fn evaluate_after_upgrade(
        &self,
        cluster_name: &str,
        namespace: &str,
        completed_version: &str,
    ) -> Result<GateDecision> {
        let Some(record) = self
            .find_record(cluster_name, namespace, completed_version)
            .await?
        else {
            return Err(Error::ProtocolViolation(format!(
                "no ClusterUpgrade record {} found for cluster {} at version {}",
                record_name(cluster_name, completed_version),
                cluster_name,
                completed_version
            )));
        };

        debug!(
            cluster = %cluster_name,
            record = %record.name_any(),
            state = %GateState::of(Some(&record)),
            "Evaluating after-upgrade"
        );

        self.store.mark_upgraded(&record).await?;
        Ok(GateDecision::Proceed)
    }
}
