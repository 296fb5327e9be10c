//! Wiring of the upgrade gate.
//!
//! Builds the gate from configuration and injected collaborators; the real
//! Kubernetes-backed collaborators are only constructed here.

use std::sync::Arc;

use kube::Client;

use crate::client::control_plane::ControlPlaneAddresses;
use crate::client::machine_inventory::{KubeMachineInventory, MachineInventory};
use crate::client::membership::{
    ClusterLabelPredicate, MembershipMode, MembershipPredicate, NameMarkerPredicate,
};
use crate::client::record_store::{KubeRecordStore, UpgradeRecordStore};
use crate::config::ExtensionConfig;
use crate::controller::upgrade_gate::UpgradeGate;
use crate::health::HealthState;

/// Membership predicate selected by configuration
pub fn membership_predicate(config: &ExtensionConfig) -> Arc<dyn MembershipPredicate> {
    match config.membership {
        MembershipMode::Name => Arc::new(NameMarkerPredicate::new(
            config.control_plane_marker.clone(),
        )),
        MembershipMode::Label => Arc::new(ClusterLabelPredicate),
    }
}

/// Build a gate from explicit collaborators
pub fn build_gate(
    store: Arc<dyn UpgradeRecordStore>,
    inventory: Arc<dyn MachineInventory>,
    config: &ExtensionConfig,
    health_state: Option<Arc<HealthState>>,
) -> UpgradeGate {
    let addresses = ControlPlaneAddresses::new(
        inventory,
        membership_predicate(config),
        config.machine_namespace.clone(),
        config.reserved_subnet_prefix.clone(),
    );

    let gate = UpgradeGate::new(store, Arc::new(addresses))
        .with_retry_after(config.retry_after_seconds);
    match health_state {
        Some(state) => gate.with_health_state(state),
        None => gate,
    }
}

/// Build a gate backed by the Kubernetes API
pub fn build_kube_gate(
    client: Client,
    config: &ExtensionConfig,
    health_state: Option<Arc<HealthState>>,
) -> UpgradeGate {
    build_gate(
        Arc::new(KubeRecordStore::new(client.clone())),
        Arc::new(KubeMachineInventory::new(client)),
        config,
        health_state,
    )
}
