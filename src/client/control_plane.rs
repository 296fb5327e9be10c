//! Control-plane address discovery.
//!
//! Combines a [`MachineInventory`] with a [`MembershipPredicate`] and drops
//! addresses in the reserved subnet.

use std::sync::Arc;

use tracing::debug;

use super::machine_inventory::{Machine, MachineInventory};
use super::membership::MembershipPredicate;
use crate::controller::error::{Error, Result};

/// Default prefix of the reserved subnet whose addresses are never targeted.
pub const DEFAULT_RESERVED_SUBNET_PREFIX: &str = "10.6.";

/// Node Inventory Adapter used by the upgrade gate.
pub struct ControlPlaneAddresses {
    inventory: Arc<dyn MachineInventory>,
    predicate: Arc<dyn MembershipPredicate>,
    machine_namespace: String,
    reserved_prefix: String,
}

impl ControlPlaneAddresses {
    pub fn new(
        inventory: Arc<dyn MachineInventory>,
        predicate: Arc<dyn MembershipPredicate>,
        machine_namespace: impl Into<String>,
        reserved_prefix: impl Into<String>,
    ) -> Self {
        Self {
            inventory,
            predicate,
            machine_namespace: machine_namespace.into(),
            reserved_prefix: reserved_prefix.into(),
        }
    }

    /// Addresses of the cluster's control-plane machines, in inventory order.
    ///
    /// Fails with `InventoryUnavailable` if the machines cannot be listed or
    /// there are none at all. An empty result is not an error here; the gate
    /// decides what an empty set means.
    pub async fn list_control_plane_addresses(&self, cluster_name: &str) -> Result<Vec<String>> {
        if cluster_name.is_empty() {
            return Err(Error::InvalidRequest("cluster name is empty".to_string()));
        }

        let machines = self.inventory.list_machines(&self.machine_namespace).await?;
        if machines.is_empty() {
            return Err(Error::InventoryUnavailable(format!(
                "no machines found in namespace {}",
                self.machine_namespace
            )));
        }

        let addresses = filter_control_plane_addresses(
            &machines,
            self.predicate.as_ref(),
            cluster_name,
            &self.reserved_prefix,
        );

        debug!(
            cluster = %cluster_name,
            machines = machines.len(),
            addresses = addresses.len(),
            "Resolved control-plane addresses"
        );

        Ok(addresses)
    }
}

/// Flatten the addresses of member machines, skipping the reserved subnet.
pub fn filter_control_plane_addresses(
    machines: &[Machine],
    predicate: &dyn MembershipPredicate,
    cluster_name: &str,
    reserved_prefix: &str,
) -> Vec<String> {
    machines
        .iter()
        .filter(|m| predicate.is_member(m, cluster_name))
        .flat_map(|m| m.addresses.iter())
        .filter(|addr| reserved_prefix.is_empty() || !addr.starts_with(reserved_prefix))
        .cloned()
        .collect()
}
