//! Machine inventory backed by CAPO `OpenStackMachine` resources.
//!
//! OpenStackMachines are read as dynamic objects; only name, labels and
//! `status.addresses[].address` are lifted into the typed [`Machine`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use kube::api::{Api, DynamicObject, ListParams};
use kube::core::{ApiResource, GroupVersionKind};
use kube::{Client, ResourceExt};
use serde::Deserialize;
use tracing::{debug, warn};

#[cfg(test)]
use mockall::automock;

use crate::controller::error::{Error, Result};

/// CAPO infrastructure group.
pub const OPENSTACK_MACHINE_GROUP: &str = "infrastructure.cluster.x-k8s.io";
/// CAPO API version the inventory reads.
pub const OPENSTACK_MACHINE_VERSION: &str = "v1alpha6";
/// Kind listed by the inventory.
pub const OPENSTACK_MACHINE_KIND: &str = "OpenStackMachine";
const OPENSTACK_MACHINE_PLURAL: &str = "openstackmachines";

/// A machine as seen by the inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Machine {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    /// Addresses in the order the provider reported them.
    pub addresses: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MachineStatus {
    #[serde(default)]
    addresses: Vec<MachineAddress>,
}

#[derive(Debug, Deserialize)]
struct MachineAddress {
    address: String,
}

impl Machine {
    /// Lift a dynamic `OpenStackMachine` into a [`Machine`].
    ///
    /// A missing or unparsable `status` yields a machine with no addresses.
    pub fn from_dynamic(obj: &DynamicObject) -> Self {
        let name = obj.name_any();
        let status = match obj.data.get("status") {
            Some(status) => MachineStatus::deserialize(status).unwrap_or_else(|e| {
                warn!(
                    machine = %name,
                    error = %e,
                    "Unparsable OpenStackMachine status, ignoring its addresses"
                );
                MachineStatus::default()
            }),
            None => MachineStatus::default(),
        };

        Self {
            name,
            labels: obj.labels().clone(),
            addresses: status.addresses.into_iter().map(|a| a.address).collect(),
        }
    }
}

/// Lists machines in a namespace.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MachineInventory: Send + Sync {
    async fn list_machines(&self, namespace: &str) -> Result<Vec<Machine>>;
}

/// `ApiResource` for CAPO OpenStackMachines.
pub fn openstack_machine_resource() -> ApiResource {
    let gvk = GroupVersionKind::gvk(
        OPENSTACK_MACHINE_GROUP,
        OPENSTACK_MACHINE_VERSION,
        OPENSTACK_MACHINE_KIND,
    );
    ApiResource::from_gvk_with_plural(&gvk, OPENSTACK_MACHINE_PLURAL)
}

/// Real inventory using the Kubernetes API.
pub struct KubeMachineInventory {
    client: Client,
    resource: ApiResource,
}

impl KubeMachineInventory {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            resource: openstack_machine_resource(),
        }
    }
}

#[async_trait]
impl MachineInventory for KubeMachineInventory {
    async fn list_machines(&self, namespace: &str) -> Result<Vec<Machine>> {
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), namespace, &self.resource);
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|e| Error::InventoryUnavailable(e.to_string()))?;

        debug!(
            namespace = %namespace,
            count = list.items.len(),
            "Listed OpenStackMachines"
        );

        Ok(list.items.iter().map(Machine::from_dynamic).collect())
    }
}
