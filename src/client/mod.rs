//! Adapters over the external collaborators the gate consumes.
//!
//! ## Architecture
//!
//! - `record_store`: `ClusterUpgrade` find / create / mark-upgraded
//! - `machine_inventory`: OpenStackMachine listing
//! - `membership`: control-plane membership predicates
//! - `control_plane`: control-plane address discovery for a cluster

pub mod control_plane;
pub mod machine_inventory;
pub mod membership;
pub mod record_store;

pub use control_plane::{ControlPlaneAddresses, filter_control_plane_addresses};
pub use machine_inventory::{KubeMachineInventory, Machine, MachineInventory};
pub use membership::{
    ClusterLabelPredicate, MembershipMode, MembershipPredicate, NameMarkerPredicate,
};
pub use record_store::{KubeRecordStore, UpgradeRecordStore};
