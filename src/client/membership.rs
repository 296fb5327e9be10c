//! Control-plane membership predicates.
//!
//! Deciding whether a machine is a control-plane member of a cluster is kept
//! behind a trait so the name-matching heuristic can be swapped for label
//! ownership without touching the gate.

use std::str::FromStr;

use super::machine_inventory::Machine;

/// CAPI label carrying the owning cluster's name.
pub const CLUSTER_NAME_LABEL: &str = "cluster.x-k8s.io/cluster-name";
/// CAPI label present on control-plane machines.
pub const CONTROL_PLANE_LABEL: &str = "cluster.x-k8s.io/control-plane";

/// Decides whether a machine belongs to the control plane of a cluster.
pub trait MembershipPredicate: Send + Sync {
    fn is_member(&self, machine: &Machine, cluster_name: &str) -> bool;
}

/// Substring match on the machine name.
///
/// A machine is a member when its name contains both the control-plane
/// marker and the cluster name. `prod` therefore also claims machines of
/// `prod-2`; use [`ClusterLabelPredicate`] where CAPI labels are reliable.
#[derive(Debug, Clone)]
pub struct NameMarkerPredicate {
    marker: String,
}

impl NameMarkerPredicate {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }
}

impl MembershipPredicate for NameMarkerPredicate {
    fn is_member(&self, machine: &Machine, cluster_name: &str) -> bool {
        machine.name.contains(&self.marker) && machine.name.contains(cluster_name)
    }
}

/// Exact match on the CAPI cluster-name and control-plane labels.
#[derive(Debug, Clone, Default)]
pub struct ClusterLabelPredicate;

impl MembershipPredicate for ClusterLabelPredicate {
    fn is_member(&self, machine: &Machine, cluster_name: &str) -> bool {
        machine
            .labels
            .get(CLUSTER_NAME_LABEL)
            .is_some_and(|name| name == cluster_name)
            && machine.labels.contains_key(CONTROL_PLANE_LABEL)
    }
}

/// Which membership predicate to wire in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MembershipMode {
    /// [`NameMarkerPredicate`]
    #[default]
    Name,
    /// [`ClusterLabelPredicate`]
    Label,
}

impl std::fmt::Display for MembershipMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MembershipMode::Name => write!(f, "name"),
            MembershipMode::Label => write!(f, "label"),
        }
    }
}

impl FromStr for MembershipMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(MembershipMode::Name),
            "label" => Ok(MembershipMode::Label),
            _ => Err(format!("Unknown membership mode: {}", s)),
        }
    }
}
