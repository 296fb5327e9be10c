//! Custom Resource Definitions (CRDs) for capi-upgrade-gate.
//!
//! - `ClusterUpgrade`: per-version upgrade coordination record

mod cluster_upgrade;

pub use cluster_upgrade::*;
