//! ClusterUpgrade Custom Resource Definition.
//!
//! A `ClusterUpgrade` is the coordination record for one (cluster, target
//! Kubernetes version) pair. This process creates it and flips
//! `spec.upgraded`; an external upgrade executor owns `status.conditions`.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Condition type the external executor sets once the upgrade run finished.
pub const SUCCESSFUL_CONDITION: &str = "Successful";

// ============================================================================
// ClusterUpgrade CRD
// ============================================================================

/// ClusterUpgrade records an upgrade of a workload cluster to one version.
///
/// The record name is `<clusterName>-<targetVersion>`, which makes the API
/// server's create-time name uniqueness the only lock the protocol needs.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "cluster.aruba.it",
    version = "v1alpha1",
    kind = "ClusterUpgrade",
    plural = "clusterupgrades",
    status = "ClusterUpgradeStatus",
    namespaced,
    printcolumn = r#"{"name":"Upgraded","type":"boolean","jsonPath":".spec.upgraded"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
pub struct ClusterUpgradeSpec {
    /// Control-plane node addresses captured when the record was created.
    #[serde(default)]
    pub nodes_ip: Vec<String>,

    /// Set once the orchestrator reported the cluster upgrade as finished.
    #[serde(default)]
    pub upgraded: bool,
}

/// Status written by the upgrade executor.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterUpgradeStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<UpgradeCondition>,
}

/// A single executor condition.
///
/// Only `type` is interpreted here. `status` is kept as raw JSON since
/// executors write booleans, `"True"` strings or anything else there, and a
/// value the gate never reads must not make the record unreadable.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeCondition {
    #[serde(default)]
    pub r#type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "opaque_schema")]
    pub status: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// Schema for a field whose shape is owned by another controller.
fn opaque_schema(_: &mut schemars::SchemaGenerator) -> schemars::Schema {
    schemars::json_schema!({
        "x-kubernetes-preserve-unknown-fields": true
    })
}

impl UpgradeCondition {
    /// Build a condition with a boolean status.
    pub fn new(condition_type: &str, status: bool) -> Self {
        Self {
            r#type: condition_type.to_string(),
            status: Some(serde_json::Value::Bool(status)),
            ..Default::default()
        }
    }
}

/// Derive the record name for a cluster and target version.
pub fn record_name(cluster_name: &str, version: &str) -> String {
    format!("{}-{}", cluster_name, version)
}

impl ClusterUpgrade {
    /// Build a fresh, not-yet-upgraded record for a cluster and version.
    pub fn for_cluster(
        cluster_name: &str,
        namespace: &str,
        version: &str,
        nodes_ip: Vec<String>,
    ) -> Self {
        Self {
            metadata: ObjectMeta {
                name: Some(record_name(cluster_name, version)),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            spec: ClusterUpgradeSpec {
                nodes_ip,
                upgraded: false,
            },
            status: None,
        }
    }

    /// Whether the executor reported a `Successful` condition.
    ///
    /// Presence alone counts: a `Successful` condition whose status is false
    /// still reads as success.
    pub fn is_successful(&self) -> bool {
        self.status
            .as_ref()
            .is_some_and(|status| {
                status
                    .conditions
                    .iter()
                    .any(|c| c.r#type == SUCCESSFUL_CONDITION)
            })
    }
}
