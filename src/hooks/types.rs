//! Runtime SDK wire types (`hooks.runtime.cluster.x-k8s.io/v1alpha1`).
//!
//! Only the fields the extension reads are modelled on requests; unknown
//! fields (the full Cluster object, from-version, ...) are ignored.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};

use super::catalog::LifecycleHook;

/// API version of all Runtime SDK hook requests and responses.
pub const HOOKS_API_VERSION: &str = "hooks.runtime.cluster.x-k8s.io/v1alpha1";

/// Namespace assumed for a Cluster object that carries none.
pub const DEFAULT_CLUSTER_NAMESPACE: &str = "default";

// ============================================================================
// Requests
// ============================================================================

/// Body of any lifecycle hook request.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// The CAPI Cluster the hook fires for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<ClusterObject>,

    /// BeforeClusterUpgrade: current version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_kubernetes_version: Option<String>,

    /// BeforeClusterUpgrade: version being upgraded to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_kubernetes_version: Option<String>,

    /// AfterControlPlaneUpgrade / AfterClusterUpgrade: version reached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes_version: Option<String>,
}

/// The slice of a CAPI Cluster object the extension needs.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ClusterObject {
    #[serde(default)]
    pub metadata: ObjectMeta,
}

impl HookRequest {
    /// Name of the cluster, if present and non-empty.
    pub fn cluster_name(&self) -> Option<&str> {
        self.cluster
            .as_ref()
            .and_then(|c| c.metadata.name.as_deref())
            .filter(|name| !name.is_empty())
    }

    /// Namespace of the cluster, falling back to `default`.
    pub fn cluster_namespace(&self) -> &str {
        self.cluster
            .as_ref()
            .and_then(|c| c.metadata.namespace.as_deref())
            .filter(|ns| !ns.is_empty())
            .unwrap_or(DEFAULT_CLUSTER_NAMESPACE)
    }

    /// Build a request for a named cluster (used by tests and tooling).
    pub fn for_cluster(name: &str, namespace: &str) -> Self {
        Self {
            api_version: Some(HOOKS_API_VERSION.to_string()),
            cluster: Some(ClusterObject {
                metadata: ObjectMeta {
                    name: Some(name.to_string()),
                    namespace: Some(namespace.to_string()),
                    ..Default::default()
                },
            }),
            ..Default::default()
        }
    }

    /// Set the target version of a BeforeClusterUpgrade request.
    pub fn to_version(mut self, version: &str) -> Self {
        self.to_kubernetes_version = Some(version.to_string());
        self
    }

    /// Set the reached version of an AfterClusterUpgrade request.
    pub fn at_version(mut self, version: &str) -> Self {
        self.kubernetes_version = Some(version.to_string());
        self
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Outcome reported to the orchestrator.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum ResponseStatus {
    Success,
    Failure,
}

impl std::fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseStatus::Success => write!(f, "Success"),
            ResponseStatus::Failure => write!(f, "Failure"),
        }
    }
}

/// Body of any lifecycle hook response.
///
/// A positive `retryAfterSeconds` tells the orchestrator to call the same
/// hook again with the same input after that many seconds.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HookResponse {
    pub api_version: String,
    pub kind: String,
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<i32>,
}

impl HookResponse {
    fn new(hook: LifecycleHook, status: ResponseStatus) -> Self {
        Self {
            api_version: HOOKS_API_VERSION.to_string(),
            kind: hook.response_kind(),
            status,
            message: String::new(),
            retry_after_seconds: None,
        }
    }

    /// Proceed immediately.
    pub fn success(hook: LifecycleHook) -> Self {
        Self::new(hook, ResponseStatus::Success)
    }

    /// Success that asks the orchestrator to call back later.
    pub fn retry_after(hook: LifecycleHook, seconds: i32) -> Self {
        Self {
            retry_after_seconds: Some(seconds),
            ..Self::new(hook, ResponseStatus::Success)
        }
    }

    /// Failure with a human-readable message.
    pub fn failure(hook: LifecycleHook, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::new(hook, ResponseStatus::Failure)
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}

// ============================================================================
// Discovery
// ============================================================================

/// Failure policy advertised for a handler.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum FailurePolicy {
    Ignore,
    Fail,
}

/// Hook reference inside a discovered handler.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GroupVersionHook {
    pub api_version: String,
    pub hook: String,
}

/// One handler advertised through discovery.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionHandler {
    pub name: String,
    pub request_hook: GroupVersionHook,
    pub timeout_seconds: i32,
    pub failure_policy: FailurePolicy,
}

/// Response to the discovery call.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryResponse {
    pub api_version: String,
    pub kind: String,
    pub status: ResponseStatus,
    pub handlers: Vec<ExtensionHandler>,
}
