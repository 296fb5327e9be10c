//! Lifecycle hooks served by this extension and their discovery entries.

use super::types::{
    DiscoveryResponse, ExtensionHandler, FailurePolicy, GroupVersionHook, HOOKS_API_VERSION,
    ResponseStatus,
};

/// Timeout the orchestrator applies to each handler call.
pub const HANDLER_TIMEOUT_SECONDS: i32 = 5;

/// Lifecycle events the extension registers for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleHook {
    BeforeClusterCreate,
    AfterControlPlaneInitialized,
    BeforeClusterUpgrade,
    AfterControlPlaneUpgrade,
    AfterClusterUpgrade,
    BeforeClusterDelete,
}

impl LifecycleHook {
    /// Every registered hook, in discovery order.
    pub const ALL: [LifecycleHook; 6] = [
        LifecycleHook::BeforeClusterCreate,
        LifecycleHook::AfterControlPlaneInitialized,
        LifecycleHook::BeforeClusterUpgrade,
        LifecycleHook::AfterControlPlaneUpgrade,
        LifecycleHook::AfterClusterUpgrade,
        LifecycleHook::BeforeClusterDelete,
    ];

    /// Runtime SDK hook name.
    pub fn hook_name(&self) -> &'static str {
        match self {
            LifecycleHook::BeforeClusterCreate => "BeforeClusterCreate",
            LifecycleHook::AfterControlPlaneInitialized => "AfterControlPlaneInitialized",
            LifecycleHook::BeforeClusterUpgrade => "BeforeClusterUpgrade",
            LifecycleHook::AfterControlPlaneUpgrade => "AfterControlPlaneUpgrade",
            LifecycleHook::AfterClusterUpgrade => "AfterClusterUpgrade",
            LifecycleHook::BeforeClusterDelete => "BeforeClusterDelete",
        }
    }

    /// Handler name registered for the hook.
    pub fn handler_name(&self) -> &'static str {
        match self {
            LifecycleHook::BeforeClusterCreate => "before-cluster-create",
            LifecycleHook::AfterControlPlaneInitialized => "after-control-plane-initialized",
            LifecycleHook::BeforeClusterUpgrade => "before-cluster-upgrade",
            LifecycleHook::AfterControlPlaneUpgrade => "after-control-plane-upgrade",
            LifecycleHook::AfterClusterUpgrade => "after-cluster-upgrade",
            LifecycleHook::BeforeClusterDelete => "before-cluster-delete",
        }
    }

    /// `kind` of the response body.
    pub fn response_kind(&self) -> String {
        format!("{}Response", self.hook_name())
    }

    /// HTTP path the orchestrator calls: `/<group>/<version>/<hook>/<handler>`.
    pub fn path(&self) -> String {
        format!(
            "/{}/{}/{}",
            HOOKS_API_VERSION,
            self.hook_name().to_lowercase(),
            self.handler_name()
        )
    }

    /// Resolve a hook from the last two path segments.
    pub fn from_path(hook: &str, handler: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|h| {
            h.hook_name().eq_ignore_ascii_case(hook) && h.handler_name() == handler
        })
    }

    /// Discovery entry for this hook.
    pub fn extension_handler(&self) -> ExtensionHandler {
        ExtensionHandler {
            name: self.handler_name().to_string(),
            request_hook: GroupVersionHook {
                api_version: HOOKS_API_VERSION.to_string(),
                hook: self.hook_name().to_string(),
            },
            timeout_seconds: HANDLER_TIMEOUT_SECONDS,
            failure_policy: FailurePolicy::Fail,
        }
    }
}

impl std::fmt::Display for LifecycleHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hook_name())
    }
}

/// Discovery response advertising every hook.
pub fn discovery_response() -> DiscoveryResponse {
    DiscoveryResponse {
        api_version: HOOKS_API_VERSION.to_string(),
        kind: "DiscoveryResponse".to_string(),
        status: ResponseStatus::Success,
        handlers: LifecycleHook::ALL
            .iter()
            .map(LifecycleHook::extension_handler)
            .collect(),
    }
}
