//! Cluster API Runtime SDK lifecycle hooks.
//!
//! Upgrade-related hooks are gated by `ClusterUpgrade` records; all other
//! registered lifecycle hooks succeed unconditionally.

pub mod catalog;
pub mod dispatcher;
mod server;
pub mod types;

pub use catalog::{LifecycleHook, discovery_response};
pub use dispatcher::HookDispatcher;
pub use server::{
    HookServerError, HookServerState, TLS_CERT_FILE, TLS_KEY_FILE, WEBHOOK_PORT,
    create_hook_router, run_hook_server,
};
pub use types::{HookRequest, HookResponse, ResponseStatus};
