//! Upgrade gating for capi-upgrade-gate.
//!
//! Contains the upgrade gate state machine, its error type, and the wiring
//! that assembles it from configuration.

pub mod context;
pub mod error;
pub mod upgrade_gate;

pub use error::{Error, Result};
pub use upgrade_gate::{DEFAULT_RETRY_AFTER_SECONDS, GateDecision, GateState, UpgradeGate};
