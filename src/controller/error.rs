//! Error types for the upgrade gate.
//!
//! Every variant ends up as a structured `Failure` hook response; none of
//! them is allowed to take the process down.

use thiserror::Error;

/// Error type for gate, record store and inventory operations
#[derive(Error, Debug)]
pub enum Error {
    /// Transport, auth or server failure talking to the record store
    #[error("ClusterUpgrade store unavailable: {0}")]
    StoreUnavailable(String),

    /// A record with the same derived name already exists
    #[error("ClusterUpgrade {0} already exists")]
    AlreadyExists(String),

    /// The record vanished between find and patch
    #[error("ClusterUpgrade {0} not found")]
    NotFound(String),

    /// Machines could not be listed, or none exist
    #[error("Machine inventory unavailable: {0}")]
    InventoryUnavailable(String),

    /// Machines exist but none yielded a usable control-plane address
    #[error("No control-plane addresses found for cluster {0}")]
    NoControlPlaneAddresses(String),

    /// After-upgrade called without a matching before-upgrade record
    #[error("{0}")]
    ProtocolViolation(String),

    /// The hook request is missing a required field
    #[error("Invalid hook request: {0}")]
    InvalidRequest(String),
}

impl Error {
    /// Classify a record store error for the named record.
    ///
    /// 409 maps to `AlreadyExists`, 404 to `NotFound`, everything else is
    /// treated as the store being unavailable.
    pub fn from_store(err: kube::Error, name: &str) -> Self {
        match &err {
            kube::Error::Api(api_err) if api_err.code == 409 => {
                Error::AlreadyExists(name.to_string())
            }
            kube::Error::Api(api_err) if api_err.code == 404 => Error::NotFound(name.to_string()),
            _ => Error::StoreUnavailable(err.to_string()),
        }
    }

    /// Short machine-readable reason, logged with every failed hook
    pub fn reason(&self) -> &'static str {
        match self {
            Error::StoreUnavailable(_) => "StoreUnavailable",
            Error::AlreadyExists(_) => "AlreadyExists",
            Error::NotFound(_) => "NotFound",
            Error::InventoryUnavailable(_) => "InventoryUnavailable",
            Error::NoControlPlaneAddresses(_) => "NoControlPlaneAddresses",
            Error::ProtocolViolation(_) => "ProtocolViolation",
            Error::InvalidRequest(_) => "InvalidRequest",
        }
    }
}

/// Result type alias for gate operations
pub type Result<T> = std::result::Result<T, Error>;
