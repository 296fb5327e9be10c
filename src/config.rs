//! Runtime configuration read from the environment.
//!
//! | Variable | Default |
//! |---|---|
//! | `WEBHOOK_PORT` | `9443` |
//! | `WEBHOOK_CERT_DIR` | `/tmp/k8s-webhook-server/serving-certs` |
//! | `HEALTH_PORT` | `8080` |
//! | `MACHINE_NAMESPACE` | `default` |
//! | `CONTROL_PLANE_MARKER` | `control-plane` |
//! | `RESERVED_SUBNET_PREFIX` | `10.6.` |
//! | `MEMBERSHIP_MODE` | `name` |
//! | `UPGRADE_RETRY_AFTER_SECONDS` | `30` |

use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::client::control_plane::DEFAULT_RESERVED_SUBNET_PREFIX;
use crate::client::membership::MembershipMode;
use crate::controller::upgrade_gate::DEFAULT_RETRY_AFTER_SECONDS;
use crate::health::HEALTH_PORT;
use crate::hooks::WEBHOOK_PORT;

pub const DEFAULT_CERT_DIR: &str = "/tmp/k8s-webhook-server/serving-certs";
pub const DEFAULT_MACHINE_NAMESPACE: &str = "default";
pub const DEFAULT_CONTROL_PLANE_MARKER: &str = "control-plane";

/// Errors raised while reading configuration
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

/// Extension configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionConfig {
    pub webhook_port: u16,
    pub cert_dir: PathBuf,
    pub health_port: u16,
    /// Namespace the OpenStackMachines are listed in
    pub machine_namespace: String,
    /// Name marker used by the name-based membership predicate
    pub control_plane_marker: String,
    /// Addresses starting with this prefix are never recorded
    pub reserved_subnet_prefix: String,
    pub membership: MembershipMode,
    pub retry_after_seconds: i32,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            webhook_port: WEBHOOK_PORT,
            cert_dir: PathBuf::from(DEFAULT_CERT_DIR),
            health_port: HEALTH_PORT,
            machine_namespace: DEFAULT_MACHINE_NAMESPACE.to_string(),
            control_plane_marker: DEFAULT_CONTROL_PLANE_MARKER.to_string(),
            reserved_subnet_prefix: DEFAULT_RESERVED_SUBNET_PREFIX.to_string(),
            membership: MembershipMode::default(),
            retry_after_seconds: DEFAULT_RETRY_AFTER_SECONDS,
        }
    }
}

impl ExtensionConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary lookup function.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let retry_after_seconds = parse_or(
            "UPGRADE_RETRY_AFTER_SECONDS",
            get("UPGRADE_RETRY_AFTER_SECONDS"),
            defaults.retry_after_seconds,
        )?;
        if retry_after_seconds <= 0 {
            return Err(ConfigError::Invalid {
                key: "UPGRADE_RETRY_AFTER_SECONDS",
                value: retry_after_seconds.to_string(),
            });
        }

        Ok(Self {
            webhook_port: parse_or("WEBHOOK_PORT", get("WEBHOOK_PORT"), defaults.webhook_port)?,
            cert_dir: get("WEBHOOK_CERT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cert_dir),
            health_port: parse_or("HEALTH_PORT", get("HEALTH_PORT"), defaults.health_port)?,
            machine_namespace: get("MACHINE_NAMESPACE").unwrap_or(defaults.machine_namespace),
            control_plane_marker: get("CONTROL_PLANE_MARKER")
                .unwrap_or(defaults.control_plane_marker),
            // An explicitly empty prefix disables the reserved-subnet filter.
            reserved_subnet_prefix: lookup("RESERVED_SUBNET_PREFIX")
                .unwrap_or(defaults.reserved_subnet_prefix),
            membership: parse_or("MEMBERSHIP_MODE", get("MEMBERSHIP_MODE"), defaults.membership)?,
            retry_after_seconds,
        })
    }
}

fn parse_or<T: FromStr>(
    key: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}
