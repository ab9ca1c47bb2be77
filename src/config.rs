use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use crate::registry::auth::Credentials;

// =============================================================================
// Labels and naming
// =============================================================================

/// Container label selecting the versioning mode
pub const MODE_LABEL: &str = "lookbuilding.mode";

/// Suffix given to the old container while its replacement is created
pub const OLD_CONTAINER_SUFFIX: &str = ".lb.old";

// =============================================================================
// Registry
// =============================================================================

/// Default registry (Docker Hub)
pub const DEFAULT_REGISTRY_URL: &str = "https://registry-1.docker.io";

/// Timeout for a single registry request (30 seconds)
pub const REGISTRY_TIMEOUT_SECS: u64 = 30;

/// Pending requests the registry cache accepts before callers wait
pub const CACHE_MAILBOX_SIZE: usize = 64;

// =============================================================================
// Environment
// =============================================================================

pub const ENV_ADDR: &str = "LOOKBUILDING_ADDR";
pub const ENV_REGISTRY_URL: &str = "LOOKBUILDING_REGISTRY_URL";
pub const ENV_REGISTRY_USERNAME: &str = "LOOKBUILDING_REGISTRY_USERNAME";
pub const ENV_REGISTRY_PASSWORD: &str = "LOOKBUILDING_REGISTRY_PASSWORD";
pub const ENV_ON_INVENTORY_ERROR: &str = "LOOKBUILDING_ON_INVENTORY_ERROR";
pub const ENV_STATIC_DIR: &str = "LOOKBUILDING_STATIC_DIR";
pub const ENV_SCAN_ON_START: &str = "LOOKBUILDING_SCAN_ON_START";

pub const DEFAULT_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_STATIC_DIR: &str = "static";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name}: invalid value {value:?}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} and {1} must be set together")]
    IncompleteCredentials(&'static str, &'static str),
}

/// What a scan does when one labeled container can't be inspected
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Abort the whole scan on the first failing container
    #[default]
    Abort,
    /// Log the failing container and carry on with the others
    Continue,
}

impl std::str::FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "abort" => Ok(Self::Abort),
            "continue" => Ok(Self::Continue),
            other => Err(format!("expected \"abort\" or \"continue\", got {other:?}")),
        }
    }
}

/// Process configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub addr: SocketAddr,
    pub registry_url: String,
    pub credentials: Option<Credentials>,
    pub failure_policy: FailurePolicy,
    pub static_dir: PathBuf,
    pub scan_on_start: bool,
}

impl Config {
    /// Read the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from a variable lookup, missing variables take defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let addr = parse_var(ENV_ADDR, lookup(ENV_ADDR), DEFAULT_ADDR)?;

        let registry_url = lookup(ENV_REGISTRY_URL)
            .unwrap_or_else(|| DEFAULT_REGISTRY_URL.to_string());

        let credentials = match (lookup(ENV_REGISTRY_USERNAME), lookup(ENV_REGISTRY_PASSWORD)) {
            (Some(username), Some(password)) => Some(Credentials { username, password }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::IncompleteCredentials(
                    ENV_REGISTRY_USERNAME,
                    ENV_REGISTRY_PASSWORD,
                ));
            }
        };

        let failure_policy = parse_var(
            ENV_ON_INVENTORY_ERROR,
            lookup(ENV_ON_INVENTORY_ERROR),
            "abort",
        )?;

        let static_dir = lookup(ENV_STATIC_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR));

        let scan_on_start = parse_var(ENV_SCAN_ON_START, lookup(ENV_SCAN_ON_START), "false")?;

        Ok(Self {
            addr,
            registry_url,
            credentials,
            failure_policy,
            static_dir,
            scan_on_start,
        })
    }
}

fn parse_var<T>(name: &'static str, value: Option<String>, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let value = value.unwrap_or_else(|| default.to_string());
    value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        name,
        reason: e.to_string(),
        value,
    })
}
