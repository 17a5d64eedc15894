//! Runtime configuration.
//!
//! Every field has a default matching the fixed deployment (tap `tap0`,
//! bridge `bridge0`, tunnel endpoint `127.0.0.1:2000`). A JSON file may
//! override any subset of fields; command-line flags are applied on top by
//! the binary.
//!
//! # Example
//!
//! ```
//! use tapbridge::config::{Config, Role};
//!
//! let config: Config = serde_json::from_str(r#"{ "role": "client" }"#).unwrap();
//! assert_eq!(config.role, Role::Client);
//! assert_eq!(config.device, "tap0");
//! ```

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;

/// Default tap interface name.
pub const DEFAULT_DEVICE: &str = "tap0";

/// Default bridge the server attaches the tap to.
pub const DEFAULT_BRIDGE: &str = "bridge0";

/// Default wait before every dial attempt (client role).
pub const DEFAULT_DIAL_INTERVAL: Duration = Duration::from_secs(5);

/// Default wait after the device reports not-ready.
pub const DEFAULT_NOT_READY_BACKOFF: Duration = Duration::from_secs(1);

/// Mode argument that selects the client role.
pub const CLIENT_MODE: &str = "home";

/// Which end of the tunnel this process is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Dials the tunnel endpoint, one session at a time.
    Client,
    /// Listens on the tunnel endpoint, one session per connection.
    #[default]
    Server,
}

impl Role {
    /// Select the role from the process mode argument.
    ///
    /// `home` selects the client; absence or any other value is the server.
    pub fn from_mode(mode: Option<&str>) -> Self {
        match mode {
            Some(CLIENT_MODE) => Role::Client,
            _ => Role::Server,
        }
    }
}

/// Full process configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Client or server role.
    pub role: Role,
    /// Tap interface name.
    pub device: String,
    /// Bridge to attach the tap to in server role (`None` skips it).
    pub bridge: Option<String>,
    /// Tunnel endpoint; dialed by the client, bound by the server.
    pub address: SocketAddr,
    /// Seconds to wait before each dial attempt.
    pub dial_interval_secs: u64,
    /// Milliseconds to wait after a not-ready device read.
    pub not_ready_backoff_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            role: Role::default(),
            device: DEFAULT_DEVICE.to_string(),
            bridge: Some(DEFAULT_BRIDGE.to_string()),
            address: SocketAddr::from(([127, 0, 0, 1], 2000)),
            dial_interval_secs: DEFAULT_DIAL_INTERVAL.as_secs(),
            not_ready_backoff_ms: DEFAULT_NOT_READY_BACKOFF.as_millis() as u64,
        }
    }
}

impl Config {
    /// Load a configuration file, defaulting any missing field.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read and `Config` if it is not
    /// valid JSON for this structure.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Wait before each dial attempt.
    #[inline]
    pub fn dial_interval(&self) -> Duration {
        Duration::from_secs(self.dial_interval_secs)
    }

    /// Wait after a not-ready device read.
    #[inline]
    pub fn not_ready_backoff(&self) -> Duration {
        Duration::from_millis(self.not_ready_backoff_ms)
    }
}
