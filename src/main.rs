//! Entry point for `tapbridge`.
//!
//! Owns process setup only: logging, configuration, opening the tap and the
//! one-time OS wiring. Everything after that is the library's supervisor.
//!
//! ```text
//! home side:    ssh -L 127.0.0.1:2000:127.0.0.1:2000 root@HOME
//!               tapbridge home
//! remote side:  ssh -N -R 127.0.0.1:2000:127.0.0.1:2000 root@HOME
//!               tapbridge
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tapbridge::config::{Config, Role};
use tapbridge::device;
use tapbridge::supervisor;

/// Bridge a tap device to a remote peer over a local TCP tunnel endpoint.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// `home` dials the tunnel (client role); anything else listens (server role).
    mode: Option<String>,

    /// JSON configuration file; flags override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Tap interface name.
    #[arg(short, long)]
    device: Option<String>,

    /// Bridge to attach the tap to in server role.
    #[arg(short, long)]
    bridge: Option<String>,

    /// Do not attach the tap to any bridge.
    #[arg(long, conflicts_with = "bridge")]
    no_bridge: bool,

    /// Tunnel endpoint to dial or listen on.
    #[arg(short, long)]
    address: Option<SocketAddr>,
}

impl Cli {
    fn into_config(self) -> tapbridge::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if self.mode.is_some() {
            config.role = Role::from_mode(self.mode.as_deref());
        }
        if let Some(device) = self.device {
            config.device = device;
        }
        if let Some(bridge) = self.bridge {
            config.bridge = Some(bridge);
        }
        if self.no_bridge {
            config.bridge = None;
        }
        if let Some(address) = self.address {
            config.address = address;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; set RUST_LOG to control verbosity.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Cli::parse().into_config()?;
    tracing::info!("Starting as {:?} on {}", config.role, config.address);

    let tap = match open_device(&config.device) {
        Ok(tap) => tap,
        Err(e) => {
            tracing::error!("{}", e);
            return Err(e.into());
        }
    };

    device::bring_up(&config.device).await;
    if config.role == Role::Server {
        if let Some(bridge) = &config.bridge {
            device::attach_to_bridge(bridge, &config.device).await;
        }
    }

    if let Err(e) = supervisor::run(&config, tap).await {
        tracing::error!("{}", e);
        return Err(e.into());
    }

    Ok(())
}

#[cfg(target_os = "linux")]
fn open_device(name: &str) -> tapbridge::Result<Arc<device::TapDevice>> {
    Ok(Arc::new(device::TapDevice::open(name)?))
}

#[cfg(not(target_os = "linux"))]
fn open_device(name: &str) -> tapbridge::Result<Arc<device::MemoryDevice>> {
    Err(tapbridge::TapBridgeError::DeviceOpen {
        name: name.to_string(),
        source: std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "tap devices are only supported on Linux",
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["tapbridge"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().into_config().unwrap()
    }

    #[test]
    fn test_no_mode_is_server() {
        let config = parse(&[]);
        assert_eq!(config.role, Role::Server);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_home_mode_is_client() {
        assert_eq!(parse(&["home"]).role, Role::Client);
        assert_eq!(parse(&["work"]).role, Role::Server);
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = parse(&["home", "-d", "tap3", "-a", "127.0.0.1:2200", "--no-bridge"]);
        assert_eq!(config.device, "tap3");
        assert_eq!(config.address.port(), 2200);
        assert_eq!(config.bridge, None);
    }

    #[test]
    fn test_config_file_role_kept_without_mode() {
        let path = std::env::temp_dir().join(format!("tapbridge-cli-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "role": "client", "device": "tap9" }"#).unwrap();

        let config = parse(&["--config", path.to_str().unwrap(), "-b", "br0"]);
        let _ = std::fs::remove_file(&path);

        assert_eq!(config.role, Role::Client);
        assert_eq!(config.device, "tap9");
        assert_eq!(config.bridge.as_deref(), Some("br0"));
    }
}
