//! Connection supervision for both roles.
//!
//! - **Client**: wait, dial, run one session to completion, repeat. Only one
//!   connection exists at a time and dialing never gives up.
//! - **Server**: accept forever, spawning an independent session per
//!   connection. Only a failed bind stops the server.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tapbridge::{config::Config, device::TapDevice, supervisor};
//!
//! let config = Config::default();
//! let device = Arc::new(TapDevice::open(&config.device)?);
//! supervisor::run(&config, device).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, Role};
use crate::device::FrameDevice;
use crate::error::Result;
use crate::session::Session;
use crate::transport::{Acceptor, Connector, TcpAcceptor, TcpConnector};

/// Starts sessions over time on one shared device.
pub struct Supervisor<D: ?Sized> {
    device: Arc<D>,
    dial_interval: Duration,
    not_ready_backoff: Duration,
}

impl<D> Supervisor<D>
where
    D: FrameDevice + ?Sized,
{
    /// Create a supervisor with timings taken from `config`.
    pub fn new(device: Arc<D>, config: &Config) -> Self {
        Self {
            device,
            dial_interval: config.dial_interval(),
            not_ready_backoff: config.not_ready_backoff(),
        }
    }

    /// Client role: dial on a fixed interval, one session at a time.
    ///
    /// Never returns; dial failures and session ends both lead back to the
    /// next wait.
    pub async fn run_client<C: Connector>(&self, connector: C) {
        let target = connector.describe();
        let mut attempt: u64 = 0;

        loop {
            tokio::time::sleep(self.dial_interval).await;
            attempt += 1;
            tracing::info!("Connecting to {} (attempt {})...", target, attempt);

            match connector.connect().await {
                Ok(stream) => {
                    attempt = 0;
                    let summary = Session::new(stream, self.device.clone())
                        .not_ready_backoff(self.not_ready_backoff)
                        .label(target.clone())
                        .run()
                        .await;
                    tracing::info!(
                        "Connection to {} lost after {} frames, redialing",
                        target,
                        summary.total_frames()
                    );
                }
                Err(e) => tracing::warn!("{}", e),
            }
        }
    }

    /// Server role: accept forever, one concurrent session per connection.
    ///
    /// Accept failures are reported and the loop continues.
    pub async fn run_server<A: Acceptor>(&self, acceptor: A) {
        tracing::info!("Waiting for connections...");

        loop {
            match acceptor.accept().await {
                Ok((stream, peer)) => {
                    tracing::info!("Accepted connection from {}", peer);
                    let session = Session::new(stream, self.device.clone())
                        .not_ready_backoff(self.not_ready_backoff)
                        .label(peer);
                    tokio::spawn(session.run());
                }
                Err(e) => tracing::warn!("{}", e),
            }
        }
    }
}

/// Run the role selected by `config` over TCP.
///
/// Returns only on a fatal error: the server failing to bind.
pub async fn run<D>(config: &Config, device: Arc<D>) -> Result<()>
where
    D: FrameDevice + ?Sized,
{
    let supervisor = Supervisor::new(device, config);

    match config.role {
        Role::Client => {
            supervisor
                .run_client(TcpConnector::new(config.address))
                .await
        }
        Role::Server => {
            let acceptor = TcpAcceptor::bind(config.address).await?;
            tracing::info!("Listening on {}", acceptor.local_addr());
            supervisor.run_server(acceptor).await
        }
    }

    Ok(())
}
