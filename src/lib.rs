//! # tapbridge
//!
//! Bridges a tap device to a remote peer over one TCP connection, so two
//! physical networks behave as a single Layer-2 segment.
//!
//! ## Architecture
//!
//! - **Device** ([`device`]): raw Ethernet frames in and out of a tap interface
//! - **Wire** ([`protocol`]): each frame sent as `[u32 BE length][payload]`
//! - **Pumps** ([`pump`]): one task per direction, one frame at a time
//! - **Session** ([`session`]): both pumps on one connection, symmetric shutdown
//! - **Supervisor** ([`supervisor`]): redial loop (client) or accept loop (server)
//!
//! The TCP endpoint is the loopback end of an SSH port-forward; the tunnel
//! provides confidentiality, this crate only moves frames.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tapbridge::{config::Config, device::TapDevice, supervisor};
//!
//! #[tokio::main]
//! async fn main() -> tapbridge::Result<()> {
//!     let config = Config::default();
//!     let device = Arc::new(TapDevice::open(&config.device)?);
//!     supervisor::run(&config, device).await
//! }
//! ```

use std::future::Future;
use std::pin::Pin;

pub mod config;
pub mod device;
pub mod error;
pub mod protocol;
pub mod pump;
pub mod session;
pub mod supervisor;
pub mod transport;

pub use config::{Config, Role};
pub use error::{Result, TapBridgeError};
pub use session::{Session, SessionSummary};
pub use supervisor::Supervisor;

/// Boxed future returned by the device and transport seams.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
