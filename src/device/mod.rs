//! Device module - the Ethernet side of the bridge.
//!
//! The relay only needs a handle that reads and writes whole frames. The
//! [`FrameDevice`] trait is that seam:
//! - [`TapDevice`] - Linux tap interface (production)
//! - [`MemoryDevice`] - in-process device driven by a [`MemoryPeer`]
//!
//! One device is opened at startup and shared as `Arc<D>` by both pump
//! directions of every session. Implementations must tolerate a concurrent
//! read and write without external locking.

mod memory;
#[cfg(target_os = "linux")]
mod tap;
mod wiring;

pub use memory::{MemoryDevice, MemoryPeer};
#[cfg(target_os = "linux")]
pub use tap::TapDevice;
pub use wiring::{attach_to_bridge, bring_up, BRCTL, IFCONFIG};

use crate::error::Result;
use crate::BoxFuture;

/// A handle that moves whole Ethernet frames in and out of the host.
pub trait FrameDevice: Send + Sync + 'static {
    /// Read one frame into `buf`, returning its length.
    ///
    /// Fails with `DeviceNotReady` while the interface cannot deliver frames
    /// yet; callers back off and retry. Any other error is fatal to the
    /// calling pump.
    fn read_frame<'a>(&'a self, buf: &'a mut [u8]) -> BoxFuture<'a, Result<usize>>;

    /// Write one frame, returning the number of bytes accepted.
    fn write_frame<'a>(&'a self, frame: &'a [u8]) -> BoxFuture<'a, Result<usize>>;

    /// Interface name, for logs.
    fn name(&self) -> &str;
}
