//! Linux tap interface.
//!
//! The interface is opened through `/dev/net/tun` in tap mode without the
//! packet-info prefix, so every read yields exactly one raw Ethernet frame.
//! The descriptor is switched to non-blocking and registered with the tokio
//! reactor; a pending read suspends only the calling task.

use std::io;

use tokio::io::unix::AsyncFd;
use tun_tap::{Iface, Mode};

use super::FrameDevice;
use crate::error::{Result, TapBridgeError};
use crate::BoxFuture;

/// Tap interface registered with the tokio reactor.
pub struct TapDevice {
    fd: AsyncFd<Iface>,
}

impl TapDevice {
    /// Open (or create) the tap interface `name`.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `DeviceOpen` if the interface cannot be created or
    /// registered (missing privileges, no `tun` module).
    pub fn open(name: &str) -> Result<Self> {
        let open_err = |source| TapBridgeError::DeviceOpen {
            name: name.to_string(),
            source,
        };

        let iface = Iface::without_packet_info(name, Mode::Tap).map_err(open_err)?;
        iface.set_non_blocking().map_err(open_err)?;
        let fd = AsyncFd::new(iface).map_err(open_err)?;

        tracing::info!("Opened tap device {}", fd.get_ref().name());
        Ok(Self { fd })
    }

    async fn recv(&self, buf: &mut [u8]) -> Result<usize> {
        loop {
            let mut guard = self.fd.readable().await.map_err(TapBridgeError::DeviceRead)?;

            match guard.try_io(|inner| inner.get_ref().recv(buf)) {
                Ok(result) => return result.map_err(classify_read_error),
                Err(_would_block) => continue,
            }
        }
    }

    async fn send(&self, frame: &[u8]) -> Result<usize> {
        loop {
            let mut guard = self
                .fd
                .writable()
                .await
                .map_err(TapBridgeError::DeviceWrite)?;

            match guard.try_io(|inner| inner.get_ref().send(frame)) {
                Ok(result) => return result.map_err(TapBridgeError::DeviceWrite),
                Err(_would_block) => continue,
            }
        }
    }
}

impl FrameDevice for TapDevice {
    fn read_frame<'a>(&'a self, buf: &'a mut [u8]) -> BoxFuture<'a, Result<usize>> {
        Box::pin(self.recv(buf))
    }

    fn write_frame<'a>(&'a self, frame: &'a [u8]) -> BoxFuture<'a, Result<usize>> {
        Box::pin(self.send(frame))
    }

    fn name(&self) -> &str {
        self.fd.get_ref().name()
    }
}

/// The kernel answers reads on a tap that is down or detached with
/// `EIO`/`EBADFD`; both clear once the interface comes up.
fn classify_read_error(err: io::Error) -> TapBridgeError {
    match err.raw_os_error() {
        Some(libc::EIO) | Some(libc::EBADFD) => TapBridgeError::DeviceNotReady,
        _ => TapBridgeError::DeviceRead(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_down_is_not_ready() {
        let err = classify_read_error(io::Error::from_raw_os_error(libc::EIO));
        assert!(err.is_transient());

        let err = classify_read_error(io::Error::from_raw_os_error(libc::EBADFD));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_open_reports_failure_as_device_open() {
        // Succeeds with CAP_NET_ADMIN; otherwise the failure must be a DeviceOpen.
        match TapDevice::open("tbtest0") {
            Ok(tap) => assert_eq!(tap.name(), "tbtest0"),
            Err(e) => assert!(matches!(e, TapBridgeError::DeviceOpen { .. }), "{}", e),
        }
    }

    #[test]
    fn test_other_errors_are_fatal() {
        let err = classify_read_error(io::Error::from_raw_os_error(libc::EFAULT));
        assert!(matches!(err, TapBridgeError::DeviceRead(_)));
    }
}
