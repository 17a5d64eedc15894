//! In-process frame device.
//!
//! [`MemoryDevice`] behaves like a tap interface whose "wire" is a
//! [`MemoryPeer`]: frames injected by the peer are returned by
//! `read_frame`, and every `write_frame` is delivered to the peer as one
//! item. Used to run sessions without kernel privileges.
//!
//! # Example
//!
//! ```
//! use tapbridge::device::{FrameDevice, MemoryDevice};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let (device, mut peer) = MemoryDevice::new("mem0");
//! peer.inject(&b"frame"[..]);
//!
//! let mut buf = [0u8; 64];
//! let n = device.read_frame(&mut buf).await.unwrap();
//! assert_eq!(&buf[..n], b"frame");
//!
//! device.write_frame(b"reply").await.unwrap();
//! assert_eq!(&peer.next_written().await.unwrap()[..], b"reply");
//! # });
//! ```

use std::io;

use bytes::Bytes;
use tokio::sync::{mpsc, Mutex};

use super::FrameDevice;
use crate::error::{Result, TapBridgeError};
use crate::BoxFuture;

/// What the next `read_frame` call will observe.
#[derive(Debug)]
enum Input {
    Frame(Bytes),
    NotReady,
    Fail,
}

/// Frame device backed by in-memory channels.
pub struct MemoryDevice {
    name: String,
    inbound: Mutex<mpsc::UnboundedReceiver<Input>>,
    outbound: mpsc::UnboundedSender<Bytes>,
}

/// Far side of a [`MemoryDevice`].
///
/// Dropping the peer makes further device reads and writes fail.
pub struct MemoryPeer {
    inbound: mpsc::UnboundedSender<Input>,
    outbound: mpsc::UnboundedReceiver<Bytes>,
}

impl MemoryDevice {
    /// Create a device and the peer that drives it.
    pub fn new(name: &str) -> (Self, MemoryPeer) {
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();

        let device = Self {
            name: name.to_string(),
            inbound: Mutex::new(in_rx),
            outbound: out_tx,
        };
        let peer = MemoryPeer {
            inbound: in_tx,
            outbound: out_rx,
        };

        (device, peer)
    }

    async fn recv(&self, buf: &mut [u8]) -> Result<usize> {
        let input = self.inbound.lock().await.recv().await;

        match input {
            Some(Input::Frame(frame)) => {
                // Like a real interface, an oversized frame is truncated to the buffer.
                let n = frame.len().min(buf.len());
                buf[..n].copy_from_slice(&frame[..n]);
                Ok(n)
            }
            Some(Input::NotReady) => Err(TapBridgeError::DeviceNotReady),
            Some(Input::Fail) => Err(TapBridgeError::DeviceRead(io::Error::other(
                "injected device failure",
            ))),
            None => Err(TapBridgeError::DeviceRead(io::Error::from(
                io::ErrorKind::BrokenPipe,
            ))),
        }
    }

    fn send(&self, frame: &[u8]) -> Result<usize> {
        self.outbound
            .send(Bytes::copy_from_slice(frame))
            .map_err(|_| TapBridgeError::DeviceWrite(io::Error::from(io::ErrorKind::BrokenPipe)))?;
        Ok(frame.len())
    }
}

impl FrameDevice for MemoryDevice {
    fn read_frame<'a>(&'a self, buf: &'a mut [u8]) -> BoxFuture<'a, Result<usize>> {
        Box::pin(self.recv(buf))
    }

    fn write_frame<'a>(&'a self, frame: &'a [u8]) -> BoxFuture<'a, Result<usize>> {
        let result = self.send(frame);
        Box::pin(async move { result })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl MemoryPeer {
    /// Queue a frame for the device to read.
    pub fn inject(&self, frame: impl Into<Bytes>) {
        let _ = self.inbound.send(Input::Frame(frame.into()));
    }

    /// Make the next device read report `DeviceNotReady`.
    pub fn inject_not_ready(&self) {
        let _ = self.inbound.send(Input::NotReady);
    }

    /// Make the next device read fail hard.
    pub fn inject_failure(&self) {
        let _ = self.inbound.send(Input::Fail);
    }

    /// Wait for the next frame written to the device.
    ///
    /// Returns `None` once the device is dropped.
    pub async fn next_written(&mut self) -> Option<Bytes> {
        self.outbound.recv().await
    }

    /// Take a written frame if one is already queued.
    pub fn try_next_written(&mut self) -> Option<Bytes> {
        self.outbound.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_inject_then_read() {
        let (device, peer) = MemoryDevice::new("mem0");
        peer.inject(vec![1u8, 2, 3]);

        let mut buf = [0u8; 16];
        let n = device.read_frame(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], &[1, 2, 3]);
        assert_eq!(device.name(), "mem0");
    }

    #[tokio::test]
    async fn test_not_ready_and_failure() {
        let (device, peer) = MemoryDevice::new("mem0");
        peer.inject_not_ready();
        peer.inject_failure();

        let mut buf = [0u8; 16];
        assert!(matches!(
            device.read_frame(&mut buf).await,
            Err(TapBridgeError::DeviceNotReady)
        ));
        assert!(matches!(
            device.read_frame(&mut buf).await,
            Err(TapBridgeError::DeviceRead(_))
        ));
    }

    #[tokio::test]
    async fn test_oversized_frame_is_truncated() {
        let (device, peer) = MemoryDevice::new("mem0");
        peer.inject(vec![7u8; 32]);

        let mut buf = [0u8; 8];
        assert_eq!(device.read_frame(&mut buf).await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_writes_reach_peer_one_by_one() {
        let (device, mut peer) = MemoryDevice::new("mem0");
        device.write_frame(b"one").await.unwrap();
        device.write_frame(b"two").await.unwrap();

        assert_eq!(&peer.next_written().await.unwrap()[..], b"one");
        assert_eq!(&peer.next_written().await.unwrap()[..], b"two");
        assert!(peer.try_next_written().is_none());
    }

    #[tokio::test]
    async fn test_dropped_peer_fails_io() {
        let (device, peer) = MemoryDevice::new("mem0");
        drop(peer);

        let mut buf = [0u8; 8];
        assert!(matches!(
            device.read_frame(&mut buf).await,
            Err(TapBridgeError::DeviceRead(_))
        ));
        assert!(matches!(
            device.write_frame(b"x").await,
            Err(TapBridgeError::DeviceWrite(_))
        ));
    }
}
