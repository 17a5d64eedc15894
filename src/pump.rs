//! Frame pumps - one per relay direction.
//!
//! ```text
//! device ──read_frame──► [len|frame] ──write_exact──► connection
//! device ◄─write_frame── [len|frame] ◄──read_exact─── connection
//! ```
//!
//! Each pump moves one frame at a time, so frames within a direction keep
//! their order. A pump runs until it fails or until the session closes the
//! connection under it; either way it returns a [`PumpExit`] describing why.

use std::convert::Infallible;
use std::fmt;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;

use crate::device::FrameDevice;
use crate::error::{Result, TapBridgeError};
use crate::protocol::{
    decode_header, encode_header_into, validate_length, BUFFER_SIZE, HEADER_SIZE, MAX_FRAME_SIZE,
};
use crate::transport::{read_exact, write_exact};

/// Relay direction of a pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Frames read from the device, written to the connection.
    DeviceToTransport,
    /// Frames read from the connection, written to the device.
    TransportToDevice,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::DeviceToTransport => f.write_str("device->transport"),
            Direction::TransportToDevice => f.write_str("transport->device"),
        }
    }
}

/// Frames and payload bytes relayed by one pump.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    pub frames: u64,
    pub bytes: u64,
}

impl PumpStats {
    #[inline]
    fn record(&mut self, len: usize) {
        self.frames += 1;
        self.bytes += len as u64;
    }
}

/// Why and after how much traffic a pump stopped.
#[derive(Debug)]
pub struct PumpExit {
    pub direction: Direction,
    pub stats: PumpStats,
    pub cause: TapBridgeError,
}

impl PumpExit {
    /// Whether the pump stopped because its sibling closed the connection.
    pub fn closed_by_session(&self) -> bool {
        matches!(self.cause, TapBridgeError::ConnectionClosed)
    }
}

/// Relay frames from `device` to `writer` until failure or `closed` fires.
///
/// A not-ready device is retried after `backoff` without ending the pump.
pub async fn run_device_to_transport<D, W>(
    device: &D,
    mut writer: W,
    backoff: Duration,
    closed: &CancellationToken,
) -> PumpExit
where
    D: FrameDevice + ?Sized,
    W: AsyncWrite + Unpin,
{
    let mut stats = PumpStats::default();

    let result = tokio::select! {
        result = device_to_transport(device, &mut writer, backoff, &mut stats) => result,
        _ = closed.cancelled() => Err(TapBridgeError::ConnectionClosed),
    };

    PumpExit {
        direction: Direction::DeviceToTransport,
        stats,
        cause: into_cause(result),
    }
}

/// Relay frames from `reader` to `device` until failure or `closed` fires.
pub async fn run_transport_to_device<D, R>(
    device: &D,
    mut reader: R,
    closed: &CancellationToken,
) -> PumpExit
where
    D: FrameDevice + ?Sized,
    R: AsyncRead + Unpin,
{
    let mut stats = PumpStats::default();

    let result = tokio::select! {
        result = transport_to_device(device, &mut reader, &mut stats) => result,
        _ = closed.cancelled() => Err(TapBridgeError::ConnectionClosed),
    };

    PumpExit {
        direction: Direction::TransportToDevice,
        stats,
        cause: into_cause(result),
    }
}

fn into_cause(result: Result<Infallible>) -> TapBridgeError {
    match result {
        Ok(never) => match never {},
        Err(e) => e,
    }
}

async fn device_to_transport<D, W>(
    device: &D,
    writer: &mut W,
    backoff: Duration,
    stats: &mut PumpStats,
) -> Result<Infallible>
where
    D: FrameDevice + ?Sized,
    W: AsyncWrite + Unpin,
{
    // Header space up front so each frame goes out in one write.
    let mut buf = vec![0u8; BUFFER_SIZE];

    loop {
        let n = match device.read_frame(&mut buf[HEADER_SIZE..]).await {
            Ok(n) => n,
            Err(e) if e.is_transient() => {
                tracing::warn!(
                    "Device {} not ready, waiting {:?}",
                    device.name(),
                    backoff
                );
                tokio::time::sleep(backoff).await;
                continue;
            }
            Err(e) => return Err(e),
        };

        encode_header_into(&mut buf, n as u32);
        write_exact(writer, &buf[..HEADER_SIZE + n]).await?;

        stats.record(n);
        tracing::trace!("{} frame of {} bytes", Direction::DeviceToTransport, n);
    }
}

async fn transport_to_device<D, R>(
    device: &D,
    reader: &mut R,
    stats: &mut PumpStats,
) -> Result<Infallible>
where
    D: FrameDevice + ?Sized,
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_SIZE];
    let mut payload = vec![0u8; MAX_FRAME_SIZE];

    loop {
        read_exact(reader, &mut header).await?;

        // An oversized length means framing is lost; nothing after it can be trusted.
        let len = validate_length(decode_header(header), payload.len())?;

        let frame = &mut payload[..len];
        read_exact(reader, frame).await?;

        let written = device.write_frame(frame).await?;
        if written != len {
            tracing::warn!(
                "Device {} accepted {} of {} bytes",
                device.name(),
                written,
                len
            );
        }

        stats.record(len);
        tracing::trace!("{} frame of {} bytes", Direction::TransportToDevice, len);
    }
}
