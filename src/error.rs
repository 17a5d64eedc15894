//! Error types for tapbridge.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Main error type for all tapbridge operations.
#[derive(Debug, Error)]
pub enum TapBridgeError {
    /// I/O error outside the relay path (config file, process setup).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration file could not be parsed.
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    /// The tap device could not be opened at startup.
    #[error("Cannot open device {name}: {source}")]
    DeviceOpen {
        name: String,
        #[source]
        source: io::Error,
    },

    /// The device exists but is not ready to deliver frames yet.
    #[error("Device not ready")]
    DeviceNotReady,

    /// Hard failure reading a frame from the device.
    #[error("Device read error: {0}")]
    DeviceRead(#[source] io::Error),

    /// Hard failure writing a frame to the device.
    #[error("Device write error: {0}")]
    DeviceWrite(#[source] io::Error),

    /// Read from the connection failed or hit end of stream.
    #[error("Connection read error: {0}")]
    ConnectionRead(#[source] io::Error),

    /// Write to the connection failed.
    #[error("Connection write error: {0}")]
    ConnectionWrite(#[source] io::Error),

    /// The session closed the connection under this pump.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Peer declared a frame larger than the receive buffer.
    #[error("Frame length {length} exceeds maximum {max}")]
    FrameTooLarge { length: u32, max: usize },

    /// Client role could not reach the tunnel endpoint.
    #[error("Dial {addr} failed: {source}")]
    Dial {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// Server role failed to accept one connection.
    #[error("Accept failed: {0}")]
    Accept(#[source] io::Error),

    /// Server role could not bind its listening endpoint.
    #[error("Listen on {addr} failed: {source}")]
    Listen {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

impl TapBridgeError {
    /// Whether the condition is retried in place rather than ending a pump.
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(self, TapBridgeError::DeviceNotReady)
    }
}

/// Result type alias using TapBridgeError.
pub type Result<T> = std::result::Result<T, TapBridgeError>;
