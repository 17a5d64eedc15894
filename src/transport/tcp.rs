//! TCP endpoints for the tunnel.
//!
//! Both roles only ever talk to the local end of an externally established
//! SSH port-forward, so the address is a loopback endpoint.
//!
//! The supervisors are written against the [`Connector`] and [`Acceptor`]
//! seams; [`TcpConnector`] and [`TcpAcceptor`] are the production
//! implementations.
//!
//! # Example
//!
//! ```ignore
//! use tapbridge::transport::{Acceptor, TcpAcceptor};
//!
//! let acceptor = TcpAcceptor::bind("127.0.0.1:2000".parse()?).await?;
//! let (stream, peer) = acceptor.accept().await?;
//! ```

use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};

use crate::error::{Result, TapBridgeError};
use crate::BoxFuture;

/// Default tunnel endpoint (local end of the SSH forward).
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:2000";

/// Opens outbound connections for the client role.
pub trait Connector: Send + Sync + 'static {
    /// Stream type produced by a successful dial.
    type Stream: AsyncRead + AsyncWrite + Send + 'static;

    /// Dial the endpoint once.
    fn connect(&self) -> BoxFuture<'_, Result<Self::Stream>>;

    /// Human-readable description of the endpoint, for logs.
    fn describe(&self) -> String;
}

/// Accepts inbound connections for the server role.
pub trait Acceptor: Send + Sync + 'static {
    /// Stream type produced by a successful accept.
    type Stream: AsyncRead + AsyncWrite + Send + 'static;

    /// Accept a single connection, with a label naming the peer.
    fn accept(&self) -> BoxFuture<'_, Result<(Self::Stream, String)>>;
}

/// Dials a fixed TCP address.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: SocketAddr,
}

impl TcpConnector {
    /// Create a connector for `addr`.
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    fn connect(&self) -> BoxFuture<'_, Result<TcpStream>> {
        Box::pin(async move {
            let stream = TcpStream::connect(self.addr)
                .await
                .map_err(|source| TapBridgeError::Dial {
                    addr: self.addr,
                    source,
                })?;
            configure(&stream);
            Ok(stream)
        })
    }

    fn describe(&self) -> String {
        self.addr.to_string()
    }
}

/// TCP listener bound to the tunnel address.
pub struct TcpAcceptor {
    listener: TcpListener,
    addr: SocketAddr,
}

impl TcpAcceptor {
    /// Bind the listening endpoint.
    ///
    /// # Errors
    ///
    /// Returns `Listen` if the address cannot be bound; this is terminal for
    /// the server role.
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TapBridgeError::Listen { addr, source })?;
        let addr = listener.local_addr().unwrap_or(addr);

        Ok(Self { listener, addr })
    }

    /// Get the bound address (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Acceptor for TcpAcceptor {
    type Stream = TcpStream;

    fn accept(&self) -> BoxFuture<'_, Result<(TcpStream, String)>> {
        Box::pin(async move {
            let (stream, peer) = self
                .listener
                .accept()
                .await
                .map_err(TapBridgeError::Accept)?;
            configure(&stream);
            Ok((stream, peer.to_string()))
        })
    }
}

/// Frames are small and latency-sensitive; don't let Nagle batch them.
fn configure(stream: &TcpStream) {
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!("set_nodelay failed: {}", e);
    }
}
