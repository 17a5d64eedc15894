//! Transport module - the TCP side of the bridge.
//!
//! Provides:
//! - exact-count stream I/O ([`read_exact`], [`write_exact`])
//! - dial/accept seams and their TCP implementations

mod io;
mod tcp;

pub use io::{read_exact, write_exact};
pub use tcp::{Acceptor, Connector, TcpAcceptor, TcpConnector, DEFAULT_ADDRESS};
