//! Session - one connection relayed to the shared device.
//!
//! A session splits its stream, starts both pumps as independent tasks and
//! waits on a two-slot completion gate:
//!
//! 1. the first pump to stop (error or end of stream) posts its exit
//! 2. the session closes the connection, which unblocks the other pump
//! 3. the other pump posts its exit
//! 4. the stream is dropped and the session returns both exits
//!
//! Nothing outlives the session: when [`Session::run`] returns, both tasks
//! have finished and the connection is closed.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::DEFAULT_NOT_READY_BACKOFF;
use crate::device::FrameDevice;
use crate::error::TapBridgeError;
use crate::pump::{run_device_to_transport, run_transport_to_device, Direction, PumpExit};

/// Number of pumps per session, and slots in the completion gate.
const PUMPS: usize = 2;

/// One connection bound to the shared device.
pub struct Session<S, D: ?Sized> {
    stream: S,
    device: Arc<D>,
    not_ready_backoff: Duration,
    label: String,
}

/// Both pump exits, in the order the pumps stopped.
#[derive(Debug)]
pub struct SessionSummary {
    pub label: String,
    pub exits: Vec<PumpExit>,
}

impl SessionSummary {
    /// The exit that ended the session.
    pub fn first(&self) -> Option<&PumpExit> {
        self.exits.first()
    }

    /// Exit of the pump running in `direction`.
    pub fn exit(&self, direction: Direction) -> Option<&PumpExit> {
        self.exits.iter().find(|e| e.direction == direction)
    }

    /// Total frames relayed in both directions.
    pub fn total_frames(&self) -> u64 {
        self.exits.iter().map(|e| e.stats.frames).sum()
    }
}

impl<S, D> Session<S, D>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
    D: FrameDevice + ?Sized,
{
    /// Create a session for `stream` on `device`.
    pub fn new(stream: S, device: Arc<D>) -> Self {
        Self {
            stream,
            device,
            not_ready_backoff: DEFAULT_NOT_READY_BACKOFF,
            label: String::from("session"),
        }
    }

    /// Set the wait after a not-ready device read.
    pub fn not_ready_backoff(mut self, backoff: Duration) -> Self {
        self.not_ready_backoff = backoff;
        self
    }

    /// Set the name used in log lines (usually the peer address).
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Relay until either direction stops, then shut the other down.
    ///
    /// Returns once both pumps have finished and the connection is closed.
    pub async fn run(self) -> SessionSummary {
        let Session {
            stream,
            device,
            not_ready_backoff,
            label,
        } = self;

        tracing::info!("Session {} started on {}", label, device.name());

        let (reader, writer) = tokio::io::split(stream);
        let closed = CancellationToken::new();
        let (done_tx, mut done_rx) = mpsc::channel::<PumpExit>(PUMPS);

        {
            let device = device.clone();
            let closed = closed.clone();
            let done = done_tx.clone();
            tokio::spawn(async move {
                let exit =
                    run_device_to_transport(&*device, writer, not_ready_backoff, &closed).await;
                let _ = done.send(exit).await;
            });
        }

        {
            let device = device.clone();
            let closed = closed.clone();
            let done = done_tx;
            tokio::spawn(async move {
                let exit = run_transport_to_device(&*device, reader, &closed).await;
                let _ = done.send(exit).await;
            });
        }

        let mut exits = Vec::with_capacity(PUMPS);

        if let Some(first) = done_rx.recv().await {
            report(&label, &first);
            exits.push(first);
        }

        // Closing is the only cancellation path: the sibling sees it and exits.
        closed.cancel();

        // `None` only if a pump task died without posting; its half is dropped either way.
        while let Some(exit) = done_rx.recv().await {
            report(&label, &exit);
            exits.push(exit);
        }

        if exits.len() < PUMPS {
            tracing::error!("Session {}: a pump task ended without reporting", label);
        }

        let summary = SessionSummary { label, exits };
        tracing::info!(
            "Session {} ended after {} frames",
            summary.label,
            summary.total_frames()
        );
        summary
    }
}

fn report(label: &str, exit: &PumpExit) {
    let PumpExit {
        direction,
        stats,
        cause,
    } = exit;

    match cause {
        TapBridgeError::ConnectionClosed => {
            tracing::debug!("Session {}: {} stopped by close", label, direction)
        }
        TapBridgeError::ConnectionRead(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            tracing::info!(
                "Session {}: peer closed the connection, {} relayed {} frames / {} bytes",
                label,
                direction,
                stats.frames,
                stats.bytes
            )
        }
        _ => tracing::error!(
            "Session {}: {} failed after {} frames: {}",
            label,
            direction,
            stats.frames,
            cause
        ),
    }
}
