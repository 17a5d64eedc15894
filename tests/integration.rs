//! Integration tests for tapbridge.
//!
//! These tests drive whole sessions and supervisors through the public API,
//! using in-memory devices and either real loopback TCP or scripted streams.

use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::sync::mpsc;
use tokio::time::{timeout, Instant};

use tapbridge::device::MemoryDevice;
use tapbridge::protocol::{build_frame, HEADER_SIZE};
use tapbridge::transport::{Acceptor, Connector, TcpAcceptor, TcpConnector};
use tapbridge::{BoxFuture, Config, Result, Supervisor, TapBridgeError};

/// A minimal Ethernet frame: broadcast destination, ARP ethertype, padding.
fn ethernet_frame(tag: u8) -> Vec<u8> {
    let mut frame = vec![0xFF; 6];
    frame.extend_from_slice(&[0x02, 0, 0, 0, 0, tag]);
    frame.extend_from_slice(&[0x08, 0x06]);
    frame.resize(60, tag);
    frame
}

/// Connector that refuses or connects according to a script.
struct ScriptedConnector {
    script: Mutex<VecDeque<Option<DuplexStream>>>,
    attempts: Arc<Mutex<Vec<Instant>>>,
}

impl Connector for ScriptedConnector {
    type Stream = DuplexStream;

    fn connect(&self) -> BoxFuture<'_, Result<DuplexStream>> {
        self.attempts.lock().unwrap().push(Instant::now());
        let next = self.script.lock().unwrap().pop_front().flatten();

        Box::pin(async move {
            next.ok_or_else(|| TapBridgeError::Dial {
                addr: SocketAddr::from(([127, 0, 0, 1], 2000)),
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            })
        })
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

/// Acceptor fed from a channel; `None` entries become accept errors.
struct ChannelAcceptor {
    incoming: tokio::sync::Mutex<mpsc::UnboundedReceiver<Option<DuplexStream>>>,
    accepted: AtomicUsize,
}

impl Acceptor for ChannelAcceptor {
    type Stream = DuplexStream;

    fn accept(&self) -> BoxFuture<'_, Result<(DuplexStream, String)>> {
        Box::pin(async move {
            match self.incoming.lock().await.recv().await {
                Some(Some(stream)) => {
                    let n = self.accepted.fetch_add(1, Ordering::Relaxed) + 1;
                    Ok((stream, format!("peer-{}", n)))
                }
                Some(None) => Err(TapBridgeError::Accept(io::Error::from(
                    io::ErrorKind::ConnectionAborted,
                ))),
                None => std::future::pending().await,
            }
        })
    }
}

#[tokio::test]
async fn test_frames_cross_a_loopback_tunnel() {
    let acceptor = TcpAcceptor::bind("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let addr = acceptor.local_addr();
    let config = Config {
        address: addr,
        dial_interval_secs: 0,
        ..Config::default()
    };

    let (server_dev, mut server_peer) = MemoryDevice::new("srv0");
    let (client_dev, mut client_peer) = MemoryDevice::new("cli0");

    let server = Supervisor::new(Arc::new(server_dev), &config);
    let client = Supervisor::new(Arc::new(client_dev), &config);
    let server_task = tokio::spawn(async move { server.run_server(acceptor).await });
    let client_task =
        tokio::spawn(async move { client.run_client(TcpConnector::new(addr)).await });

    let outbound = ethernet_frame(1);
    client_peer.inject(outbound.clone());
    let arrived = timeout(Duration::from_secs(5), server_peer.next_written())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&arrived[..], &outbound[..]);

    let inbound = ethernet_frame(2);
    server_peer.inject(inbound.clone());
    let arrived = timeout(Duration::from_secs(5), client_peer.next_written())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&arrived[..], &inbound[..]);

    client_task.abort();
    server_task.abort();
}

#[tokio::test(start_paused = true)]
async fn test_client_redials_until_endpoint_accepts() {
    let (device, peer) = MemoryDevice::new("mem0");
    let (near, mut far) = duplex(4096);

    let attempts = Arc::new(Mutex::new(Vec::new()));
    let connector = ScriptedConnector {
        script: Mutex::new(VecDeque::from(vec![None, None, None, Some(near)])),
        attempts: attempts.clone(),
    };

    let start = Instant::now();
    let supervisor = Supervisor::new(Arc::new(device), &Config::default());
    let client = tokio::spawn(async move { supervisor.run_client(connector).await });

    // Only a live session can carry this frame to the far end.
    let frame = ethernet_frame(7);
    peer.inject(frame.clone());
    let mut buf = vec![0u8; HEADER_SIZE + frame.len()];
    far.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf[HEADER_SIZE..], &frame[..]);

    let offsets: Vec<Duration> = attempts
        .lock()
        .unwrap()
        .iter()
        .map(|t| t.duration_since(start))
        .collect();
    assert_eq!(offsets.len(), 4);
    for (i, offset) in offsets.iter().enumerate() {
        // Every attempt, failed or not, is preceded by a 5 second wait.
        let expected = Duration::from_secs(5 * (i as u64 + 1));
        assert!(*offset >= expected, "attempt {} at {:?}", i + 1, offset);
        assert!(*offset < expected + Duration::from_secs(1));
    }

    client.abort();
}

#[tokio::test(start_paused = true)]
async fn test_client_redials_after_session_ends() {
    let (device, mut peer) = MemoryDevice::new("mem0");
    let (first, first_far) = duplex(4096);
    let (second, mut second_far) = duplex(4096);
    drop(first_far);

    let attempts = Arc::new(Mutex::new(Vec::new()));
    let connector = ScriptedConnector {
        script: Mutex::new(VecDeque::from(vec![Some(first), Some(second)])),
        attempts: attempts.clone(),
    };

    let supervisor = Supervisor::new(Arc::new(device), &Config::default());
    let client = tokio::spawn(async move { supervisor.run_client(connector).await });

    // The first session dies at once; the second one must be live.
    second_far.write_all(&build_frame(b"ping")).await.unwrap();
    assert_eq!(&peer.next_written().await.unwrap()[..], b"ping");

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(attempts.lock().unwrap().len(), 2);

    client.abort();
}

#[tokio::test]
async fn test_server_runs_concurrent_sessions_without_cross_talk() {
    let (device, mut peer) = MemoryDevice::new("mem0");
    let (tx, rx) = mpsc::unbounded_channel();
    let acceptor = ChannelAcceptor {
        incoming: tokio::sync::Mutex::new(rx),
        accepted: AtomicUsize::new(0),
    };

    let (a_near, mut a_far) = duplex(4096);
    let (b_near, mut b_far) = duplex(4096);
    tx.send(None).unwrap(); // an accept failure must not stop the loop
    tx.send(Some(a_near)).unwrap();
    tx.send(Some(b_near)).unwrap();

    let supervisor = Supervisor::new(Arc::new(device), &Config::default());
    let server = tokio::spawn(async move { supervisor.run_server(acceptor).await });

    a_far.write_all(&build_frame(b"a:1")).await.unwrap();
    b_far.write_all(&build_frame(b"b:1")).await.unwrap();

    let mut seen = vec![
        peer.next_written().await.unwrap(),
        peer.next_written().await.unwrap(),
    ];
    seen.sort();
    assert_eq!(&seen[0][..], b"a:1");
    assert_eq!(&seen[1][..], b"b:1");

    // Ending one session leaves the other relaying.
    drop(b_far);
    a_far.write_all(&build_frame(b"a:2")).await.unwrap();
    assert_eq!(&peer.next_written().await.unwrap()[..], b"a:2");

    server.abort();
}

#[tokio::test]
async fn test_desynchronized_peer_gets_disconnected() {
    let (device, mut peer) = MemoryDevice::new("mem0");
    let (tx, rx) = mpsc::unbounded_channel();
    let acceptor = ChannelAcceptor {
        incoming: tokio::sync::Mutex::new(rx),
        accepted: AtomicUsize::new(0),
    };

    let (near, mut far) = duplex(4096);
    tx.send(Some(near)).unwrap();

    let supervisor = Supervisor::new(Arc::new(device), &Config::default());
    let server = tokio::spawn(async move { supervisor.run_server(acceptor).await });

    far.write_all(&build_frame(b"good")).await.unwrap();
    far.write_all(&[0xFF, 0xFF, 0x00, 0x00]).await.unwrap();

    assert_eq!(&peer.next_written().await.unwrap()[..], b"good");

    // The session closes the stream instead of reading past the bad header.
    let mut rest = Vec::new();
    let n = timeout(Duration::from_secs(5), far.read_to_end(&mut rest))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(n, 0);
    assert!(peer.try_next_written().is_none());

    server.abort();
}
