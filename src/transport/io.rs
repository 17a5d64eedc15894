//! Exact-count reads and writes over a byte stream.
//!
//! A single `read`/`write` on a stream may transfer fewer bytes than asked
//! for. These helpers loop over the remaining region until the whole range is
//! transferred, so the framing above never sees fragmentation.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, TapBridgeError};

/// Fill `buf` completely from `reader`.
///
/// End of stream before `buf` is full is an error, never a short success.
///
/// # Errors
///
/// Returns `ConnectionRead` on the first failed read or on EOF.
pub async fn read_exact<R>(reader: &mut R, buf: &mut [u8]) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;

    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await {
            Ok(0) => {
                return Err(TapBridgeError::ConnectionRead(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("stream closed after {} of {} bytes", filled, buf.len()),
                )));
            }
            Ok(n) => filled += n,
            Err(e) => return Err(TapBridgeError::ConnectionRead(e)),
        }
    }

    Ok(())
}

/// Write all of `buf` to `writer`, then flush.
///
/// # Errors
///
/// Returns `ConnectionWrite` on the first failed write, or if the stream
/// stops accepting bytes.
pub async fn write_exact<W>(writer: &mut W, buf: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;

    while written < buf.len() {
        match writer.write(&buf[written..]).await {
            Ok(0) => {
                return Err(TapBridgeError::ConnectionWrite(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "write returned 0",
                )));
            }
            Ok(n) => written += n,
            Err(e) => return Err(TapBridgeError::ConnectionWrite(e)),
        }
    }

    writer.flush().await.map_err(TapBridgeError::ConnectionWrite)
}
