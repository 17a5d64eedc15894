//! Wire format encoding and decoding.
//!
//! Every Ethernet frame travels as one wire message:
//! ```text
//! ┌──────────┬─────────────────┐
//! │ Length   │ Payload         │
//! │ 4 bytes  │ Length bytes    │
//! │ uint32 BE│                 │
//! └──────────┴─────────────────┘
//! ```
//!
//! The length is always Big Endian regardless of host byte order. There is no
//! version byte and no size negotiation: both peers must agree on
//! [`BUFFER_SIZE`].

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, TapBridgeError};

/// Header size in bytes (fixed, exactly 4).
pub const HEADER_SIZE: usize = 4;

/// Size of the per-direction relay buffer, header included.
pub const BUFFER_SIZE: usize = 1600;

/// Largest payload a peer may declare.
pub const MAX_FRAME_SIZE: usize = BUFFER_SIZE - HEADER_SIZE;

/// Encode a payload length into a 4-byte header (Big Endian).
///
/// # Example
///
/// ```
/// use tapbridge::protocol::encode_header;
///
/// assert_eq!(encode_header(0x0102_0304), [1, 2, 3, 4]);
/// ```
#[inline]
pub fn encode_header(payload_length: u32) -> [u8; HEADER_SIZE] {
    payload_length.to_be_bytes()
}

/// Encode a payload length into the first 4 bytes of `buf`.
///
/// # Panics
///
/// Panics if buffer is smaller than `HEADER_SIZE` (4 bytes).
#[inline]
pub fn encode_header_into(buf: &mut [u8], payload_length: u32) {
    buf[..HEADER_SIZE].copy_from_slice(&encode_header(payload_length));
}

/// Decode a payload length from a 4-byte header.
///
/// Any input decodes; checking against [`MAX_FRAME_SIZE`] is done by
/// [`validate_length`].
#[inline]
pub fn decode_header(header: [u8; HEADER_SIZE]) -> u32 {
    u32::from_be_bytes(header)
}

/// Check a declared payload length against the receive capacity.
///
/// Returns the length as `usize` so the caller can slice with it.
pub fn validate_length(payload_length: u32, max_payload_size: usize) -> Result<usize> {
    let length = payload_length as usize;
    if length > max_payload_size {
        return Err(TapBridgeError::FrameTooLarge {
            length: payload_length,
            max: max_payload_size,
        });
    }
    Ok(length)
}

/// Build a complete wire message (header + payload) in a fresh buffer.
pub fn build_frame(payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    buf.put_u32(payload.len() as u32);
    buf.put_slice(payload);
    buf.freeze()
}
