//! Protocol module - wire format for relayed frames.
//!
//! A wire message is a 4-byte Big Endian length followed by exactly that many
//! payload bytes. Payloads are opaque Ethernet frames.

mod wire_format;

pub use wire_format::{
    build_frame, decode_header, encode_header, encode_header_into, validate_length, BUFFER_SIZE,
    HEADER_SIZE, MAX_FRAME_SIZE,
};
