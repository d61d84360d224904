//! retro-protocol
//!
//! Wire format for the retro board:
//! - JSON envelopes for inbound operations and outbound events
//! - handshake query parsing (`roomId`, `username`)

pub mod handshake;
pub mod json_codec;
pub mod wire_types;

pub use handshake::Handshake;
pub use json_codec::{decode_input, decode_output, encode_input, encode_output, ProtocolError};
pub use wire_types::{Envelope, WireEvent, WireInputType, WirePosition};
