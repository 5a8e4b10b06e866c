//! # vitals-protocol
//!
//! Wire message types and codec for the vitals WebSocket stream.
//!
//! This crate defines the JSON messages exchanged between the server,
//! viewer clients, and devices pushing over a socket.

pub mod codec;
pub mod messages;

pub use codec::{decode_client_message, encode_server_message, CodecError};
pub use messages::*;
