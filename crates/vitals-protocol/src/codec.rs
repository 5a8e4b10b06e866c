//! WebSocket message codec.
//!
//! All protocol messages are JSON over WebSocket text frames. This module
//! provides encoding and decoding utilities with a shared error type.

use crate::messages::{ClientMessage, ServerMessage};
use thiserror::Error;

/// Errors that can occur during message encoding/decoding.
#[derive(Debug, Error)]
pub enum CodecError {
    /// JSON serialization or deserialization failed.
    #[error("failed to (de)serialize message: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Encode a server message to a JSON string for transmission.
pub fn encode_server_message(msg: &ServerMessage) -> Result<String, CodecError> {
    serde_json::to_string(msg).map_err(CodecError::from)
}

/// Decode a client message from a JSON string received over WebSocket.
pub fn decode_client_message(text: &str) -> Result<ClientMessage, CodecError> {
    serde_json::from_str(text).map_err(CodecError::from)
}
