//! Structured push-payload adapter.
//!
//! Shared by the HTTP push endpoint and the socket push events: one JSON
//! object per call, every declared field optional, unknown fields ignored.
//! A payload with zero recognized fields yields an empty candidate (a
//! no-op update downstream) rather than an error.

use crate::ParseError;
use vitals_core::CandidateReading;

/// Map one structured payload to a candidate reading.
pub fn parse_push(body: &serde_json::Value) -> Result<CandidateReading, ParseError> {
    if !body.is_object() {
        return Err(ParseError::Unparseable(body.to_string()));
    }
    serde_json::from_value(body.clone()).map_err(ParseError::from)
}
