//! Publish/subscribe message adapter.
//!
//! One broker topic carries JSON-encoded readings. The adapter parses and
//! normalizes each message, appends the normalized reading to the
//! persistence sink, and hands the reading back for Broadcaster fanout.
//! A sink failure is logged and never blocks fanout.

use crate::{push::parse_push, ParseError};
use std::sync::Arc;
use tracing::warn;
use vitals_core::{normalize, Reading, ReadingSink};

/// Adapter for one pub/sub subscription.
pub struct PubSubAdapter {
    sink: Arc<dyn ReadingSink>,
}

impl PubSubAdapter {
    pub fn new(sink: Arc<dyn ReadingSink>) -> Self {
        Self { sink }
    }

    /// Handle one raw broker message.
    ///
    /// Returns the normalized reading for fanout; persistence is
    /// fire-and-forget from the caller's perspective.
    pub fn handle_message(&self, payload: &[u8]) -> Result<Reading, ParseError> {
        let body: serde_json::Value = serde_json::from_slice(payload)?;
        let candidate = parse_push(&body)?;
        let reading = normalize(candidate);

        if !reading.is_empty() {
            if let Err(e) = self.sink.append(&reading) {
                warn!(error = %e, "persistence append failed, continuing fanout");
            }
        }

        Ok(reading)
    }
}
