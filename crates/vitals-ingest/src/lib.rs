//! # vitals-ingest
//!
//! Ingestion adapters, one per transport. Each adapter is a pure mapping
//! from transport bytes/objects to candidate readings; none of them
//! broadcasts. All candidates route through `vitals_core::normalize`
//! before the Broadcaster sees them, so fault handling is identical
//! regardless of transport.
//!
//! - [`line::LineAdapter`] - newline-delimited serial/USB text
//! - [`push::parse_push`] - structured push payloads (HTTP and socket)
//! - [`pubsub::PubSubAdapter`] - broker messages, with persistence append

pub mod line;
pub mod pubsub;
pub mod push;

pub use line::LineAdapter;
pub use pubsub::PubSubAdapter;
pub use push::parse_push;

use thiserror::Error;

/// A malformed transport payload. Logged and discarded by callers; never
/// terminates the stream that produced it.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Neither the structured parse nor the CSV fallback accepted the line.
    #[error("unparseable payload: {0:?}")]
    Unparseable(String),

    /// A CSV fallback token failed strict numeric parsing.
    #[error("malformed numeric token {token:?} in CSV fallback")]
    BadNumber { token: String },

    /// Unframed input exceeded the line buffer cap.
    #[error("discarded {0} buffered bytes without a line delimiter")]
    LineTooLong(usize),

    /// Structured payload was JSON but not an object of recognized shape.
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),
}
