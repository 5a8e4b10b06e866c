//! Persistence sink abstraction.
//!
//! Durable storage of readings is an external collaborator: the core only
//! knows an append-only interface. Sink failures are logged by callers and
//! never block or roll back the in-memory broadcast.

use crate::model::Reading;
use std::sync::Mutex;
use thiserror::Error;

/// Errors a persistence sink may report.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("sink write failed: {0}")]
    Write(String),
    #[error("sink unavailable: {0}")]
    Unavailable(String),
}

/// Append-only durable log of readings.
///
/// Implementations must be cheap to call from the ingest path; anything
/// slow belongs behind a queue inside the implementation.
pub trait ReadingSink: Send + Sync {
    fn append(&self, reading: &Reading) -> Result<(), PersistenceError>;
}

/// Sink that discards everything. Used when persistence is disabled.
#[derive(Debug, Default)]
pub struct NullSink;

impl ReadingSink for NullSink {
    fn append(&self, _reading: &Reading) -> Result<(), PersistenceError> {
        Ok(())
    }
}

/// In-memory sink for tests and diagnostics.
#[derive(Debug, Default)]
pub struct MemorySink {
    readings: Mutex<Vec<Reading>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn readings(&self) -> Vec<Reading> {
        self.readings.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl ReadingSink for MemorySink {
    fn append(&self, reading: &Reading) -> Result<(), PersistenceError> {
        self.readings
            .lock()
            .map_err(|e| PersistenceError::Unavailable(e.to_string()))?
            .push(reading.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_appends() {
        let sink = MemorySink::new();
        let reading = Reading {
            heart_rate: Some(72),
            timestamp: 1,
            ..Default::default()
        };
        sink.append(&reading).unwrap();
        assert_eq!(sink.readings().len(), 1);
        assert_eq!(sink.readings()[0].heart_rate, Some(72));
    }

    #[test]
    fn test_null_sink_accepts_everything() {
        let sink = NullSink;
        assert!(sink.append(&Reading::default()).is_ok());
    }
}
