//! Append-only JSONL persistence sink.
//!
//! One normalized reading per line, written synchronously under a mutex.
//! The ingest path treats append failures as non-fatal, so a full disk
//! degrades to warnings rather than stopping fanout.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use vitals_core::{PersistenceError, Reading, ReadingSink};

pub struct JsonlSink {
    file: Mutex<File>,
}

impl JsonlSink {
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl ReadingSink for JsonlSink {
    fn append(&self, reading: &Reading) -> Result<(), PersistenceError> {
        let line = serde_json::to_string(reading)
            .map_err(|e| PersistenceError::Write(e.to_string()))?;
        let mut file = self
            .file
            .lock()
            .map_err(|_| PersistenceError::Unavailable("sink lock poisoned".to_string()))?;
        writeln!(file, "{line}").map_err(|e| PersistenceError::Write(e.to_string()))?;
        Ok(())
    }
}
