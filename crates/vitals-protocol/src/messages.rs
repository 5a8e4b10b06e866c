//! Protocol message types for WebSocket communication.
//!
//! Two directions:
//! - Client → Server: subscribe/unsubscribe, history requests, and device
//!   push (`sensorData`/`healthData`). Untagged - the message type is
//!   determined by which key is present.
//! - Server → Client: `{"type": ..., "data": ...}` envelopes, one event
//!   type per metric channel plus `vitalsUpdate`, `historicalData` and
//!   the connect-time `hello`.

use serde::{Deserialize, Serialize};
use vitals_core::{CandidateReading, Reading, TimedValue};

/// Messages received from a connected client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClientMessage {
    /// Subscribe to the listed channels ("all" subscribes to everything).
    Subscribe { subscribe: Vec<String> },

    /// Unsubscribe from the listed channels.
    Unsubscribe { unsubscribe: Vec<String> },

    /// Request one bounded batch of a channel's history ring.
    History {
        #[serde(rename = "requestHistory")]
        request_history: String,
    },

    /// Device push: a raw candidate reading over the socket.
    SensorData {
        #[serde(rename = "sensorData")]
        sensor_data: CandidateReading,
    },

    /// Device push, alternate event name used by older firmware.
    HealthData {
        #[serde(rename = "healthData")]
        health_data: CandidateReading,
    },
}

/// One bounded batch of a channel's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryBatch {
    pub channel: String,
    pub samples: Vec<TimedValue>,
}

/// Hello message sent by the server immediately on connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloMessage {
    /// Server name identifier.
    pub name: String,

    /// Protocol version.
    pub version: String,

    /// Current server timestamp in ISO 8601 format.
    pub timestamp: String,
}

impl HelloMessage {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        }
    }
}

/// Messages sent from server to client.
///
/// Serialized as `{"type": "<event>", "data": <payload>}`. The per-metric
/// variants carry just that metric's current value; slot values may be
/// null for late-join snapshots of never-reported metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    #[serde(rename = "hello")]
    Hello(HelloMessage),

    #[serde(rename = "heartRate")]
    HeartRate(Option<i64>),

    #[serde(rename = "spo2")]
    Spo2(Option<i64>),

    #[serde(rename = "temperature")]
    Temperature(Option<f64>),

    #[serde(rename = "temperatureF")]
    TemperatureF(Option<f64>),

    #[serde(rename = "status")]
    Status(Option<String>),

    /// Derived finger-absence event: true when no finger is detected.
    #[serde(rename = "fingerNotDetected")]
    FingerNotDetected(bool),

    /// Combined update carrying a full or partial reading.
    #[serde(rename = "vitalsUpdate")]
    VitalsUpdate(Reading),

    #[serde(rename = "historicalData")]
    HistoricalData(HistoryBatch),
}
