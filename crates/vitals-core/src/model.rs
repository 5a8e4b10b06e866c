//! Vitals data model types.
//!
//! These types represent the canonical structures flowing through the
//! pipeline:
//! - `CandidateReading` - transport-parsed, not yet sentinel-cleaned
//! - `Reading` - normalized sample with optional per-metric fields
//! - `SensorState` - the current-value snapshot, one slot per metric
//! - `Metric` - the set of channels a viewer can subscribe to

use serde::{Deserialize, Serialize};

/// The metrics tracked by the server, one per channel.
///
/// `channel()` returns the wire name used in subscriptions and outbound
/// events; note that `TemperatureC` is published on the `temperature`
/// channel for compatibility with existing viewers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    HeartRate,
    Spo2,
    TemperatureC,
    TemperatureF,
    FingerDetected,
    Status,
}

impl Metric {
    /// All metrics, in canonical order.
    pub const ALL: [Metric; 6] = [
        Metric::HeartRate,
        Metric::Spo2,
        Metric::TemperatureC,
        Metric::TemperatureF,
        Metric::FingerDetected,
        Metric::Status,
    ];

    /// The wire channel name for this metric.
    pub fn channel(&self) -> &'static str {
        match self {
            Metric::HeartRate => "heartRate",
            Metric::Spo2 => "spo2",
            Metric::TemperatureC => "temperature",
            Metric::TemperatureF => "temperatureF",
            Metric::FingerDetected => "fingerDetected",
            Metric::Status => "status",
        }
    }

    /// Look up a metric by its wire channel name.
    pub fn from_channel(channel: &str) -> Option<Metric> {
        Metric::ALL.iter().copied().find(|m| m.channel() == channel)
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.channel())
    }
}

/// A finger-presence field as it arrives off the wire.
///
/// Devices report finger presence either as a boolean or as a raw integer
/// on the sentinel channel (`-10000` meaning no finger detected). The
/// normalizer collapses both forms into `Option<bool>`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FingerValue {
    Flag(bool),
    Raw(i64),
}

/// A Reading-shaped structure whose fields have not yet been
/// sentinel-cleaned.
///
/// Every field is optional and unknown fields are ignored, so a payload
/// with zero recognized fields deserializes to an empty candidate rather
/// than failing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CandidateReading {
    pub heart_rate: Option<i64>,
    pub spo2: Option<i64>,
    pub temperature_c: Option<f64>,
    pub temperature_f: Option<f64>,
    pub finger_detected: Option<FingerValue>,
    pub status: Option<String>,
}

impl CandidateReading {
    /// True if no recognized field is present.
    pub fn is_empty(&self) -> bool {
        self.heart_rate.is_none()
            && self.spo2.is_none()
            && self.temperature_c.is_none()
            && self.temperature_f.is_none()
            && self.finger_detected.is_none()
            && self.status.is_none()
    }
}

/// One canonical normalized sensor sample.
///
/// Partial updates are legal: absent fields must not overwrite store slots.
/// After normalization no field carries a fault sentinel - sentinels become
/// absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Reading {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spo2: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_c: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_f: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finger_detected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Ingestion time, milliseconds since epoch.
    pub timestamp: u64,
}

impl Reading {
    /// True if no metric field is present.
    pub fn is_empty(&self) -> bool {
        self.present_metrics().is_empty()
    }

    /// The metrics that carry a value in this reading.
    pub fn present_metrics(&self) -> Vec<Metric> {
        let mut present = Vec::new();
        if self.heart_rate.is_some() {
            present.push(Metric::HeartRate);
        }
        if self.spo2.is_some() {
            present.push(Metric::Spo2);
        }
        if self.temperature_c.is_some() {
            present.push(Metric::TemperatureC);
        }
        if self.temperature_f.is_some() {
            present.push(Metric::TemperatureF);
        }
        if self.finger_detected.is_some() {
            present.push(Metric::FingerDetected);
        }
        if self.status.is_some() {
            present.push(Metric::Status);
        }
        present
    }

    /// The value of a metric as JSON, if present.
    pub fn value(&self, metric: Metric) -> Option<serde_json::Value> {
        match metric {
            Metric::HeartRate => self.heart_rate.map(|v| serde_json::json!(v)),
            Metric::Spo2 => self.spo2.map(|v| serde_json::json!(v)),
            Metric::TemperatureC => self.temperature_c.map(|v| serde_json::json!(v)),
            Metric::TemperatureF => self.temperature_f.map(|v| serde_json::json!(v)),
            Metric::FingerDetected => self.finger_detected.map(|v| serde_json::json!(v)),
            Metric::Status => self.status.as_ref().map(|v| serde_json::json!(v)),
        }
    }
}

/// Process-wide current snapshot, one slot per metric.
///
/// Slots hold the last normalized non-absent value, or `None` if never
/// set. Serialized with explicit nulls so a snapshot always shows every
/// slot. Mutated exclusively through the store owned by the Broadcaster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SensorState {
    pub heart_rate: Option<i64>,
    pub spo2: Option<i64>,
    pub temperature_c: Option<f64>,
    pub temperature_f: Option<f64>,
    pub finger_detected: Option<bool>,
    pub status: Option<String>,
}

impl SensorState {
    /// The current value of a metric slot as JSON (`Null` if unknown).
    pub fn value(&self, metric: Metric) -> serde_json::Value {
        match metric {
            Metric::HeartRate => serde_json::json!(self.heart_rate),
            Metric::Spo2 => serde_json::json!(self.spo2),
            Metric::TemperatureC => serde_json::json!(self.temperature_c),
            Metric::TemperatureF => serde_json::json!(self.temperature_f),
            Metric::FingerDetected => serde_json::json!(self.finger_detected),
            Metric::Status => serde_json::json!(self.status),
        }
    }
}

/// Current time in milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_channel_roundtrip() {
        for metric in Metric::ALL {
            assert_eq!(Metric::from_channel(metric.channel()), Some(metric));
        }
        assert_eq!(Metric::from_channel("bloodPressure"), None);
        assert_eq!(Metric::from_channel("temperature"), Some(Metric::TemperatureC));
    }

    #[test]
    fn test_candidate_deserialize_partial() {
        let candidate: CandidateReading =
            serde_json::from_str(r#"{"heartRate": 72, "spo2": 98}"#).unwrap();
        assert_eq!(candidate.heart_rate, Some(72));
        assert_eq!(candidate.spo2, Some(98));
        assert!(candidate.temperature_c.is_none());
        assert!(!candidate.is_empty());
    }

    #[test]
    fn test_candidate_ignores_unknown_fields() {
        let candidate: CandidateReading =
            serde_json::from_str(r#"{"heartRate": 72, "bloodPressure": "120/80"}"#).unwrap();
        assert_eq!(candidate.heart_rate, Some(72));
    }

    #[test]
    fn test_candidate_zero_recognized_fields_is_empty() {
        let candidate: CandidateReading =
            serde_json::from_str(r#"{"deviceId": "esp32-01"}"#).unwrap();
        assert!(candidate.is_empty());
    }

    #[test]
    fn test_finger_value_forms() {
        let flag: CandidateReading =
            serde_json::from_str(r#"{"fingerDetected": true}"#).unwrap();
        assert_eq!(flag.finger_detected, Some(FingerValue::Flag(true)));

        let raw: CandidateReading =
            serde_json::from_str(r#"{"fingerDetected": -10000}"#).unwrap();
        assert_eq!(raw.finger_detected, Some(FingerValue::Raw(-10000)));
    }

    #[test]
    fn test_reading_present_metrics() {
        let reading = Reading {
            heart_rate: Some(72),
            temperature_c: Some(36.5),
            timestamp: 1,
            ..Default::default()
        };
        assert_eq!(
            reading.present_metrics(),
            vec![Metric::HeartRate, Metric::TemperatureC]
        );
        assert!(!reading.is_empty());
        assert!(Reading::default().is_empty());
    }

    #[test]
    fn test_reading_serialize_skips_absent() {
        let reading = Reading {
            heart_rate: Some(0),
            timestamp: 1700000000000,
            ..Default::default()
        };
        let json = serde_json::to_string(&reading).unwrap();
        // Zero is a legitimate value and must survive serialization.
        assert!(json.contains("\"heartRate\":0"));
        assert!(!json.contains("spo2"));
    }

    #[test]
    fn test_sensor_state_serializes_all_slots() {
        let state = SensorState::default();
        let json = serde_json::to_value(&state).unwrap();
        assert!(json["heartRate"].is_null());
        assert!(json["fingerDetected"].is_null());
        assert!(json["status"].is_null());
    }
}
