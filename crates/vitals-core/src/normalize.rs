//! Sentinel and range normalization.
//!
//! Every adapter routes candidates through [`normalize`] before the
//! Broadcaster sees a Reading, so one fault-handling policy applies
//! regardless of transport. Rules apply independently per field:
//!
//! - the fault sentinel (`-10000`) maps to absent, never to zero
//! - `fingerDetected` on the numeric channel: sentinel means "no finger"
//!   (`Some(false)`), any other non-zero integer means present; a boolean
//!   passes through unchanged
//! - `spo2` outside [0, 100] is dropped and logged as a data-quality
//!   event, not a hard failure
//! - absent fields stay absent - zero is a legitimate reading value and
//!   must remain distinguishable from "not reported"

use crate::model::{now_millis, CandidateReading, FingerValue, Reading};
use tracing::warn;

/// The reserved out-of-range integer devices emit on sensor failure.
pub const FAULT_SENTINEL: i64 = -10000;

/// Valid SpO2 range in percent.
const SPO2_RANGE: std::ops::RangeInclusive<i64> = 0..=100;

/// Clean a candidate into a validated Reading, stamping ingestion time.
pub fn normalize(candidate: CandidateReading) -> Reading {
    Reading {
        heart_rate: clean_int(candidate.heart_rate, "heartRate"),
        spo2: clean_spo2(candidate.spo2),
        temperature_c: clean_float(candidate.temperature_c, "temperatureC"),
        temperature_f: clean_float(candidate.temperature_f, "temperatureF"),
        finger_detected: clean_finger(candidate.finger_detected),
        status: candidate.status,
        timestamp: now_millis(),
    }
}

fn clean_int(value: Option<i64>, field: &str) -> Option<i64> {
    match value {
        Some(FAULT_SENTINEL) => {
            warn!(field, "sensor fault sentinel, treating as absent");
            None
        }
        other => other,
    }
}

fn clean_spo2(value: Option<i64>) -> Option<i64> {
    match clean_int(value, "spo2") {
        Some(v) if !SPO2_RANGE.contains(&v) => {
            warn!(value = v, "spo2 out of range [0,100], treating as absent");
            None
        }
        other => other,
    }
}

fn clean_float(value: Option<f64>, field: &str) -> Option<f64> {
    match value {
        Some(v) if v == FAULT_SENTINEL as f64 => {
            warn!(field, "sensor fault sentinel, treating as absent");
            None
        }
        Some(v) if !v.is_finite() => {
            warn!(field, value = v, "non-finite value, treating as absent");
            None
        }
        other => other,
    }
}

/// Finger presence convention: a boolean passes through; on the numeric
/// channel the sentinel (and zero) mean "no finger", anything else means
/// a finger is present.
fn clean_finger(value: Option<FingerValue>) -> Option<bool> {
    match value {
        Some(FingerValue::Flag(b)) => Some(b),
        Some(FingerValue::Raw(FAULT_SENTINEL)) => Some(false),
        Some(FingerValue::Raw(n)) => Some(n != 0),
        None => None,
    }
}
