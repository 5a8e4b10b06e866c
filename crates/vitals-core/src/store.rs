//! In-memory sensor state store.
//!
//! The store holds the current value per metric plus a bounded recent
//! history ring per metric. It has a single-writer discipline: only the
//! Broadcaster mutates it, everyone else reads snapshots.

use crate::model::{Metric, Reading, SensorState};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Fixed capacity of each per-metric history ring.
pub const HISTORY_CAPACITY: usize = 100;

/// One timestamped historical value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedValue {
    pub value: serde_json::Value,
    pub timestamp: u64,
}

/// Fixed-capacity FIFO of recent timestamped values for one metric.
///
/// Append-only in steady state; once full, every insert evicts the oldest
/// entry.
#[derive(Debug, Clone, Default)]
pub struct HistoryRing {
    points: VecDeque<TimedValue>,
}

impl HistoryRing {
    pub fn push(&mut self, point: TimedValue) {
        if self.points.len() == HISTORY_CAPACITY {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Oldest-first copy of the ring contents.
    pub fn to_vec(&self) -> Vec<TimedValue> {
        self.points.iter().cloned().collect()
    }
}

/// Current-value-per-metric state plus per-metric history rings.
#[derive(Debug, Clone, Default)]
pub struct SensorStore {
    state: SensorState,
    rings: HashMap<Metric, HistoryRing>,
}

impl SensorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a normalized reading: present fields update their slots and
    /// append to their rings, absent fields leave their slots untouched.
    pub fn apply(&mut self, reading: &Reading) {
        if let Some(v) = reading.heart_rate {
            self.state.heart_rate = Some(v);
        }
        if let Some(v) = reading.spo2 {
            self.state.spo2 = Some(v);
        }
        if let Some(v) = reading.temperature_c {
            self.state.temperature_c = Some(v);
        }
        if let Some(v) = reading.temperature_f {
            self.state.temperature_f = Some(v);
        }
        if let Some(v) = reading.finger_detected {
            self.state.finger_detected = Some(v);
        }
        if let Some(ref v) = reading.status {
            self.state.status = Some(v.clone());
        }

        for metric in reading.present_metrics() {
            if let Some(value) = reading.value(metric) {
                self.rings.entry(metric).or_default().push(TimedValue {
                    value,
                    timestamp: reading.timestamp,
                });
            }
        }
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> SensorState {
        self.state.clone()
    }

    /// Oldest-first history for a metric (empty if never reported).
    pub fn history(&self, metric: Metric) -> Vec<TimedValue> {
        self.rings
            .get(&metric)
            .map(HistoryRing::to_vec)
            .unwrap_or_default()
    }
}
