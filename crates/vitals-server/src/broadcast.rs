//! The Broadcaster: single logical owner of state mutation.
//!
//! All ingestion adapters serialize through [`Broadcaster::ingest`]. Each
//! call takes one short write-lock on the store (no I/O held under it),
//! then fans the reading out through the viewer registry. Zero active
//! sessions is not an error - state and history still update.

use tokio::sync::RwLock;
use tracing::debug;
use vitals_core::{Metric, Reading, SensorState, SensorStore, TimedValue};

use crate::registry::ViewerRegistry;

/// Fanout hub owning the sensor store and the viewer registry.
#[derive(Default)]
pub struct Broadcaster {
    store: RwLock<SensorStore>,
    registry: ViewerRegistry,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &ViewerRegistry {
        &self.registry
    }

    /// Ingest one normalized reading: update slots and history for every
    /// present field, then publish to subscribed sessions.
    pub async fn ingest(&self, reading: Reading) {
        if reading.is_empty() {
            debug!("empty reading, nothing to apply");
            return;
        }

        {
            let mut store = self.store.write().await;
            store.apply(&reading);
        }

        self.registry.publish(&reading).await;
    }

    /// Current snapshot of all metric slots.
    pub async fn snapshot(&self) -> SensorState {
        self.store.read().await.snapshot()
    }

    /// Bounded history for one metric, oldest first.
    pub async fn history(&self, metric: Metric) -> Vec<TimedValue> {
        self.store.read().await.history(metric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::ChannelSet;
    use crate::registry::SESSION_QUEUE_CAPACITY;
    use tokio::sync::mpsc;
    use uuid::Uuid;
    use vitals_protocol::ServerMessage;

    fn reading(heart_rate: Option<i64>, spo2: Option<i64>) -> Reading {
        Reading {
            heart_rate,
            spo2,
            timestamp: vitals_core::now_millis(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_ingest_updates_state_without_sessions() {
        let broadcaster = Broadcaster::new();
        broadcaster.ingest(reading(Some(72), Some(98))).await;

        let snapshot = broadcaster.snapshot().await;
        assert_eq!(snapshot.heart_rate, Some(72));
        assert_eq!(snapshot.spo2, Some(98));
        assert_eq!(broadcaster.history(Metric::HeartRate).await.len(), 1);
    }

    #[tokio::test]
    async fn test_ingest_partial_leaves_other_slots() {
        let broadcaster = Broadcaster::new();
        broadcaster.ingest(reading(Some(72), Some(98))).await;
        broadcaster.ingest(reading(None, Some(97))).await;

        let snapshot = broadcaster.snapshot().await;
        assert_eq!(snapshot.heart_rate, Some(72));
        assert_eq!(snapshot.spo2, Some(97));
    }

    #[tokio::test]
    async fn test_ingest_fans_out_to_sessions() {
        let broadcaster = Broadcaster::new();
        let (tx, mut rx) = mpsc::channel(SESSION_QUEUE_CAPACITY);
        broadcaster
            .registry()
            .subscribe(Uuid::new_v4(), ChannelSet::all(), tx)
            .await;

        broadcaster.ingest(reading(Some(72), None)).await;

        match rx.recv().await.unwrap() {
            ServerMessage::VitalsUpdate(r) => assert_eq!(r.heart_rate, Some(72)),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_reading_is_noop_fanout() {
        let broadcaster = Broadcaster::new();
        let (tx, mut rx) = mpsc::channel(SESSION_QUEUE_CAPACITY);
        broadcaster
            .registry()
            .subscribe(Uuid::new_v4(), ChannelSet::all(), tx)
            .await;

        broadcaster
            .ingest(Reading {
                timestamp: 1,
                ..Default::default()
            })
            .await;

        assert!(rx.try_recv().is_err());
    }
}
