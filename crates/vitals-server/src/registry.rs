//! Viewer connection registry.
//!
//! Tracks connected viewer sessions and fans updates out to them. Each
//! session owns a bounded message queue; delivery is `try_send` so a slow
//! or blocked viewer drops its own messages instead of stalling ingestion
//! or other viewers. Unsubscribing is idempotent, and publishing to a
//! removed session id is a silent no-op.

use std::collections::HashMap;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;
use vitals_core::Reading;
use vitals_protocol::ServerMessage;

use crate::subscription::{update_messages, ChannelSet};

/// Per-session outbound queue depth. A session further behind than this
/// starts losing updates (it can always resync from the snapshot).
pub const SESSION_QUEUE_CAPACITY: usize = 64;

/// One connected viewer session.
struct ViewerSession {
    channels: ChannelSet,
    tx: mpsc::Sender<ServerMessage>,
}

/// Registry of connected viewer sessions.
#[derive(Default)]
pub struct ViewerRegistry {
    sessions: RwLock<HashMap<Uuid, ViewerSession>>,
}

impl ViewerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session with its subscribed channels and outbound queue.
    pub async fn subscribe(
        &self,
        id: Uuid,
        channels: ChannelSet,
        tx: mpsc::Sender<ServerMessage>,
    ) {
        self.sessions
            .write()
            .await
            .insert(id, ViewerSession { channels, tx });
        debug!(session = %id, "viewer session registered");
    }

    /// Replace a session's channel set. No-op for unknown sessions.
    pub async fn set_channels(&self, id: Uuid, channels: ChannelSet) {
        if let Some(session) = self.sessions.write().await.get_mut(&id) {
            session.channels = channels;
        }
    }

    /// Remove a session. Idempotent: removing twice is a no-op.
    pub async fn unsubscribe(&self, id: Uuid) {
        if self.sessions.write().await.remove(&id).is_some() {
            debug!(session = %id, "viewer session removed");
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Fan a reading out to every matching session, fire-and-forget.
    pub async fn publish(&self, reading: &Reading) {
        let sessions = self.sessions.read().await;
        for (id, session) in sessions.iter() {
            for msg in update_messages(reading, &session.channels) {
                match session.tx.try_send(msg) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!(session = %id, "viewer queue full, dropping update");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        // Connection already gone; cleanup happens on
                        // unsubscribe.
                        debug!(session = %id, "viewer queue closed");
                    }
                }
            }
        }
    }
}
