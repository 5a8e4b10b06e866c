//! # vitals-core
//!
//! Core data model, normalizer and state store for the vitals server.
//!
//! This crate provides:
//! - Data model types (Metric, CandidateReading, Reading, SensorState)
//! - The sentinel/range normalizer every transport routes through
//! - In-memory current-state store with bounded per-metric history
//! - External collaborator traits (persistence sink, auth gate)
//!
//! This crate is intentionally runtime-agnostic and contains no async code,
//! so adapters and servers on any runtime can share one fault-handling
//! policy.

pub mod auth;
pub mod model;
pub mod normalize;
pub mod sink;
pub mod store;

pub use auth::{AuthError, AuthGate, Credentials, Identity, SessionToken};
pub use model::{now_millis, CandidateReading, FingerValue, Metric, Reading, SensorState};
pub use normalize::{normalize, FAULT_SENTINEL};
pub use sink::{MemorySink, NullSink, PersistenceError, ReadingSink};
pub use store::{HistoryRing, SensorStore, TimedValue, HISTORY_CAPACITY};
