//! # vitals-server
//!
//! The fanout hub of the vitals pipeline:
//! - [`broadcast::Broadcaster`] - single-writer state mutation + fanout
//! - [`registry::ViewerRegistry`] - connected viewer sessions
//! - [`server::VitalsServer`] - the WebSocket server viewers connect to

pub mod broadcast;
pub mod registry;
pub mod server;
pub mod subscription;

pub use broadcast::Broadcaster;
pub use registry::{ViewerRegistry, SESSION_QUEUE_CAPACITY};
pub use server::{ServerConfig, ServerEvent, VitalsServer};
pub use subscription::ChannelSet;
