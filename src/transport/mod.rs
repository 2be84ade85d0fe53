//! Publish/subscribe transport.
//!
//! ```text
//!  back office ──┐                 ┌── drone engine
//!                ▼                 ▼
//!         ┌─────────────────────────────┐
//!         │       Transport trait       │
//!         └──────────────┬──────────────┘
//!             ┌──────────┴──────────┐
//!             ▼                     ▼
//!       NatsTransport        MemoryTransport
//!       (broker)             (same process)
//! ```
//!
//! Handlers run on the subscription's own task and must only hand the payload
//! off (to a [`KeyedExecutor`](crate::runtime::KeyedExecutor) queue or a
//! channel); they never block.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::protocol::{encode, CodecError, WireMessage};

pub mod memory;
pub mod nats;

pub use memory::{MemoryBroker, MemoryTransport};
pub use nats::NatsTransport;

/// Callback receiving the raw payload of every message on a subscribed topic.
pub type MessageHandler = Arc<dyn Fn(Vec<u8>) + Send + Sync>;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport is not connected")]
    NotConnected,
    #[error("broker error: {0}")]
    Broker(String),
    #[error(transparent)]
    Encode(#[from] CodecError),
}

// ========== Transport Trait ==========

#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;

    /// Fire-and-forget publish; a failure is reported, never retried.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Subscribing to a topic that already has a handler replaces it.
    async fn subscribe(&self, topic: &str, handler: MessageHandler) -> Result<(), TransportError>;

    /// Unknown topics are ignored.
    async fn unsubscribe(&self, topic: &str) -> Result<(), TransportError>;

    /// Drops every subscription and disconnects.
    async fn close(&self) -> Result<(), TransportError>;
}

/// Encodes `message` and publishes it on `topic`.
pub async fn publish_message<T: WireMessage>(transport: &dyn Transport, topic: &str, message: &T) -> Result<(), TransportError> {
    let payload = encode(message)?;
    transport.publish(topic, payload).await
}

/// Like [`publish_message`] but for callers with nobody to report to: the
/// failure is logged.
pub async fn publish_or_log<T: WireMessage>(transport: &dyn Transport, topic: &str, message: &T) {
    if let Err(e) = publish_message(transport, topic, message).await {
        tracing::warn!(topic = %topic, error = %e, "Publish failed");
    }
}
