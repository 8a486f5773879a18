use std::pin::Pin;

use bytes::Bytes;
use futures::Stream;

use crate::error::Result;

pub mod memory;
pub mod nats;

pub use self::memory::{MemoryBus, MemoryTransport};
pub use self::nats::{NatsTransport, NatsTransportBuilder};

/// Stream of payloads published on a subscribed topic
///
/// Ends when the subscription is torn down (transport closed or dropped).
pub type Subscription = Pin<Box<dyn Stream<Item = Bytes> + Send>>;

/// Transport trait for publishing and subscribing to topics
///
/// Each transport instance represents a single connection to the bus.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Publish bytes on a topic
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<()>;

    /// Subscribe to a topic
    async fn subscribe(&self, topic: &str) -> Result<Subscription>;

    /// Release the connection's resources
    ///
    /// Buffered publishes are flushed. Subscriptions end once their streams
    /// are dropped; transports that own their subscriptions may end them here.
    async fn close(&self) -> Result<()>;
}
