use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;

use crate::codec::Codec;
use crate::error::Result;
use crate::transport::{NatsTransport, Subscription, Transport};

/// High-level channel for publishing envelopes and subscribing to topics
///
/// Combines a transport and codec. Cloning shares the underlying connection.
#[derive(Clone)]
pub struct Channel<C> {
    transport: Arc<dyn Transport>,
    codec: C,
}

impl<C: Codec> Channel<C> {
    /// Create a channel from an existing transport
    pub fn from_transport(transport: impl Transport + 'static, codec: C) -> Self {
        Self::from_shared(Arc::new(transport), codec)
    }

    /// Create a channel from a transport shared with other owners
    pub fn from_shared(transport: Arc<dyn Transport>, codec: C) -> Self {
        Self { transport, codec }
    }

    /// Open a NATS channel
    pub async fn nats(url: impl Into<String>, codec: C) -> Result<Self> {
        let transport = NatsTransport::connect(url).await?;
        Ok(Self::from_transport(transport, codec))
    }

    /// Encode a message and publish it on a topic
    pub async fn publish<T: Serialize + Sync>(&self, topic: &str, message: &T) -> Result<()> {
        let bytes = self.codec.encode(message)?;
        self.transport.publish(topic, Bytes::from(bytes)).await
    }

    /// Subscribe to raw payloads on a topic
    ///
    /// Decoding is left to the caller so one malformed payload does not end
    /// the subscription.
    pub async fn subscribe(&self, topic: &str) -> Result<Subscription> {
        self.transport.subscribe(topic).await
    }

    /// Codec used by this channel
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Close the underlying transport, see [`Transport::close`]
    pub async fn close(&self) -> Result<()> {
        self.transport.close().await
    }
}
