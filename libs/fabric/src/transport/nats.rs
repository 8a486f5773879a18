use std::time::Duration;

use async_nats::{Client, ConnectOptions};
use bytes::Bytes;
use futures::StreamExt;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::transport::{Subscription, Transport};

/// NATS transport
///
/// Topics map one to one onto NATS subjects.
#[derive(Debug, Clone)]
pub struct NatsTransport {
    client: Client,
}

impl NatsTransport {
    /// Connect to a NATS server with default options
    pub async fn connect(url: impl Into<String>) -> Result<Self> {
        Self::builder().url(url).connect().await
    }

    /// Connect with a connect timeout
    pub async fn connect_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Self::builder()
            .url(url)
            .connect_timeout(timeout)
            .connect()
            .await
    }

    /// Create a builder for configuring the transport
    pub fn builder() -> NatsTransportBuilder {
        NatsTransportBuilder::new()
    }

    /// Create from an existing NATS client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Get the underlying NATS client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait::async_trait]
impl Transport for NatsTransport {
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<()> {
        debug!("Publishing {} bytes to {}", payload.len(), topic);

        self.client
            .publish(topic.to_string(), payload)
            .await
            .map_err(|e| Error::Publish(e.to_string()))
    }

    async fn subscribe(&self, topic: &str) -> Result<Subscription> {
        let subscriber = self
            .client
            .subscribe(topic.to_string())
            .await
            .map_err(|e| Error::Subscribe(e.to_string()))?;

        debug!("Subscribed to {}", topic);

        Ok(Box::pin(subscriber.map(|message| message.payload)))
    }

    /// Flushes buffered publishes only
    ///
    /// The connection itself stays up while any clone of the client lives;
    /// subscriptions are unsubscribed when their streams drop.
    async fn close(&self) -> Result<()> {
        self.client
            .flush()
            .await
            .map_err(|e| Error::Custom(format!("Flush failed: {e}")))
    }
}

/// Builder for configuring NATS transport
#[derive(Default)]
pub struct NatsTransportBuilder {
    url: Option<String>,
    name: Option<String>,
    connect_timeout: Option<Duration>,
}

impl NatsTransportBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server URL, e.g. `nats://127.0.0.1:4222`
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the connection name reported to the server
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Connect with the configured settings
    pub async fn connect(self) -> Result<NatsTransport> {
        let url = self
            .url
            .ok_or_else(|| Error::Custom("URL not set".to_string()))?;

        let mut options = ConnectOptions::new();
        if let Some(name) = &self.name {
            options = options.name(name);
        }
        if let Some(timeout) = self.connect_timeout {
            options = options.connection_timeout(timeout);
        }

        let client = options
            .connect(url.as_str())
            .await
            .map_err(|e| Error::Connect(format!("{url}: {e}")))?;

        info!("Connected to NATS at {}", url);

        Ok(NatsTransport { client })
    }
}
