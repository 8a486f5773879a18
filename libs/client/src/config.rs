use std::sync::Arc;
use std::time::Duration;

use moleculer_fabric::transport::{NatsTransport, Transport};

use crate::client::Client;
use crate::error::{Error, Result};

/// NATS server used when no URL is configured
pub const DEFAULT_URL: &str = "nats://127.0.0.1:4222";

/// Default for both the advertised and the locally enforced request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(5000);

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Validated client settings
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Node id of this client; replies are addressed to it
    pub sender: String,
    /// Node id the client sends requests, pings and events to
    pub target_node: String,
    pub url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

/// Builder for configuring and connecting a [`Client`]
#[derive(Debug, Default)]
pub struct ClientBuilder {
    sender: Option<String>,
    target_node: Option<String>,
    url: Option<String>,
    connect_timeout: Option<Duration>,
    request_timeout: Option<Duration>,
}

impl ClientBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set this client's node id
    pub fn sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    /// Set the node id requests are addressed to
    pub fn target_node(mut self, node: impl Into<String>) -> Self {
        self.target_node = Some(node.into());
        self
    }

    /// Set the NATS server URL
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the default timeout for calls, pings and discovers
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Validate the settings without connecting
    pub fn build_config(self) -> Result<ClientConfig> {
        let sender = validate_node_id("sender", self.sender)?;
        let target_node = validate_node_id("target node", self.target_node)?;

        Ok(ClientConfig {
            sender,
            target_node,
            url: self.url.unwrap_or_else(|| DEFAULT_URL.to_string()),
            connect_timeout: self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            request_timeout: self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
        })
    }

    /// Connect to NATS with the configured settings
    pub async fn connect(self) -> Result<Client> {
        let config = self.build_config()?;

        let transport = NatsTransport::builder()
            .url(config.url.as_str())
            .name(config.sender.as_str())
            .connect_timeout(config.connect_timeout)
            .connect()
            .await?;

        Client::start(config, Arc::new(transport)).await
    }

    /// Start the client on an already connected transport
    pub async fn with_transport(self, transport: impl Transport + 'static) -> Result<Client> {
        let config = self.build_config()?;
        Client::start(config, Arc::new(transport)).await
    }
}

/// Node ids become topic tokens, so they must be valid subject tokens
fn validate_node_id(field: &str, value: Option<String>) -> Result<String> {
    let id = value.ok_or_else(|| Error::Config(format!("{field} not set")))?;

    if id.is_empty() {
        return Err(Error::Config(format!("{field} is empty")));
    }
    if id.chars().any(|c| c.is_whitespace() || c == '*' || c == '>') {
        return Err(Error::Config(format!(
            "{field} {id:?} contains whitespace or a wildcard"
        )));
    }

    Ok(id)
}
