use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use moleculer_core::{topic, Command, Discover, Event, Info, Ping, Pong, Request, Response};
use moleculer_fabric::codec::{Codec, JsonCodec};
use moleculer_fabric::{Channel, Subscription, Transport};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{ClientBuilder, ClientConfig};
use crate::correlation::{Correlated, CorrelationStore};
use crate::error::{Error, Result};

/// INFO packets buffered for slow discover callers
const INFO_BUFFER: usize = 16;

/// Optional arguments of [`Client::call_with`]
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub meta: Map<String, Value>,
    /// Sent to the peer and enforced locally; the client default when `None`
    pub timeout: Option<Duration>,
}

/// Optional arguments of [`Client::emit_with`]
#[derive(Debug, Clone, Default)]
pub struct EmitOptions {
    pub meta: Map<String, Value>,
    pub groups: Vec<String>,
    pub broadcast: bool,
    pub caller: Option<String>,
}

/// A participant in a Moleculer mesh
///
/// The client listens on its own RES, PONG and INFO topics for its whole
/// lifetime. Replies are matched to requests by id, so a single client can
/// have any number of calls and pings in flight.
pub struct Client {
    config: ClientConfig,
    channel: Channel<JsonCodec>,
    responses: Arc<CorrelationStore<Response>>,
    pongs: Arc<CorrelationStore<Pong>>,
    infos: broadcast::Sender<Info>,
    handlers: Vec<JoinHandle<()>>,
}

impl Client {
    /// Connect to the NATS server at `url` as `sender`, addressing `target_node`
    pub async fn connect(
        sender: impl Into<String>,
        target_node: impl Into<String>,
        url: impl Into<String>,
    ) -> Result<Self> {
        ClientBuilder::new()
            .sender(sender)
            .target_node(target_node)
            .url(url)
            .connect()
            .await
    }

    /// Create a builder for configuring the client
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) async fn start(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let channel = Channel::from_shared(transport, JsonCodec);

        // Subscribe before anything is published so no reply can be missed
        let response_topic = Command::Response.topic(&config.sender);
        let pong_topic = Command::Pong.topic(&config.sender);
        let info_topic = Command::Info.topic(&config.sender);
        let responses_in = channel.subscribe(&response_topic).await?;
        let pongs_in = channel.subscribe(&pong_topic).await?;
        let infos_in = channel.subscribe(&info_topic).await?;

        let responses: Arc<CorrelationStore<Response>> = Arc::new(CorrelationStore::new());
        let pongs: Arc<CorrelationStore<Pong>> = Arc::new(CorrelationStore::new());
        let (infos, _) = broadcast::channel(INFO_BUFFER);

        let handlers = vec![
            spawn_reply_handler(responses_in, Arc::clone(&responses), "response"),
            spawn_reply_handler(pongs_in, Arc::clone(&pongs), "pong"),
            spawn_info_handler(infos_in, infos.clone()),
        ];

        info!(
            "Moleculer client {} ready, addressing {}",
            config.sender, config.target_node
        );

        Ok(Self {
            config,
            channel,
            responses,
            pongs,
            infos,
            handlers,
        })
    }

    pub fn sender(&self) -> &str {
        &self.config.sender
    }

    pub fn target_node(&self) -> &str {
        &self.config.target_node
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Calls and pings still waiting for a reply
    pub fn pending_requests(&self) -> usize {
        self.responses.len() + self.pongs.len()
    }

    /// Call `action` on the target node and wait for its reply
    pub async fn call(&self, action: &str, params: Value) -> Result<Value> {
        self.call_with(action, params, CallOptions::default()).await
    }

    /// Call `action` with explicit meta and timeout
    ///
    /// Fails with [`Error::Timeout`] when no reply arrives in time and with
    /// [`Error::Remote`] when the peer reports a failure.
    pub async fn call_with(&self, action: &str, params: Value, options: CallOptions) -> Result<Value> {
        let timeout = options.timeout.unwrap_or(self.config.request_timeout);
        let request = Request::new(
            self.config.sender.as_str(),
            action,
            params,
            options.meta,
            u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        );

        let pending = self.responses.register(request.id.clone())?;
        let topic = Command::Request.topic(&self.config.target_node);

        debug!("Calling {} on {} with id {}", action, topic, request.id);
        self.channel.publish(&topic, &request).await?;

        let response = pending.wait("call", timeout).await?;
        Ok(response.into_result()?)
    }

    /// Ask the target node (or every node) for its INFO
    ///
    /// Returns the first INFO received after the request was sent.
    pub async fn discover(&self, broadcast: bool) -> Result<Info> {
        // Subscribe first so an immediate answer is not lost
        let mut infos = self.infos.subscribe();

        let topic = topic(Command::Discover, &self.config.target_node, broadcast);
        debug!("Discovering via {}", topic);
        self.channel
            .publish(&topic, &Discover::new(self.config.sender.as_str()))
            .await?;

        let after = self.config.request_timeout;
        match tokio::time::timeout(after, next_info(&mut infos)).await {
            Ok(info) => info,
            Err(_) => Err(Error::Timeout {
                operation: "discover",
                after,
            }),
        }
    }

    /// Ping the target node (or every node) and return the pong without its id
    pub async fn ping(&self, broadcast: bool) -> Result<Map<String, Value>> {
        let ping = Ping::new(self.config.sender.as_str());
        let pending = self.pongs.register(ping.id.clone())?;

        let topic = topic(Command::Ping, &self.config.target_node, broadcast);
        debug!("Pinging via {} with id {}", topic, ping.id);
        self.channel.publish(&topic, &ping).await?;

        let pong = pending.wait("ping", self.config.request_timeout).await?;
        Ok(pong.into_payload())
    }

    /// Publish `event` to the target node without waiting for anything
    pub async fn emit(&self, event: &str, data: Value) -> Result<()> {
        self.emit_with(event, data, EmitOptions::default()).await
    }

    pub async fn emit_with(&self, event: &str, data: Value, options: EmitOptions) -> Result<()> {
        let mut envelope = Event::new(self.config.sender.as_str(), event, data);
        envelope.meta = options.meta;
        envelope.groups = options.groups;
        envelope.broadcast = options.broadcast;
        envelope.caller = options.caller;

        let topic = Command::Event.topic(&self.config.target_node);
        debug!("Emitting {} on {}", event, topic);
        self.channel.publish(&topic, &envelope).await?;
        Ok(())
    }

    /// Stop the reply handlers and close the transport
    pub async fn close(self) -> Result<()> {
        for handler in &self.handlers {
            handler.abort();
        }

        self.channel.close().await?;
        info!("Moleculer client {} closed", self.config.sender);
        Ok(())
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        for handler in &self.handlers {
            handler.abort();
        }
    }
}

/// Drain a reply topic into its correlation store
fn spawn_reply_handler<T>(
    mut subscription: Subscription,
    store: Arc<CorrelationStore<T>>,
    kind: &'static str,
) -> JoinHandle<()>
where
    T: Correlated + DeserializeOwned + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(bytes) = subscription.next().await {
            let reply: T = match JsonCodec.decode(&bytes) {
                Ok(reply) => reply,
                Err(e) => {
                    warn!("Dropping malformed {} envelope: {}", kind, e);
                    continue;
                }
            };

            let id = reply.correlation_id().clone();
            if store.put(&id, reply).is_err() {
                // Late reply after a timeout, or a second pong to a broadcast ping
                debug!("Dropping unmatched {} {}", kind, id);
            }
        }
        debug!("{} subscription ended", kind);
    })
}

/// Fan INFO packets out to every discover in progress
fn spawn_info_handler(mut subscription: Subscription, infos: broadcast::Sender<Info>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(bytes) = subscription.next().await {
            match JsonCodec.decode::<Info>(&bytes) {
                Ok(info) => {
                    if infos.send(info).is_err() {
                        debug!("Dropping INFO, no discover in progress");
                    }
                }
                Err(e) => warn!("Dropping malformed info envelope: {}", e),
            }
        }
        debug!("info subscription ended");
    })
}

async fn next_info(infos: &mut broadcast::Receiver<Info>) -> Result<Info> {
    loop {
        match infos.recv().await {
            Ok(info) => return Ok(info),
            Err(RecvError::Lagged(skipped)) => debug!("Discover skipped {} INFO packets", skipped),
            Err(RecvError::Closed) => return Err(Error::ConnectionClosed),
        }
    }
}
