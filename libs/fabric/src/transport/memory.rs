//! In-process bus for tests and local development
//!
//! A [`MemoryBus`] plays the role of the broker: every [`MemoryTransport`]
//! connected to it sees what the others publish. The bus also records every
//! publish so tests can assert on the exact topics used.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;

use crate::error::{Error, Result};
use crate::transport::{Subscription, Transport};

type Subscribers = HashMap<String, Vec<(u64, mpsc::UnboundedSender<Bytes>)>>;

#[derive(Debug, Default)]
struct BusState {
    subscribers: Mutex<Subscribers>,
    published: Mutex<Vec<(String, Bytes)>>,
    next_connection_id: AtomicU64,
}

/// Shared in-memory broker
#[derive(Debug, Clone, Default)]
pub struct MemoryBus {
    state: Arc<BusState>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new connection to this bus
    pub fn connect(&self) -> MemoryTransport {
        let connection_id = self.state.next_connection_id.fetch_add(1, Ordering::Relaxed);
        debug!("Memory connection {} opened", connection_id);

        MemoryTransport {
            bus: self.clone(),
            connection_id,
            closed: AtomicBool::new(false),
        }
    }

    /// Every publish seen so far, in order, as `(topic, payload)`
    pub fn published(&self) -> Vec<(String, Bytes)> {
        self.state.published.lock().clone()
    }

    /// Payloads published on `topic`, in order
    pub fn published_to(&self, topic: &str) -> Vec<Bytes> {
        self.state
            .published
            .lock()
            .iter()
            .filter(|(published, _)| published == topic)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    /// Number of live subscriptions on `topic`
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.state
            .subscribers
            .lock()
            .get(topic)
            .map_or(0, |subscribers| {
                subscribers.iter().filter(|(_, tx)| !tx.is_closed()).count()
            })
    }

    fn deliver(&self, topic: &str, payload: Bytes) -> usize {
        self.state
            .published
            .lock()
            .push((topic.to_string(), payload.clone()));

        let mut subscribers = self.state.subscribers.lock();
        let Some(listeners) = subscribers.get_mut(topic) else {
            return 0;
        };

        // Dropped subscription streams are pruned lazily
        listeners.retain(|(_, tx)| tx.send(payload.clone()).is_ok());
        listeners.len()
    }

    fn add_subscriber(&self, topic: &str, connection_id: u64) -> mpsc::UnboundedReceiver<Bytes> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state
            .subscribers
            .lock()
            .entry(topic.to_string())
            .or_default()
            .push((connection_id, tx));
        rx
    }

    fn remove_connection(&self, connection_id: u64) {
        let mut subscribers = self.state.subscribers.lock();
        for listeners in subscribers.values_mut() {
            listeners.retain(|(id, _)| *id != connection_id);
        }
        subscribers.retain(|_, listeners| !listeners.is_empty());
    }
}

/// A single connection to a [`MemoryBus`]
#[derive(Debug)]
pub struct MemoryTransport {
    bus: MemoryBus,
    connection_id: u64,
    closed: AtomicBool,
}

impl MemoryTransport {
    /// Bus this connection publishes to
    pub fn bus(&self) -> &MemoryBus {
        &self.bus
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(Error::ConnectionClosed)
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl Transport for MemoryTransport {
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<()> {
        self.ensure_open()?;

        let delivered = self.bus.deliver(topic, payload);
        debug!(
            "Memory connection {} published to {} ({} subscribers)",
            self.connection_id, topic, delivered
        );
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<Subscription> {
        self.ensure_open()?;

        let rx = self.bus.add_subscriber(topic, self.connection_id);
        debug!(
            "Memory connection {} subscribed to {}",
            self.connection_id, topic
        );
        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.bus.remove_connection(self.connection_id);
            debug!("Memory connection {} closed", self.connection_id);
        }
        Ok(())
    }
}

impl Drop for MemoryTransport {
    fn drop(&mut self) {
        // Ends this connection's subscription streams
        self.bus.remove_connection(self.connection_id);
    }
}
