//! Matching inbound replies with the requests that caused them.
//!
//! Every outstanding request owns one entry, keyed by its [`RequestId`] and
//! holding the sending half of a one-shot channel. The inbound handler
//! fulfils an entry with [`CorrelationStore::put`]; the caller awaits the
//! matching [`Pending`]. An entry is removed exactly once: when its reply is
//! delivered, or when the `Pending` is dropped (timeout, cancellation).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use moleculer_core::{Pong, RequestId, Response};
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::{Error, Result};

/// Inbound envelope that names the request it answers
pub trait Correlated {
    fn correlation_id(&self) -> &RequestId;
}

impl Correlated for Response {
    fn correlation_id(&self) -> &RequestId {
        &self.id
    }
}

impl Correlated for Pong {
    fn correlation_id(&self) -> &RequestId {
        &self.id
    }
}

/// Outstanding requests awaiting a reply of type `T`
#[derive(Debug)]
pub struct CorrelationStore<T> {
    pending: Mutex<HashMap<RequestId, oneshot::Sender<T>>>,
}

impl<T> Default for CorrelationStore<T> {
    fn default() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> CorrelationStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start waiting for the reply to `id`
    ///
    /// Must happen before the request is published, so a fast reply cannot
    /// arrive ahead of its entry.
    pub fn register(self: &Arc<Self>, id: RequestId) -> Result<Pending<T>> {
        let (sender, receiver) = oneshot::channel();

        let mut pending = self.pending.lock();
        if pending.contains_key(&id) {
            return Err(Error::DuplicateRequest(id));
        }
        pending.insert(id.clone(), sender);
        drop(pending);

        Ok(Pending {
            id,
            receiver,
            store: Arc::clone(self),
        })
    }

    /// Deliver the reply for `id` to its waiter
    pub fn put(&self, id: &RequestId, payload: T) -> Result<()> {
        let sender = self.take(id)?;
        // The waiter can give up between take and send
        sender
            .send(payload)
            .map_err(|_| Error::NotFound(id.clone()))
    }

    /// Remove the entry for `id`
    pub fn take(&self, id: &RequestId) -> Result<oneshot::Sender<T>> {
        self.pending
            .lock()
            .remove(id)
            .ok_or_else(|| Error::NotFound(id.clone()))
    }

    pub fn contains(&self, id: &RequestId) -> bool {
        self.pending.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Caller's half of a registered request
#[derive(Debug)]
pub struct Pending<T> {
    id: RequestId,
    receiver: oneshot::Receiver<T>,
    store: Arc<CorrelationStore<T>>,
}

impl<T> Pending<T> {
    pub fn id(&self) -> &RequestId {
        &self.id
    }

    /// Wait up to `after` for the reply
    pub async fn wait(mut self, operation: &'static str, after: Duration) -> Result<T> {
        match tokio::time::timeout(after, &mut self.receiver).await {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => Err(Error::Timeout { operation, after }),
        }
    }
}

impl<T> Drop for Pending<T> {
    fn drop(&mut self) {
        self.store.pending.lock().remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Arc<CorrelationStore<u32>> {
        Arc::new(CorrelationStore::new())
    }

    #[tokio::test]
    async fn put_delivers_to_waiter() {
        let store = store();
        let id = RequestId::new();
        let pending = store.register(id.clone()).unwrap();

        store.put(&id, 7).unwrap();

        assert_eq!(pending.wait("test", Duration::from_secs(1)).await.unwrap(), 7);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn entries_are_consumed_once() {
        let store = store();
        let id = RequestId::from("r-1");
        let _pending = store.register(id.clone()).unwrap();

        store.put(&id, 1).unwrap();

        assert!(matches!(store.take(&id), Err(Error::NotFound(_))));
        assert!(matches!(store.put(&id, 2), Err(Error::NotFound(_))));
    }

    #[test]
    fn put_without_register_is_not_found() {
        let store = store();
        let result = store.put(&RequestId::from("unknown"), 1);
        assert!(matches!(result, Err(Error::NotFound(id)) if id.as_str() == "unknown"));
    }

    #[test]
    fn duplicate_register_is_rejected() {
        let store = store();
        let id = RequestId::from("dup");
        let _first = store.register(id.clone()).unwrap();

        assert!(matches!(
            store.register(id),
            Err(Error::DuplicateRequest(_))
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn dropping_pending_removes_entry() {
        let store = store();
        let id = RequestId::new();
        let pending = store.register(id.clone()).unwrap();
        assert!(store.contains(&id));

        drop(pending);

        assert!(!store.contains(&id));
        assert!(matches!(store.put(&id, 1), Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn wait_times_out_and_cleans_up() {
        let store = store();
        let pending = store.register(RequestId::new()).unwrap();

        let result = pending.wait("call", Duration::from_millis(20)).await;

        assert!(matches!(
            result,
            Err(Error::Timeout { operation: "call", .. })
        ));
        assert!(store.is_empty());
    }
}
