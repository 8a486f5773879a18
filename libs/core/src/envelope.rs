//! Envelopes exchanged on the bus, one type per packet kind.
//!
//! Outbound envelopes always serialize every field of their kind, with `null`
//! for absent optionals, so peers see the same shape on every message.
//! Inbound envelopes ignore unknown fields; those whose extra fields matter to
//! callers (Response, Pong, Info) keep them in a flattened map.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RemoteError;
use crate::id::RequestId;
use crate::PROTOCOL_VERSION;

/// Asks a node (or every node) to publish its INFO
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discover {
    pub ver: String,
    pub sender: String,
}

impl Discover {
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            ver: PROTOCOL_VERSION.to_string(),
            sender: sender.into(),
        }
    }
}

/// Invokes an action on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub ver: String,
    pub sender: String,
    pub id: RequestId,
    pub action: String,
    pub params: Value,
    pub meta: Map<String, Value>,
    /// Milliseconds the peer may spend on the action
    pub timeout: u64,
    pub level: u32,
    pub metrics: bool,
    pub tracing: Option<Value>,
    pub caller: Option<String>,
    pub stream: bool,
}

impl Request {
    /// Build a top-level request with a fresh id
    pub fn new(
        sender: impl Into<String>,
        action: impl Into<String>,
        params: Value,
        meta: Map<String, Value>,
        timeout: u64,
    ) -> Self {
        Self {
            ver: PROTOCOL_VERSION.to_string(),
            sender: sender.into(),
            id: RequestId::new(),
            action: action.into(),
            params,
            meta,
            timeout,
            level: 1,
            metrics: false,
            tracing: None,
            caller: None,
            stream: false,
        }
    }
}

/// Reply to a [`Request`], published on the requester's RES topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: RequestId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ver: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,

    #[serde(default)]
    pub data: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,

    /// Fields not interpreted by the client (`meta`, `stream`, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Response {
    /// Successful reply carrying `data`
    pub fn success(id: RequestId, data: Value) -> Self {
        Self {
            id,
            ver: Some(PROTOCOL_VERSION.to_string()),
            sender: None,
            success: Some(true),
            data,
            error: None,
            extra: Map::new(),
        }
    }

    /// Failed reply carrying `error`
    pub fn failure(id: RequestId, error: RemoteError) -> Self {
        Self {
            id,
            ver: Some(PROTOCOL_VERSION.to_string()),
            sender: None,
            success: Some(false),
            data: Value::Null,
            error: serde_json::to_value(error).ok(),
            extra: Map::new(),
        }
    }

    /// The reply's data, or the peer's error when `success` is explicitly false
    pub fn into_result(self) -> Result<Value, RemoteError> {
        match self.success {
            Some(false) => Err(RemoteError::from_value(self.error)),
            _ => Ok(self.data),
        }
    }
}

/// Liveness probe; the peer answers with a [`Pong`] echoing `id` and `time`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ping {
    pub ver: String,
    pub id: RequestId,
    pub sender: String,
    /// Send time in milliseconds since the Unix epoch
    pub time: i64,
}

impl Ping {
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            ver: PROTOCOL_VERSION.to_string(),
            id: RequestId::new(),
            sender: sender.into(),
            time: Utc::now().timestamp_millis(),
        }
    }
}

/// Reply to a [`Ping`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pong {
    pub id: RequestId,

    /// Everything but the id: `ver`, `sender`, `time`, `arrived`, ...
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Pong {
    /// Drop the correlation id, keeping only what the peer reported
    pub fn into_payload(self) -> Map<String, Value> {
        self.payload
    }
}

/// Fire-and-forget event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub ver: String,
    pub sender: String,
    pub id: RequestId,
    pub event: String,
    pub data: Value,
    pub meta: Map<String, Value>,
    pub groups: Vec<String>,
    pub broadcast: bool,
    pub level: u32,
    pub caller: Option<String>,
    pub metrics: bool,
    pub tracing: Option<Value>,
    pub stream: bool,
}

impl Event {
    pub fn new(sender: impl Into<String>, event: impl Into<String>, data: Value) -> Self {
        Self {
            ver: PROTOCOL_VERSION.to_string(),
            sender: sender.into(),
            id: RequestId::new(),
            event: event.into(),
            data,
            meta: Map::new(),
            groups: Vec::new(),
            broadcast: false,
            level: 1,
            caller: None,
            metrics: false,
            tracing: None,
            stream: false,
        }
    }
}

/// Node description published in answer to a [`Discover`]
///
/// Kept as the raw object the peer sent, so it re-serializes unchanged
/// whatever fields or types the peer uses.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Info(Map<String, Value>);

impl Info {
    pub fn ver(&self) -> Option<&Value> {
        self.0.get("ver")
    }

    /// Node id of the node that published this INFO
    pub fn sender(&self) -> Option<&str> {
        self.0.get("sender").and_then(Value::as_str)
    }

    /// Advertised service descriptions, empty when absent or not an array
    pub fn services(&self) -> &[Value] {
        self.0
            .get("services")
            .and_then(Value::as_array)
            .map_or(&[], Vec::as_slice)
    }

    /// Names of the services the node advertises
    pub fn service_names(&self) -> Vec<&str> {
        self.services()
            .iter()
            .filter_map(|service| service.get("name").and_then(Value::as_str))
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Info {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}
