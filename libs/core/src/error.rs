use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Error object carried by a failed Response
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{name}: {message}")]
pub struct RemoteError {
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default)]
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

fn default_name() -> String {
    "MoleculerError".to_string()
}

impl RemoteError {
    pub fn custom(msg: impl Into<String>) -> Self {
        Self {
            name: default_name(),
            message: msg.into(),
            code: None,
            kind: None,
            data: None,
        }
    }

    /// Build from the `error` field of a Response
    ///
    /// Peers written against other runtimes do not always send an object, so
    /// anything that does not parse is kept as the message text.
    pub fn from_value(value: Option<Value>) -> Self {
        match value {
            Some(Value::String(message)) => Self::custom(message),
            Some(value @ Value::Object(_)) => serde_json::from_value(value.clone())
                .unwrap_or_else(|_| Self::custom(value.to_string())),
            Some(other) => Self::custom(other.to_string()),
            None => Self::custom("request failed without an error payload"),
        }
    }
}
