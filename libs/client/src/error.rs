use std::time::Duration;

use moleculer_core::{RemoteError, RequestId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Transport error: {0}")]
    Transport(#[from] moleculer_fabric::Error),

    #[error("No pending request with id {0}")]
    NotFound(RequestId),

    #[error("Request id {0} is already pending")]
    DuplicateRequest(RequestId),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
