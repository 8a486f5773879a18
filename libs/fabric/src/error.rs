use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Connect error: {0}")]
    Connect(String),

    #[error("Publish error: {0}")]
    Publish(String),

    #[error("Subscribe error: {0}")]
    Subscribe(String),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("{0}")]
    Custom(String),
}

pub type Result<T> = std::result::Result<T, Error>;
