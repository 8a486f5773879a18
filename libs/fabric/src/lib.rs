//! Moleculer Fabric - Publish/subscribe transport and codec layer
//!
//! Provides the transport abstraction the Moleculer client runs on (NATS, or
//! an in-process bus for tests) and codec support (JSON) for the envelopes
//! carried over it.
//!
//! # Example
//!
//! ```no_run
//! use futures::StreamExt;
//! use moleculer_fabric::{Channel, codec::{Codec, JsonCodec}};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Hello { sender: String }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let channel = Channel::nats("nats://127.0.0.1:4222", JsonCodec).await?;
//!
//! let mut replies = channel.subscribe("MOL.INFO.api").await?;
//! channel.publish("MOL.DISCOVER", &Hello { sender: "api".into() }).await?;
//!
//! if let Some(bytes) = replies.next().await {
//!     let info: serde_json::Value = channel.codec().decode(&bytes)?;
//!     println!("{info}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod codec;
pub mod error;
pub mod transport;

// Re-exports for convenience
pub use channel::Channel;
pub use error::{Error, Result};
pub use transport::{Subscription, Transport};
