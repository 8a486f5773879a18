//! Moleculer Client - Request/response and events over a Moleculer mesh
//!
//! Lets a process take part in a Moleculer service mesh over NATS: discover
//! nodes, ping them, call their actions and emit events. Replies arrive
//! asynchronously on the client's own topics and are matched to the waiting
//! caller by request id.
//!
//! # Example
//!
//! ```no_run
//! use moleculer_client::Client;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::connect("rust-node", "node-1", "nats://127.0.0.1:4222").await?;
//!
//! let info = client.discover(false).await?;
//! println!("services: {:?}", info.service_names());
//!
//! client.emit("client.alive", json!({})).await?;
//! let reply = client.call("microservice.action", json!({"data": "moleculer test"})).await?;
//! println!("{reply}");
//!
//! client.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod correlation;
pub mod error;

// Re-exports for convenience
pub use client::{CallOptions, Client, EmitOptions};
pub use config::{ClientBuilder, ClientConfig};
pub use correlation::CorrelationStore;
pub use error::{Error, Result};
pub use moleculer_core::{Info, RemoteError, RequestId};
