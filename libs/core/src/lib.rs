//! Moleculer Core - Protocol model for the Moleculer message bus
//!
//! Defines the envelopes exchanged between nodes, the topics they travel on,
//! and the identifiers used to correlate replies with requests. Nothing in
//! this crate performs I/O.
//!
//! # Example
//!
//! ```
//! use moleculer_core::{Command, envelope::Discover};
//!
//! let topic = Command::Discover.topic("node-1");
//! assert_eq!(topic, "MOL.DISCOVER.node-1");
//! assert_eq!(Command::Discover.broadcast(), "MOL.DISCOVER");
//!
//! let discover = Discover::new("python-node");
//! assert_eq!(discover.ver, moleculer_core::PROTOCOL_VERSION);
//! ```

pub mod envelope;
pub mod error;
pub mod id;
pub mod topic;

// Re-exports for convenience
pub use envelope::{Discover, Event, Info, Ping, Pong, Request, Response};
pub use error::RemoteError;
pub use id::RequestId;
pub use topic::{topic, Command};

/// Protocol version carried in the `ver` field of every outbound envelope
pub const PROTOCOL_VERSION: &str = "4";
