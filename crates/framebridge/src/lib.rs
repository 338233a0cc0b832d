//! Host↔embed frame messaging.
//!
//! framebridge connects a host document to the documents it embeds in
//! frames: the embed reports its content height so the host can size the
//! frame, and either side can send data, fire-and-forget actions, and
//! requests that resolve with exactly one response.
//!
//! # Crate Structure
//!
//! - [`transport`]: origins, windows, and the `postMessage`-style send primitive
//! - [`message`]: wire messages, the codec, and channel ids
//! - [`schema`]: optional JSON Schema validation of action payloads (behind `schema` feature)
//! - [`peer`]: host and embed bridges (behind `peer` feature)

/// Re-export transport types.
pub mod transport {
    pub use framebridge_transport::*;
}

/// Re-export message types.
pub mod message {
    pub use framebridge_message::*;
}

/// Re-export schema types (requires `schema` feature).
#[cfg(feature = "schema")]
pub mod schema {
    pub use framebridge_schema::*;
}

/// Re-export bridge types (requires `peer` feature).
#[cfg(feature = "peer")]
pub mod peer {
    pub use framebridge_peer::*;
}
