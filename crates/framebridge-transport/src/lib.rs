//! Cross-document message transport primitive.
//!
//! Models the browser's frame-to-frame messaging surface:
//! - [`Origin`] parsing, serialization, and relative resolution
//! - [`MessageTarget`], the untyped `postMessage`-equivalent send primitive
//! - [`Window`], a document with its own origin and message event stream
//! - [`BroadcastChannel`], the same-key fan-out side channel
//!
//! This is the lowest layer of framebridge. Everything else builds on top of
//! the [`MessageTarget`] trait and the [`MessageEvent`] stream provided here.

pub mod broadcast;
pub mod error;
pub mod origin;
pub mod window;

pub use broadcast::{BroadcastChannel, BroadcastHub};
pub use error::{Result, TransportError};
pub use origin::{Origin, WILDCARD};
pub use url::Url;
pub use window::{MessageEvent, MessageTarget, Window, WindowProxy, DEFAULT_EVENT_CAPACITY};
