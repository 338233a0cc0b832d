//! Host and embed endpoints for frame-to-frame messaging.
//!
//! This is the "just works" layer. A host mounts a frame and gets a
//! content height, a loading flag, and `send_*` operations; the embed
//! attaches a content root, registers action handlers, and answers
//! requests. Both sides filter every inbound event by origin and channel
//! before anything else looks at it.

pub mod config;
pub mod control;
pub mod correlator;
pub mod dispatcher;
pub mod embed;
pub mod error;
pub mod handlers;
pub mod host;
pub mod listener;
pub mod origin;
pub mod outbound;
pub mod resize;
mod session;

pub use config::{EmbedConfig, HostConfig, DEFAULT_HEIGHT};
pub use control::{InitPayload, INIT_ACTION};
pub use correlator::{Correlator, PendingSummary, DEFAULT_REQUEST_TIMEOUT};
pub use dispatcher::{Disposition, DropReason, Side};
pub use embed::EmbedBridge;
pub use error::{BridgeError, Result};
pub use handlers::{
    handler_async, handler_fn, ActionHandler, ActionRegistry, HandlerResult, InboundCommand,
};
pub use host::HostBridge;
pub use origin::{is_valid_origin, OriginPolicy};
pub use outbound::Outbound;
pub use resize::{ContentRoot, LayoutState, LoadingFlag};
