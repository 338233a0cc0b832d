use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::{Result, TransportError};
use crate::origin::{Origin, WILDCARD};

/// Default number of undelivered events a single listener may lag behind.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// A raw inbound message event, as seen by a document's `message` listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    /// Serialized origin of the sending document.
    pub origin: String,
    /// Untyped structured-clone payload.
    pub data: Value,
}

/// The native send primitive: a handle on another document that accepts
/// untyped messages.
///
/// Delivery is best effort. A `target_origin` that does not match the
/// recipient's origin silently drops the message, exactly like the browser.
pub trait MessageTarget: Send + Sync {
    /// Post `data` to the target document.
    ///
    /// `target_origin` is either [`WILDCARD`], `"/"` (same origin as the
    /// sender), or an absolute origin/URL.
    fn post_message(&self, data: Value, target_origin: &str) -> Result<()>;
}

/// A document with its own origin and a page-wide `message` event stream.
///
/// Every listener registered through [`Window::subscribe`] sees every event
/// posted to this window, regardless of which channel it belongs to;
/// filtering is the listener's job. Dropping the receiver removes the
/// listener.
pub struct Window {
    location: String,
    origin: Origin,
    events: broadcast::Sender<MessageEvent>,
    closed: AtomicBool,
}

impl Window {
    /// Open a document at `location` with the default event capacity.
    pub fn open(location: &str) -> Result<Arc<Self>> {
        Self::open_with_capacity(location, DEFAULT_EVENT_CAPACITY)
    }

    /// Open a document at `location` with an explicit per-listener event capacity.
    pub fn open_with_capacity(location: &str, capacity: usize) -> Result<Arc<Self>> {
        let origin = Origin::parse(location)?;
        let (events, _) = broadcast::channel(capacity.max(1));
        Ok(Arc::new(Self {
            location: location.trim().to_string(),
            origin,
            events,
            closed: AtomicBool::new(false),
        }))
    }

    /// Full load URL of this document.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Origin of this document.
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Register a `message` listener.
    pub fn subscribe(&self) -> broadcast::Receiver<MessageEvent> {
        self.events.subscribe()
    }

    /// Number of currently registered listeners.
    pub fn listener_count(&self) -> usize {
        self.events.receiver_count()
    }

    /// Obtain a handle on this window for posting from `source`.
    ///
    /// The handle stamps `source`'s origin on every event it delivers.
    pub fn endpoint(self: &Arc<Self>, source: &Window) -> WindowProxy {
        WindowProxy {
            target: Arc::clone(self),
            source_origin: source.origin.clone(),
        }
    }

    /// Close the document. Further posts to it fail.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn deliver(&self, event: MessageEvent) {
        if self.events.send(event).is_err() {
            tracing::trace!(location = %self.location, "message posted with no listeners");
        }
    }
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("location", &self.location)
            .field("origin", &self.origin.to_string())
            .field("listeners", &self.events.receiver_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// A handle on a [`Window`] held by another document.
#[derive(Clone)]
pub struct WindowProxy {
    target: Arc<Window>,
    source_origin: Origin,
}

impl WindowProxy {
    /// The window this proxy posts into.
    pub fn target(&self) -> &Arc<Window> {
        &self.target
    }
}

impl MessageTarget for WindowProxy {
    fn post_message(&self, data: Value, target_origin: &str) -> Result<()> {
        if self.target.is_closed() {
            return Err(TransportError::WindowClosed(self.target.location.clone()));
        }

        let allowed = match target_origin.trim() {
            WILDCARD => true,
            "/" => self.target.origin == self.source_origin,
            other => Origin::parse(other)? == self.target.origin,
        };

        if !allowed {
            tracing::debug!(
                target_origin,
                recipient = %self.target.origin,
                "target origin does not match recipient; message dropped"
            );
            return Ok(());
        }

        self.target.deliver(MessageEvent {
            origin: self.source_origin.to_string(),
            data,
        });
        Ok(())
    }
}

impl fmt::Debug for WindowProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowProxy")
            .field("target", &self.target.origin.to_string())
            .field("source", &self.source_origin.to_string())
            .finish()
    }
}
