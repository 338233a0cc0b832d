//! Action handler registry and user callbacks.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, RwLock};

use serde_json::Value;

/// Handler outcome: a response payload, or an error message for the peer.
pub type HandlerResult = std::result::Result<Value, String>;

/// Boxed future returned by an [`ActionHandler`].
pub type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send + 'static>>;

/// A registered action handler. May be synchronous or asynchronous.
pub type ActionHandler = Arc<dyn Fn(Option<Value>) -> HandlerFuture + Send + Sync>;

/// Wrap a synchronous handler.
///
/// The closure runs when the returned future is first polled, so a panic
/// inside it surfaces where the dispatcher catches it.
pub fn handler_fn<F, E>(handler: F) -> ActionHandler
where
    F: Fn(Option<Value>) -> std::result::Result<Value, E> + Send + Sync + 'static,
    E: fmt::Display,
{
    let handler = Arc::new(handler);
    Arc::new(move |payload: Option<Value>| -> HandlerFuture {
        let handler = Arc::clone(&handler);
        Box::pin(async move { handler(payload).map_err(|err| err.to_string()) })
    })
}

/// Wrap an asynchronous handler.
pub fn handler_async<F, Fut, E>(handler: F) -> ActionHandler
where
    F: Fn(Option<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<Value, E>> + Send + 'static,
    E: fmt::Display,
{
    Arc::new(move |payload: Option<Value>| -> HandlerFuture {
        let future = handler(payload);
        Box::pin(async move { future.await.map_err(|err| err.to_string()) })
    })
}

/// Action name to handler, at most one handler per name.
#[derive(Default)]
pub struct ActionRegistry {
    handlers: RwLock<HashMap<String, ActionHandler>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `action`. The last registration wins; the
    /// replaced handler is returned.
    pub fn register(&self, action: impl Into<String>, handler: ActionHandler) -> Option<ActionHandler> {
        let action = action.into();
        let replaced = self
            .handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(action.clone(), handler);
        if replaced.is_some() {
            tracing::debug!(%action, "action handler replaced");
        }
        replaced
    }

    pub fn unregister(&self, action: &str) -> Option<ActionHandler> {
        self.handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(action)
    }

    pub fn get(&self, action: &str) -> Option<ActionHandler> {
        self.handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(action)
            .cloned()
    }

    /// Registered action names, sorted.
    pub fn actions(&self) -> Vec<String> {
        let mut actions: Vec<String> = self
            .handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .cloned()
            .collect();
        actions.sort();
        actions
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.actions())
            .finish()
    }
}

/// An action or request that no registered handler claimed.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundCommand {
    pub action: String,
    pub payload: Option<Value>,
    /// Set for requests; answer with `send_response`.
    pub request_id: Option<String>,
}

type DataCallback = Arc<dyn Fn(Value) + Send + Sync>;
type CommandCallback = Arc<dyn Fn(InboundCommand) + Send + Sync>;

/// Optional user callbacks, replaceable at any time.
#[derive(Default)]
pub(crate) struct Callbacks {
    data: Mutex<Option<DataCallback>>,
    unhandled: Mutex<Option<CommandCallback>>,
    broadcast: Mutex<Option<DataCallback>>,
}

impl Callbacks {
    pub(crate) fn set_data(&self, callback: DataCallback) {
        *lock(&self.data) = Some(callback);
    }

    pub(crate) fn set_unhandled(&self, callback: CommandCallback) {
        *lock(&self.unhandled) = Some(callback);
    }

    pub(crate) fn set_broadcast(&self, callback: DataCallback) {
        *lock(&self.broadcast) = Some(callback);
    }

    pub(crate) fn data(&self) -> Option<DataCallback> {
        lock(&self.data).clone()
    }

    pub(crate) fn unhandled(&self) -> Option<CommandCallback> {
        lock(&self.unhandled).clone()
    }

    pub(crate) fn broadcast(&self) -> Option<DataCallback> {
        lock(&self.broadcast).clone()
    }

    pub(crate) fn clear(&self) {
        *lock(&self.data) = None;
        *lock(&self.unhandled) = None;
        *lock(&self.broadcast) = None;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
