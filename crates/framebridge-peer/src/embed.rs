use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use framebridge_message::{Body, ChannelBinding};
use framebridge_transport::{BroadcastChannel, MessageEvent, MessageTarget, Window};
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::EmbedConfig;
use crate::dispatcher::{Dispatcher, Disposition, Side};
use crate::error::{BridgeError, Result};
use crate::handlers::{ActionHandler, ActionRegistry, Callbacks, HandlerResult, InboundCommand};
use crate::listener::Listener;
use crate::origin::OriginPolicy;
use crate::outbound::Outbound;
use crate::resize::{ContentRoot, EmbedResize};
use crate::session::Session;

/// The embedded document's side of the bridge.
///
/// Attaching registers a listener on the embed document. Shutting down (or
/// dropping the bridge) removes it, disconnects the size observer, closes
/// the broadcast side channel, and rejects every pending request.
pub struct EmbedBridge {
    session: Arc<Session>,
    handlers: Arc<ActionRegistry>,
    callbacks: Arc<Callbacks>,
    resize: Arc<EmbedResize>,
    dispatcher: Arc<Dispatcher>,
    listener: Mutex<Option<Listener>>,
    broadcast: Mutex<Option<BroadcastLink>>,
}

/// Owner task of an open [`BroadcastChannel`].
struct BroadcastLink {
    name: String,
    outgoing: mpsc::UnboundedSender<Value>,
    task: JoinHandle<()>,
}

impl EmbedBridge {
    /// Attach to `window`, posting to `parent`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn attach(window: &Window, parent: Arc<dyn MessageTarget>, config: EmbedConfig) -> Result<Self> {
        let target_origin = config.resolve_target_origin(window.origin())?;
        let policy = OriginPolicy::new(&target_origin, window.origin())?;

        let binding = match config.channel_id.as_deref() {
            Some(channel_id) => ChannelBinding::explicit(channel_id),
            None => ChannelBinding::unbound(),
        };
        let session = Arc::new(Session::new(
            binding,
            Outbound::new(parent, target_origin),
            config.request_timeout,
        ));
        let handlers = Arc::new(ActionRegistry::new());
        let callbacks = Arc::new(Callbacks::default());

        let resize = EmbedResize::new(config.initial_loading, {
            let session = Arc::clone(&session);
            Arc::new(move |height: u32| {
                if let Err(err) = session.send(Body::Resize { height }) {
                    tracing::debug!(height, error = %err, "resize not sent");
                }
            })
        });

        let dispatcher = Dispatcher::new(
            Side::Embed,
            policy,
            Arc::clone(&session),
            Arc::clone(&handlers),
            Arc::clone(&callbacks),
        )
        .with_bound_hook({
            let resize = Arc::clone(&resize);
            Arc::new(move || {
                resize.notify();
            })
        });
        #[cfg(feature = "schema")]
        let dispatcher = dispatcher.with_schemas(config.schemas.clone());
        let dispatcher = Arc::new(dispatcher);

        let listener = Listener::spawn(window, Arc::clone(&dispatcher));
        let broadcast = config
            .broadcast_key
            .as_deref()
            .map(|key| BroadcastLink::open(key, Arc::clone(&callbacks)));

        tracing::info!(
            channel_id = session.channel_id().unwrap_or("<unbound>"),
            target_origin = session.outbound().target_origin(),
            "embed attached"
        );

        Ok(Self {
            session,
            handlers,
            callbacks,
            resize,
            dispatcher,
            listener: Mutex::new(Some(listener)),
            broadcast: Mutex::new(broadcast),
        })
    }

    /// Bound channel id; `None` until the host's init message arrives.
    pub fn channel_id(&self) -> Option<&str> {
        self.session.channel_id()
    }

    pub fn target_origin(&self) -> &str {
        self.session.outbound().target_origin()
    }

    /// Observe `root` and report its height now and on every change.
    pub fn attach_content_root(&self, root: ContentRoot) {
        self.resize.attach(root);
    }

    /// Disconnect the size observer.
    pub fn detach_content_root(&self) -> bool {
        self.resize.detach()
    }

    /// Report the current content height again.
    pub fn notify_size(&self) -> bool {
        self.resize.notify()
    }

    pub fn set_loading(&self, loading: bool) {
        self.resize.set_loading(loading);
    }

    pub fn is_loading(&self) -> bool {
        self.resize.loading().get()
    }

    pub fn watch_loading(&self) -> watch::Receiver<bool> {
        self.resize.loading().watch()
    }

    pub fn send_data(&self, payload: Value) -> Result<()> {
        self.session.send(Body::Data { payload })
    }

    pub fn send_action(&self, action: &str, payload: Option<Value>) -> Result<()> {
        self.session.send(Body::Action {
            action: action.to_string(),
            payload,
        })
    }

    /// Answer a request forwarded to the `on_unhandled` callback.
    pub fn send_response(&self, request_id: &str, result: HandlerResult) -> Result<()> {
        self.session.respond(request_id, result)
    }

    pub async fn send_request(&self, action: &str, payload: Option<Value>) -> Result<Value> {
        self.session
            .request(action, payload, self.session.request_timeout())
            .await
    }

    pub async fn send_request_with_timeout(
        &self,
        action: &str,
        payload: Option<Value>,
        timeout: Duration,
    ) -> Result<Value> {
        self.session.request(action, payload, timeout).await
    }

    pub fn register_action_handler(
        &self,
        action: impl Into<String>,
        handler: ActionHandler,
    ) -> Option<ActionHandler> {
        self.handlers.register(action, handler)
    }

    pub fn unregister_action_handler(&self, action: &str) -> Option<ActionHandler> {
        self.handlers.unregister(action)
    }

    pub fn on_data<F>(&self, callback: F)
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        self.callbacks.set_data(Arc::new(callback));
    }

    /// Receive actions and requests with no registered handler.
    pub fn on_unhandled<F>(&self, callback: F)
    where
        F: Fn(InboundCommand) + Send + Sync + 'static,
    {
        self.callbacks.set_unhandled(Arc::new(callback));
    }

    /// Receive values posted by other documents on the broadcast side channel.
    pub fn on_broadcast<F>(&self, callback: F)
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        self.callbacks.set_broadcast(Arc::new(callback));
    }

    /// Post `value` to every other participant on the broadcast side channel.
    pub fn broadcast(&self, value: Value) -> Result<()> {
        let link = lock(&self.broadcast);
        let link = link
            .as_ref()
            .ok_or_else(|| BridgeError::Closed("no broadcast channel open".to_string()))?;
        link.outgoing
            .send(value)
            .map_err(|_| BridgeError::Closed(format!("broadcast channel '{}' closed", link.name)))
    }

    /// Dispatch one event directly, bypassing the listener.
    pub fn handle_event(&self, event: &MessageEvent) -> Disposition {
        self.dispatcher.on_native_message(event)
    }

    /// Release every registration and reject pending requests.
    ///
    /// Returns the number of requests rejected. Idempotent.
    pub fn shutdown(&self) -> usize {
        if let Some(listener) = lock(&self.listener).take() {
            listener.stop();
        }
        self.resize.detach();
        if let Some(link) = lock(&self.broadcast).take() {
            link.close();
        }
        let rejected = self.session.close("embed shut down");
        self.callbacks.clear();
        rejected
    }

    pub fn is_attached(&self) -> bool {
        !self.session.is_closed()
    }
}

impl Drop for EmbedBridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for EmbedBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbedBridge")
            .field("channel_id", &self.channel_id())
            .field("target_origin", &self.target_origin())
            .field("loading", &self.is_loading())
            .field("handlers", &self.handlers)
            .field("attached", &self.is_attached())
            .finish()
    }
}

impl BroadcastLink {
    fn open(name: &str, callbacks: Arc<Callbacks>) -> Self {
        let mut channel = BroadcastChannel::open(name);
        let (outgoing, mut queued) = mpsc::unbounded_channel::<Value>();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    next = queued.recv() => match next {
                        Some(value) => {
                            if let Err(err) = channel.post(value) {
                                tracing::warn!(error = %err, "broadcast post failed");
                            }
                        }
                        None => break,
                    },
                    received = channel.recv() => match received {
                        Some(value) => {
                            if let Some(callback) = callbacks.broadcast() {
                                callback(value);
                            }
                        }
                        None => break,
                    },
                }
            }
            channel.close();
        });

        tracing::debug!(channel = name, "broadcast side channel opened");
        Self {
            name: name.to_string(),
            outgoing,
            task,
        }
    }

    fn close(self) {
        self.task.abort();
        tracing::debug!(channel = %self.name, "broadcast side channel closed");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
