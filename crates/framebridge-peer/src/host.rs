use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use framebridge_message::{set_channel_param, Body, ChannelBinding};
use framebridge_transport::{MessageEvent, MessageTarget, Url, Window};
use serde_json::Value;
use tokio::sync::watch;

use crate::config::HostConfig;
use crate::control::InitPayload;
use crate::correlator::PendingSummary;
use crate::dispatcher::{Dispatcher, Disposition, Side};
use crate::error::{BridgeError, Result};
use crate::handlers::{ActionHandler, ActionRegistry, Callbacks, HandlerResult, InboundCommand};
use crate::listener::Listener;
use crate::origin::OriginPolicy;
use crate::outbound::Outbound;
use crate::resize::LayoutState;
use crate::session::Session;

/// The host side of one mounted frame.
///
/// Mounting registers a listener on the host document; unmounting (or
/// dropping the bridge) removes it and rejects every pending request.
pub struct HostBridge {
    frame_url: Url,
    channel_id: String,
    session: Arc<Session>,
    handlers: Arc<ActionRegistry>,
    callbacks: Arc<Callbacks>,
    layout: Arc<LayoutState>,
    dispatcher: Arc<Dispatcher>,
    listener: Mutex<Option<Listener>>,
}

impl HostBridge {
    /// Mount a frame whose message endpoint is `frame`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn mount(window: &Window, frame: Arc<dyn MessageTarget>, config: HostConfig) -> Result<Self> {
        let target_origin = config.resolve_target_origin(window.origin())?;
        let policy = OriginPolicy::new(&target_origin, window.origin())?;

        let binding = ChannelBinding::from_config(config.channel_id.as_deref(), &config.channel_prefix);
        let channel_id = binding
            .id()
            .map(str::to_string)
            .ok_or_else(|| BridgeError::Config("host channel id unavailable".to_string()))?;
        let frame_url = resolve_frame_url(window, &config.url, &channel_id)?;

        let session = Arc::new(Session::new(
            binding,
            Outbound::new(frame, target_origin),
            config.request_timeout,
        ));
        let handlers = Arc::new(ActionRegistry::new());
        let callbacks = Arc::new(Callbacks::default());
        let layout = Arc::new(LayoutState::new(config.default_height));

        let dispatcher = Dispatcher::new(
            Side::Host,
            policy,
            Arc::clone(&session),
            Arc::clone(&handlers),
            Arc::clone(&callbacks),
        )
        .with_layout(Arc::clone(&layout));
        #[cfg(feature = "schema")]
        let dispatcher = dispatcher.with_schemas(config.schemas.clone());
        let dispatcher = Arc::new(dispatcher);

        let listener = Listener::spawn(window, Arc::clone(&dispatcher));
        tracing::info!(
            %channel_id,
            url = %frame_url,
            target_origin = session.outbound().target_origin(),
            "frame mounted"
        );

        Ok(Self {
            frame_url,
            channel_id,
            session,
            handlers,
            callbacks,
            layout,
            dispatcher,
            listener: Mutex::new(Some(listener)),
        })
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    /// The frame's load URL with the channel id in its query.
    pub fn frame_url(&self) -> &Url {
        &self.frame_url
    }

    pub fn target_origin(&self) -> &str {
        self.session.outbound().target_origin()
    }

    /// Last height reported by the embed, or the default.
    pub fn content_height(&self) -> u32 {
        self.layout.height()
    }

    /// True until the first resize arrives.
    pub fn is_loading(&self) -> bool {
        self.layout.is_loading()
    }

    pub fn watch_height(&self) -> watch::Receiver<u32> {
        self.layout.watch_height()
    }

    pub fn watch_loading(&self) -> watch::Receiver<bool> {
        self.layout.watch_loading()
    }

    /// Tell the embed its channel id. Call when the frame reports it has loaded.
    pub fn frame_loaded(&self) -> Result<()> {
        self.session
            .send(InitPayload::new(self.channel_id.as_str()).into_body())
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

    /// Send a request and wait for its response, with the configured timeout.
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

    /// Answer a request forwarded to the `on_unhandled` callback.
    pub fn send_response(&self, request_id: &str, result: HandlerResult) -> Result<()> {
        self.session.respond(request_id, result)
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

    pub fn pending_requests(&self) -> Vec<PendingSummary> {
        self.session.correlator().pending()
    }

    /// Dispatch one event directly, bypassing the listener.
    pub fn handle_event(&self, event: &MessageEvent) -> Disposition {
        self.dispatcher.on_native_message(event)
    }

    /// Remove the listener and reject every pending request.
    ///
    /// Returns the number of requests rejected. Idempotent.
    pub fn unmount(&self) -> usize {
        if let Some(listener) = self
            .listener
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
        {
            listener.stop();
        }
        let rejected = self.session.close("frame unmounted");
        self.callbacks.clear();
        if rejected > 0 {
            tracing::debug!(channel_id = %self.channel_id, rejected, "pending requests rejected on unmount");
        }
        rejected
    }

    pub fn is_mounted(&self) -> bool {
        !self.session.is_closed()
    }
}

/// Resolve the configured frame URL against the host document, then stamp the channel id.
fn resolve_frame_url(window: &Window, url: &str, channel_id: &str) -> Result<Url> {
    let mut frame_url = Url::parse(window.location())
        .and_then(|base| base.join(url.trim()))
        .map_err(|err| BridgeError::Config(format!("invalid frame url '{url}': {err}")))?;
    set_channel_param(&mut frame_url, channel_id);
    Ok(frame_url)
}

impl Drop for HostBridge {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl fmt::Debug for HostBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostBridge")
            .field("channel_id", &self.channel_id)
            .field("frame_url", &self.frame_url.as_str())
            .field("target_origin", &self.target_origin())
            .field("layout", &self.layout)
            .field("pending", &self.session.correlator().pending_count())
            .field("mounted", &self.is_mounted())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use framebridge_message::channel_param;
    use serde_json::json;

    use super::*;

    fn windows() -> (Arc<Window>, Arc<Window>) {
        (
            Window::open("https://app.example/dashboard").unwrap(),
            Window::open("https://widgets.example/embed").unwrap(),
        )
    }

    #[tokio::test]
    async fn mount_generates_stable_channel_and_frame_url() {
        let (host, embed) = windows();
        let bridge = HostBridge::mount(
            &host,
            Arc::new(embed.endpoint(&host)),
            HostConfig::new("https://widgets.example/embed?theme=dark").with_channel_prefix("chart"),
        )
        .unwrap();

        assert!(bridge.channel_id().starts_with("chart-"));
        assert_eq!(
            channel_param(bridge.frame_url()).as_deref(),
            Some(bridge.channel_id())
        );
        assert_eq!(bridge.target_origin(), "https://widgets.example");
        assert_eq!(bridge.content_height(), 150);
        assert!(bridge.is_loading());
        assert_eq!(host.listener_count(), 1);
    }

    #[tokio::test]
    async fn frame_loaded_posts_init_action() {
        let (host, embed) = windows();
        let mut inbox = embed.subscribe();
        let bridge = HostBridge::mount(
            &host,
            Arc::new(embed.endpoint(&host)),
            HostConfig::new("https://widgets.example/embed").with_channel_id("abc"),
        )
        .unwrap();

        bridge.frame_loaded().unwrap();
        let event = inbox.recv().await.unwrap();
        assert_eq!(event.origin, "https://app.example");
        assert_eq!(event.data["type"], "action");
        assert_eq!(event.data["action"], "framebridge:init");
        assert_eq!(event.data["payload"], json!({"channelId": "abc"}));
    }

    #[tokio::test]
    async fn unmount_removes_listener_and_refuses_sends() {
        let (host, embed) = windows();
        let bridge = HostBridge::mount(
            &host,
            Arc::new(embed.endpoint(&host)),
            HostConfig::new("https://widgets.example/embed"),
        )
        .unwrap();

        assert_eq!(bridge.unmount(), 0);
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        assert_eq!(host.listener_count(), 0);
        assert!(!bridge.is_mounted());
        assert!(matches!(
            bridge.send_data(json!(1)),
            Err(BridgeError::Closed(_))
        ));
        assert_eq!(bridge.unmount(), 0);
    }

    #[tokio::test]
    async fn invalid_url_fails_mount() {
        let (host, embed) = windows();
        let result = HostBridge::mount(
            &host,
            Arc::new(embed.endpoint(&host)),
            HostConfig::new("javascript:alert(1)"),
        );
        assert!(matches!(result, Err(BridgeError::Config(_))));
    }

    #[tokio::test]
    async fn relative_frame_url_resolves_against_host_document() {
        let (host, embed) = windows();
        let bridge = HostBridge::mount(
            &host,
            Arc::new(embed.endpoint(&host)),
            HostConfig::new("embed/chart?theme=dark").with_channel_id("abc"),
        )
        .unwrap();

        assert_eq!(
            bridge.frame_url().as_str(),
            "https://app.example/embed/chart?theme=dark&channelId=abc"
        );
        assert_eq!(bridge.target_origin(), "https://app.example");
    }

    #[tokio::test]
    async fn idn_frame_url_mounts_with_ascii_origin() {
        let (host, embed) = windows();
        let bridge = HostBridge::mount(
            &host,
            Arc::new(embed.endpoint(&host)),
            HostConfig::new("https://bücher.example/embed"),
        )
        .unwrap();

        assert_eq!(bridge.target_origin(), "https://xn--bcher-kva.example");
        assert_eq!(bridge.frame_url().host_str(), Some("xn--bcher-kva.example"));
    }
}
