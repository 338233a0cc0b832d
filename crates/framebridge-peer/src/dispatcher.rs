//! Inbound dispatch.
//!
//! One [`Dispatcher`] serves one local side of one channel. Every raw event
//! on the document's message stream passes through
//! [`Dispatcher::on_native_message`], which checks the origin, decodes the
//! wire value, filters by channel, and routes by kind. Nothing here returns
//! an error to the event loop: the outcome is a [`Disposition`].

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use framebridge_message::{decode, BindOutcome, Message};
use framebridge_transport::MessageEvent;
use futures::FutureExt;
use serde_json::Value;

use crate::control::{InitPayload, INIT_ACTION};
use crate::handlers::{ActionRegistry, Callbacks, HandlerResult, InboundCommand};
use crate::origin::OriginPolicy;
use crate::resize::LayoutState;
use crate::session::Session;

/// Which end of the frame boundary a bridge sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Host,
    Embed,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Host => "host",
            Side::Embed => "embed",
        })
    }
}

/// Why an inbound event was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// Declared origin is not the configured peer origin.
    OriginMismatch,
    /// Not a well-formed message.
    Malformed(String),
    /// Addressed to another channel.
    ForeignChannel,
    /// A kind this side never receives, such as `resize` at the embed.
    ProtocolViolation,
    /// Payload failed validation.
    InvalidPayload(String),
    /// The local side has been torn down.
    Closed,
}

/// What the dispatcher did with one inbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    Dropped(DropReason),
    /// Host applied a resize.
    Resized { height: u32 },
    /// Data forwarded to the data callback, if any.
    Data,
    /// A response was checked against pending requests.
    Response { matched: bool },
    /// A registered handler was started.
    Handled { action: String },
    /// Passed to the fallback callback.
    Forwarded { action: String },
    /// No handler and no fallback. Requests were answered with a failure.
    Unhandled { action: String },
    /// The embed bound itself to the channel named by an init message.
    Bound { channel_id: String },
}

impl Disposition {
    pub fn is_dropped(&self) -> bool {
        matches!(self, Disposition::Dropped(_))
    }
}

pub(crate) type BoundHook = Arc<dyn Fn() + Send + Sync>;

/// Inbound router for one side of one channel.
pub struct Dispatcher {
    side: Side,
    policy: OriginPolicy,
    session: Arc<Session>,
    handlers: Arc<ActionRegistry>,
    callbacks: Arc<Callbacks>,
    layout: Option<Arc<LayoutState>>,
    on_bound: Option<BoundHook>,
    #[cfg(feature = "schema")]
    schemas: Option<Arc<framebridge_schema::SchemaRegistry>>,
}

impl Dispatcher {
    pub(crate) fn new(
        side: Side,
        policy: OriginPolicy,
        session: Arc<Session>,
        handlers: Arc<ActionRegistry>,
        callbacks: Arc<Callbacks>,
    ) -> Self {
        Self {
            side,
            policy,
            session,
            handlers,
            callbacks,
            layout: None,
            on_bound: None,
            #[cfg(feature = "schema")]
            schemas: None,
        }
    }

    /// Host side: apply `resize` messages to `layout`.
    pub(crate) fn with_layout(mut self, layout: Arc<LayoutState>) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Embed side: run `hook` whenever an init message binds or confirms the channel.
    pub(crate) fn with_bound_hook(mut self, hook: BoundHook) -> Self {
        self.on_bound = Some(hook);
        self
    }

    #[cfg(feature = "schema")]
    pub(crate) fn with_schemas(
        mut self,
        schemas: Option<Arc<framebridge_schema::SchemaRegistry>>,
    ) -> Self {
        self.schemas = schemas;
        self
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Process one raw event from the document's message stream.
    ///
    /// Handlers run on their own tasks, so this must be called from within
    /// a tokio runtime.
    pub fn on_native_message(&self, event: &MessageEvent) -> Disposition {
        if self.session.is_closed() {
            return Disposition::Dropped(DropReason::Closed);
        }

        // Origin first: nothing about the payload is looked at before this.
        if !self.policy.allows(&event.origin) {
            tracing::trace!(side = %self.side, origin = %event.origin, "origin mismatch; event ignored");
            return Disposition::Dropped(DropReason::OriginMismatch);
        }

        let message = match decode(&event.data) {
            Ok(message) => message,
            Err(err) => {
                tracing::debug!(side = %self.side, origin = %event.origin, error = %err, "malformed message dropped");
                return Disposition::Dropped(DropReason::Malformed(err.to_string()));
            }
        };

        if let Message::Action(action) = &message {
            if self.side == Side::Embed && action.action == INIT_ACTION {
                return self.bind(action.payload.as_ref());
            }
        }

        if !self.session.channel().accepts(message.channel_id()) {
            tracing::trace!(
                side = %self.side,
                channel_id = message.channel_id(),
                "message for another channel ignored"
            );
            return Disposition::Dropped(DropReason::ForeignChannel);
        }

        self.route(message)
    }

    fn bind(&self, payload: Option<&Value>) -> Disposition {
        let Some(init) = InitPayload::parse(payload) else {
            tracing::debug!("init message without a usable channel id dropped");
            return Disposition::Dropped(DropReason::InvalidPayload(
                "init payload requires a non-empty channelId".to_string(),
            ));
        };

        match self.session.channel().bind(&init.channel_id) {
            BindOutcome::Conflict => {
                tracing::trace!(channel_id = %init.channel_id, "init for another channel ignored");
                Disposition::Dropped(DropReason::ForeignChannel)
            }
            outcome => {
                if outcome == BindOutcome::Bound {
                    tracing::info!(channel_id = %init.channel_id, "embed bound to channel");
                }
                if let Some(hook) = &self.on_bound {
                    hook();
                }
                Disposition::Bound {
                    channel_id: init.channel_id,
                }
            }
        }
    }

    fn route(&self, message: Message) -> Disposition {
        match message {
            Message::Resize(resize) => match (&self.layout, self.side) {
                (Some(layout), Side::Host) => {
                    if layout.apply_resize(resize.height) {
                        tracing::debug!(channel_id = %resize.channel_id, height = resize.height, "frame resized");
                    }
                    Disposition::Resized {
                        height: resize.height,
                    }
                }
                _ => {
                    tracing::debug!(side = %self.side, "resize received outside the host; dropped");
                    Disposition::Dropped(DropReason::ProtocolViolation)
                }
            },
            Message::Response(response) => Disposition::Response {
                matched: self.session.correlator().complete(&response),
            },
            Message::Data(data) => {
                if let Some(callback) = self.callbacks.data() {
                    guard_callback("data", || callback(data.payload));
                }
                Disposition::Data
            }
            Message::Action(action) => self.command(InboundCommand {
                action: action.action,
                payload: action.payload,
                request_id: None,
            }),
            Message::Request(request) => self.command(InboundCommand {
                action: request.action,
                payload: request.payload,
                request_id: Some(request.request_id),
            }),
        }
    }

    fn command(&self, command: InboundCommand) -> Disposition {
        #[cfg(feature = "schema")]
        if let Some(schemas) = &self.schemas {
            if let Err(err) = schemas.validate(&command.action, command.payload.as_ref()) {
                tracing::warn!(action = %command.action, error = %err, "payload failed validation");
                if let Some(request_id) = &command.request_id {
                    self.respond(request_id, Err(err.to_string()));
                }
                return Disposition::Dropped(DropReason::InvalidPayload(err.to_string()));
            }
        }

        if let Some(handler) = self.handlers.get(&command.action) {
            let InboundCommand {
                action,
                payload,
                request_id,
            } = command;
            self.spawn_handler(action.clone(), request_id, || handler(payload));
            return Disposition::Handled { action };
        }

        if let Some(fallback) = self.callbacks.unhandled() {
            let action = command.action.clone();
            guard_callback("unhandled", || fallback(command));
            return Disposition::Forwarded { action };
        }

        match &command.request_id {
            Some(request_id) => {
                tracing::debug!(action = %command.action, %request_id, "unhandled request rejected");
                self.respond(
                    request_id,
                    Err(format!("unhandled action '{}'", command.action)),
                );
            }
            None => tracing::trace!(action = %command.action, "unhandled action dropped"),
        }
        Disposition::Unhandled {
            action: command.action,
        }
    }

    fn spawn_handler<F>(&self, action: String, request_id: Option<String>, start: F)
    where
        F: FnOnce() -> crate::handlers::HandlerFuture,
    {
        let started = std::panic::catch_unwind(AssertUnwindSafe(start));
        let session = Arc::clone(&self.session);

        tokio::spawn(async move {
            let outcome: HandlerResult = match started {
                Ok(future) => AssertUnwindSafe(future)
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| Err(panic_message(panic.as_ref()))),
                Err(panic) => Err(panic_message(panic.as_ref())),
            };

            match (request_id, outcome) {
                (Some(request_id), outcome) => {
                    if let Err(err) = &outcome {
                        tracing::warn!(%action, %request_id, error = %err, "request handler failed");
                    }
                    if let Err(err) = session.respond(&request_id, outcome) {
                        tracing::debug!(%action, %request_id, error = %err, "response not sent");
                    }
                }
                (None, Err(err)) => {
                    tracing::warn!(%action, error = %err, "action handler failed");
                }
                (None, Ok(_)) => {}
            }
        });
    }

    fn respond(&self, request_id: &str, result: HandlerResult) {
        if let Err(err) = self.session.respond(request_id, result) {
            tracing::debug!(%request_id, error = %err, "response not sent");
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("side", &self.side)
            .field("policy", &self.policy)
            .field("channel_id", &self.session.channel_id())
            .finish_non_exhaustive()
    }
}

fn guard_callback(name: &str, callback: impl FnOnce()) {
    if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(callback)) {
        tracing::warn!(callback = name, error = %panic_message(panic.as_ref()), "callback panicked");
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned());
    match detail {
        Some(detail) => format!("handler panicked: {detail}"),
        None => "handler panicked".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use framebridge_message::{create_message_at, encode, Body, ChannelBinding};
    use framebridge_transport::{MessageTarget, Origin, Result as TransportResult};
    use serde_json::json;

    use super::*;
    use crate::handlers::handler_fn;
    use crate::outbound::Outbound;

    const HOST: &str = "https://app.example";
    const EMBED: &str = "https://widgets.example";

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Value>>);

    impl Recorder {
        fn posted(&self) -> Vec<Value> {
            self.0.lock().unwrap().clone()
        }
    }

    impl MessageTarget for Recorder {
        fn post_message(&self, data: Value, _target_origin: &str) -> TransportResult<()> {
            self.0.lock().unwrap().push(data);
            Ok(())
        }
    }

    struct Fixture {
        dispatcher: Dispatcher,
        recorder: Arc<Recorder>,
        handlers: Arc<ActionRegistry>,
        callbacks: Arc<Callbacks>,
        session: Arc<Session>,
    }

    fn fixture(side: Side, channel: ChannelBinding, peer: &str) -> Fixture {
        let own = Origin::parse(match side {
            Side::Host => HOST,
            Side::Embed => EMBED,
        })
        .unwrap();
        let recorder = Arc::new(Recorder::default());
        let session = Arc::new(Session::new(
            channel,
            Outbound::new(recorder.clone(), peer),
            Duration::from_secs(5),
        ));
        let handlers = Arc::new(ActionRegistry::new());
        let callbacks = Arc::new(Callbacks::default());
        let dispatcher = Dispatcher::new(
            side,
            OriginPolicy::new(peer, &own).unwrap(),
            Arc::clone(&session),
            Arc::clone(&handlers),
            Arc::clone(&callbacks),
        );
        Fixture {
            dispatcher,
            recorder,
            handlers,
            callbacks,
            session,
        }
    }

    fn event(origin: &str, channel: &str, body: Body) -> MessageEvent {
        MessageEvent {
            origin: origin.to_string(),
            data: encode(&create_message_at(channel, body, 1)).unwrap(),
        }
    }

    fn request(id: &str, action: &str) -> Body {
        Body::Request {
            request_id: id.to_string(),
            action: action.to_string(),
            payload: None,
        }
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn origin_mismatch_is_dropped_for_every_kind() {
        let f = fixture(Side::Embed, ChannelBinding::explicit("abc"), HOST);
        let seen = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&seen);
        f.callbacks
            .set_data(Arc::new(move |_: Value| *counter.lock().unwrap() += 1));
        f.handlers
            .register("a", handler_fn(|_| Ok::<_, String>(json!(1))));

        let bodies = [
            Body::Data { payload: json!(1) },
            Body::Action {
                action: "a".to_string(),
                payload: None,
            },
            request("r", "a"),
            Body::success("r", json!(1)),
            Body::Resize { height: 1 },
        ];
        for body in bodies {
            let disposition = f
                .dispatcher
                .on_native_message(&event("https://evil.example", "abc", body));
            assert_eq!(disposition, Disposition::Dropped(DropReason::OriginMismatch));
        }
        settle().await;
        assert_eq!(*seen.lock().unwrap(), 0);
        assert!(f.recorder.posted().is_empty());
    }

    #[tokio::test]
    async fn malformed_and_foreign_messages_are_dropped() {
        let f = fixture(Side::Host, ChannelBinding::explicit("a"), EMBED);

        let garbage = MessageEvent {
            origin: EMBED.to_string(),
            data: json!({"type": "resize", "channelId": "a", "height": "tall"}),
        };
        assert!(matches!(
            f.dispatcher.on_native_message(&garbage),
            Disposition::Dropped(DropReason::Malformed(_))
        ));

        let foreign = event(EMBED, "b", Body::Data { payload: json!(1) });
        assert_eq!(
            f.dispatcher.on_native_message(&foreign),
            Disposition::Dropped(DropReason::ForeignChannel)
        );
    }

    #[tokio::test]
    async fn host_applies_resize_and_embed_rejects_it() {
        let f = fixture(Side::Host, ChannelBinding::explicit("abc"), EMBED);
        let layout = Arc::new(LayoutState::new(150));
        let host = Dispatcher::new(
            Side::Host,
            OriginPolicy::new(EMBED, &Origin::parse(HOST).unwrap()).unwrap(),
            Arc::clone(&f.session),
            Arc::clone(&f.handlers),
            Arc::clone(&f.callbacks),
        )
        .with_layout(Arc::clone(&layout));

        assert_eq!(
            host.on_native_message(&event(EMBED, "abc", Body::Resize { height: 620 })),
            Disposition::Resized { height: 620 }
        );
        assert_eq!(layout.height(), 620);
        assert!(!layout.is_loading());

        let embed = fixture(Side::Embed, ChannelBinding::explicit("abc"), HOST);
        assert_eq!(
            embed
                .dispatcher
                .on_native_message(&event(HOST, "abc", Body::Resize { height: 1 })),
            Disposition::Dropped(DropReason::ProtocolViolation)
        );
    }

    #[tokio::test]
    async fn request_with_handler_is_answered() {
        let f = fixture(Side::Embed, ChannelBinding::explicit("abc"), HOST);
        f.handlers.register(
            "TOGGLE_THEME",
            handler_fn(|_| Ok::<_, String>(json!({"toggled": true}))),
        );

        let disposition = f
            .dispatcher
            .on_native_message(&event(HOST, "abc", request("r-1", "TOGGLE_THEME")));
        assert_eq!(
            disposition,
            Disposition::Handled {
                action: "TOGGLE_THEME".to_string()
            }
        );

        settle().await;
        let posted = f.recorder.posted();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0]["type"], "response");
        assert_eq!(posted[0]["requestId"], "r-1");
        assert_eq!(posted[0]["success"], true);
        assert_eq!(posted[0]["payload"], json!({"toggled": true}));
    }

    #[tokio::test]
    async fn handler_error_and_panic_become_failed_responses() {
        let f = fixture(Side::Embed, ChannelBinding::explicit("abc"), HOST);
        f.handlers
            .register("fails", handler_fn(|_| Err::<Value, _>("no theme")));
        f.handlers.register(
            "panics",
            handler_fn(|_| -> Result<Value, String> { panic!("kaboom") }),
        );

        f.dispatcher
            .on_native_message(&event(HOST, "abc", request("r-1", "fails")));
        f.dispatcher
            .on_native_message(&event(HOST, "abc", request("r-2", "panics")));
        settle().await;

        let posted = f.recorder.posted();
        assert_eq!(posted.len(), 2);
        let by_id = |id: &str| {
            posted
                .iter()
                .find(|value| value["requestId"] == id)
                .cloned()
                .unwrap()
        };
        assert_eq!(by_id("r-1")["success"], false);
        assert_eq!(by_id("r-1")["error"], "no theme");
        assert_eq!(by_id("r-2")["success"], false);
        assert_eq!(by_id("r-2")["error"], "handler panicked: kaboom");
    }

    #[tokio::test]
    async fn unhandled_request_fails_and_action_is_dropped() {
        let f = fixture(Side::Embed, ChannelBinding::explicit("abc"), HOST);

        let disposition = f
            .dispatcher
            .on_native_message(&event(HOST, "abc", request("r-1", "missing")));
        assert_eq!(
            disposition,
            Disposition::Unhandled {
                action: "missing".to_string()
            }
        );
        let action = Body::Action {
            action: "missing".to_string(),
            payload: None,
        };
        f.dispatcher.on_native_message(&event(HOST, "abc", action));

        let posted = f.recorder.posted();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0]["success"], false);
        assert_eq!(posted[0]["error"], "unhandled action 'missing'");
    }

    #[tokio::test]
    async fn fallback_receives_unhandled_commands() {
        let f = fixture(Side::Host, ChannelBinding::explicit("abc"), EMBED);
        let forwarded = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&forwarded);
        f.callbacks
            .set_unhandled(Arc::new(move |command: InboundCommand| {
                sink.lock().unwrap().push(command)
            }));

        let disposition = f
            .dispatcher
            .on_native_message(&event(EMBED, "abc", request("r-7", "open")));
        assert_eq!(
            disposition,
            Disposition::Forwarded {
                action: "open".to_string()
            }
        );

        let forwarded = forwarded.lock().unwrap();
        assert_eq!(forwarded[0].request_id.as_deref(), Some("r-7"));
        assert!(f.recorder.posted().is_empty());
    }

    #[tokio::test]
    async fn data_reaches_callback_and_callback_panic_is_contained() {
        let f = fixture(Side::Host, ChannelBinding::explicit("abc"), EMBED);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        f.callbacks.set_data(Arc::new(move |payload: Value| {
            if payload == json!("explode") {
                panic!("callback bug");
            }
            sink.lock().unwrap().push(payload);
        }));

        for payload in [json!({"rows": 3}), json!("explode"), json!(null)] {
            let disposition = f
                .dispatcher
                .on_native_message(&event(EMBED, "abc", Body::Data { payload }));
            assert_eq!(disposition, Disposition::Data);
        }
        assert_eq!(*seen.lock().unwrap(), vec![json!({"rows": 3}), json!(null)]);
    }

    #[tokio::test]
    async fn init_binds_unbound_embed_once() {
        let f = fixture(Side::Embed, ChannelBinding::unbound(), HOST);
        let bound = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&bound);
        let dispatcher = Dispatcher::new(
            Side::Embed,
            OriginPolicy::new(HOST, &Origin::parse(EMBED).unwrap()).unwrap(),
            Arc::clone(&f.session),
            Arc::clone(&f.handlers),
            Arc::clone(&f.callbacks),
        )
        .with_bound_hook(Arc::new(move || *counter.lock().unwrap() += 1));

        let init = |id: &str| event(HOST, id, InitPayload::new(id).into_body());
        assert_eq!(
            dispatcher.on_native_message(&init("abc")),
            Disposition::Bound {
                channel_id: "abc".to_string()
            }
        );
        assert_eq!(f.session.channel_id(), Some("abc"));
        assert_eq!(
            dispatcher.on_native_message(&init("xyz")),
            Disposition::Dropped(DropReason::ForeignChannel)
        );
        assert_eq!(f.session.channel_id(), Some("abc"));
        assert_eq!(*bound.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn response_is_matched_through_correlator() {
        let f = fixture(Side::Host, ChannelBinding::explicit("abc"), EMBED);
        let disposition = f
            .dispatcher
            .on_native_message(&event(EMBED, "abc", Body::success("unknown", json!(1))));
        assert_eq!(disposition, Disposition::Response { matched: false });
    }

    #[cfg(feature = "schema")]
    #[tokio::test]
    async fn schema_failure_rejects_request_and_drops_action() {
        let f = fixture(Side::Embed, ChannelBinding::explicit("abc"), HOST);
        let registry = framebridge_schema::SchemaRegistry::from_embedded(&[(
            "SET_THEME",
            r#"{"type": "object", "required": ["theme"], "properties": {"theme": {"type": "string"}}}"#,
        )])
        .unwrap();
        let dispatcher = Dispatcher::new(
            Side::Embed,
            OriginPolicy::new(HOST, &Origin::parse(EMBED).unwrap()).unwrap(),
            Arc::clone(&f.session),
            Arc::clone(&f.handlers),
            Arc::clone(&f.callbacks),
        )
        .with_schemas(Some(Arc::new(registry)));

        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        f.handlers.register(
            "SET_THEME",
            handler_fn(move |_| {
                *counter.lock().unwrap() += 1;
                Ok::<_, String>(json!(true))
            }),
        );

        let bad_request = Body::Request {
            request_id: "r-1".to_string(),
            action: "SET_THEME".to_string(),
            payload: Some(json!({"theme": 3})),
        };
        assert!(matches!(
            dispatcher.on_native_message(&event(HOST, "abc", bad_request)),
            Disposition::Dropped(DropReason::InvalidPayload(_))
        ));

        let bad_action = Body::Action {
            action: "SET_THEME".to_string(),
            payload: None,
        };
        assert!(matches!(
            dispatcher.on_native_message(&event(HOST, "abc", bad_action)),
            Disposition::Dropped(DropReason::InvalidPayload(_))
        ));

        let good_action = Body::Action {
            action: "SET_THEME".to_string(),
            payload: Some(json!({"theme": "dark"})),
        };
        assert_eq!(
            dispatcher.on_native_message(&event(HOST, "abc", good_action)),
            Disposition::Handled {
                action: "SET_THEME".to_string()
            }
        );
        settle().await;

        let posted = f.recorder.posted();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0]["type"], "response");
        assert_eq!(posted[0]["requestId"], "r-1");
        assert_eq!(posted[0]["success"], false);
        assert!(!posted[0]["error"].as_str().unwrap().is_empty());
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn closed_session_drops_everything() {
        let f = fixture(Side::Host, ChannelBinding::explicit("abc"), EMBED);
        f.session.close("unmounted");
        assert_eq!(
            f.dispatcher
                .on_native_message(&event(EMBED, "abc", Body::Data { payload: json!(1) })),
            Disposition::Dropped(DropReason::Closed)
        );
    }
}
