use std::fmt;
use std::sync::Arc;

use framebridge_message::{encode, Message};
use framebridge_transport::MessageTarget;

/// The send half of a bridge: the peer document plus the target origin.
///
/// Sending is fire-and-forget. Failures are logged and swallowed, because
/// the native primitive gives no delivery guarantee either.
#[derive(Clone)]
pub struct Outbound {
    target: Arc<dyn MessageTarget>,
    target_origin: String,
}

impl Outbound {
    pub fn new(target: Arc<dyn MessageTarget>, target_origin: impl Into<String>) -> Self {
        Self {
            target,
            target_origin: target_origin.into(),
        }
    }

    pub fn target_origin(&self) -> &str {
        &self.target_origin
    }

    /// Encode and post `message`.
    pub fn send(&self, message: &Message) {
        let data = match encode(message) {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!(kind = %message.kind(), error = %err, "failed to encode message");
                return;
            }
        };

        match self.target.post_message(data, &self.target_origin) {
            Ok(()) => tracing::trace!(
                kind = %message.kind(),
                channel_id = message.channel_id(),
                "message posted"
            ),
            Err(err) => tracing::warn!(
                kind = %message.kind(),
                channel_id = message.channel_id(),
                error = %err,
                "failed to post message"
            ),
        }
    }
}

impl fmt::Debug for Outbound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Outbound")
            .field("target_origin", &self.target_origin)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use framebridge_message::{create_message_at, Body};
    use framebridge_transport::{Result as TransportResult, TransportError};
    use serde_json::{json, Value};

    use super::*;

    #[derive(Default)]
    struct Recorder {
        posted: Mutex<Vec<(Value, String)>>,
        fail: bool,
    }

    impl MessageTarget for Recorder {
        fn post_message(&self, data: Value, target_origin: &str) -> TransportResult<()> {
            if self.fail {
                return Err(TransportError::WindowClosed("gone".to_string()));
            }
            self.posted
                .lock()
                .unwrap()
                .push((data, target_origin.to_string()));
            Ok(())
        }
    }

    #[test]
    fn posts_encoded_message_with_target_origin() {
        let recorder = Arc::new(Recorder::default());
        let outbound = Outbound::new(recorder.clone(), "https://widgets.example");

        outbound.send(&create_message_at("c", Body::Resize { height: 42 }, 5));

        let posted = recorder.posted.lock().unwrap();
        assert_eq!(
            posted.as_slice(),
            &[(
                json!({"type": "resize", "channelId": "c", "height": 42, "timestamp": 5}),
                "https://widgets.example".to_string()
            )]
        );
    }

    #[test]
    fn post_failure_is_swallowed() {
        let recorder = Arc::new(Recorder {
            fail: true,
            ..Recorder::default()
        });
        let outbound = Outbound::new(recorder, "*");
        outbound.send(&create_message_at("c", Body::Data { payload: json!(1) }, 5));
        assert_eq!(outbound.target_origin(), "*");
    }
}
