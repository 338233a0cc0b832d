use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use framebridge_message::{create_message, Body, ChannelBinding};
use serde_json::Value;

use crate::correlator::Correlator;
use crate::error::{BridgeError, Result};
use crate::handlers::HandlerResult;
use crate::outbound::Outbound;

/// Per-side state shared by a bridge, its dispatcher, and its tasks.
#[derive(Debug)]
pub(crate) struct Session {
    channel: ChannelBinding,
    outbound: Outbound,
    correlator: Correlator,
    request_timeout: Duration,
    closed: AtomicBool,
}

impl Session {
    pub(crate) fn new(channel: ChannelBinding, outbound: Outbound, request_timeout: Duration) -> Self {
        Self {
            channel,
            outbound,
            correlator: Correlator::new(),
            request_timeout,
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn channel(&self) -> &ChannelBinding {
        &self.channel
    }

    pub(crate) fn channel_id(&self) -> Option<&str> {
        self.channel.id()
    }

    pub(crate) fn outbound(&self) -> &Outbound {
        &self.outbound
    }

    pub(crate) fn correlator(&self) -> &Correlator {
        &self.correlator
    }

    pub(crate) fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Stamp `body` with the bound channel and post it.
    pub(crate) fn send(&self, body: Body) -> Result<()> {
        if self.is_closed() {
            return Err(BridgeError::Closed("bridge torn down".to_string()));
        }
        let Some(channel_id) = self.channel.id() else {
            tracing::debug!(kind = %body.kind(), "channel not bound; message dropped");
            return Err(BridgeError::Unbound);
        };
        self.outbound.send(&create_message(channel_id, body));
        Ok(())
    }

    pub(crate) async fn request(
        &self,
        action: &str,
        payload: Option<Value>,
        timeout: Duration,
    ) -> Result<Value> {
        if timeout.is_zero() {
            return Err(BridgeError::Config(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        self.correlator
            .request(action, timeout, |request_id| {
                self.send(Body::Request {
                    request_id: request_id.to_string(),
                    action: action.to_string(),
                    payload,
                })
            })
            .await
    }

    /// Answer `request_id` with a handler outcome.
    pub(crate) fn respond(&self, request_id: &str, result: HandlerResult) -> Result<()> {
        let body = match result {
            Ok(payload) => Body::success(request_id, payload),
            Err(error) => Body::failure(request_id, error),
        };
        self.send(body)
    }

    /// Mark the session closed and reject pending requests.
    ///
    /// Returns the number of requests rejected; zero on repeat calls.
    pub(crate) fn close(&self, reason: &str) -> usize {
        if self.closed.swap(true, Ordering::AcqRel) {
            return 0;
        }
        let rejected = self.correlator.reject_all(reason);
        tracing::debug!(
            channel_id = self.channel.id().unwrap_or("<unbound>"),
            rejected,
            reason,
            "session closed"
        );
        rejected
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
