use serde::{Deserialize, Serialize};
use serde_json::Value;

use framebridge_message::Body;

/// Action name of the host's initialization message.
pub const INIT_ACTION: &str = "framebridge:init";

/// Payload of the initialization message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitPayload {
    pub channel_id: String,
}

impl InitPayload {
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
        }
    }

    /// The `Action` body carrying this payload.
    pub fn into_body(self) -> Body {
        Body::Action {
            action: INIT_ACTION.to_string(),
            payload: serde_json::to_value(self).ok(),
        }
    }

    /// Read an init payload. Returns `None` when absent, mistyped, or empty.
    pub fn parse(payload: Option<&Value>) -> Option<Self> {
        let payload = InitPayload::deserialize(payload?).ok()?;
        (!payload.channel_id.is_empty()).then_some(payload)
    }
}
