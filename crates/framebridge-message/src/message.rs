use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire `type` discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Resize,
    Data,
    Action,
    Request,
    Response,
}

impl MessageKind {
    pub const ALL: [MessageKind; 5] = [
        MessageKind::Resize,
        MessageKind::Data,
        MessageKind::Action,
        MessageKind::Request,
        MessageKind::Response,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Resize => "resize",
            MessageKind::Data => "data",
            MessageKind::Action => "action",
            MessageKind::Request => "request",
            MessageKind::Response => "response",
        }
    }

    /// Look up a kind by its wire string.
    pub fn from_wire(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Embed → host: the embedded content's measured height in CSS pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizeMessage {
    pub channel_id: String,
    pub height: u32,
    pub timestamp: u64,
}

/// Opaque payload, either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataMessage {
    pub channel_id: String,
    #[serde(default)]
    pub payload: Value,
    pub timestamp: u64,
}

/// Fire-and-forget command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionMessage {
    pub channel_id: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    pub timestamp: u64,
}

/// Command expecting exactly one [`ResponseMessage`] with the same `request_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMessage {
    pub channel_id: String,
    pub request_id: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    pub timestamp: u64,
}

/// Outcome of a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMessage {
    pub channel_id: String,
    pub request_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: u64,
}

/// A wire message, one variant per kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    Resize(ResizeMessage),
    Data(DataMessage),
    Action(ActionMessage),
    Request(RequestMessage),
    Response(ResponseMessage),
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Resize(_) => MessageKind::Resize,
            Message::Data(_) => MessageKind::Data,
            Message::Action(_) => MessageKind::Action,
            Message::Request(_) => MessageKind::Request,
            Message::Response(_) => MessageKind::Response,
        }
    }

    pub fn channel_id(&self) -> &str {
        match self {
            Message::Resize(m) => &m.channel_id,
            Message::Data(m) => &m.channel_id,
            Message::Action(m) => &m.channel_id,
            Message::Request(m) => &m.channel_id,
            Message::Response(m) => &m.channel_id,
        }
    }

    pub fn timestamp(&self) -> u64 {
        match self {
            Message::Resize(m) => m.timestamp,
            Message::Data(m) => m.timestamp,
            Message::Action(m) => m.timestamp,
            Message::Request(m) => m.timestamp,
            Message::Response(m) => m.timestamp,
        }
    }

    /// Correlation id for requests and responses.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Message::Request(m) => Some(&m.request_id),
            Message::Response(m) => Some(&m.request_id),
            _ => None,
        }
    }

    /// Action name for actions and requests.
    pub fn action(&self) -> Option<&str> {
        match self {
            Message::Action(m) => Some(&m.action),
            Message::Request(m) => Some(&m.action),
            _ => None,
        }
    }
}

/// Kind-specific fields of a message, without the stamped metadata.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Resize {
        height: u32,
    },
    Data {
        payload: Value,
    },
    Action {
        action: String,
        payload: Option<Value>,
    },
    Request {
        request_id: String,
        action: String,
        payload: Option<Value>,
    },
    Response {
        request_id: String,
        success: bool,
        payload: Option<Value>,
        error: Option<String>,
    },
}

impl Body {
    pub fn kind(&self) -> MessageKind {
        match self {
            Body::Resize { .. } => MessageKind::Resize,
            Body::Data { .. } => MessageKind::Data,
            Body::Action { .. } => MessageKind::Action,
            Body::Request { .. } => MessageKind::Request,
            Body::Response { .. } => MessageKind::Response,
        }
    }

    /// Successful response carrying `payload`.
    pub fn success(request_id: impl Into<String>, payload: Value) -> Self {
        Body::Response {
            request_id: request_id.into(),
            success: true,
            payload: Some(payload),
            error: None,
        }
    }

    /// Failed response carrying `error`.
    pub fn failure(request_id: impl Into<String>, error: impl Into<String>) -> Self {
        Body::Response {
            request_id: request_id.into(),
            success: false,
            payload: None,
            error: Some(error.into()),
        }
    }
}

/// Build a message for `channel_id`, stamping the current time.
///
/// Fields are not validated here; receivers validate on decode.
pub fn create_message(channel_id: &str, body: Body) -> Message {
    create_message_at(channel_id, body, now_millis())
}

/// Build a message with an explicit timestamp.
pub fn create_message_at(channel_id: &str, body: Body, timestamp: u64) -> Message {
    let channel_id = channel_id.to_string();
    match body {
        Body::Resize { height } => Message::Resize(ResizeMessage {
            channel_id,
            height,
            timestamp,
        }),
        Body::Data { payload } => Message::Data(DataMessage {
            channel_id,
            payload,
            timestamp,
        }),
        Body::Action { action, payload } => Message::Action(ActionMessage {
            channel_id,
            action,
            payload,
            timestamp,
        }),
        Body::Request {
            request_id,
            action,
            payload,
        } => Message::Request(RequestMessage {
            channel_id,
            request_id,
            action,
            payload,
            timestamp,
        }),
        Body::Response {
            request_id,
            success,
            payload,
            error,
        } => Message::Response(ResponseMessage {
            channel_id,
            request_id,
            success,
            payload,
            error,
            timestamp,
        }),
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
