use std::time::Duration;

/// Errors that can occur in bridge operations.
///
/// None of these cross the native event boundary: inbound failures are
/// reported as a [`crate::Disposition`], outbound failures to the caller.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] framebridge_transport::TransportError),

    /// Message encoding/decoding error.
    #[error("message error: {0}")]
    Message(#[from] framebridge_message::MessageError),

    /// The bridge configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// No response arrived before the request deadline.
    #[error("request '{action}' timed out after {timeout:?}")]
    Timeout { action: String, timeout: Duration },

    /// The peer answered with `success: false`.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The local side has been torn down.
    #[error("bridge closed: {0}")]
    Closed(String),

    /// The local side has no channel id yet.
    #[error("channel not bound")]
    Unbound,

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Schema validation error.
    #[cfg(feature = "schema")]
    #[error("schema validation error: {0}")]
    Schema(#[from] framebridge_schema::SchemaError),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
