/// Errors that can occur while encoding or decoding wire messages.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// The value is not a JSON object.
    #[error("message is not a JSON object (got {0})")]
    NotAnObject(&'static str),

    /// The `type` discriminator is missing or not a string.
    #[error("message has no string `type` field")]
    MissingType,

    /// The `type` discriminator names no known message kind.
    #[error("unknown message type '{0}'")]
    UnknownType(String),

    /// A field is missing or has the wrong shape for the message kind.
    #[error("malformed {kind} message: {reason}")]
    Malformed { kind: &'static str, reason: String },

    /// The encoded text exceeds the configured maximum.
    #[error("encoded message too large ({size} bytes, max {max})")]
    TooLarge { size: usize, max: usize },

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MessageError>;
