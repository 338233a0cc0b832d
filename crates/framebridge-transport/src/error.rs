/// Errors that can occur in cross-document transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The string is not a usable origin or absolute URL.
    #[error("invalid origin '{input}': {reason}")]
    InvalidOrigin { input: String, reason: String },

    /// The target window has been closed.
    #[error("target window closed: {0}")]
    WindowClosed(String),

    /// The broadcast channel has been closed.
    #[error("broadcast channel '{0}' closed")]
    ChannelClosed(String),
}

impl TransportError {
    pub(crate) fn invalid_origin(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidOrigin {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
