/// Errors that can occur during schema validation.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The schema file could not be loaded.
    #[error("failed to load schema: {0}")]
    LoadFailed(String),

    /// The schema could not be compiled.
    #[error("failed to compile schema: {0}")]
    CompileFailed(String),

    /// The payload failed schema validation.
    #[error("payload for action '{action}' failed validation: {message}")]
    ValidationFailed { action: String, message: String },

    /// The schema text is not valid JSON.
    #[error("schema is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// No schema registered for the given action.
    #[error("no schema registered for action '{0}'")]
    NoSchema(String),
}

pub type Result<T> = std::result::Result<T, SchemaError>;
