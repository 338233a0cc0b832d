use jsonschema::Validator;
use serde_json::Value;

use crate::error::{Result, SchemaError};

static NULL: Value = Value::Null;

/// Validate `payload` for `action`; an absent payload validates as `null`.
pub(crate) fn validate_payload(
    action: &str,
    payload: Option<&Value>,
    validator: &Validator,
) -> Result<()> {
    let payload = payload.unwrap_or(&NULL);

    let mut errors = validator.iter_errors(payload);
    if let Some(first) = errors.next() {
        let mut message = first.to_string();
        for err in errors.take(3) {
            message.push_str("; ");
            message.push_str(&err.to_string());
        }
        return Err(SchemaError::ValidationFailed {
            action: action.to_string(),
            message,
        });
    }

    Ok(())
}
