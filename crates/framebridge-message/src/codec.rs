use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{MessageError, Result};
use crate::message::{Message, MessageKind};

/// Maximum accepted length of textual wire messages: 1 MiB.
pub const MAX_ENCODED_LEN: usize = 1024 * 1024;

/// Encode a message into its wire value.
pub fn encode(message: &Message) -> Result<Value> {
    Ok(serde_json::to_value(message)?)
}

/// Encode a message into wire JSON text.
pub fn encode_string(message: &Message) -> Result<String> {
    Ok(serde_json::to_string(message)?)
}

/// Decode a wire value into a message.
///
/// Fails closed: the value must be an object with a known `type`, every
/// required field of that kind must be present with the right shape, and
/// identifiers (`channelId`, `requestId`, `action`) must be non-empty.
/// Unknown extra fields are ignored.
pub fn decode(value: &Value) -> Result<Message> {
    let object = value
        .as_object()
        .ok_or(MessageError::NotAnObject(json_type_name(value)))?;

    let tag = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or(MessageError::MissingType)?;
    let kind = MessageKind::from_wire(tag).ok_or_else(|| MessageError::UnknownType(tag.to_string()))?;

    let message = match kind {
        MessageKind::Resize => Message::Resize(fields(kind, value)?),
        MessageKind::Data => Message::Data(fields(kind, value)?),
        MessageKind::Action => Message::Action(fields(kind, value)?),
        MessageKind::Request => Message::Request(fields(kind, value)?),
        MessageKind::Response => Message::Response(fields(kind, value)?),
    };

    check_identifiers(&message)?;
    Ok(message)
}

/// Decode wire JSON text into a message.
pub fn decode_str(text: &str) -> Result<Message> {
    if text.len() > MAX_ENCODED_LEN {
        return Err(MessageError::TooLarge {
            size: text.len(),
            max: MAX_ENCODED_LEN,
        });
    }
    let value: Value = serde_json::from_str(text)?;
    decode(&value)
}

fn fields<T: DeserializeOwned>(kind: MessageKind, value: &Value) -> Result<T> {
    T::deserialize(value).map_err(|err| MessageError::Malformed {
        kind: kind.as_str(),
        reason: err.to_string(),
    })
}

fn check_identifiers(message: &Message) -> Result<()> {
    let kind = message.kind().as_str();
    let malformed = |reason: &str| MessageError::Malformed {
        kind,
        reason: reason.to_string(),
    };

    if message.channel_id().is_empty() {
        return Err(malformed("empty channelId"));
    }
    if message.request_id().is_some_and(str::is_empty) {
        return Err(malformed("empty requestId"));
    }
    if message.action().is_some_and(str::is_empty) {
        return Err(malformed("empty action"));
    }
    Ok(())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::message::{create_message_at, Body};

    #[test]
    fn decodes_every_kind() {
        let cases = [
            json!({"type": "resize", "channelId": "c", "height": 620, "timestamp": 1}),
            json!({"type": "data", "channelId": "c", "payload": [1, 2], "timestamp": 1}),
            json!({"type": "action", "channelId": "c", "action": "TOGGLE_THEME", "timestamp": 1}),
            json!({"type": "request", "channelId": "c", "requestId": "r", "action": "a", "payload": {"x": 1}, "timestamp": 1}),
            json!({"type": "response", "channelId": "c", "requestId": "r", "success": false, "error": "nope", "timestamp": 1}),
        ];

        let kinds: Vec<MessageKind> = cases
            .iter()
            .map(|value| decode(value).unwrap().kind())
            .collect();
        assert_eq!(kinds, MessageKind::ALL.to_vec());
    }

    #[test]
    fn encode_matches_wire_shape() {
        let message = create_message_at("abc", Body::Resize { height: 300 }, 7);
        assert_eq!(
            encode(&message).unwrap(),
            json!({"type": "resize", "channelId": "abc", "height": 300, "timestamp": 7})
        );
        let text = encode_string(&message).unwrap();
        assert_eq!(decode_str(&text).unwrap(), message);
    }

    #[test]
    fn rejects_non_objects() {
        assert!(matches!(
            decode(&json!("resize")),
            Err(MessageError::NotAnObject("string"))
        ));
        assert!(matches!(
            decode(&json!(null)),
            Err(MessageError::NotAnObject("null"))
        ));
    }

    #[test]
    fn rejects_missing_or_unknown_type() {
        assert!(matches!(
            decode(&json!({"channelId": "c"})),
            Err(MessageError::MissingType)
        ));
        assert!(matches!(
            decode(&json!({"type": 3, "channelId": "c"})),
            Err(MessageError::MissingType)
        ));
        assert!(matches!(
            decode(&json!({"type": "ping", "channelId": "c", "timestamp": 1})),
            Err(MessageError::UnknownType(t)) if t == "ping"
        ));
    }

    #[test]
    fn rejects_missing_and_mistyped_fields() {
        let missing_channel = json!({"type": "resize", "height": 1, "timestamp": 1});
        let fractional_height = json!({"type": "resize", "channelId": "c", "height": 10.5, "timestamp": 1});
        let negative_height = json!({"type": "resize", "channelId": "c", "height": -3, "timestamp": 1});
        let success_as_string = json!({"type": "response", "channelId": "c", "requestId": "r", "success": "yes", "timestamp": 1});
        let missing_request_id = json!({"type": "request", "channelId": "c", "action": "a", "timestamp": 1});

        for value in [
            missing_channel,
            fractional_height,
            negative_height,
            success_as_string,
            missing_request_id,
        ] {
            assert!(
                matches!(decode(&value), Err(MessageError::Malformed { .. })),
                "expected malformed: {value}"
            );
        }
    }

    #[test]
    fn rejects_empty_identifiers() {
        let empty_channel = json!({"type": "data", "channelId": "", "payload": 1, "timestamp": 1});
        let empty_request = json!({"type": "response", "channelId": "c", "requestId": "", "success": true, "timestamp": 1});
        let empty_action = json!({"type": "action", "channelId": "c", "action": "", "timestamp": 1});

        for value in [empty_channel, empty_request, empty_action] {
            assert!(matches!(decode(&value), Err(MessageError::Malformed { .. })));
        }
    }

    #[test]
    fn ignores_unknown_fields_and_defaults_data_payload() {
        let message = decode(&json!({
            "type": "data",
            "channelId": "c",
            "timestamp": 1,
            "source": "react-devtools"
        }))
        .unwrap();

        match message {
            Message::Data(data) => assert_eq!(data.payload, Value::Null),
            other => panic!("expected data, got {other:?}"),
        }
    }

    #[test]
    fn decode_str_rejects_oversized_and_invalid_text() {
        let huge = "x".repeat(MAX_ENCODED_LEN + 1);
        assert!(matches!(
            decode_str(&huge),
            Err(MessageError::TooLarge { .. })
        ));
        assert!(matches!(decode_str("{not-json"), Err(MessageError::Json(_))));
    }
}
