//! Wire messages and channel identifiers for host↔embed messaging.
//!
//! Every message on the wire is a JSON object tagged by `type`:
//! - `resize`: embed reports its content height
//! - `data`: opaque payload, either direction
//! - `action`: fire-and-forget command
//! - `request`: command expecting exactly one `response`
//! - `response`: outcome of a request, matched by `requestId`
//!
//! Every message carries the `channelId` of the host↔embed pair it belongs
//! to and a `timestamp` in epoch milliseconds. Decoding fails closed: any
//! structural mismatch is a [`MessageError`], never a partially-filled value.

pub mod channel;
pub mod codec;
pub mod error;
pub mod message;

pub use channel::{
    channel_param, generate_channel_id, generate_request_id, set_channel_param,
    with_channel_param, BindOutcome, ChannelBinding, CHANNEL_ID_PARAM, DEFAULT_CHANNEL_PREFIX,
};
pub use codec::{decode, decode_str, encode, encode_string, MAX_ENCODED_LEN};
pub use error::{MessageError, Result};
pub use message::{
    create_message, create_message_at, now_millis, ActionMessage, Body, DataMessage, Message,
    MessageKind, RequestMessage, ResizeMessage, ResponseMessage,
};
