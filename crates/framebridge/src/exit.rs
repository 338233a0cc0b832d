use std::fmt;
use std::io;

use framebridge_message::MessageError;
use framebridge_peer::BridgeError;
use framebridge_transport::TransportError;

// Process exit codes.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => USAGE,
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => DATA_INVALID,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::InvalidOrigin { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(FAILURE, format!("{context}: {other}")),
    }
}

pub fn message_error(context: &str, err: MessageError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn bridge_error(context: &str, err: BridgeError) -> CliError {
    match err {
        BridgeError::Transport(err) => transport_error(context, err),
        BridgeError::Message(err) => message_error(context, err),
        BridgeError::Config(_) => CliError::new(USAGE, format!("{context}: {err}")),
        BridgeError::Timeout { .. } => CliError::new(TIMEOUT, format!("{context}: {err}")),
        BridgeError::Rejected(_) | BridgeError::Closed(_) | BridgeError::Unbound => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
        BridgeError::Json(_) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        #[cfg(feature = "schema")]
        BridgeError::Schema(_) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
    }
}
