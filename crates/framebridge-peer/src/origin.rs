use framebridge_transport::{Origin, WILDCARD};

use crate::error::{BridgeError, Result};

/// Whether an event declared from `declared` may be processed.
///
/// `allowed` is the configured peer origin: [`WILDCARD`] accepts any
/// sender, anything else is resolved against the local document's own
/// origin (so `"/"` or `/embed/chart` mean "same origin" and
/// `//cdn.example/x` inherits the local scheme) and must equal `declared`.
/// Unparseable origins never match.
pub fn is_valid_origin(declared: &str, allowed: &str, own: &Origin) -> bool {
    match allowed.trim() {
        WILDCARD => true,
        expected => match (Origin::parse(declared), Origin::resolve(expected, own)) {
            (Ok(declared), Ok(expected)) => declared == expected,
            _ => false,
        },
    }
}

/// Pre-normalized form of the allowed peer origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginPolicy {
    expected: Option<Origin>,
}

impl OriginPolicy {
    pub fn new(allowed: &str, own: &Origin) -> Result<Self> {
        let expected = match allowed.trim() {
            WILDCARD => None,
            other => Some(
                Origin::resolve(other, own).map_err(|err| BridgeError::Config(err.to_string()))?,
            ),
        };
        Ok(Self { expected })
    }

    /// Accept every sender.
    pub fn any() -> Self {
        Self { expected: None }
    }

    pub fn allows(&self, declared: &str) -> bool {
        match &self.expected {
            None => true,
            Some(expected) => Origin::parse(declared).is_ok_and(|origin| &origin == expected),
        }
    }

    /// The only origin accepted, or `None` for any.
    pub fn expected(&self) -> Option<&Origin> {
        self.expected.as_ref()
    }
}
