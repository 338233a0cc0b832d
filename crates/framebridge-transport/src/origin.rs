use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::{Result, TransportError};

/// Target-origin marker that matches any recipient.
pub const WILDCARD: &str = "*";

const MAX_URL_LEN: usize = 8 * 1024;

/// A tuple origin: scheme, host, and non-default port.
///
/// Serializes exactly like a browser's `location.origin` (ASCII form, IDN
/// hosts in punycode), so string equality against an event's declared
/// origin is meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    scheme: String,
    host: String,
    port: Option<u16>,
}

impl Origin {
    /// Parse the origin of an absolute URL such as `https://app.example/page?x=1`.
    pub fn parse(url: &str) -> Result<Self> {
        let input = bounded(url)?;
        if input.is_empty() {
            return Err(TransportError::invalid_origin(url, "empty"));
        }
        let parsed =
            Url::parse(input).map_err(|err| TransportError::invalid_origin(input, err.to_string()))?;
        Self::from_url(&parsed)
    }

    /// Origin of an already-parsed URL. Opaque origins are rejected.
    pub fn from_url(url: &Url) -> Result<Self> {
        match url.origin() {
            url::Origin::Tuple(scheme, host, port) => {
                let port = Some(port).filter(|port| Some(*port) != default_port(&scheme));
                Ok(Self {
                    host: host.to_string(),
                    scheme,
                    port,
                })
            }
            url::Origin::Opaque(_) => Err(TransportError::invalid_origin(
                url.as_str(),
                "opaque origin",
            )),
        }
    }

    /// Resolve a possibly-relative reference against `base`.
    ///
    /// Follows URL joining rules: absolute URLs resolve to their own origin,
    /// scheme-relative references (`//host/...`) inherit the base scheme,
    /// and paths, queries, fragments and the empty string resolve to `base`.
    pub fn resolve(reference: &str, base: &Origin) -> Result<Self> {
        let reference = bounded(reference)?;
        let base_url = base.to_url()?;
        let joined = base_url
            .join(reference)
            .map_err(|err| TransportError::invalid_origin(reference, err.to_string()))?;
        Self::from_url(&joined)
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Explicit port, `None` when it is the scheme default.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Serialized form, e.g. `https://app.example:8443`.
    pub fn serialize(&self) -> String {
        self.to_string()
    }

    /// The origin as a root URL (`https://app.example/`).
    pub fn to_url(&self) -> Result<Url> {
        let serialized = self.serialize();
        Url::parse(&serialized)
            .map_err(|err| TransportError::invalid_origin(&serialized, err.to_string()))
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        Ok(())
    }
}

impl FromStr for Origin {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn bounded(url: &str) -> Result<&str> {
    let input = url.trim();
    if input.len() > MAX_URL_LEN {
        let head: String = input.chars().take(64).collect();
        return Err(TransportError::invalid_origin(
            &head,
            format!("url too long ({} bytes, max {MAX_URL_LEN})", input.len()),
        ));
    }
    Ok(input)
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" | "ws" => Some(80),
        "https" | "wss" => Some(443),
        "ftp" => Some(21),
        _ => None,
    }
}
