use std::fmt;
use std::time::Duration;

use framebridge_message::{channel_param, DEFAULT_CHANNEL_PREFIX};
use framebridge_transport::{Origin, Url, WILDCARD};

use crate::correlator::DEFAULT_REQUEST_TIMEOUT;
use crate::error::{BridgeError, Result};

/// Host-side frame height before the first resize arrives, in CSS pixels.
pub const DEFAULT_HEIGHT: u32 = 150;

/// Host-side configuration, supplied by the component that mounts the frame.
#[derive(Clone)]
pub struct HostConfig {
    /// Load URL of the embedded document; may be relative to the host.
    pub url: String,
    /// Height held until the embed reports one.
    pub default_height: u32,
    /// Explicit channel id. Generated once per mount when absent.
    pub channel_id: Option<String>,
    /// Override for the origin posted to and accepted from.
    /// Derived from `url` when absent.
    pub target_origin: Option<String>,
    /// Default deadline for `send_request`.
    pub request_timeout: Duration,
    /// Prefix for generated channel ids.
    pub channel_prefix: String,
    /// Payload schemas checked before handlers run.
    #[cfg(feature = "schema")]
    pub schemas: Option<std::sync::Arc<framebridge_schema::SchemaRegistry>>,
}

impl HostConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            default_height: DEFAULT_HEIGHT,
            channel_id: None,
            target_origin: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            channel_prefix: DEFAULT_CHANNEL_PREFIX.to_string(),
            #[cfg(feature = "schema")]
            schemas: None,
        }
    }

    pub fn with_default_height(mut self, height: u32) -> Self {
        self.default_height = height;
        self
    }

    pub fn with_channel_id(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = Some(channel_id.into());
        self
    }

    pub fn with_target_origin(mut self, origin: impl Into<String>) -> Self {
        self.target_origin = Some(origin.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_channel_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.channel_prefix = prefix.into();
        self
    }

    /// Attach a shared payload schema registry.
    #[cfg(feature = "schema")]
    pub fn with_schema_registry(
        mut self,
        registry: std::sync::Arc<framebridge_schema::SchemaRegistry>,
    ) -> Self {
        self.schemas = Some(registry);
        self
    }

    /// Concrete origin of the embedded document.
    pub(crate) fn resolve_target_origin(&self, own: &Origin) -> Result<String> {
        validate_common(self.channel_id.as_deref(), self.request_timeout)?;
        match self.target_origin.as_deref().map(str::trim) {
            Some(WILDCARD) => {
                tracing::warn!(url = %self.url, "host configured with wildcard target origin");
                Ok(WILDCARD.to_string())
            }
            Some(explicit) => resolve(explicit, own),
            None => resolve(&self.url, own),
        }
    }
}

impl fmt::Debug for HostConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("HostConfig");
        dbg.field("url", &self.url)
            .field("default_height", &self.default_height)
            .field("channel_id", &self.channel_id)
            .field("target_origin", &self.target_origin)
            .field("request_timeout", &self.request_timeout)
            .field("channel_prefix", &self.channel_prefix);
        #[cfg(feature = "schema")]
        dbg.field(
            "schemas",
            &self.schemas.as_ref().map(|registry| registry.actions()),
        );
        dbg.finish()
    }
}

/// Embed-side configuration.
#[derive(Clone)]
pub struct EmbedConfig {
    /// Initial value of the embed's loading flag.
    pub initial_loading: bool,
    /// Host origin to post to and accept from. Wildcard when absent,
    /// since an embed usually cannot know who will frame it.
    pub target_origin: Option<String>,
    /// Channel id. When absent the embed stays unbound until the host's
    /// initialization message arrives.
    pub channel_id: Option<String>,
    /// Default deadline for `send_request`.
    pub request_timeout: Duration,
    /// Name of a same-key broadcast side channel to join.
    pub broadcast_key: Option<String>,
    /// Payload schemas checked before handlers run.
    #[cfg(feature = "schema")]
    pub schemas: Option<std::sync::Arc<framebridge_schema::SchemaRegistry>>,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            initial_loading: false,
            target_origin: None,
            channel_id: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            broadcast_key: None,
            #[cfg(feature = "schema")]
            schemas: None,
        }
    }
}

impl EmbedConfig {
    /// Configuration with the channel id taken from the frame's load URL.
    pub fn from_location(location: &str) -> Self {
        Self {
            channel_id: Url::parse(location.trim())
                .ok()
                .and_then(|url| channel_param(&url)),
            ..Self::default()
        }
    }

    pub fn with_initial_loading(mut self, loading: bool) -> Self {
        self.initial_loading = loading;
        self
    }

    pub fn with_target_origin(mut self, origin: impl Into<String>) -> Self {
        self.target_origin = Some(origin.into());
        self
    }

    pub fn with_channel_id(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = Some(channel_id.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_broadcast_key(mut self, key: impl Into<String>) -> Self {
        self.broadcast_key = Some(key.into());
        self
    }

    /// Attach a shared payload schema registry.
    #[cfg(feature = "schema")]
    pub fn with_schema_registry(
        mut self,
        registry: std::sync::Arc<framebridge_schema::SchemaRegistry>,
    ) -> Self {
        self.schemas = Some(registry);
        self
    }

    /// Host origin, or the wildcard when none is configured.
    pub(crate) fn resolve_target_origin(&self, own: &Origin) -> Result<String> {
        validate_common(self.channel_id.as_deref(), self.request_timeout)?;
        match self.target_origin.as_deref().map(str::trim) {
            None | Some(WILDCARD) => {
                tracing::debug!("embed host origin unknown; posting with wildcard target");
                Ok(WILDCARD.to_string())
            }
            Some(explicit) => resolve(explicit, own),
        }
    }
}

impl fmt::Debug for EmbedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("EmbedConfig");
        dbg.field("initial_loading", &self.initial_loading)
            .field("target_origin", &self.target_origin)
            .field("channel_id", &self.channel_id)
            .field("request_timeout", &self.request_timeout)
            .field("broadcast_key", &self.broadcast_key);
        #[cfg(feature = "schema")]
        dbg.field(
            "schemas",
            &self.schemas.as_ref().map(|registry| registry.actions()),
        );
        dbg.finish()
    }
}

fn resolve(reference: &str, own: &Origin) -> Result<String> {
    Origin::resolve(reference, own)
        .map(|origin| origin.to_string())
        .map_err(|err| BridgeError::Config(err.to_string()))
}

fn validate_common(channel_id: Option<&str>, request_timeout: Duration) -> Result<()> {
    if channel_id.is_some_and(str::is_empty) {
        return Err(BridgeError::Config("channel id must not be empty".to_string()));
    }
    if request_timeout.is_zero() {
        return Err(BridgeError::Config(
            "request timeout must be greater than zero".to_string(),
        ));
    }
    Ok(())
}
