//! Channel identifiers.
//!
//! A channel id names one host↔embed pair so several pairs can share a
//! page-wide message stream without cross-talk. Ids are random with a
//! timestamp suffix; uniqueness is probabilistic.

use std::sync::OnceLock;

use rand::Rng;
use url::Url;

use crate::message::now_millis;

/// Prefix used when the embedding application supplies none.
pub const DEFAULT_CHANNEL_PREFIX: &str = "frame";

/// Query parameter that carries the channel id on the frame's load URL.
pub const CHANNEL_ID_PARAM: &str = "channelId";

const TOKEN_LEN: usize = 7;
const TOKEN_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate `<prefix>-<random token>-<epoch millis>`.
pub fn generate_channel_id(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let token: String = (0..TOKEN_LEN)
        .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
        .collect();
    format!("{prefix}-{token}-{}", now_millis())
}

/// Generate a fresh request id.
pub fn generate_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Result of [`ChannelBinding::bind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    /// The binding was empty and now holds the id.
    Bound,
    /// The binding already held this id.
    AlreadyBound,
    /// The binding holds a different id; nothing changed.
    Conflict,
}

/// The channel id a local side is bound to.
///
/// Once an id is assigned it never changes. A binding is either explicit
/// (caller-supplied id), lazy (generated on first use and kept for the
/// binding's lifetime), or unbound until [`ChannelBinding::bind`] is called.
#[derive(Debug, Default)]
pub struct ChannelBinding {
    id: OnceLock<String>,
    lazy_prefix: Option<String>,
}

impl ChannelBinding {
    pub fn explicit(id: impl Into<String>) -> Self {
        let binding = Self::unbound();
        let _ = binding.id.set(id.into());
        binding
    }

    pub fn lazy(prefix: impl Into<String>) -> Self {
        Self {
            id: OnceLock::new(),
            lazy_prefix: Some(prefix.into()),
        }
    }

    pub fn unbound() -> Self {
        Self::default()
    }

    /// Explicit when `id` is given, lazy with `prefix` otherwise.
    pub fn from_config(id: Option<&str>, prefix: &str) -> Self {
        match id {
            Some(id) => Self::explicit(id),
            None => Self::lazy(prefix),
        }
    }

    /// Current id, generating it first for lazy bindings.
    pub fn id(&self) -> Option<&str> {
        if let Some(id) = self.id.get() {
            return Some(id);
        }
        let prefix = self.lazy_prefix.as_deref()?;
        Some(self.id.get_or_init(|| generate_channel_id(prefix)))
    }

    /// Assign `id` to an empty binding.
    pub fn bind(&self, id: &str) -> BindOutcome {
        if let Some(existing) = self.id() {
            return if existing == id {
                BindOutcome::AlreadyBound
            } else {
                BindOutcome::Conflict
            };
        }
        match self.id.set(id.to_string()) {
            Ok(()) => BindOutcome::Bound,
            Err(_) if self.id.get().map(String::as_str) == Some(id) => BindOutcome::AlreadyBound,
            Err(_) => BindOutcome::Conflict,
        }
    }

    /// True when a message on `channel_id` belongs to this side.
    ///
    /// An unbound side accepts every channel.
    pub fn accepts(&self, channel_id: &str) -> bool {
        self.id().is_none_or(|id| id == channel_id)
    }
}

/// Set `channelId=<id>` in the query of `url`, replacing any previous value.
pub fn set_channel_param(url: &mut Url, channel_id: &str) {
    let retained: Vec<(String, String)> = url
        .query_pairs()
        .into_owned()
        .filter(|(key, _)| key != CHANNEL_ID_PARAM)
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(retained)
        .append_pair(CHANNEL_ID_PARAM, channel_id);
}

/// Copy of `url` carrying `channelId=<id>`.
pub fn with_channel_param(url: &Url, channel_id: &str) -> Url {
    let mut url = url.clone();
    set_channel_param(&mut url, channel_id);
    url
}

/// Read the `channelId` query parameter from `url`.
pub fn channel_param(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| *key == CHANNEL_ID_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn generated_id_has_prefix_token_and_timestamp() {
        let id = generate_channel_id("dashboard");
        let parts: Vec<&str> = id.splitn(3, '-').collect();
        assert_eq!(parts[0], "dashboard");
        assert_eq!(parts[1].len(), TOKEN_LEN);
        assert!(parts[1].bytes().all(|b| TOKEN_ALPHABET.contains(&b)));
        assert!(parts[2].parse::<u64>().is_ok());
    }

    #[test]
    fn generated_ids_do_not_collide_in_practice() {
        let ids: HashSet<String> = (0..1000).map(|_| generate_channel_id("x")).collect();
        assert_eq!(ids.len(), 1000);

        let requests: HashSet<String> = (0..1000).map(|_| generate_request_id()).collect();
        assert_eq!(requests.len(), 1000);
    }

    #[test]
    fn lazy_binding_generates_once_and_keeps_it() {
        let binding = ChannelBinding::lazy("host");
        let first = binding.id().unwrap().to_string();
        assert!(first.starts_with("host-"));
        assert_eq!(binding.id(), Some(first.as_str()));
        assert_eq!(binding.bind("other"), BindOutcome::Conflict);
        assert_eq!(binding.id(), Some(first.as_str()));
    }

    #[test]
    fn unbound_binding_accepts_all_until_bound() {
        let binding = ChannelBinding::unbound();
        assert_eq!(binding.id(), None);
        assert!(binding.accepts("a"));
        assert!(binding.accepts("b"));

        assert_eq!(binding.bind("a"), BindOutcome::Bound);
        assert_eq!(binding.bind("a"), BindOutcome::AlreadyBound);
        assert_eq!(binding.bind("b"), BindOutcome::Conflict);
        assert!(binding.accepts("a"));
        assert!(!binding.accepts("b"));
    }

    #[test]
    fn explicit_binding_is_fixed() {
        let binding = ChannelBinding::from_config(Some("abc"), DEFAULT_CHANNEL_PREFIX);
        assert_eq!(binding.id(), Some("abc"));
        assert!(!binding.accepts("abd"));
    }

    fn url(input: &str) -> Url {
        Url::parse(input).unwrap()
    }

    #[test]
    fn channel_param_set_before_fragment() {
        let with_id = with_channel_param(&url("https://widgets.example/embed#top"), "a b&c");
        assert_eq!(
            with_id.as_str(),
            "https://widgets.example/embed?channelId=a+b%26c#top"
        );
        assert_eq!(channel_param(&with_id).as_deref(), Some("a b&c"));
    }

    #[test]
    fn channel_param_keeps_other_pairs_and_replaces_previous_id() {
        let mut location = url("https://widgets.example/embed?theme=dark&channelId=old");
        set_channel_param(&mut location, "abc");
        assert_eq!(
            location.as_str(),
            "https://widgets.example/embed?theme=dark&channelId=abc"
        );
        assert_eq!(channel_param(&location).as_deref(), Some("abc"));
    }

    #[test]
    fn channel_param_absent_or_empty() {
        assert_eq!(channel_param(&url("https://widgets.example/embed")), None);
        assert_eq!(channel_param(&url("https://widgets.example/embed?channelId=")), None);
        assert_eq!(
            channel_param(&url("https://widgets.example/embed?x=1#channelId=a")),
            None
        );
        assert_eq!(
            channel_param(&url("https://widgets.example/embed?channelId=frame%2D1")).as_deref(),
            Some("frame-1")
        );
    }
}
