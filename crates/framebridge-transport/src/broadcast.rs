//! Same-key fan-out side channel.
//!
//! A [`BroadcastChannel`] delivers every posted value to every other open
//! channel with the same name. There is no origin concept and no
//! self-delivery. It is an additive transport next to the origin-checked
//! window messaging, never a replacement for it.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock};

use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::{Result, TransportError};
use crate::window::DEFAULT_EVENT_CAPACITY;

#[derive(Debug, Clone)]
struct Envelope {
    sender: u64,
    data: Value,
}

/// Registry of named broadcast topics.
pub struct BroadcastHub {
    topics: Mutex<HashMap<String, broadcast::Sender<Envelope>>>,
    next_id: AtomicU64,
    capacity: usize,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            capacity: capacity.max(1),
        }
    }

    /// The process-wide hub used by [`BroadcastChannel::open`].
    pub fn global() -> &'static BroadcastHub {
        static HUB: OnceLock<BroadcastHub> = OnceLock::new();
        HUB.get_or_init(BroadcastHub::new)
    }

    /// Open a channel on `name` in this hub.
    pub fn open(&self, name: &str) -> BroadcastChannel {
        let mut topics = self.topics();
        topics.retain(|_, tx| tx.receiver_count() > 0);
        let tx = topics
            .entry(name.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone();
        let rx = tx.subscribe();

        BroadcastChannel {
            name: name.to_string(),
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            tx,
            rx: Some(rx),
        }
    }

    /// Number of open channels on `name`.
    pub fn open_count(&self, name: &str) -> usize {
        self.topics()
            .get(name)
            .map(broadcast::Sender::receiver_count)
            .unwrap_or(0)
    }

    fn topics(&self) -> MutexGuard<'_, HashMap<String, broadcast::Sender<Envelope>>> {
        self.topics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

/// One participant on a named broadcast topic.
pub struct BroadcastChannel {
    name: String,
    id: u64,
    tx: broadcast::Sender<Envelope>,
    rx: Option<broadcast::Receiver<Envelope>>,
}

impl BroadcastChannel {
    /// Open a channel on the process-wide hub.
    pub fn open(name: &str) -> Self {
        BroadcastHub::global().open(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Post `data` to every other open channel with the same name.
    pub fn post(&self, data: Value) -> Result<()> {
        if self.rx.is_none() {
            return Err(TransportError::ChannelClosed(self.name.clone()));
        }
        let _ = self.tx.send(Envelope {
            sender: self.id,
            data,
        });
        Ok(())
    }

    /// Receive the next value posted by another participant.
    ///
    /// Returns `None` once this channel is closed.
    pub async fn recv(&mut self) -> Option<Value> {
        let own_id = self.id;
        let rx = self.rx.as_mut()?;
        loop {
            match rx.recv().await {
                Ok(envelope) if envelope.sender == own_id => continue,
                Ok(envelope) => return Some(envelope.data),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(channel = %self.name, skipped, "broadcast receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Stop receiving and reject further posts.
    pub fn close(&mut self) {
        self.rx = None;
    }

    pub fn is_closed(&self) -> bool {
        self.rx.is_none()
    }
}

impl fmt::Debug for BroadcastChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastChannel")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}
