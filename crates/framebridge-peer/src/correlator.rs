//! Request/response correlation.
//!
//! Each outgoing request gets a fresh id and a one-shot completion slot.
//! Exactly one of three things settles it: the matching response, the
//! deadline, or teardown. Whichever comes first removes the entry, so a
//! late response finds nothing and is ignored.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use framebridge_message::{generate_request_id, ResponseMessage};
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::error::{BridgeError, Result};

/// Deadline applied when the caller does not give one.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(5000);

struct PendingRequest {
    action: String,
    /// `None` when the timeout is too large to represent; such a request never expires.
    deadline: Option<Instant>,
    completion: oneshot::Sender<Result<Value>>,
}

/// Diagnostic view of one outstanding request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSummary {
    pub request_id: String,
    pub action: String,
    /// Time left before the request times out.
    pub remaining: Duration,
}

/// Table of outstanding requests, keyed by request id.
#[derive(Default)]
pub struct Correlator {
    pending: Mutex<HashMap<String, PendingRequest>>,
    closed: AtomicBool,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a request, hand its id to `send`, and wait for the outcome.
    ///
    /// `send` must post the request message. If it fails, the entry is
    /// removed and its error returned. Dropping the returned future also
    /// removes the entry.
    pub async fn request<F>(&self, action: &str, timeout: Duration, send: F) -> Result<Value>
    where
        F: FnOnce(&str) -> Result<()>,
    {
        let request_id = generate_request_id();
        let (completion, mut outcome) = oneshot::channel();

        {
            let mut pending = self.lock();
            if self.is_closed() {
                return Err(BridgeError::Closed("bridge torn down".to_string()));
            }
            pending.insert(
                request_id.clone(),
                PendingRequest {
                    action: action.to_string(),
                    deadline: Instant::now().checked_add(timeout),
                    completion,
                },
            );
        }
        let _guard = PendingGuard {
            correlator: self,
            request_id: &request_id,
        };

        send(&request_id)?;
        tracing::debug!(%request_id, action, ?timeout, "request sent");

        match tokio::time::timeout(timeout, &mut outcome).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(BridgeError::Closed("request abandoned".to_string())),
            Err(_) => {
                if self.lock().remove(&request_id).is_none() {
                    // Settled between the deadline firing and this branch.
                    if let Ok(result) = outcome.try_recv() {
                        return result;
                    }
                }
                tracing::debug!(%request_id, action, ?timeout, "request timed out");
                Err(BridgeError::Timeout {
                    action: action.to_string(),
                    timeout,
                })
            }
        }
    }

    /// Settle the request matching `response`.
    ///
    /// Returns `false` when no such request is outstanding.
    pub fn complete(&self, response: &ResponseMessage) -> bool {
        let Some(entry) = self.lock().remove(&response.request_id) else {
            tracing::trace!(
                request_id = %response.request_id,
                "response for unknown or settled request ignored"
            );
            return false;
        };

        let result = if response.success {
            Ok(response.payload.clone().unwrap_or(Value::Null))
        } else {
            Err(BridgeError::Rejected(
                response
                    .error
                    .clone()
                    .unwrap_or_else(|| "request failed".to_string()),
            ))
        };
        tracing::debug!(
            request_id = %response.request_id,
            action = %entry.action,
            success = response.success,
            "response matched"
        );
        // The waiter may have been dropped in the meantime.
        let _ = entry.completion.send(result);
        true
    }

    /// Reject every outstanding request and refuse new ones.
    pub fn reject_all(&self, reason: &str) -> usize {
        self.closed.store(true, Ordering::Release);
        let drained: Vec<(String, PendingRequest)> = self.lock().drain().collect();
        let count = drained.len();
        for (request_id, entry) in drained {
            tracing::debug!(%request_id, action = %entry.action, reason, "request rejected");
            let _ = entry
                .completion
                .send(Err(BridgeError::Closed(reason.to_string())));
        }
        count
    }

    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }

    /// Outstanding request ids, sorted.
    pub fn pending_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Outstanding requests, soonest deadline first.
    pub fn pending(&self) -> Vec<PendingSummary> {
        let now = Instant::now();
        let mut summaries: Vec<PendingSummary> = self
            .lock()
            .iter()
            .map(|(request_id, entry)| PendingSummary {
                request_id: request_id.clone(),
                action: entry.action.clone(),
                remaining: entry
                    .deadline
                    .map_or(Duration::MAX, |deadline| deadline.saturating_duration_since(now)),
            })
            .collect();
        summaries.sort_by(|a, b| {
            a.remaining
                .cmp(&b.remaining)
                .then_with(|| a.request_id.cmp(&b.request_id))
        });
        summaries
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, PendingRequest>> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for Correlator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Correlator")
            .field("pending", &self.pending_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}

struct PendingGuard<'a> {
    correlator: &'a Correlator,
    request_id: &'a str,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.correlator.lock().remove(self.request_id);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::FutureExt;
    use serde_json::json;

    use super::*;

    fn response(request_id: &str, success: bool, payload: Option<Value>) -> ResponseMessage {
        ResponseMessage {
            channel_id: "c".to_string(),
            request_id: request_id.to_string(),
            success,
            payload,
            error: (!success).then(|| "handler failed".to_string()),
            timestamp: 1,
        }
    }

    /// Start a request and hand back its id once it is on the wire.
    async fn start(
        correlator: &Arc<Correlator>,
        timeout: Duration,
    ) -> (String, tokio::task::JoinHandle<Result<Value>>) {
        let (id_tx, id_rx) = oneshot::channel();
        let task = tokio::spawn({
            let correlator = Arc::clone(correlator);
            async move {
                correlator
                    .request("TOGGLE_THEME", timeout, move |id| {
                        let _ = id_tx.send(id.to_string());
                        Ok(())
                    })
                    .await
            }
        });
        (id_rx.await.unwrap(), task)
    }

    #[tokio::test]
    async fn response_resolves_matching_request() {
        let correlator = Arc::new(Correlator::new());
        let (id, task) = start(&correlator, DEFAULT_REQUEST_TIMEOUT).await;
        assert_eq!(correlator.pending_ids(), vec![id.clone()]);

        assert!(correlator.complete(&response(&id, true, Some(json!({"toggled": true})))));
        assert_eq!(task.await.unwrap().unwrap(), json!({"toggled": true}));
        assert_eq!(correlator.pending_count(), 0);
    }

    #[tokio::test]
    async fn failed_response_rejects_with_error_text() {
        let correlator = Arc::new(Correlator::new());
        let (id, task) = start(&correlator, DEFAULT_REQUEST_TIMEOUT).await;

        correlator.complete(&response(&id, false, None));
        match task.await.unwrap() {
            Err(BridgeError::Rejected(message)) => assert_eq!(message, "handler failed"),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn success_without_payload_resolves_null() {
        let correlator = Arc::new(Correlator::new());
        let (id, task) = start(&correlator, DEFAULT_REQUEST_TIMEOUT).await;
        correlator.complete(&response(&id, true, None));
        assert_eq!(task.await.unwrap().unwrap(), Value::Null);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_times_out_and_late_response_is_ignored() {
        let correlator = Arc::new(Correlator::new());
        let (id, task) = start(&correlator, Duration::from_millis(5000)).await;

        tokio::time::advance(Duration::from_millis(4999)).await;
        assert_eq!(correlator.pending_count(), 1);

        match task.await.unwrap() {
            Err(BridgeError::Timeout { action, timeout }) => {
                assert_eq!(action, "TOGGLE_THEME");
                assert_eq!(timeout, Duration::from_millis(5000));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert_eq!(correlator.pending_count(), 0);
        assert!(!correlator.complete(&response(&id, true, None)));
    }

    #[tokio::test]
    async fn unknown_response_is_ignored() {
        let correlator = Correlator::new();
        assert!(!correlator.complete(&response("never-sent", true, None)));
    }

    #[tokio::test]
    async fn send_failure_removes_entry() {
        let correlator = Correlator::new();
        let result = correlator
            .request("a", DEFAULT_REQUEST_TIMEOUT, |_| Err(BridgeError::Unbound))
            .await;
        assert!(matches!(result, Err(BridgeError::Unbound)));
        assert_eq!(correlator.pending_count(), 0);
    }

    #[tokio::test]
    async fn reject_all_settles_everything_and_closes() {
        let correlator = Arc::new(Correlator::new());
        let (_, first) = start(&correlator, DEFAULT_REQUEST_TIMEOUT).await;
        let (_, second) = start(&correlator, DEFAULT_REQUEST_TIMEOUT).await;

        assert_eq!(correlator.reject_all("unmounted"), 2);
        for task in [first, second] {
            assert!(matches!(task.await.unwrap(), Err(BridgeError::Closed(r)) if r == "unmounted"));
        }

        let late = correlator
            .request("a", DEFAULT_REQUEST_TIMEOUT, |_| Ok(()))
            .await;
        assert!(matches!(late, Err(BridgeError::Closed(_))));
        assert!(correlator.is_closed());
    }

    #[tokio::test]
    async fn unrepresentable_timeout_never_expires() {
        let correlator = Arc::new(Correlator::new());
        let (id, task) = start(&correlator, Duration::MAX).await;

        let pending = correlator.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].remaining, Duration::MAX);

        assert!(correlator.complete(&response(&id, true, Some(json!(7)))));
        assert_eq!(task.await.unwrap().unwrap(), json!(7));
    }

    #[tokio::test(start_paused = true)]
    async fn response_matched_after_deadline_reaches_waiter() {
        let correlator = Correlator::new();
        let (id_tx, mut id_rx) = oneshot::channel();
        let request = correlator.request("TOGGLE_THEME", Duration::from_millis(100), move |id| {
            let _ = id_tx.send(id.to_string());
            Ok(())
        });
        tokio::pin!(request);
        assert!((&mut request).now_or_never().is_none());
        let id = id_rx.try_recv().unwrap();

        tokio::time::advance(Duration::from_millis(150)).await;
        assert!(correlator.complete(&response(&id, true, Some(json!("late")))));
        assert_eq!(request.await.unwrap(), json!("late"));
        assert_eq!(correlator.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_summary_reports_remaining_time() {
        let correlator = Arc::new(Correlator::new());
        let (id, _task) = start(&correlator, Duration::from_secs(5)).await;

        tokio::time::advance(Duration::from_secs(2)).await;
        let pending = correlator.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].request_id, id);
        assert_eq!(pending[0].action, "TOGGLE_THEME");
        assert_eq!(pending[0].remaining, Duration::from_secs(3));
    }
}
