use std::sync::Arc;

use framebridge_transport::Window;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::dispatcher::Dispatcher;

/// A registered `message` listener feeding one [`Dispatcher`].
///
/// The listener is removed when this handle is stopped or dropped.
#[derive(Debug)]
pub struct Listener {
    task: JoinHandle<()>,
}

impl Listener {
    /// Subscribe to `window` and dispatch every event on a new task.
    ///
    /// The subscription is taken before this returns, so no event posted
    /// afterwards is missed. Must be called from within a tokio runtime.
    pub fn spawn(window: &Window, dispatcher: Arc<Dispatcher>) -> Self {
        let mut events = window.subscribe();
        let side = dispatcher.side();

        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let disposition = dispatcher.on_native_message(&event);
                        tracing::trace!(%side, ?disposition, "event dispatched");
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(%side, skipped, "message listener lagged; events lost");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            tracing::debug!(%side, "message listener finished");
        });

        Self { task }
    }

    /// Remove the listener.
    pub fn stop(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.task.abort();
    }
}
