//! Polling tasks that feed observers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::DEFAULT_POLL_INTERVAL_MS;
use crate::session::SessionId;
use crate::state::StateStore;

use super::cursor::ObserverCursor;
use super::event::ProgressEvent;

/// A running observer task and its event stream.
#[derive(Debug)]
pub struct Watch {
    pub events: mpsc::UnboundedReceiver<ProgressEvent>,
    pub handle: JoinHandle<()>,
}

/// Spawns one polling task per observer.
#[derive(Debug, Clone)]
pub struct ProgressBroadcaster {
    store: Arc<StateStore>,
    poll_interval: Duration,
}

impl ProgressBroadcaster {
    pub fn new(store: Arc<StateStore>) -> Self {
        Self {
            store,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Start streaming `session_id` to a new observer.
    ///
    /// Streams the session's current run, or its next one if the current
    /// run has already ended.
    ///
    /// The task ends after the terminal event, when `disconnect` is
    /// cancelled, or when the receiver is dropped. Must be called inside a
    /// Tokio runtime.
    pub fn watch(&self, session_id: SessionId, disconnect: CancellationToken) -> Watch {
        let (tx, events) = mpsc::unbounded_channel();
        let cursor = ObserverCursor::attached_to(session_id, &self.store);
        let handle = tokio::spawn(poll_loop(
            Arc::clone(&self.store),
            self.poll_interval,
            cursor,
            tx,
            disconnect,
        ));
        Watch { events, handle }
    }
}

async fn poll_loop(
    store: Arc<StateStore>,
    poll_interval: Duration,
    mut cursor: ObserverCursor,
    tx: mpsc::UnboundedSender<ProgressEvent>,
    disconnect: CancellationToken,
) {
    debug!(
        session_id = %cursor.session_id(),
        interval_ms = poll_interval.as_millis() as u64,
        "Observer polling started"
    );
    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = disconnect.cancelled() => {
                debug!(session_id = %cursor.session_id(), "Observer disconnected");
                break;
            }

            _ = interval.tick() => {
                let Some(event) = cursor.poll(&store) else {
                    continue;
                };
                let terminal = event.is_terminal();
                if tx.send(event).is_err() {
                    debug!(session_id = %cursor.session_id(), "Observer receiver dropped");
                    break;
                }
                if terminal {
                    info!(session_id = %cursor.session_id(), "Terminal event sent");
                    break;
                }
            }
        }
    }
}
