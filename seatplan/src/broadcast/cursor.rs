//! Per-observer "already sent" bookkeeping.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::session::SessionId;
use crate::state::{ProcessingStatus, StateStore};

use super::event::ProgressEvent;

/// What one observer has already been sent.
///
/// [`poll`](Self::poll) returns an event only when something changed, and
/// returns the terminal event exactly once.
#[derive(Debug)]
pub struct ObserverCursor {
    session_id: SessionId,
    /// Run that had already ended when the observer attached
    finished_run: Option<String>,
    sent_outputs: HashSet<String>,
    last: Option<(ProcessingStatus, u8, Option<String>)>,
    finished: bool,
}

impl ObserverCursor {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            finished_run: None,
            sent_outputs: HashSet::new(),
            last: None,
            finished: false,
        }
    }

    /// Cursor that skips a run of `session_id` that already ended in `store`.
    ///
    /// The observer then waits for the session's next run instead of
    /// replaying the finished one.
    pub fn attached_to(session_id: SessionId, store: &StateStore) -> Self {
        let processing = store.get("processing").unwrap_or(Value::Null);
        let owned = processing.get("session_id").and_then(Value::as_str)
            == Some(session_id.as_str());
        let ended = processing
            .get("status")
            .and_then(|v| serde_json::from_value::<ProcessingStatus>(v.clone()).ok())
            .is_some_and(|status| status.is_terminal());

        let mut cursor = Self::new(session_id);
        if owned && ended {
            cursor.finished_run = Some(run_id_of(&processing).to_string());
        }
        cursor
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Whether the terminal event has been returned.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Read the store and return the delta since the previous event.
    ///
    /// Returns `None` while the store belongs to another session, when
    /// nothing changed, and after the terminal event.
    pub fn poll(&mut self, store: &StateStore) -> Option<ProgressEvent> {
        if self.finished {
            return None;
        }

        // Both reads under one lock hold so they describe the same moment
        let (processing, results) = store.batch(|s| (s.get("processing"), s.get("analysis_result")));
        let processing = processing.unwrap_or(Value::Null);

        let owner = processing.get("session_id").and_then(Value::as_str);
        if owner != Some(self.session_id.as_str()) {
            return None;
        }
        if let Some(finished) = &self.finished_run {
            if run_id_of(&processing) == finished.as_str() {
                return None;
            }
            self.finished_run = None;
        }

        let status = processing
            .get("status")
            .and_then(|v| serde_json::from_value::<ProcessingStatus>(v.clone()).ok())
            .unwrap_or(ProcessingStatus::Idle);
        let progress = processing
            .get("progress")
            .and_then(Value::as_u64)
            .map(|p| p.min(100) as u8)
            .unwrap_or(0);
        let message = processing
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string);

        let mut outputs = Map::new();
        if let Some(Value::Object(results)) = results {
            for (stage, output) in results {
                if self.sent_outputs.insert(stage.clone()) {
                    outputs.insert(stage, output);
                }
            }
        }

        let scalars = (status, progress, message.clone());
        let changed = !outputs.is_empty() || self.last.as_ref() != Some(&scalars);
        if !changed && !status.is_terminal() {
            return None;
        }

        self.last = Some(scalars);
        self.finished = status.is_terminal();
        Some(ProgressEvent {
            session_id: self.session_id.to_string(),
            status,
            progress,
            message,
            outputs,
        })
    }
}

fn run_id_of(processing: &Value) -> &str {
    processing
        .get("run_id")
        .and_then(Value::as_str)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store_for(session: &str) -> StateStore {
        let store = StateStore::in_memory();
        store.update([
            ("processing.session_id", json!(session)),
            ("processing.status", json!("running")),
        ]);
        store
    }

    #[test]
    fn test_only_new_outputs_are_sent() {
        let store = store_for("s");
        let mut cursor = ObserverCursor::new(SessionId::from("s"));

        store.set("analysis_result.a", json!({"big": "payload"}));
        let first = cursor.poll(&store).unwrap();
        assert_eq!(first.outputs.len(), 1);

        assert!(cursor.poll(&store).is_none());

        store.set("analysis_result.b", json!("second"));
        let second = cursor.poll(&store).unwrap();
        assert_eq!(second.outputs.keys().collect::<Vec<_>>(), ["b"]);
    }

    #[test]
    fn test_scalar_change_without_outputs() {
        let store = store_for("s");
        let mut cursor = ObserverCursor::new(SessionId::from("s"));
        cursor.poll(&store).unwrap();

        store.set("processing.progress", json!(50));
        let event = cursor.poll(&store).unwrap();
        assert_eq!(event.progress, 50);
        assert!(event.outputs.is_empty());
    }

    #[test]
    fn test_terminal_event_once() {
        let store = store_for("s");
        let mut cursor = ObserverCursor::new(SessionId::from("s"));
        store.set("processing.status", json!("completed"));

        assert!(cursor.poll(&store).unwrap().is_terminal());
        assert!(cursor.is_finished());
        assert!(cursor.poll(&store).is_none());
    }

    #[test]
    fn test_other_session_is_ignored() {
        let store = store_for("other");
        store.set("processing.status", json!("completed"));
        let mut cursor = ObserverCursor::new(SessionId::from("mine"));
        assert!(cursor.poll(&store).is_none());
        assert!(!cursor.is_finished());
    }

    #[test]
    fn test_finished_run_is_not_replayed() {
        let store = store_for("s");
        store.update([
            ("processing.run_id", json!("run-1")),
            ("processing.status", json!("completed")),
            ("analysis_result.a", json!("old")),
        ]);
        let mut cursor = ObserverCursor::attached_to(SessionId::from("s"), &store);
        assert!(cursor.poll(&store).is_none());

        store.update([
            ("processing.run_id", json!("run-2")),
            ("processing.status", json!("running")),
            ("analysis_result", json!({})),
        ]);
        let event = cursor.poll(&store).unwrap();
        assert_eq!(event.status, ProcessingStatus::Running);
        assert!(event.outputs.is_empty());

        store.set("processing.status", json!("completed"));
        assert!(cursor.poll(&store).unwrap().is_terminal());
    }

    #[test]
    fn test_attaching_mid_run_streams_it() {
        let store = store_for("s");
        store.set("processing.run_id", json!("run-1"));
        let mut cursor = ObserverCursor::attached_to(SessionId::from("s"), &store);
        assert_eq!(cursor.poll(&store).unwrap().status, ProcessingStatus::Running);
    }

    #[test]
    fn test_observers_are_independent() {
        let store = store_for("s");
        store.set("analysis_result.a", json!(1));
        let mut early = ObserverCursor::new(SessionId::from("s"));
        early.poll(&store).unwrap();

        let mut late = ObserverCursor::new(SessionId::from("s"));
        assert_eq!(late.poll(&store).unwrap().outputs.len(), 1);
    }
}
