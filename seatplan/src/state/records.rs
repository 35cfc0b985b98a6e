//! Typed helpers over well-known parts of the state tree.
//!
//! - `sessions.<id>` - per-session data
//! - `processing.*` - run status, progress and timestamps
//! - `upload.*` - the inputs of the current run
//! - `notifications` - bounded operator log

use std::fmt;
use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::store::StateStore;
use super::tree::MAX_NOTIFICATIONS;

/// Current time as an RFC 3339 string, the timestamp format of the tree.
pub(crate) fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

// =============================================================================
// Processing status
// =============================================================================

/// Value of `processing.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Idle,
    Started,
    Running,
    Completed,
    Error,
    Cancelled,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Idle => "idle",
            ProcessingStatus::Started => "started",
            ProcessingStatus::Running => "running",
            ProcessingStatus::Completed => "completed",
            ProcessingStatus::Error => "error",
            ProcessingStatus::Cancelled => "cancelled",
        }
    }

    /// Completed, error and cancelled are final.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProcessingStatus::Completed | ProcessingStatus::Error | ProcessingStatus::Cancelled
        )
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(ProcessingStatus::Idle),
            "started" => Ok(ProcessingStatus::Started),
            "running" => Ok(ProcessingStatus::Running),
            "completed" => Ok(ProcessingStatus::Completed),
            "error" => Ok(ProcessingStatus::Error),
            "cancelled" => Ok(ProcessingStatus::Cancelled),
            other => Err(format!("unknown processing status '{other}'")),
        }
    }
}

// =============================================================================
// Notifications
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// One entry of the `notifications` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub message: String,
    pub level: NotificationLevel,
    pub timestamp: String,
}

// =============================================================================
// StateStore helpers
// =============================================================================

impl StateStore {
    /// Data stored for a session, `{}` if none.
    pub fn get_session(&self, session_id: &str) -> Value {
        self.get_or(&format!("sessions.{session_id}"), json!({}))
    }

    pub fn set_session(&self, session_id: &str, data: Value) -> bool {
        self.set(&format!("sessions.{session_id}"), data)
    }

    pub fn remove_session(&self, session_id: &str) -> bool {
        self.remove(&format!("sessions.{session_id}")).is_some()
    }

    /// Current `processing.status`, `Idle` if missing or unknown.
    pub fn processing_status(&self) -> ProcessingStatus {
        self.get_as::<ProcessingStatus>("processing.status")
            .unwrap_or(ProcessingStatus::Idle)
    }

    /// Set status, progress and optionally the scenario in one batch.
    ///
    /// `Started` stamps `processing.started_at`; completed and error stamp
    /// `processing.completed_at`.
    pub fn set_processing_status(
        &self,
        status: ProcessingStatus,
        progress: u8,
        scenario: Option<&str>,
    ) {
        let now = now_iso();
        let mut updates: Vec<(&str, Value)> = vec![
            ("processing.status", json!(status.as_str())),
            ("processing.progress", json!(progress.min(100))),
            ("processing.last_updated", json!(now)),
        ];
        if let Some(scenario) = scenario {
            updates.push(("processing.current_scenario", json!(scenario)));
        }
        match status {
            ProcessingStatus::Started => updates.push(("processing.started_at", json!(now))),
            ProcessingStatus::Completed | ProcessingStatus::Error => {
                updates.push(("processing.completed_at", json!(now)))
            }
            _ => {}
        }
        self.update(updates);
    }

    /// Write each field under `upload.<field>`.
    pub fn set_upload_status<I, K>(&self, fields: I) -> usize
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        self.update(
            fields
                .into_iter()
                .map(|(key, value)| (format!("upload.{}", key.as_ref()), value)),
        )
    }

    /// Append a notification, keeping only the newest entries.
    pub fn add_notification(&self, message: impl Into<String>, level: NotificationLevel) -> Notification {
        let notification = Notification {
            id: format!("notif_{}", uuid::Uuid::new_v4().simple()),
            message: message.into(),
            level,
            timestamp: now_iso(),
        };
        let entry = serde_json::to_value(&notification).unwrap_or(Value::Null);

        self.modify("notifications", |list| {
            if !list.is_array() {
                *list = Value::Array(Vec::new());
            }
            if let Value::Array(items) = list {
                items.push(entry);
                if items.len() > MAX_NOTIFICATIONS {
                    let excess = items.len() - MAX_NOTIFICATIONS;
                    items.drain(..excess);
                }
            }
        });
        notification
    }

    /// The newest `limit` notifications (all when `None`), oldest first.
    pub fn notifications(&self, limit: Option<usize>) -> Vec<Notification> {
        let all: Vec<Notification> = self.get_as("notifications").unwrap_or_default();
        match limit {
            Some(limit) if limit < all.len() => all[all.len() - limit..].to_vec(),
            _ => all,
        }
    }

    pub fn clear_notifications(&self) -> bool {
        self.set("notifications", json!([]))
    }

    /// Summary of system, processing, upload and hardware sections.
    pub fn system_status(&self) -> Value {
        let snapshot = self.snapshot();
        let section = |name: &str| snapshot.get(name).cloned().unwrap_or_else(|| json!({}));
        let count = |name: &str| match snapshot.get(name) {
            Some(Value::Object(map)) => map.len(),
            Some(Value::Array(items)) => items.len(),
            _ => 0,
        };

        let mut status = Map::new();
        status.insert("system".into(), section("system"));
        status.insert("processing".into(), section("processing"));
        status.insert("upload".into(), section("upload"));
        status.insert("hardware".into(), section("hardware"));
        status.insert("active_sessions".into(), json!(count("sessions")));
        status.insert("notifications_count".into(), json!(count("notifications")));
        for optional in ["current_step", "analysis_result", "step_times"] {
            if let Some(value) = snapshot.get(optional) {
                status.insert(optional.into(), value.clone());
            }
        }
        Value::Object(status)
    }

    /// Return the per-run keys to their idle baseline.
    ///
    /// Clears stage outputs, step counter, progress and notifications and
    /// sets `processing.status` to idle. Sessions and hardware are kept.
    pub fn reset_session_keys(&self) {
        self.update([
            ("current_step", json!(0)),
            ("analysis_result", json!({})),
            ("processing.status", json!(ProcessingStatus::Idle.as_str())),
            ("processing.progress", json!(0)),
            ("processing.message", Value::Null),
            ("notifications", json!([])),
        ]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        for status in [
            ProcessingStatus::Idle,
            ProcessingStatus::Running,
            ProcessingStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<ProcessingStatus>(), Ok(status));
        }
        assert!("paused".parse::<ProcessingStatus>().is_err());
        assert!(ProcessingStatus::Error.is_terminal());
        assert!(!ProcessingStatus::Running.is_terminal());
    }

    #[test]
    fn test_session_helpers() {
        let store = StateStore::in_memory();
        assert_eq!(store.get_session("s1"), json!({}));

        store.set_session("s1", json!({"kind": "mobile"}));
        assert_eq!(store.get_session("s1")["kind"], "mobile");
        assert!(store.remove_session("s1"));
        assert!(!store.remove_session("s1"));
    }

    #[test]
    fn test_processing_status_timestamps() {
        let store = StateStore::in_memory();
        store.set_processing_status(ProcessingStatus::Started, 0, Some("lunch"));
        assert_eq!(store.processing_status(), ProcessingStatus::Started);
        assert!(store.get("processing.started_at").unwrap().is_string());
        assert_eq!(store.get("processing.current_scenario"), Some(json!("lunch")));
        assert_eq!(store.get("processing.completed_at"), Some(Value::Null));

        store.set_processing_status(ProcessingStatus::Completed, 150, None);
        assert_eq!(store.get("processing.progress"), Some(json!(100)));
        assert!(store.get("processing.completed_at").unwrap().is_string());
    }

    #[test]
    fn test_notifications_are_bounded() {
        let store = StateStore::in_memory();
        for i in 0..(MAX_NOTIFICATIONS + 5) {
            store.add_notification(format!("message {i}"), NotificationLevel::Info);
        }

        let all = store.notifications(None);
        assert_eq!(all.len(), MAX_NOTIFICATIONS);
        assert_eq!(all[0].message, "message 5");

        let recent = store.notifications(Some(2));
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1].message, format!("message {}", MAX_NOTIFICATIONS + 4));

        assert!(store.clear_notifications());
        assert!(store.notifications(None).is_empty());
    }

    #[test]
    fn test_system_status_summary() {
        let store = StateStore::in_memory();
        store.set_session("a", json!({}));
        store.add_notification("hello", NotificationLevel::Success);
        store.set("analysis_result.analyze_input", json!({"people": 2}));

        let status = store.system_status();
        assert_eq!(status["active_sessions"], 1);
        assert_eq!(status["notifications_count"], 1);
        assert_eq!(status["analysis_result"]["analyze_input"]["people"], 2);
        assert!(status.get("current_step").is_none());
    }

    #[test]
    fn test_upload_status() {
        let store = StateStore::in_memory();
        let changed = store.set_upload_status([
            ("people_count", json!(3)),
            ("scenario", json!("meeting")),
        ]);
        assert_eq!(changed, 2);
        assert_eq!(store.get("upload.people_count"), Some(json!(3)));
    }

    #[test]
    fn test_reset_session_keys() {
        let store = StateStore::in_memory();
        store.set_session("keep", json!({"x": 1}));
        store.set("analysis_result.plan_actions", "text");
        store.set("current_step", 3);
        store.set_processing_status(ProcessingStatus::Running, 75, None);

        store.reset_session_keys();
        assert_eq!(store.get("analysis_result"), Some(json!({})));
        assert_eq!(store.get("current_step"), Some(json!(0)));
        assert_eq!(store.processing_status(), ProcessingStatus::Idle);
        assert_eq!(store.get_session("keep"), json!({"x": 1}));
    }
}
