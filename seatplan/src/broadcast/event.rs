//! Observer-facing progress events.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::state::ProcessingStatus;

/// One progress update for one observer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub session_id: String,
    pub status: ProcessingStatus,
    /// 0-100
    pub progress: u8,
    pub message: Option<String>,
    /// Stage outputs not sent to this observer before, by stage name.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub outputs: Map<String, Value>,
}

impl ProgressEvent {
    /// Whether this is the last event of the session.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
