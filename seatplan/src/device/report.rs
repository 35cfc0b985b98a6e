//! Connection and dispatch outcomes.

use serde::Serialize;

use crate::codec::CellId;

/// Result of trying to bring up one controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EndpointStatus {
    /// Link is live
    Connected { port: String },
    /// No enumerated port carries this serial number
    NotFound,
    /// Port found but every open attempt failed
    Failed { port: String, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectReport {
    pub endpoints: Vec<(CellId, String, EndpointStatus)>,
}

impl ConnectReport {
    pub fn live_count(&self) -> usize {
        self.endpoints
            .iter()
            .filter(|(_, _, status)| matches!(status, EndpointStatus::Connected { .. }))
            .count()
    }

    pub fn status(&self, cell: CellId) -> Option<&EndpointStatus> {
        self.endpoints
            .iter()
            .find(|(c, _, _)| *c == cell)
            .map(|(_, _, status)| status)
    }
}

/// What happened to one cell's chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ChunkResult {
    Sent { payload: String },
    /// Cell had no live link
    Skipped,
    Failed { reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub results: Vec<(CellId, ChunkResult)>,
}

impl DispatchReport {
    pub fn sent_count(&self) -> usize {
        self.results
            .iter()
            .filter(|(_, r)| matches!(r, ChunkResult::Sent { .. }))
            .count()
    }

    pub fn result(&self, cell: CellId) -> Option<&ChunkResult> {
        self.results.iter().find(|(c, _)| *c == cell).map(|(_, r)| r)
    }
}

/// Outcome of a dispatch or broadcast.
///
/// Both variants are success from the caller's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// At least one chunk was written
    Sent(DispatchReport),
    /// No live links, or every write failed
    DryRun { payload: String },
}

impl DispatchOutcome {
    pub fn is_dry_run(&self) -> bool {
        matches!(self, DispatchOutcome::DryRun { .. })
    }
}
