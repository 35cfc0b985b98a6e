//! Service error types.

use thiserror::Error;

use crate::session::SessionId;

/// Failures of the facade itself.
///
/// Stage failures and cancellation are not errors here; they are reported
/// through [`SessionOutcome`](super::SessionOutcome).
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The session already has a run in progress
    #[error("session {0} already has a run in progress")]
    AlreadyRunning(SessionId),

    /// A blocking task panicked or was aborted
    #[error("background task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for ServiceError {
    fn from(e: tokio::task::JoinError) -> Self {
        ServiceError::Task(e.to_string())
    }
}
