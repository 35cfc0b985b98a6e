//! Error and outcome types for pipeline runs.

use std::fmt;

use thiserror::Error;

use crate::codec::CodecError;
use crate::session::SessionId;
use crate::state::ProcessingStatus;

use super::analysis::ServiceCallError;

/// Errors raised by a single stage.
#[derive(Debug, Error)]
pub enum StageError {
    /// The analysis service call failed
    #[error("analysis service failed: {0}")]
    Service(#[from] ServiceCallError),

    /// The plan could not be encoded
    #[error("command encoding failed: {0}")]
    Codec(#[from] CodecError),

    /// A stage this one depends on produced no usable output
    #[error("missing input from stage '{0}'")]
    MissingInput(String),

    /// The stage produced output it cannot represent
    #[error("malformed stage output: {0}")]
    MalformedOutput(String),
}

/// A [`StageError`] tagged with the stage that raised it.
#[derive(Debug, Error)]
#[error("stage '{stage}' failed: {source}")]
pub struct StageFailure {
    pub stage: String,
    #[source]
    pub source: StageError,
}

/// Why a run did not complete.
#[derive(Debug)]
pub enum RunOutcome {
    /// Cancellation was requested. `at_stage` is the stage whose boundary
    /// observed it, `None` if it was observed before the first stage.
    Cancelled {
        session_id: SessionId,
        at_stage: Option<String>,
    },

    /// A stage failed and the run was aborted.
    Failed(StageFailure),
}

impl RunOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunOutcome::Cancelled { .. })
    }

    /// The terminal `processing.status` this outcome leaves behind.
    pub fn status(&self) -> ProcessingStatus {
        match self {
            RunOutcome::Cancelled { .. } => ProcessingStatus::Cancelled,
            RunOutcome::Failed(_) => ProcessingStatus::Error,
        }
    }

    /// Name of the stage involved, if any.
    pub fn stage(&self) -> Option<&str> {
        match self {
            RunOutcome::Cancelled { at_stage, .. } => at_stage.as_deref(),
            RunOutcome::Failed(failure) => Some(&failure.stage),
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Cancelled {
                session_id,
                at_stage: Some(stage),
            } => write!(f, "session {session_id} cancelled at stage '{stage}'"),
            RunOutcome::Cancelled { session_id, .. } => {
                write!(f, "session {session_id} cancelled before start")
            }
            RunOutcome::Failed(failure) => write!(f, "{failure}"),
        }
    }
}

impl From<StageFailure> for RunOutcome {
    fn from(failure: StageFailure) -> Self {
        RunOutcome::Failed(failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_display_names_stage() {
        let failure = StageFailure {
            stage: "encode_command".into(),
            source: StageError::MissingInput("plan_actions".into()),
        };
        let outcome = RunOutcome::from(failure);

        assert!(!outcome.is_cancelled());
        assert_eq!(outcome.status(), ProcessingStatus::Error);
        assert_eq!(outcome.stage(), Some("encode_command"));
        assert_eq!(
            outcome.to_string(),
            "stage 'encode_command' failed: missing input from stage 'plan_actions'"
        );
    }

    #[test]
    fn test_cancelled_is_not_an_error() {
        let outcome = RunOutcome::Cancelled {
            session_id: SessionId::from("abc"),
            at_stage: None,
        };
        assert!(outcome.is_cancelled());
        assert_eq!(outcome.status(), ProcessingStatus::Cancelled);
        assert_eq!(outcome.to_string(), "session abc cancelled before start");
    }

    #[test]
    fn test_codec_error_is_verbatim() {
        let codec = CodecError::Parse {
            token: "fold(".into(),
        };
        let expected = format!("command encoding failed: {codec}");
        assert_eq!(StageError::from(codec).to_string(), expected);
    }
}
