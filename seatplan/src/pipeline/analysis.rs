//! The external analysis service seam.
//!
//! Stages that need model output call an [`AnalysisService`] with the
//! stage name and a text input and get text back. What answers the call is
//! outside this crate; [`ReplayService`] serves canned replies from disk
//! and [`StaticService`] from memory.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

/// One call to the analysis service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRequest {
    /// Name of the calling stage.
    pub stage: String,
    pub input: String,
    /// Image reference for stages that look at the upload.
    pub image: Option<String>,
}

impl ServiceRequest {
    pub fn new(stage: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            input: input.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

/// Errors from an analysis service call.
#[derive(Debug, Error)]
pub enum ServiceCallError {
    /// No reply is available for the stage
    #[error("no reply for stage '{stage}'")]
    NoReply { stage: String },

    /// Reading a canned reply failed
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The service reported a failure
    #[error("{0}")]
    Failed(String),
}

/// Opaque text-in, text-out analysis service.
pub trait AnalysisService: Send + Sync {
    fn invoke(&self, request: &ServiceRequest) -> Result<String, ServiceCallError>;
}

// =============================================================================
// Replay
// =============================================================================

/// Serves `<directory>/<stage>.txt` as the reply for each stage.
#[derive(Debug, Clone)]
pub struct ReplayService {
    directory: PathBuf,
}

impl ReplayService {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn reply_path(&self, stage: &str) -> PathBuf {
        self.directory.join(format!("{stage}.txt"))
    }
}

impl AnalysisService for ReplayService {
    fn invoke(&self, request: &ServiceRequest) -> Result<String, ServiceCallError> {
        let path = self.reply_path(&request.stage);
        match fs::read_to_string(&path) {
            Ok(reply) => {
                debug!(stage = %request.stage, path = %path.display(), bytes = reply.len(), "Replayed reply");
                Ok(reply)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ServiceCallError::NoReply {
                stage: request.stage.clone(),
            }),
            Err(source) => Err(ServiceCallError::Io { path, source }),
        }
    }
}

// =============================================================================
// Static
// =============================================================================

/// Fixed in-memory replies keyed by stage name. Records every request.
#[derive(Debug, Default)]
pub struct StaticService {
    replies: HashMap<String, String>,
    requests: Mutex<Vec<ServiceRequest>>,
}

impl StaticService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(mut self, stage: impl Into<String>, reply: impl Into<String>) -> Self {
        self.replies.insert(stage.into(), reply.into());
        self
    }

    /// Requests received so far, in call order.
    pub fn requests(&self) -> Vec<ServiceRequest> {
        self.requests.lock().clone()
    }
}

impl AnalysisService for StaticService {
    fn invoke(&self, request: &ServiceRequest) -> Result<String, ServiceCallError> {
        self.requests.lock().push(request.clone());
        self.replies
            .get(&request.stage)
            .cloned()
            .ok_or_else(|| ServiceCallError::NoReply {
                stage: request.stage.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_replay_reads_stage_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("plan_actions.txt"), "{\"1\": [\"fold\"]}").unwrap();
        let service = ReplayService::new(dir.path());

        let reply = service
            .invoke(&ServiceRequest::new("plan_actions", "ignored"))
            .unwrap();
        assert_eq!(reply, "{\"1\": [\"fold\"]}");
    }

    #[test]
    fn test_replay_missing_stage() {
        let dir = TempDir::new().unwrap();
        let service = ReplayService::new(dir.path());

        let err = service
            .invoke(&ServiceRequest::new("analyze_input", ""))
            .unwrap_err();
        assert!(matches!(err, ServiceCallError::NoReply { stage } if stage == "analyze_input"));
    }

    #[test]
    fn test_static_records_requests() {
        let service = StaticService::new().with_reply("a", "reply");
        let request = ServiceRequest::new("a", "input").with_image("img.png");

        assert_eq!(service.invoke(&request).unwrap(), "reply");
        assert!(service.invoke(&ServiceRequest::new("b", "")).is_err());

        let requests = service.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].image.as_deref(), Some("img.png"));
    }
}
