//! State persistence errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from loading or saving the state file.
///
/// These never escape a write; [`super::StateStore`] logs and swallows them.
/// They are returned by the explicit [`super::StateStore::persist`] call.
#[derive(Debug, Error)]
pub enum StateError {
    /// Reading or writing the state file failed
    #[error("state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// State file did not contain a JSON object
    #[error("state file {path} is not valid state JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Store has no backing file
    #[error("state store is not backed by a file")]
    NotPersistent,
}
