//! Seatplan - staged seat placement analysis driving four serial seat cells
//!
//! A run sends the uploaded scene through a fixed list of analysis stages,
//! publishes every stage output into a shared [`state::StateStore`] that
//! observers poll, folds the final per-cell action plan into a 16 digit
//! wire command, and routes one 4 digit chunk to each cell controller.
//!
//! # High-Level API
//!
//! For most use cases, the [`service`] module provides a simplified facade:
//!
//! ```ignore
//! use seatplan::service::{SeatplanService, ServiceConfig};
//! use seatplan::pipeline::{ReplayService, RunInput};
//!
//! let store = Arc::new(StateStore::open(config.state.file.clone()));
//! let service = SeatplanService::new(store, Arc::new(ReplayService::new(replay_dir)))
//!     .with_config(ServiceConfig::from_config_file(&config));
//!
//! let session = service.start_session(SessionKind::Desktop);
//! let outcome = service
//!     .run_session(&session.id, RunInput::new("lunch", 6, "scene.png"))
//!     .await?;
//! ```
//!
//! The lower layers are usable on their own: [`codec::encode`] is a pure
//! function and [`device::DeviceLinkManager`] can dispatch any command.

pub mod broadcast;
pub mod cancel;
pub mod codec;
pub mod config;
pub mod device;
pub mod logging;
pub mod pipeline;
pub mod service;
pub mod session;
pub mod state;

/// Version of the seatplan library and CLI.
///
/// Synchronized across the workspace; defined in `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
