//! Shared hierarchical state tree.
//!
//! [`StateStore`] holds one JSON tree addressed by dot-separated paths
//! (`processing.status`, `analysis_result.plan_actions`, ...). It is shared
//! between the pipeline thread, progress broadcasters, and control calls.
//!
//! # Write semantics
//!
//! - Every write is equality-checked; writing the current value is a no-op
//!   and notifies nobody.
//! - Listeners run synchronously on the writing thread while the store lock
//!   is held. A listener may read or write the store (the lock is reentrant).
//! - Writes under `system.*` stamp `system.last_updated`.
//! - The tree is mirrored to a JSON file after each write (or once at the end
//!   of an [`StateStore::update`] batch). Persistence is best-effort: failures
//!   are logged and the in-memory tree stays authoritative.

mod error;
mod path;
mod records;
mod store;
mod tree;

pub use error::StateError;
pub use records::{Notification, NotificationLevel, ProcessingStatus};
pub use store::{ListenerId, StateListener, StateStore};
pub use tree::{default_tree, MAX_NOTIFICATIONS, STATE_VERSION};
