//! Cooperative cancellation.
//!
//! Each running session owns one [`CancellationController`]: an abort flag
//! that is set at most once, an optional external stop predicate, and a
//! [`CancellationToken`](tokio_util::sync::CancellationToken) for async
//! waiters. The pipeline polls [`CancellationController::is_cancelled`] at
//! stage boundaries; nothing is interrupted mid-stage.
//!
//! Controllers are looked up by session through the [`CancellationRegistry`]
//! and removed from it when the run ends.

mod controller;
mod registry;

pub use controller::{CancellationController, StopPredicate};
pub use registry::CancellationRegistry;
