//! Progress streaming to observers.
//!
//! Each observer gets its own polling task that reads the
//! [`StateStore`](crate::state::StateStore) on a fixed interval and sends
//! only what changed since its previous event. Observers of the same
//! session keep independent bookkeeping, so a late joiner still receives
//! every stage output once.
//!
//! Runs are told apart by `processing.run_id`. An observer that attaches
//! after a run ended waits for the session's next run. When the run is
//! driven by [`SeatplanService`](crate::service::SeatplanService), the
//! terminal `completed` status is written after `hardware.*` records the
//! dispatch, so observers can read the outcome once the stream ends.
//!
//! # Example
//!
//! ```ignore
//! let broadcaster = ProgressBroadcaster::new(Arc::clone(&store));
//! let mut watch = broadcaster.watch(session_id, shutdown.child_token());
//! while let Some(event) = watch.events.recv().await {
//!     println!("{}% {}", event.progress, event.message.unwrap_or_default());
//! }
//! ```

mod broadcaster;
mod cursor;
mod event;

pub use broadcaster::{ProgressBroadcaster, Watch};
pub use cursor::ObserverCursor;
pub use event::ProgressEvent;
