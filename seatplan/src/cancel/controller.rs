//! Per-session cancellation flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::session::SessionId;

/// External stop condition, polled together with the abort flag.
///
/// Must be cheap and free of side effects; it may be called from any thread.
pub type StopPredicate = Arc<dyn Fn() -> bool + Send + Sync>;

/// Abort flag for one session.
pub struct CancellationController {
    session_id: SessionId,
    requested: AtomicBool,
    token: CancellationToken,
    stop_predicate: Option<StopPredicate>,
    created_at: Instant,
}

impl CancellationController {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            requested: AtomicBool::new(false),
            token: CancellationToken::new(),
            stop_predicate: None,
            created_at: Instant::now(),
        }
    }

    /// Also treat the session as cancelled whenever `predicate` returns true.
    pub fn with_stop_predicate(mut self, predicate: StopPredicate) -> Self {
        self.stop_predicate = Some(predicate);
        self
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Set the abort flag.
    ///
    /// Returns `true` for the call that set it and `false` for repeats.
    pub fn request_cancel(&self) -> bool {
        let first = !self.requested.swap(true, Ordering::AcqRel);
        if first {
            self.token.cancel();
            info!(
                session_id = %self.session_id,
                after_ms = self.created_at.elapsed().as_millis() as u64,
                "Cancellation requested"
            );
        }
        first
    }

    /// Whether the flag is set or the stop predicate holds. No side effects.
    pub fn is_cancelled(&self) -> bool {
        self.requested.load(Ordering::Acquire)
            || self.stop_predicate.as_ref().is_some_and(|stop| stop())
    }

    /// Token cancelled together with the flag, for async waiters.
    ///
    /// The stop predicate does not trigger the token.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl std::fmt::Debug for CancellationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationController")
            .field("session_id", &self.session_id)
            .field("requested", &self.requested.load(Ordering::Relaxed))
            .field("has_stop_predicate", &self.stop_predicate.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_cancel_is_idempotent() {
        let controller = CancellationController::new(SessionId::from("s"));
        assert!(!controller.is_cancelled());

        assert!(controller.request_cancel());
        assert!(!controller.request_cancel());
        assert!(controller.is_cancelled());
        assert!(controller.token().is_cancelled());
    }

    #[test]
    fn test_stop_predicate() {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let controller = CancellationController::new(SessionId::from("s"))
            .with_stop_predicate(Arc::new(move || flag.load(Ordering::SeqCst)));

        assert!(!controller.is_cancelled());
        stop.store(true, Ordering::SeqCst);
        assert!(controller.is_cancelled());
        // Predicate alone does not set the flag
        assert!(!controller.token().is_cancelled());
    }

    #[test]
    fn test_cancel_from_another_thread() {
        let controller = Arc::new(CancellationController::new(SessionId::from("s")));
        let remote = Arc::clone(&controller);
        std::thread::spawn(move || remote.request_cancel())
            .join()
            .unwrap();
        assert!(controller.is_cancelled());
    }
}
