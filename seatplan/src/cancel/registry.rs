//! Session to controller map.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use crate::session::SessionId;

use super::controller::{CancellationController, StopPredicate};

/// Controllers of the sessions currently running.
#[derive(Default)]
pub struct CancellationRegistry {
    controllers: DashMap<SessionId, Arc<CancellationController>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register a controller for `session_id`.
    ///
    /// Replaces any controller left from an earlier run of the same session.
    pub fn register(&self, session_id: &SessionId) -> Arc<CancellationController> {
        self.insert(CancellationController::new(session_id.clone()))
    }

    pub fn register_with_predicate(
        &self,
        session_id: &SessionId,
        predicate: StopPredicate,
    ) -> Arc<CancellationController> {
        self.insert(CancellationController::new(session_id.clone()).with_stop_predicate(predicate))
    }

    /// Register a controller only if the session has none.
    ///
    /// Returns `None` when a run is already registered for `session_id`.
    pub fn try_register(
        &self,
        session_id: &SessionId,
        predicate: Option<StopPredicate>,
    ) -> Option<Arc<CancellationController>> {
        match self.controllers.entry(session_id.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let mut controller = CancellationController::new(session_id.clone());
                if let Some(predicate) = predicate {
                    controller = controller.with_stop_predicate(predicate);
                }
                let controller = Arc::new(controller);
                slot.insert(Arc::clone(&controller));
                debug!(session_id = %session_id, "Cancellation controller registered");
                Some(controller)
            }
        }
    }

    fn insert(&self, controller: CancellationController) -> Arc<CancellationController> {
        let controller = Arc::new(controller);
        let session_id = controller.session_id().clone();
        self.controllers
            .insert(session_id.clone(), Arc::clone(&controller));
        debug!(session_id = %session_id, "Cancellation controller registered");
        controller
    }

    pub fn get(&self, session_id: &SessionId) -> Option<Arc<CancellationController>> {
        self.controllers
            .get(session_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Request cancellation of a running session.
    ///
    /// Returns `false` if the session has no controller.
    pub fn request_cancel(&self, session_id: &SessionId) -> bool {
        match self.get(session_id) {
            Some(controller) => {
                controller.request_cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_cancelled(&self, session_id: &SessionId) -> bool {
        self.get(session_id)
            .is_some_and(|controller| controller.is_cancelled())
    }

    /// Drop the controller of a finished session.
    pub fn remove(&self, session_id: &SessionId) -> bool {
        let removed = self.controllers.remove(session_id).is_some();
        if removed {
            debug!(session_id = %session_id, "Cancellation controller removed");
        }
        removed
    }

    pub fn active_count(&self) -> usize {
        self.controllers.len()
    }
}

impl std::fmt::Debug for CancellationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationRegistry")
            .field("active", &self.controllers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_cancel_remove() {
        let registry = CancellationRegistry::new();
        let id = SessionId::from("run-1");
        let controller = registry.register(&id);

        assert!(!registry.is_cancelled(&id));
        assert!(registry.request_cancel(&id));
        assert!(registry.request_cancel(&id));
        assert!(controller.is_cancelled());

        assert!(registry.remove(&id));
        assert!(!registry.remove(&id));
        assert!(!registry.request_cancel(&id));
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn test_reregister_gives_fresh_flag() {
        let registry = CancellationRegistry::new();
        let id = SessionId::from("run-1");
        registry.register(&id).request_cancel();

        let fresh = registry.register(&id);
        assert!(!fresh.is_cancelled());
        assert_eq!(registry.active_count(), 1);
    }

    #[test]
    fn test_try_register_refuses_second_run() {
        let registry = CancellationRegistry::new();
        let id = SessionId::from("run-3");

        assert!(registry.try_register(&id, None).is_some());
        assert!(registry.try_register(&id, None).is_none());

        registry.remove(&id);
        assert!(registry.try_register(&id, None).is_some());
    }

    #[test]
    fn test_predicate_registration() {
        let registry = CancellationRegistry::new();
        let id = SessionId::from("run-2");
        registry.register_with_predicate(&id, Arc::new(|| true));
        assert!(registry.is_cancelled(&id));
    }
}
