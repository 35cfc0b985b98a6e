//! Session registry with idle expiry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::json;
use tracing::{debug, info};

use crate::state::StateStore;

use super::id::{SessionId, SessionKind};

/// A registered session.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub kind: SessionKind,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    last_seen: Instant,
}

impl Session {
    fn new(id: SessionId, kind: SessionKind) -> Self {
        let now = Utc::now();
        Self {
            id,
            kind,
            created_at: now,
            last_activity: now,
            last_seen: Instant::now(),
        }
    }

    /// Time since the last activity.
    pub fn idle_for(&self) -> Duration {
        self.last_seen.elapsed()
    }

    fn is_idle_at(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) > timeout
    }
}

/// Active sessions, keyed by id.
///
/// Expired sessions are swept on every lookup and by [`Self::expire_idle`].
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Session>,
    idle_timeout: Duration,
    store: Option<Arc<StateStore>>,
}

impl SessionRegistry {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_timeout,
            store: None,
        }
    }

    /// Mirror sessions into `sessions.<id>` of `store`.
    pub fn with_store(mut self, store: Arc<StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Register a new session.
    pub fn register(&self, kind: SessionKind) -> Session {
        self.register_with_id(SessionId::new(), kind)
    }

    /// Register a session under a caller-chosen id, replacing any existing one.
    pub fn register_with_id(&self, id: SessionId, kind: SessionKind) -> Session {
        let session = Session::new(id.clone(), kind);
        self.sessions.insert(id.clone(), session.clone());
        self.mirror(&session);
        info!(session_id = %id, kind = %kind, "Session registered");
        session
    }

    /// Look up a live session.
    pub fn get(&self, id: &SessionId) -> Option<Session> {
        self.expire_idle();
        self.sessions.get(id).map(|s| s.value().clone())
    }

    /// Record activity on a session. Returns `false` if it is unknown or expired.
    pub fn touch(&self, id: &SessionId) -> bool {
        self.expire_idle();
        let touched = match self.sessions.get_mut(id) {
            Some(mut entry) => {
                entry.last_activity = Utc::now();
                entry.last_seen = Instant::now();
                Some(entry.value().clone())
            }
            None => None,
        };
        match touched {
            Some(session) => {
                self.mirror(&session);
                true
            }
            None => false,
        }
    }

    /// Remove a session. Returns it if it was registered.
    pub fn remove(&self, id: &SessionId) -> Option<Session> {
        let removed = self.sessions.remove(id).map(|(_, session)| session);
        if removed.is_some() {
            if let Some(store) = &self.store {
                store.remove_session(id.as_str());
            }
            debug!(session_id = %id, "Session removed");
        }
        removed
    }

    /// Live sessions, oldest first.
    pub fn list(&self) -> Vec<Session> {
        self.expire_idle();
        let mut sessions: Vec<Session> = self.sessions.iter().map(|s| s.value().clone()).collect();
        sessions.sort_by_key(|s| s.created_at);
        sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop sessions idle for longer than the timeout. Returns the expired ids.
    pub fn expire_idle(&self) -> Vec<SessionId> {
        self.expire_idle_at(Instant::now())
    }

    /// [`Self::expire_idle`] evaluated at `now`.
    pub fn expire_idle_at(&self, now: Instant) -> Vec<SessionId> {
        let expired: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().is_idle_at(now, self.idle_timeout))
            .map(|entry| entry.key().clone())
            .collect();

        for id in &expired {
            self.sessions.remove(id);
            if let Some(store) = &self.store {
                store.remove_session(id.as_str());
            }
            info!(session_id = %id, "Session expired");
        }
        expired
    }

    fn mirror(&self, session: &Session) {
        if let Some(store) = &self.store {
            store.set_session(
                session.id.as_str(),
                json!({
                    "kind": session.kind.as_str(),
                    "created_at": session.created_at.to_rfc3339(),
                    "last_activity": session.last_activity.to_rfc3339(),
                }),
            );
        }
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.sessions.len())
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_get() {
        let registry = SessionRegistry::new(Duration::from_secs(60));
        let session = registry.register(SessionKind::Mobile);

        let found = registry.get(&session.id).unwrap();
        assert_eq!(found.kind, SessionKind::Mobile);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_expire_idle() {
        let registry = SessionRegistry::new(Duration::from_secs(60));
        let old = registry.register(SessionKind::Desktop);

        let later = Instant::now() + Duration::from_secs(61);
        assert_eq!(registry.expire_idle_at(later), vec![old.id.clone()]);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_touch_keeps_session_alive() {
        let registry = SessionRegistry::new(Duration::from_secs(60));
        let session = registry.register(SessionKind::Desktop);
        assert!(registry.touch(&session.id));
        assert!(registry.expire_idle_at(Instant::now() + Duration::from_secs(30)).is_empty());
        assert!(!registry.touch(&SessionId::from("unknown")));
    }

    #[test]
    fn test_mirrors_into_store() {
        let store = Arc::new(StateStore::in_memory());
        let registry = SessionRegistry::new(Duration::from_secs(60)).with_store(Arc::clone(&store));

        let session = registry.register(SessionKind::Mobile);
        assert_eq!(store.get_session(session.id.as_str())["kind"], "mobile");

        registry.remove(&session.id);
        assert_eq!(store.get_session(session.id.as_str()), json!({}));
    }

    #[test]
    fn test_list_is_ordered_by_creation() {
        let registry = SessionRegistry::new(Duration::from_secs(60));
        let first = registry.register_with_id("a".into(), SessionKind::Desktop);
        std::thread::sleep(Duration::from_millis(2));
        let second = registry.register_with_id("b".into(), SessionKind::Mobile);

        let ids: Vec<_> = registry.list().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }
}
