//! The state store.

use std::cell::RefCell;
use std::fs;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, info, trace, warn};

use super::error::StateError;
use super::path;
use super::records::now_iso;
use super::tree::{default_tree, merge_missing_sections};

/// Change listener, called with the written path and its new value.
pub type StateListener = Arc<dyn Fn(&str, &Value) + Send + Sync>;

/// Handle returned by [`StateStore::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Inner {
    tree: Value,
    batch_depth: usize,
    dirty: bool,
}

type InnerGuard<'a> = ReentrantMutexGuard<'a, RefCell<Inner>>;

/// Thread-safe hierarchical key/value store with JSON persistence.
///
/// Construct one per process and share it behind an `Arc`.
pub struct StateStore {
    inner: ReentrantMutex<RefCell<Inner>>,
    listeners: Mutex<Vec<(ListenerId, StateListener)>>,
    next_listener_id: AtomicU64,
    file: Option<PathBuf>,
}

impl StateStore {
    /// Open a store backed by `file`.
    ///
    /// A missing file is created from the default tree. An unreadable or
    /// corrupt file is replaced by the default tree (logged, not an error).
    pub fn open(file: impl Into<PathBuf>) -> Self {
        let file = file.into();
        let (tree, write_back) = load_tree(&file);
        let store = Self::with_tree(tree, Some(file));
        if write_back {
            store.persist_logged();
        }
        store
    }

    /// Create a store that is never written to disk.
    pub fn in_memory() -> Self {
        Self::with_tree(default_tree(), None)
    }

    fn with_tree(tree: Value, file: Option<PathBuf>) -> Self {
        Self {
            inner: ReentrantMutex::new(RefCell::new(Inner {
                tree,
                batch_depth: 0,
                dirty: false,
            })),
            listeners: Mutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(1),
            file,
        }
    }

    /// Backing file, if any.
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Value at `path`, cloned.
    pub fn get(&self, path: &str) -> Option<Value> {
        let guard = self.inner.lock();
        let inner = guard.borrow();
        path::lookup(&inner.tree, path).cloned()
    }

    /// Value at `path`, or `default` when absent.
    pub fn get_or(&self, path: &str, default: impl Into<Value>) -> Value {
        self.get(path).unwrap_or_else(|| default.into())
    }

    /// Value at `path` deserialized into `T`.
    ///
    /// Returns `None` when the path is absent or has a different shape.
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        self.get(path)
            .and_then(|value| serde_json::from_value(value).ok())
    }

    /// Whether `path` resolves to a value.
    pub fn contains(&self, path: &str) -> bool {
        let guard = self.inner.lock();
        let inner = guard.borrow();
        path::lookup(&inner.tree, path).is_some()
    }

    /// Clone of the whole tree.
    pub fn snapshot(&self) -> Value {
        let guard = self.inner.lock();
        let inner = guard.borrow();
        inner.tree.clone()
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Write `value` at `path`.
    ///
    /// Returns `false` (and does nothing else) when the stored value is
    /// already equal. Otherwise notifies listeners and persists.
    pub fn set(&self, path: &str, value: impl Into<Value>) -> bool {
        if path.is_empty() {
            warn!("Ignoring state write with empty path");
            return false;
        }
        let value = value.into();
        let guard = self.inner.lock();

        let changed = {
            let mut inner = guard.borrow_mut();
            let changed = path::assign(&mut inner.tree, path, value.clone());
            if changed && path.starts_with("system.") && path != "system.last_updated" {
                path::assign(
                    &mut inner.tree,
                    "system.last_updated",
                    Value::String(now_iso()),
                );
            }
            changed
        };

        if !changed {
            trace!(path, "State unchanged");
            return false;
        }

        debug!(path, "State changed");
        self.notify(path, &value);
        self.persist_or_defer(&guard);
        true
    }

    /// Apply several writes as one batch with a single disk write at the end.
    ///
    /// Returns how many writes changed the tree.
    pub fn update<I, K, V>(&self, updates: I) -> usize
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.batch(|store| {
            updates
                .into_iter()
                .map(|(path, value)| store.set(path.as_ref(), value))
                .filter(|changed| *changed)
                .count()
        })
    }

    /// Run `f` with persistence deferred until it returns.
    ///
    /// Batches nest; the file is written once when the outermost batch ends
    /// and at least one write changed the tree.
    pub fn batch<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        let guard = self.inner.lock();
        guard.borrow_mut().batch_depth += 1;

        let result = f(self);

        let flush = {
            let mut inner = guard.borrow_mut();
            inner.batch_depth -= 1;
            inner.batch_depth == 0 && std::mem::take(&mut inner.dirty)
        };
        if flush {
            self.persist_logged();
        }
        result
    }

    /// Remove the value at `path`. Listeners are not notified.
    pub fn remove(&self, path: &str) -> Option<Value> {
        let guard = self.inner.lock();
        let removed = path::remove(&mut guard.borrow_mut().tree, path);
        if removed.is_some() {
            debug!(path, "State removed");
            self.persist_or_defer(&guard);
        }
        removed
    }

    /// Replace the whole tree with the default tree.
    pub fn reset(&self) {
        let guard = self.inner.lock();
        guard.borrow_mut().tree = default_tree();
        info!("State reset to defaults");
        self.persist_or_defer(&guard);
    }

    /// Apply `f` to a clone of the value at `path` and write the result back.
    ///
    /// Runs under the store lock, so read-modify-write sequences from
    /// different threads do not interleave.
    pub fn modify(&self, path: &str, f: impl FnOnce(&mut Value)) -> bool {
        let _guard = self.inner.lock();
        let mut value = self.get(path).unwrap_or(Value::Null);
        f(&mut value);
        self.set(path, value)
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    /// Register a change listener.
    pub fn add_listener(&self, listener: StateListener) -> ListenerId {
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, listener));
        id
    }

    /// Unregister a listener. Returns `false` if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    fn notify(&self, path: &str, value: &Value) {
        let listeners: Vec<StateListener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            if panic::catch_unwind(AssertUnwindSafe(|| listener(path, value))).is_err() {
                error!(path, "State listener panicked");
            }
        }
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Write the tree to the backing file now.
    pub fn persist(&self) -> Result<(), StateError> {
        let Some(file) = self.file.as_deref() else {
            return Err(StateError::NotPersistent);
        };
        let guard = self.inner.lock();
        let json = {
            let inner = guard.borrow();
            serde_json::to_string_pretty(&inner.tree).map_err(|source| StateError::Json {
                path: file.to_path_buf(),
                source,
            })?
        };
        write_atomically(file, &json)
    }

    fn persist_or_defer(&self, guard: &InnerGuard<'_>) {
        let deferred = {
            let mut inner = guard.borrow_mut();
            if inner.batch_depth > 0 {
                inner.dirty = true;
                true
            } else {
                false
            }
        };
        if !deferred {
            self.persist_logged();
        }
    }

    fn persist_logged(&self) {
        match self.persist() {
            Ok(()) | Err(StateError::NotPersistent) => {}
            Err(e) => warn!(error = %e, "Failed to persist state"),
        }
    }
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("file", &self.file)
            .field("listeners", &self.listeners.lock().len())
            .finish()
    }
}

/// Load the tree from `file`. The flag is set when the file should be
/// (re)written with the returned tree.
fn load_tree(file: &Path) -> (Value, bool) {
    let content = match fs::read_to_string(file) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!(path = %file.display(), "No state file, starting from defaults");
            return (default_tree(), true);
        }
        Err(e) => {
            warn!(path = %file.display(), error = %e, "Cannot read state file, using defaults");
            return (default_tree(), true);
        }
    };

    match serde_json::from_str::<Value>(&content) {
        Ok(mut tree @ Value::Object(_)) => {
            merge_missing_sections(&mut tree);
            info!(path = %file.display(), "State loaded");
            (tree, false)
        }
        Ok(_) => {
            warn!(path = %file.display(), "State file is not a JSON object, using defaults");
            (default_tree(), true)
        }
        Err(e) => {
            warn!(path = %file.display(), error = %e, "Corrupt state file, using defaults");
            (default_tree(), true)
        }
    }
}

fn write_atomically(file: &Path, content: &str) -> Result<(), StateError> {
    let io_err = |source| StateError::Io {
        path: file.to_path_buf(),
        source,
    };
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let temp = file.with_extension("json.tmp");
    fs::write(&temp, content).map_err(io_err)?;
    fs::rename(&temp, file).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn counting_listener(store: &StateStore) -> Arc<AtomicUsize> {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        store.add_listener(Arc::new(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        calls
    }

    #[test]
    fn test_get_and_set() {
        let store = StateStore::in_memory();
        assert_eq!(store.get("processing.status"), Some(json!("idle")));
        assert!(store.set("processing.status", "running"));
        assert_eq!(store.get_or("processing.status", "x"), json!("running"));
        assert_eq!(store.get_or("processing.nope", 7), json!(7));
    }

    #[test]
    fn test_equal_write_does_not_notify() {
        let store = StateStore::in_memory();
        let calls = counting_listener(&store);

        assert!(store.set("upload.people_count", 4));
        assert!(!store.set("upload.people_count", 4));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_system_write_stamps_last_updated() {
        let store = StateStore::in_memory();
        store.set("system.last_updated", "stale");
        store.set("system.status", "busy");
        assert_ne!(store.get("system.last_updated"), Some(json!("stale")));
    }

    #[test]
    fn test_listener_can_write_reentrantly() {
        let store = Arc::new(StateStore::in_memory());
        let inner = Arc::clone(&store);
        store.add_listener(Arc::new(move |path, value| {
            if path == "processing.progress" {
                inner.set("mirror.progress", value.clone());
            }
        }));

        store.set("processing.progress", 40);
        assert_eq!(store.get("mirror.progress"), Some(json!(40)));
    }

    #[test]
    fn test_panicking_listener_is_contained() {
        let store = StateStore::in_memory();
        store.add_listener(Arc::new(|_, _| panic!("listener bug")));
        let calls = counting_listener(&store);

        assert!(store.set("hardware.connected", true));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_listener() {
        let store = StateStore::in_memory();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let id = store.add_listener(Arc::new(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert!(store.remove_listener(id));
        assert!(!store.remove_listener(id));
        store.set("a", 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_persists_and_reloads() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("state.json");

        let store = StateStore::open(&file);
        assert!(file.exists());
        store.set("upload.scenario", "meeting");
        drop(store);

        let reopened = StateStore::open(&file);
        assert_eq!(reopened.get("upload.scenario"), Some(json!("meeting")));
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("state.json");
        fs::write(&file, "{not json").unwrap();

        let store = StateStore::open(&file);
        assert_eq!(store.get("processing.status"), Some(json!("idle")));

        let rewritten: Value = serde_json::from_str(&fs::read_to_string(&file).unwrap()).unwrap();
        assert!(rewritten.is_object());
    }

    #[test]
    fn test_update_batch_writes_once() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("state.json");
        let store = StateStore::open(&file);

        let changed = store.batch(|s| {
            s.set("a.one", 1);
            // Still the default tree on disk while the batch is open.
            let on_disk: Value =
                serde_json::from_str(&fs::read_to_string(&file).unwrap()).unwrap();
            assert!(on_disk.get("a").is_none());
            s.update([("a.two", json!(2)), ("a.one", json!(1))])
        });
        assert_eq!(changed, 1);

        let on_disk: Value = serde_json::from_str(&fs::read_to_string(&file).unwrap()).unwrap();
        assert_eq!(on_disk["a"], json!({"one": 1, "two": 2}));
    }

    #[test]
    fn test_persistence_failure_is_swallowed() {
        let dir = tempfile::TempDir::new().unwrap();
        // A directory where the file should be makes every write fail.
        let file = dir.path().join("state.json");
        fs::create_dir(&file).unwrap();

        let store = StateStore::open(&file);
        assert!(store.set("processing.status", "running"));
        assert_eq!(store.get("processing.status"), Some(json!("running")));
        assert!(store.persist().is_err());
    }

    #[test]
    fn test_modify_and_remove() {
        let store = StateStore::in_memory();
        store.modify("counter", |v| *v = json!(v.as_i64().unwrap_or(0) + 1));
        store.modify("counter", |v| *v = json!(v.as_i64().unwrap_or(0) + 1));
        assert_eq!(store.get("counter"), Some(json!(2)));

        assert_eq!(store.remove("counter"), Some(json!(2)));
        assert!(!store.contains("counter"));
    }

    #[test]
    fn test_reset_restores_defaults() {
        let store = StateStore::in_memory();
        store.set("processing.status", "error");
        store.set("analysis_result.x", 1);
        store.reset();
        assert_eq!(store.get("processing.status"), Some(json!("idle")));
        assert!(!store.contains("analysis_result"));
    }
}
