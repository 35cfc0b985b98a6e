//! Default state tree.

use serde_json::{json, Value};

/// Version recorded under `system.version`.
pub const STATE_VERSION: &str = "1.0.0";

/// Maximum notifications kept; older entries are dropped first.
pub const MAX_NOTIFICATIONS: usize = 100;

/// The tree a fresh (or unreadable) state file is initialized to.
pub fn default_tree() -> Value {
    json!({
        "system": {
            "status": "idle",
            "last_updated": crate::state::records::now_iso(),
            "version": STATE_VERSION,
        },
        "sessions": {},
        "processing": {
            "current_scenario": null,
            "progress": 0,
            "status": "idle",
            "started_at": null,
            "completed_at": null,
        },
        "upload": {
            "uploaded_file": null,
            "image_path": null,
            "people_count": 0,
            "scenario": null,
        },
        "hardware": {
            "connected": false,
            "motor_status": "idle",
            "last_command": null,
        },
        "notifications": [],
    })
}

/// Fill keys missing from a loaded tree with their defaults.
///
/// Only top-level sections are merged; existing sections are kept as-is.
pub(super) fn merge_missing_sections(tree: &mut Value) {
    let (Value::Object(target), Value::Object(defaults)) = (tree, default_tree()) else {
        return;
    };
    for (key, value) in defaults {
        target.entry(key).or_insert(value);
    }
}
