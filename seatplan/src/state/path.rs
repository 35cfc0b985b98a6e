//! Dot-path navigation over a JSON tree.

use serde_json::{Map, Value};

/// Look up `path` in `root`.
///
/// Returns `None` when any segment is missing or an intermediate value is
/// not an object.
pub(super) fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(root);
    }
    path.split('.')
        .try_fold(root, |node, segment| node.as_object()?.get(segment))
}

/// Write `value` at `path`, creating intermediate objects.
///
/// Non-object intermediates are replaced by empty objects. Returns `false`
/// without touching the tree when the existing value is equal.
pub(super) fn assign(root: &mut Value, path: &str, value: Value) -> bool {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(leaf) = segments.pop() else {
        return false;
    };

    let mut node = root;
    for segment in segments {
        let map = ensure_object(node);
        node = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    let map = ensure_object(node);
    if map.get(leaf) == Some(&value) {
        return false;
    }
    map.insert(leaf.to_string(), value);
    true
}

/// Remove the value at `path`. Returns the removed value.
pub(super) fn remove(root: &mut Value, path: &str) -> Option<Value> {
    let (parent, leaf) = match path.rsplit_once('.') {
        Some((parent, leaf)) => (lookup_mut(root, parent)?, leaf),
        None => (root, path),
    };
    parent.as_object_mut()?.remove(leaf)
}

fn lookup_mut<'a>(root: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    path.split('.')
        .try_fold(root, |node, segment| node.as_object_mut()?.get_mut(segment))
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced with an object"),
    }
}
