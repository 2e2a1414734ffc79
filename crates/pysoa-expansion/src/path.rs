//! Addressing a location inside a `serde_json::Value` tree by path rather
//! than by live reference.
//!
//! The dispatch loop discovers candidate objects, fires off async expansion
//! calls for them, and later needs to write the result back into the same
//! spot in the tree. Holding `&mut Value` across an `.await` doesn't work
//! with the borrow checker once more than one object is in flight, so
//! discovery instead records a [`Path`] and the loop re-resolves a mutable
//! reference from the root each time it needs to touch the object. This is
//! sound here because splicing a field within an object, or replacing a
//! value at a path, never invalidates a sibling path: object fields aren't
//! indexed positionally and array lengths aren't touched by this engine.

use serde_json::Value;

/// One step into a JSON tree: a map key or an array index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// A key into a JSON object.
    Key(String),
    /// An index into a JSON array.
    Index(usize),
}

/// A location inside a `serde_json::Value` tree, root-relative.
pub type Path = Vec<PathSegment>;

/// Resolve `path` against `root`, returning a shared reference if every
/// segment exists and matches the expected container kind.
pub fn resolve<'a>(root: &'a Value, path: &[PathSegment]) -> Option<&'a Value> {
    let mut current = root;
    for segment in path {
        current = match (segment, current) {
            (PathSegment::Key(key), Value::Object(map)) => map.get(key)?,
            (PathSegment::Index(idx), Value::Array(arr)) => arr.get(*idx)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Resolve `path` against `root`, returning a mutable reference if every
/// segment exists and matches the expected container kind.
pub fn resolve_mut<'a>(root: &'a mut Value, path: &[PathSegment]) -> Option<&'a mut Value> {
    let mut current = root;
    for segment in path {
        current = match (segment, current) {
            (PathSegment::Key(key), Value::Object(map)) => map.get_mut(key)?,
            (PathSegment::Index(idx), Value::Array(arr)) => arr.get_mut(*idx)?,
            _ => return None,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_nested_path() {
        let root = json!({"a": {"b": [1, 2, {"c": "found"}]}});
        let path = vec![
            PathSegment::Key("a".into()),
            PathSegment::Key("b".into()),
            PathSegment::Index(2),
            PathSegment::Key("c".into()),
        ];
        assert_eq!(resolve(&root, &path), Some(&json!("found")));
    }

    #[test]
    fn resolve_mut_allows_in_place_edits() {
        let mut root = json!({"a": {"x": 1}});
        let path = vec![PathSegment::Key("a".into())];
        if let Some(Value::Object(map)) = resolve_mut(&mut root, &path) {
            map.insert("y".to_string(), json!(2));
        }
        assert_eq!(root, json!({"a": {"x": 1, "y": 2}}));
    }

    #[test]
    fn missing_segment_resolves_to_none() {
        let root = json!({"a": 1});
        let path = vec![PathSegment::Key("missing".into())];
        assert_eq!(resolve(&root, &path), None);
    }
}
