//! Compiled expansion trees: [`TypeNode`] is a request's root, [`ExpansionNode`]
//! is everything under it. Grounded on `expander.py`'s `TypeNode` /
//! `ExpansionNode` classes.

use crate::path::{Path, PathSegment};
use serde_json::Value;
use std::collections::BTreeMap;

/// Shared behavior of a node that owns a set of named child expansions.
///
/// `ExpansionNode` is itself such a node in the original implementation
/// (`ExpansionNode` subclasses `TypeNode`) — a node with its own
/// expansions satisfied can have further expansions nested under it. This
/// trait captures that without inheritance.
pub trait ExpansionParent {
    /// The `_type` marker this node matches objects against.
    fn object_type(&self) -> &str;

    /// This node's child expansions, keyed by expansion name.
    fn children(&self) -> &BTreeMap<String, ExpansionNode>;

    /// Mutable access to this node's child expansions.
    fn children_mut(&mut self) -> &mut BTreeMap<String, ExpansionNode>;

    /// Add a child expansion node. If a node with the same name already
    /// exists, their children are merged recursively rather than one
    /// replacing the other (spec.md §4.6: a later expansion string
    /// sharing a prefix with an earlier one extends the same subtree).
    fn add_expansion(&mut self, node: ExpansionNode) {
        match self.children_mut().entry(node.name.clone()) {
            std::collections::btree_map::Entry::Occupied(mut existing) => {
                for (_, child) in node.take_children() {
                    existing.get_mut().add_expansion(child);
                }
            }
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(node);
            }
        }
    }

    /// Look up a direct child expansion by name.
    fn get_expansion(&self, name: &str) -> Option<&ExpansionNode> {
        self.children().get(name)
    }

    /// Iterate this node's direct child expansions.
    fn expansions(&self) -> std::collections::btree_map::Values<'_, String, ExpansionNode> {
        self.children().values()
    }

    /// Find every object within `value` whose `_type` matches this node's
    /// `object_type`, returning each match's path from `value`'s root.
    ///
    /// Mirrors `TypeNode.find_objects`: a dict with no `_type` key is
    /// searched recursively; a dict whose `_type` differs from the target
    /// is a dead end and is *not* searched further (shallowest match wins,
    /// and a mismatched wrapper object never leaks a nested match).
    fn find_objects(&self, value: &Value) -> Vec<Path> {
        let mut out = Vec::new();
        let mut current = Path::new();
        find_objects_inner(value, self.object_type(), &mut current, &mut out);
        out
    }
}

fn find_objects_inner(value: &Value, object_type: &str, current: &mut Path, out: &mut Vec<Path>) {
    match value {
        Value::Object(map) => match map.get("_type") {
            Some(Value::String(t)) if t == object_type => out.push(current.clone()),
            Some(_) => {}
            None => {
                for (key, sub_value) in map {
                    current.push(PathSegment::Key(key.clone()));
                    find_objects_inner(sub_value, object_type, current, out);
                    current.pop();
                }
            }
        },
        Value::Array(items) => {
            for (idx, sub_value) in items.iter().enumerate() {
                current.push(PathSegment::Index(idx));
                find_objects_inner(sub_value, object_type, current, out);
                current.pop();
            }
        }
        _ => {}
    }
}

/// The root of one expansion tree: an object type and the expansions
/// requested directly on it (spec.md §4.6).
#[derive(Debug, Clone)]
pub struct TypeNode {
    object_type: String,
    children: BTreeMap<String, ExpansionNode>,
}

impl TypeNode {
    /// Build an empty type node rooted at `object_type`.
    #[must_use]
    pub fn new(object_type: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            children: BTreeMap::new(),
        }
    }
}

impl ExpansionParent for TypeNode {
    fn object_type(&self) -> &str {
        &self.object_type
    }

    fn children(&self) -> &BTreeMap<String, ExpansionNode> {
        &self.children
    }

    fn children_mut(&mut self) -> &mut BTreeMap<String, ExpansionNode> {
        &mut self.children
    }
}

/// One expansion: which field to read the identifier from, which service
/// action resolves it, which field to write the result into, and any
/// further expansions nested under the resolved object (spec.md §4.6).
#[derive(Debug, Clone)]
pub struct ExpansionNode {
    object_type: String,
    /// This expansion's name, as it appears in a dotted expansion string.
    pub name: String,
    /// Field on the containing object holding the expansion identifier.
    pub source_field: String,
    /// Field on the containing object to fill with the expansion result.
    pub dest_field: String,
    /// The service to call to resolve this expansion.
    pub service: String,
    /// The action to call on `service`.
    pub action: String,
    /// The request body field to place the identifier value into.
    pub request_field: String,
    /// The response body field to read the resolved value from.
    pub response_field: String,
    /// Whether an action error resolving this expansion should propagate
    /// rather than simply leaving `dest_field` unpopulated.
    pub raise_action_errors: bool,
    children: BTreeMap<String, ExpansionNode>,
}

impl ExpansionNode {
    /// Build a leaf expansion node (no nested expansions yet).
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        object_type: impl Into<String>,
        name: impl Into<String>,
        source_field: impl Into<String>,
        dest_field: impl Into<String>,
        service: impl Into<String>,
        action: impl Into<String>,
        request_field: impl Into<String>,
        response_field: impl Into<String>,
        raise_action_errors: bool,
    ) -> Self {
        Self {
            object_type: object_type.into(),
            name: name.into(),
            source_field: source_field.into(),
            dest_field: dest_field.into(),
            service: service.into(),
            action: action.into(),
            request_field: request_field.into(),
            response_field: response_field.into(),
            raise_action_errors,
            children: BTreeMap::new(),
        }
    }

    fn take_children(self) -> BTreeMap<String, ExpansionNode> {
        self.children
    }
}

impl ExpansionParent for ExpansionNode {
    fn object_type(&self) -> &str {
        &self.object_type
    }

    fn children(&self) -> &BTreeMap<String, ExpansionNode> {
        &self.children
    }

    fn children_mut(&mut self) -> &mut BTreeMap<String, ExpansionNode> {
        &mut self.children
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn leaf(name: &str) -> ExpansionNode {
        ExpansionNode::new("user", name, "user_id", "user", "users", "get_user", "id", "user", true)
    }

    #[test]
    fn merging_same_named_expansion_combines_children() {
        let mut a = leaf("author");
        a.add_expansion(leaf("manager"));

        let mut b = leaf("author");
        b.add_expansion(leaf("team"));

        let mut root = TypeNode::new("post");
        root.add_expansion(a);
        root.add_expansion(b);

        let author = root.get_expansion("author").unwrap();
        assert!(author.get_expansion("manager").is_some());
        assert!(author.get_expansion("team").is_some());
    }

    #[test]
    fn find_objects_stops_at_mismatched_type_marker() {
        let root = TypeNode::new("user");
        let value = json!({
            "_type": "post",
            "author": { "_type": "user", "id": 1 }
        });
        assert!(root.find_objects(&value).is_empty());
    }

    #[test]
    fn find_objects_recurses_through_untyped_wrappers() {
        let root = TypeNode::new("user");
        let value = json!({
            "wrapper": { "author": { "_type": "user", "id": 1 } }
        });
        let paths = root.find_objects(&value);
        assert_eq!(paths.len(), 1);
        assert_eq!(
            crate::path::resolve(&value, &paths[0]),
            Some(&json!({"_type": "user", "id": 1}))
        );
    }
}
