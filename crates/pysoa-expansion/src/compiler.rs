//! Compiling a declarative [`ExpansionRequest`] into a forest of
//! [`TypeNode`] trees, using [`TypeRoutes`] and [`TypeExpansions`] to
//! resolve each dotted expansion string. Grounded on
//! `expander.py::ExpansionConverter.dict_to_trees`.

use crate::config::{ConfigError, ExpansionRequest, TypeExpansions, TypeRoutes};
use crate::tree::{ExpansionNode, ExpansionParent, TypeNode};

/// Compiles expansion requests against a fixed configuration of type routes
/// and type expansions.
pub struct ExpansionCompiler {
    type_routes: TypeRoutes,
    type_expansions: TypeExpansions,
}

impl ExpansionCompiler {
    /// Build a compiler over the given route and expansion configuration.
    #[must_use]
    pub fn new(type_routes: TypeRoutes, type_expansions: TypeExpansions) -> Self {
        Self {
            type_routes,
            type_expansions,
        }
    }

    /// Compile an [`ExpansionRequest`] into one [`TypeNode`] tree per
    /// requested object type.
    ///
    /// A dotted expansion string like `"author.manager"` walks down the
    /// tree one segment at a time, resolving and inserting any node not
    /// already present; two strings sharing a prefix (`"author.manager"`
    /// and `"author.team"`) extend the same `author` subtree rather than
    /// creating two.
    pub fn compile(&self, request: &ExpansionRequest) -> Result<Vec<TypeNode>, ConfigError> {
        let mut trees = Vec::with_capacity(request.len());
        for (object_type, expansion_strings) in request {
            let mut root = TypeNode::new(object_type.clone());
            for exp_string in expansion_strings {
                let parts: Vec<&str> = exp_string.split('.').collect();
                self.compile_path(&mut root, object_type, &parts)?;
            }
            trees.push(root);
        }
        Ok(trees)
    }

    fn compile_path<P: ExpansionParent>(
        &self,
        parent: &mut P,
        object_type: &str,
        parts: &[&str],
    ) -> Result<(), ConfigError> {
        let Some((&exp_name, rest)) = parts.split_first() else {
            return Ok(());
        };

        if !parent.children().contains_key(exp_name) {
            let entry = self
                .type_expansions
                .get(object_type)
                .and_then(|m| m.get(exp_name))
                .ok_or_else(|| ConfigError::UnknownExpansion {
                    object_type: object_type.to_string(),
                    name: exp_name.to_string(),
                })?;

            let route_name = entry.route_name()?;
            let route =
                self.type_routes
                    .get(route_name)
                    .ok_or_else(|| ConfigError::UnknownRoute {
                        route: route_name.to_string(),
                    })?;
            let child_type = entry.object_type()?;

            let node = ExpansionNode::new(
                child_type,
                exp_name,
                &entry.source_field,
                &entry.dest_field,
                &route.service,
                &route.action,
                &route.request_field,
                &route.response_field,
                entry.raise_action_errors,
            );
            parent.children_mut().insert(exp_name.to_string(), node);
        }

        let child = parent
            .children_mut()
            .get_mut(exp_name)
            .expect("just inserted or already present");
        let child_type = child.object_type().to_string();
        self.compile_path(child, &child_type, rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{TypeExpansionEntry, TypeRoute};
    use std::collections::HashMap;

    fn sample_compiler() -> ExpansionCompiler {
        let mut routes = HashMap::new();
        routes.insert(
            "user".to_string(),
            TypeRoute {
                service: "users".to_string(),
                action: "get_user".to_string(),
                request_field: "id".to_string(),
                response_field: "user".to_string(),
            },
        );

        let mut post_expansions = HashMap::new();
        post_expansions.insert(
            "author".to_string(),
            TypeExpansionEntry {
                route: None,
                object_type: None,
                legacy_type: Some("user".to_string()),
                source_field: "author_id".to_string(),
                dest_field: "author".to_string(),
                raise_action_errors: false,
            },
        );
        let mut user_expansions = HashMap::new();
        user_expansions.insert(
            "manager".to_string(),
            TypeExpansionEntry {
                route: None,
                object_type: None,
                legacy_type: Some("user".to_string()),
                source_field: "manager_id".to_string(),
                dest_field: "manager".to_string(),
                raise_action_errors: false,
            },
        );

        let mut expansions = HashMap::new();
        expansions.insert("post".to_string(), post_expansions);
        expansions.insert("user".to_string(), user_expansions);

        ExpansionCompiler::new(routes, expansions)
    }

    #[test]
    fn compiles_dotted_expansion_into_nested_nodes() {
        let compiler = sample_compiler();
        let mut request = HashMap::new();
        request.insert("post".to_string(), vec!["author.manager".to_string()]);

        let trees = compiler.compile(&request).unwrap();
        assert_eq!(trees.len(), 1);
        let author = trees[0].get_expansion("author").unwrap();
        assert_eq!(author.service, "users");
        let manager = author.get_expansion("manager").unwrap();
        assert_eq!(manager.dest_field, "manager");
    }

    #[test]
    fn unknown_expansion_name_is_an_error() {
        let compiler = sample_compiler();
        let mut request = HashMap::new();
        request.insert("post".to_string(), vec!["ghost".to_string()]);
        let err = compiler.compile(&request).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownExpansion { .. }));
    }
}
