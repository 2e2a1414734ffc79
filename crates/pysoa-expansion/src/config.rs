//! Declarative expansion configuration (spec §4.6, §9).
//!
//! Two config dictionaries drive the engine: type routes (which service
//! action satisfies an expansion type) and type expansions (which fields,
//! on which object type, carry an expansion of which type). Grounded on
//! `expander.py`'s `ExpansionConverter.__init__` docstring, including the
//! `type`/`route` coupling called out as an open question in spec.md §9.

use serde::Deserialize;
use std::collections::HashMap;

/// How to satisfy an expansion of a given type: which service/action to
/// call and which request/response fields carry the expansion identifier
/// and result.
#[derive(Debug, Clone, Deserialize)]
pub struct TypeRoute {
    /// The service that can satisfy this expansion type.
    pub service: String,
    /// The action to call on `service`.
    pub action: String,
    /// The field in the action's request body that carries the identifier.
    pub request_field: String,
    /// The field in the action's response body that carries the result.
    pub response_field: String,
}

/// `{ route_name: TypeRoute }`.
pub type TypeRoutes = HashMap<String, TypeRoute>;

/// One expansion definition for a field on some object type.
///
/// The original implementation used one key, `type`, to mean both "which
/// route satisfies this" and "what type is the expanded object" — a single
/// field serving two purposes (spec.md §9's open question). This struct
/// accepts either the legacy `type` key or an explicit `route`/`object_type`
/// pair, decoupling the two at deserialization time while still defaulting
/// `object_type` to the route name when the caller hasn't split them out.
#[derive(Debug, Clone, Deserialize)]
pub struct TypeExpansionEntry {
    /// The route name to look up in [`TypeRoutes`], if given explicitly.
    #[serde(default)]
    pub route: Option<String>,
    /// The expanded object's `_type` marker, if given explicitly.
    #[serde(default)]
    pub object_type: Option<String>,
    /// Legacy single key serving as both `route` and `object_type` when
    /// neither of those is present.
    #[serde(rename = "type", default)]
    pub legacy_type: Option<String>,
    /// Field on the containing object that holds the expansion identifier.
    pub source_field: String,
    /// Field on the containing object to fill with the expansion result.
    pub dest_field: String,
    /// Whether an error from the expansion action should propagate rather
    /// than leave the destination field unpopulated.
    #[serde(default)]
    pub raise_action_errors: bool,
}

impl TypeExpansionEntry {
    /// Resolve the route name to look up in [`TypeRoutes`].
    pub fn route_name(&self) -> Result<&str, ConfigError> {
        self.route
            .as_deref()
            .or(self.legacy_type.as_deref())
            .ok_or(ConfigError::MissingRoute)
    }

    /// Resolve the expanded object's `_type` marker.
    pub fn object_type(&self) -> Result<&str, ConfigError> {
        self.object_type
            .as_deref()
            .or(self.legacy_type.as_deref())
            .ok_or(ConfigError::MissingObjectType)
    }
}

/// `{ object_type: { expansion_name: TypeExpansionEntry } }`.
pub type TypeExpansions = HashMap<String, HashMap<String, TypeExpansionEntry>>;

/// A declarative expansion request: `{ object_type: [dotted expansion
/// strings] }` (spec.md §4.6's "expansion dictionary").
pub type ExpansionRequest = HashMap<String, Vec<String>>;

/// Failures compiling an [`ExpansionRequest`] against [`TypeRoutes`] and
/// [`TypeExpansions`].
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A `TypeExpansionEntry` specified neither `route` nor `type`.
    #[error("expansion entry specifies neither `route` nor `type`")]
    MissingRoute,
    /// A `TypeExpansionEntry` specified neither `object_type` nor `type`.
    #[error("expansion entry specifies neither `object_type` nor `type`")]
    MissingObjectType,
    /// An expansion string named an expansion not defined for its object type.
    #[error("no expansion named `{name}` is defined for type `{object_type}`")]
    UnknownExpansion {
        /// The object type the expansion string was rooted at.
        object_type: String,
        /// The undefined expansion name.
        name: String,
    },
    /// An expansion entry named a route absent from [`TypeRoutes`].
    #[error("no route named `{route}` is configured")]
    UnknownRoute {
        /// The undefined route name.
        route: String,
    },
}
