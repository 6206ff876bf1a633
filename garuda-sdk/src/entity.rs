//! The domain entity contract. An external SDK plugs real domain types
//! (users, organizations, whatever the host application models) into a
//! Garuda server by implementing [`Entity`] and registering a factory for it
//! in an [`crate::registry::SdkBundle`]; the server never knows the concrete
//! type, only this trait.

use crate::error_list::ErrorList;
use serde_json::Value;
use std::fmt;

/// Describes one child relationship of an entity: a REST name reachable as a
/// sub-collection, and whether it is resolved by parent pointer ("child", the
/// owning relationship) or by an explicit association list ("rel").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// The child stores `parent_type`/`parent_id` and is found by scanning
    /// for those values.
    Child,
    /// The parent stores an explicit list of related ids (`assign`).
    Related,
}

#[derive(Debug, Clone)]
pub struct FetcherMetadata {
    pub rest_name: String,
    pub kind: RelationKind,
}

/// A boxed, trait-object domain entity. This is the unit of currency passed
/// through the operations pipeline: storage plugins produce and consume it,
/// permissions plugins inspect ownership on it, logic plugins see it in the
/// request `Context`.
pub type EntityInstance = Box<dyn Entity>;

/// The contract an external domain model implements to participate in a
/// Garuda server's request pipeline.
///
/// Implementors are expected to be plain data holders; all of the pipeline's
/// behavior (authentication, permissions, storage dispatch) lives outside
/// this trait and only calls through it.
pub trait Entity: fmt::Debug + Send + Sync {
    /// The REST resource name used in URLs and in storage keys, e.g. `"user"`.
    fn rest_name(&self) -> &str;

    /// Unique identifier, assigned by the storage plugin on creation.
    fn id(&self) -> Option<&str>;

    fn set_id(&mut self, id: String);

    /// Identifier of the entity that owns this one (for permission checks).
    fn owner(&self) -> Option<&str>;

    fn set_owner(&mut self, owner: String);

    /// REST name and id of the parent entity this one was created under, if
    /// any (root-level entities have none).
    fn parent(&self) -> Option<(&str, &str)>;

    fn set_parent(&mut self, rest_name: String, id: String);

    /// The REST names of child collections this entity can own, in cascade
    /// delete order.
    fn children_rest_names(&self) -> &[String];

    /// Describes how each child collection is resolved.
    fn fetcher_for_rest_name(&self, rest_name: &str) -> Option<FetcherMetadata>;

    /// Serializes this entity to its wire representation (fields only, no
    /// envelope).
    fn to_dict(&self) -> Value;

    /// Overwrites this entity's fields from a wire representation, leaving
    /// `id`/`owner`/`parent` untouched unless present in `data`.
    fn from_dict(&mut self, data: &Value) -> Result<(), String>;

    /// Validates the entity's current field values, appending any violations
    /// to `errors`. An entity with no errors added is considered valid.
    fn validate(&self, errors: &mut ErrorList);

    /// True if `other` has the same REST name, id, and field values as
    /// `self` — used by storage plugins to detect no-op updates.
    fn rest_equals(&self, other: &dyn Entity) -> bool;

    /// Object-safe clone, since `Clone` itself is not object-safe.
    fn clone_box(&self) -> EntityInstance;
}

impl Clone for EntityInstance {
    fn clone(&self) -> Self {
        self.as_ref().clone_box()
    }
}
