//! Entity store contracts and reference backends.
//!
//! The core consumes its collaborators through narrow traits with key-value
//! semantics: get by id, get by unique key, save, list. Two backends live
//! here:
//!
//! - [`mem`] — concurrent in-memory stores (DashMap), the reference backend
//!   used by tests and embedded deployments
//!
//! Production deployments implement the same traits against their own
//! persistence engine; nothing in the core depends on more than these
//! method sets.

pub mod mem;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::model::{
    AclEntry, BindingRole, Fact, FactComment, FactId, Object, ObjectId, Origin, OriginId, TypeId,
};

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// The reciprocal Object → Fact binding record.
///
/// These records are the reverse index traversal runs on: expanding a vertex
/// reads the Object's binding records, then loads each referenced Fact. The
/// role stored here mirrors the role embedded in the Fact's own binding list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectFactBinding {
    pub object: ObjectId,
    pub fact: FactId,
    pub role: BindingRole,
}

/// Store contract for Objects and their Fact binding records.
pub trait ObjectStore: Send + Sync {
    /// Get an Object by id.
    fn object(&self, id: ObjectId) -> StoreResult<Option<Object>>;

    /// Get an Object by its unique (type, value) key.
    fn object_by_value(&self, type_id: TypeId, value: &str) -> StoreResult<Option<Object>>;

    /// All Fact binding records of an Object.
    fn bindings(&self, id: ObjectId) -> StoreResult<Vec<ObjectFactBinding>>;

    /// Persist a new Object. Errors on duplicate id or duplicate (type, value).
    fn save_object(&self, object: Object) -> StoreResult<Object>;

    /// Persist a reciprocal Object → Fact binding record.
    fn save_binding(&self, binding: ObjectFactBinding) -> StoreResult<()>;
}

/// Store contract for Facts, their ACLs and comments.
pub trait FactStore: Send + Sync {
    /// Get a Fact by id.
    fn fact(&self, id: FactId) -> StoreResult<Option<Fact>>;

    /// All Facts with the given value. Used to find dedup candidates; callers
    /// narrow the result by type, bindings, organization and access mode.
    fn facts_by_value(&self, value: &str) -> StoreResult<Vec<Fact>>;

    /// Persist a new Fact.
    fn save_fact(&self, fact: Fact) -> StoreResult<Fact>;

    /// Bump a Fact's last-seen timestamp, returning the refreshed Fact.
    fn refresh_fact(&self, id: FactId, seen_at: DateTime<Utc>) -> StoreResult<Fact>;

    /// Append ACL entries to a Fact, skipping subjects already granted.
    /// Returns the updated Fact.
    fn append_acl(&self, id: FactId, entries: Vec<AclEntry>) -> StoreResult<Fact>;

    /// Append a comment to a Fact.
    fn append_comment(&self, comment: FactComment) -> StoreResult<()>;

    /// All comments of a Fact, oldest first.
    fn comments(&self, id: FactId) -> StoreResult<Vec<FactComment>>;

    /// Record that `meta` references `referenced` (meta-fact discoverability).
    fn save_meta_ref(&self, referenced: FactId, meta: FactId) -> StoreResult<()>;

    /// All meta-facts referencing the given Fact.
    fn meta_refs(&self, referenced: FactId) -> StoreResult<Vec<FactId>>;
}

/// Store contract for Origins.
pub trait OriginStore: Send + Sync {
    /// Get an Origin by id.
    fn origin(&self, id: OriginId) -> StoreResult<Option<Origin>>;

    /// Persist an Origin.
    fn save_origin(&self, origin: Origin) -> StoreResult<Origin>;
}

/// The external "retracted" marker index.
///
/// Retraction never touches the retracted Fact's record; the marker lives
/// outside the entities, mirroring how the surrounding platform keeps it in
/// its search index.
pub trait RetractionIndex: Send + Sync {
    /// Whether the Fact has been retracted.
    fn is_retracted(&self, id: FactId) -> bool;

    /// Flag the Fact as retracted.
    fn mark_retracted(&self, id: FactId);
}
