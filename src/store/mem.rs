//! Concurrent in-memory store backends (DashMap).
//!
//! Reference implementation of the store contracts. The dedup key
//! (type, value, bindings, organization, access mode) has no
//! compare-and-insert here: two concurrent identical creates may both
//! insert, and the duplicate is tolerated — last write wins on the
//! last-seen timestamp.

use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};

use crate::error::StoreError;
use crate::model::{
    AclEntry, Fact, FactComment, FactId, Object, ObjectId, Origin, OriginId, TypeId,
};

use super::{FactStore, ObjectFactBinding, ObjectStore, OriginStore, RetractionIndex, StoreResult};

/// In-memory Object store with a (type, value) uniqueness index.
#[derive(Default)]
pub struct MemObjectStore {
    objects: DashMap<ObjectId, Object>,
    by_value: DashMap<(TypeId, String), ObjectId>,
    bindings: DashMap<ObjectId, Vec<ObjectFactBinding>>,
}

impl MemObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored Objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl ObjectStore for MemObjectStore {
    fn object(&self, id: ObjectId) -> StoreResult<Option<Object>> {
        Ok(self.objects.get(&id).map(|r| r.value().clone()))
    }

    fn object_by_value(&self, type_id: TypeId, value: &str) -> StoreResult<Option<Object>> {
        let id = match self.by_value.get(&(type_id, value.to_string())) {
            Some(r) => *r.value(),
            None => return Ok(None),
        };
        self.object(id)
    }

    fn bindings(&self, id: ObjectId) -> StoreResult<Vec<ObjectFactBinding>> {
        Ok(self
            .bindings
            .get(&id)
            .map(|r| r.value().clone())
            .unwrap_or_default())
    }

    fn save_object(&self, object: Object) -> StoreResult<Object> {
        let key = (object.type_id, object.value.clone());
        if self.objects.contains_key(&object.id) {
            return Err(StoreError::DuplicateKey {
                key: object.id.to_string(),
            });
        }
        if self.by_value.contains_key(&key) {
            return Err(StoreError::DuplicateKey {
                key: format!("{}/{}", object.type_id, object.value),
            });
        }
        self.by_value.insert(key, object.id);
        self.objects.insert(object.id, object.clone());
        Ok(object)
    }

    fn save_binding(&self, binding: ObjectFactBinding) -> StoreResult<()> {
        let mut entry = self.bindings.entry(binding.object).or_default();
        if !entry.contains(&binding) {
            entry.push(binding);
        }
        Ok(())
    }
}

/// In-memory Fact store with a value index for dedup candidate lookup.
#[derive(Default)]
pub struct MemFactStore {
    facts: DashMap<FactId, Fact>,
    by_value: DashMap<String, Vec<FactId>>,
    comments: DashMap<FactId, Vec<FactComment>>,
    meta_refs: DashMap<FactId, Vec<FactId>>,
}

impl MemFactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored Facts.
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    fn fact_or_err(&self, id: FactId) -> StoreResult<Fact> {
        self.facts
            .get(&id)
            .map(|r| r.value().clone())
            .ok_or(StoreError::Backend {
                message: format!("fact {id} not stored"),
            })
    }
}

impl FactStore for MemFactStore {
    fn fact(&self, id: FactId) -> StoreResult<Option<Fact>> {
        Ok(self.facts.get(&id).map(|r| r.value().clone()))
    }

    fn facts_by_value(&self, value: &str) -> StoreResult<Vec<Fact>> {
        let ids = match self.by_value.get(value) {
            Some(r) => r.value().clone(),
            None => return Ok(Vec::new()),
        };
        Ok(ids
            .into_iter()
            .filter_map(|id| self.facts.get(&id).map(|r| r.value().clone()))
            .collect())
    }

    fn save_fact(&self, fact: Fact) -> StoreResult<Fact> {
        if self.facts.contains_key(&fact.id) {
            return Err(StoreError::DuplicateKey {
                key: fact.id.to_string(),
            });
        }
        self.by_value
            .entry(fact.value.clone())
            .or_default()
            .push(fact.id);
        self.facts.insert(fact.id, fact.clone());
        Ok(fact)
    }

    fn refresh_fact(&self, id: FactId, seen_at: DateTime<Utc>) -> StoreResult<Fact> {
        let mut entry = self.facts.get_mut(&id).ok_or(StoreError::Backend {
            message: format!("fact {id} not stored"),
        })?;
        entry.last_seen_timestamp = seen_at;
        Ok(entry.value().clone())
    }

    fn append_acl(&self, id: FactId, entries: Vec<AclEntry>) -> StoreResult<Fact> {
        let mut entry = self.facts.get_mut(&id).ok_or(StoreError::Backend {
            message: format!("fact {id} not stored"),
        })?;
        for acl in entries {
            if !entry.acl.iter().any(|e| e.subject == acl.subject) {
                entry.acl.push(acl);
            }
        }
        Ok(entry.value().clone())
    }

    fn append_comment(&self, comment: FactComment) -> StoreResult<()> {
        // Comments reference a Fact; a dangling comment is a caller bug.
        self.fact_or_err(comment.fact)?;
        self.comments.entry(comment.fact).or_default().push(comment);
        Ok(())
    }

    fn comments(&self, id: FactId) -> StoreResult<Vec<FactComment>> {
        Ok(self
            .comments
            .get(&id)
            .map(|r| r.value().clone())
            .unwrap_or_default())
    }

    fn save_meta_ref(&self, referenced: FactId, meta: FactId) -> StoreResult<()> {
        let mut entry = self.meta_refs.entry(referenced).or_default();
        if !entry.contains(&meta) {
            entry.push(meta);
        }
        Ok(())
    }

    fn meta_refs(&self, referenced: FactId) -> StoreResult<Vec<FactId>> {
        Ok(self
            .meta_refs
            .get(&referenced)
            .map(|r| r.value().clone())
            .unwrap_or_default())
    }
}

/// In-memory Origin store.
#[derive(Default)]
pub struct MemOriginStore {
    origins: DashMap<OriginId, Origin>,
}

impl MemOriginStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OriginStore for MemOriginStore {
    fn origin(&self, id: OriginId) -> StoreResult<Option<Origin>> {
        Ok(self.origins.get(&id).map(|r| r.value().clone()))
    }

    fn save_origin(&self, origin: Origin) -> StoreResult<Origin> {
        self.origins.insert(origin.id, origin.clone());
        Ok(origin)
    }
}

/// In-memory retraction marker index.
#[derive(Default)]
pub struct MemRetractionIndex {
    retracted: DashSet<FactId>,
}

impl MemRetractionIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RetractionIndex for MemRetractionIndex {
    fn is_retracted(&self, id: FactId) -> bool {
        self.retracted.contains(&id)
    }

    fn mark_retracted(&self, id: FactId) {
        self.retracted.insert(id);
    }
}
