//! Read-only typed property views for vertices and edges.
//!
//! Property tables are computed once per element instantiation and never
//! change mid-traversal. Lookup follows the "no keys → all, keys → the
//! intersection, unknown keys → empty" rule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Fact, Object};

/// A typed property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Str(String),
    Id(Uuid),
    Float(f32),
    Int(i64),
    Time(DateTime<Utc>),
}

impl std::fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyValue::Str(s) => write!(f, "{s}"),
            PropertyValue::Id(id) => write!(f, "{id}"),
            PropertyValue::Float(v) => write!(f, "{v}"),
            PropertyValue::Int(v) => write!(f, "{v}"),
            PropertyValue::Time(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}

/// An immutable, name-keyed property table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyTable {
    entries: Vec<(String, PropertyValue)>,
}

impl PropertyTable {
    pub fn new(entries: Vec<(String, PropertyValue)>) -> Self {
        PropertyTable { entries }
    }

    /// Look up properties by key. An empty key slice returns every property;
    /// otherwise the intersection is returned. Unknown keys contribute
    /// nothing — they are not an error.
    pub fn lookup(&self, keys: &[String]) -> Vec<(&str, &PropertyValue)> {
        self.entries
            .iter()
            .filter(|(name, _)| keys.is_empty() || keys.iter().any(|k| k == name))
            .map(|(name, value)| (name.as_str(), value))
            .collect()
    }

    /// Look up a single property by key.
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no properties.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build the fixed property table of an edge from its owning Fact.
pub fn fact_properties(fact: &Fact) -> PropertyTable {
    let mut entries = vec![
        ("factID".to_string(), PropertyValue::Id(fact.id.get())),
        ("value".to_string(), PropertyValue::Str(fact.value.clone())),
        (
            "organizationID".to_string(),
            PropertyValue::Id(fact.organization),
        ),
        ("originID".to_string(), PropertyValue::Id(fact.origin)),
        (
            "accessMode".to_string(),
            PropertyValue::Str(fact.access_mode.to_string()),
        ),
        ("trust".to_string(), PropertyValue::Float(fact.trust)),
        (
            "confidence".to_string(),
            PropertyValue::Float(fact.confidence),
        ),
        (
            "certainty".to_string(),
            PropertyValue::Float(fact.certainty()),
        ),
        ("timestamp".to_string(), PropertyValue::Time(fact.timestamp)),
        (
            "lastSeenTimestamp".to_string(),
            PropertyValue::Time(fact.last_seen_timestamp),
        ),
    ];
    if let Some(reference) = fact.in_reference_to {
        entries.push((
            "inReferenceToID".to_string(),
            PropertyValue::Id(reference.get()),
        ));
    }
    PropertyTable::new(entries)
}

/// Build the property table of a vertex from its Object.
///
/// Only `value` is exposed. Object statistics would need the external search
/// index and stay out of this core.
pub fn object_properties(object: &Object) -> PropertyTable {
    PropertyTable::new(vec![(
        "value".to_string(),
        PropertyValue::Str(object.value.clone()),
    )])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FactId, ObjectId};

    #[test]
    fn empty_keys_return_all_properties() {
        let fact = Fact::new(FactId::random(), Uuid::new_v4()).with_value("v");
        let table = fact_properties(&fact);
        assert_eq!(table.lookup(&[]).len(), table.len());
    }

    #[test]
    fn requested_keys_return_intersection() {
        let fact = Fact::new(FactId::random(), Uuid::new_v4()).with_value("v");
        let table = fact_properties(&fact);
        let selected = table.lookup(&["value".to_string(), "trust".to_string()]);
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn unknown_keys_yield_empty_not_error() {
        let object = Object::new(ObjectId::random(), Uuid::new_v4(), "1.2.3.4");
        let table = object_properties(&object);
        assert!(table.lookup(&["nope".to_string()]).is_empty());
        assert!(table.get("nope").is_none());
    }

    #[test]
    fn in_reference_to_present_only_for_meta_facts() {
        let base = Fact::new(FactId::random(), Uuid::new_v4());
        assert!(fact_properties(&base).get("inReferenceToID").is_none());

        let meta = Fact::new(FactId::random(), Uuid::new_v4()).with_in_reference_to(base.id);
        assert_eq!(
            fact_properties(&meta).get("inReferenceToID"),
            Some(&PropertyValue::Id(base.id.get()))
        );
    }

    #[test]
    fn vertex_exposes_only_value() {
        let object = Object::new(ObjectId::random(), Uuid::new_v4(), "test.example.org");
        let table = object_properties(&object);
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.get("value"),
            Some(&PropertyValue::Str("test.example.org".into()))
        );
    }
}
