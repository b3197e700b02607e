//! Wire-level response models and the injected conversion functions.
//!
//! Conversion is a pure, caller-injected concern: the traversal engine and
//! lifecycle manager hand entities to a [`ResponseConverter`] and never build
//! wire representations themselves. [`ModelConverter`] is the default
//! implementation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    AccessMode, BindingRole, Fact, FactId, Object, ObjectId, OrganizationId, OriginId, UserId,
};

/// Response model of an Object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectModel {
    pub id: ObjectId,
    #[serde(rename = "type")]
    pub type_name: String,
    pub value: String,
}

/// One resolved binding on a Fact response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingModel {
    pub object: ObjectId,
    pub role: BindingRole,
}

/// Response model of a Fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactModel {
    pub id: FactId,
    #[serde(rename = "type")]
    pub type_name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_reference_to: Option<FactId>,
    pub organization: OrganizationId,
    pub origin: OriginId,
    pub added_by: UserId,
    pub access_mode: AccessMode,
    pub trust: f32,
    pub confidence: f32,
    pub certainty: f32,
    pub timestamp: DateTime<Utc>,
    pub last_seen_timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<BindingModel>,
}

/// Injected, pure entity → response conversion.
pub trait ResponseConverter: Send + Sync {
    fn object(&self, object: &Object, type_name: &str) -> ObjectModel;
    fn fact(&self, fact: &Fact, type_name: &str) -> FactModel;
}

/// Field-for-field default conversion.
#[derive(Debug, Clone, Default)]
pub struct ModelConverter;

impl ModelConverter {
    pub fn new() -> Self {
        ModelConverter
    }
}

impl ResponseConverter for ModelConverter {
    fn object(&self, object: &Object, type_name: &str) -> ObjectModel {
        ObjectModel {
            id: object.id,
            type_name: type_name.to_string(),
            value: object.value.clone(),
        }
    }

    fn fact(&self, fact: &Fact, type_name: &str) -> FactModel {
        FactModel {
            id: fact.id,
            type_name: type_name.to_string(),
            value: fact.value.clone(),
            in_reference_to: fact.in_reference_to,
            organization: fact.organization,
            origin: fact.origin,
            added_by: fact.added_by,
            access_mode: fact.access_mode,
            trust: fact.trust,
            confidence: fact.confidence,
            certainty: fact.certainty(),
            timestamp: fact.timestamp,
            last_seen_timestamp: fact.last_seen_timestamp,
            bindings: fact
                .bindings
                .iter()
                .map(|b| BindingModel {
                    object: b.object,
                    role: b.role,
                })
                .collect(),
        }
    }
}
