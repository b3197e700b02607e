//! Type registry: ObjectType and FactType definitions with id ↔ name lookup.
//!
//! The registry is the schema of the knowledge base. FactTypes declare,
//! mutually exclusively, which Object bindings they allow (source type,
//! destination type, bidirectional flag) or which referenced FactTypes they
//! allow (for meta-facts). Validators are compiled once at registration and
//! cached for every later check.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RegistryError;
use crate::model::TypeId;
use crate::validator::{CompiledValidator, Validator};

/// Well-known id of the reserved Retraction FactType.
///
/// Created on demand by [`TypeRegistry::retraction_type`]; callers may not use
/// it directly when creating Facts.
pub const RETRACTION_TYPE_ID: TypeId = Uuid::from_u128(0x00000000_0000_0000_0000_000000000001);

/// Name of the reserved Retraction FactType.
pub const RETRACTION_TYPE_NAME: &str = "Retraction";

/// Definition of an Object entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectType {
    pub id: TypeId,
    pub name: String,
    #[serde(default)]
    pub validator: Validator,
}

impl ObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        ObjectType {
            id: Uuid::new_v4(),
            name: name.into(),
            validator: Validator::TrueAlways,
        }
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }
}

/// An allowed (source type, destination type, bidirectional) combination for
/// Object-binding Facts. Either side may be open to support bindings of
/// cardinality 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectBindingDef {
    pub source_type: Option<TypeId>,
    pub destination_type: Option<TypeId>,
    pub bidirectional: bool,
}

/// An allowed referenced FactType for meta-facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactBindingDef {
    pub fact_type: TypeId,
}

/// Definition of a Fact statement type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactType {
    pub id: TypeId,
    pub name: String,
    /// Confidence assigned when a create request does not state one.
    pub default_confidence: f32,
    #[serde(default)]
    pub validator: Validator,
    /// Allowed Object bindings. Mutually exclusive with `relevant_fact_bindings`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relevant_object_bindings: Vec<ObjectBindingDef>,
    /// Allowed referenced FactTypes. Mutually exclusive with `relevant_object_bindings`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relevant_fact_bindings: Vec<FactBindingDef>,
}

impl FactType {
    pub fn new(name: impl Into<String>) -> Self {
        FactType {
            id: Uuid::new_v4(),
            name: name.into(),
            default_confidence: 1.0,
            validator: Validator::TrueAlways,
            relevant_object_bindings: Vec::new(),
            relevant_fact_bindings: Vec::new(),
        }
    }

    pub fn with_default_confidence(mut self, confidence: f32) -> Self {
        self.default_confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Allow a directed binding between the given Object types.
    pub fn with_object_binding(
        mut self,
        source_type: Option<TypeId>,
        destination_type: Option<TypeId>,
        bidirectional: bool,
    ) -> Self {
        self.relevant_object_bindings.push(ObjectBindingDef {
            source_type,
            destination_type,
            bidirectional,
        });
        self
    }

    /// Allow referencing Facts of the given type (meta-facts).
    pub fn with_fact_binding(mut self, fact_type: TypeId) -> Self {
        self.relevant_fact_bindings.push(FactBindingDef { fact_type });
        self
    }
}

/// Registry of ObjectTypes and FactTypes with O(1) lookup by id and by name.
pub struct TypeRegistry {
    object_types: DashMap<TypeId, ObjectType>,
    object_type_names: DashMap<String, TypeId>,
    fact_types: DashMap<TypeId, FactType>,
    fact_type_names: DashMap<String, TypeId>,
    /// Compiled validators for both kinds of types, keyed by type id.
    validators: DashMap<TypeId, CompiledValidator>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        TypeRegistry {
            object_types: DashMap::new(),
            object_type_names: DashMap::new(),
            fact_types: DashMap::new(),
            fact_type_names: DashMap::new(),
            validators: DashMap::new(),
        }
    }

    /// Register an ObjectType. Errors on duplicate name or invalid pattern.
    pub fn register_object_type(&self, object_type: ObjectType) -> Result<(), RegistryError> {
        if self.object_type_names.contains_key(&object_type.name) {
            return Err(RegistryError::DuplicateName {
                name: object_type.name,
            });
        }
        let compiled = CompiledValidator::compile(&object_type.validator).map_err(|e| {
            RegistryError::InvalidPattern {
                name: object_type.name.clone(),
                message: e.to_string(),
            }
        })?;

        self.validators.insert(object_type.id, compiled);
        self.object_type_names
            .insert(object_type.name.clone(), object_type.id);
        self.object_types.insert(object_type.id, object_type);
        Ok(())
    }

    /// Register a FactType. Errors on duplicate name, invalid pattern, or a
    /// definition declaring both Object and Fact bindings.
    pub fn register_fact_type(&self, fact_type: FactType) -> Result<(), RegistryError> {
        if !fact_type.relevant_object_bindings.is_empty()
            && !fact_type.relevant_fact_bindings.is_empty()
        {
            return Err(RegistryError::AmbiguousBindings {
                name: fact_type.name,
            });
        }
        if self.fact_type_names.contains_key(&fact_type.name) {
            return Err(RegistryError::DuplicateName {
                name: fact_type.name,
            });
        }
        let compiled = CompiledValidator::compile(&fact_type.validator).map_err(|e| {
            RegistryError::InvalidPattern {
                name: fact_type.name.clone(),
                message: e.to_string(),
            }
        })?;

        self.validators.insert(fact_type.id, compiled);
        self.fact_type_names
            .insert(fact_type.name.clone(), fact_type.id);
        self.fact_types.insert(fact_type.id, fact_type);
        Ok(())
    }

    /// Look up an ObjectType by id.
    pub fn object_type(&self, id: TypeId) -> Option<ObjectType> {
        self.object_types.get(&id).map(|r| r.value().clone())
    }

    /// Look up an ObjectType by name.
    pub fn object_type_by_name(&self, name: &str) -> Option<ObjectType> {
        let id = *self.object_type_names.get(name)?;
        self.object_type(id)
    }

    /// Look up a FactType by id.
    pub fn fact_type(&self, id: TypeId) -> Option<FactType> {
        self.fact_types.get(&id).map(|r| r.value().clone())
    }

    /// Look up a FactType by name.
    pub fn fact_type_by_name(&self, name: &str) -> Option<FactType> {
        let id = *self.fact_type_names.get(name)?;
        self.fact_type(id)
    }

    /// Resolve FactType names to ids, silently dropping unknown names.
    ///
    /// Used for edge label filters, where an unknown label simply matches
    /// nothing.
    pub fn fact_type_names_to_ids(&self, names: &[String]) -> Vec<TypeId> {
        names
            .iter()
            .filter_map(|n| self.fact_type_names.get(n.as_str()).map(|r| *r.value()))
            .collect()
    }

    /// The reserved Retraction FactType, registered on first use.
    ///
    /// Retraction Facts reference the retracted Fact, so the type allows any
    /// referenced FactType; this is expressed by leaving the relevant fact
    /// bindings check to the retract operation itself.
    pub fn retraction_type(&self) -> FactType {
        if let Some(existing) = self.fact_type(RETRACTION_TYPE_ID) {
            return existing;
        }
        let retraction = FactType {
            id: RETRACTION_TYPE_ID,
            name: RETRACTION_TYPE_NAME.to_string(),
            default_confidence: 1.0,
            validator: Validator::TrueAlways,
            relevant_object_bindings: Vec::new(),
            relevant_fact_bindings: Vec::new(),
        };
        // A concurrent caller may have registered it in between; the fixed id
        // makes the second insert a no-op either way.
        let _ = self.register_fact_type(retraction.clone());
        retraction
    }

    /// The compiled validator for a type, if registered.
    pub fn validator(&self, id: TypeId) -> Option<CompiledValidator> {
        self.validators.get(&id).map(|r| r.value().clone())
    }

    /// Number of registered types (object + fact).
    pub fn len(&self) -> usize {
        self.object_types.len() + self.fact_types.len()
    }

    /// Whether no types are registered.
    pub fn is_empty(&self) -> bool {
        self.object_types.is_empty() && self.fact_types.is_empty()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("object_types", &self.object_types.len())
            .field("fact_types", &self.fact_types.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_lookup_object_type() {
        let registry = TypeRegistry::new();
        let ip = ObjectType::new("ip");
        let id = ip.id;
        registry.register_object_type(ip).unwrap();

        assert_eq!(registry.object_type(id).unwrap().name, "ip");
        assert_eq!(registry.object_type_by_name("ip").unwrap().id, id);
        assert!(registry.object_type_by_name("domain").is_none());
    }

    #[test]
    fn duplicate_name_rejected() {
        let registry = TypeRegistry::new();
        registry.register_object_type(ObjectType::new("ip")).unwrap();
        let err = registry.register_object_type(ObjectType::new("ip"));
        assert!(matches!(err, Err(RegistryError::DuplicateName { .. })));
    }

    #[test]
    fn ambiguous_fact_type_rejected() {
        let registry = TypeRegistry::new();
        let other = FactType::new("other");
        let bad = FactType::new("bad")
            .with_object_binding(None, None, false)
            .with_fact_binding(other.id);
        assert!(matches!(
            registry.register_fact_type(bad),
            Err(RegistryError::AmbiguousBindings { .. })
        ));
    }

    #[test]
    fn invalid_validator_pattern_rejected() {
        let registry = TypeRegistry::new();
        let bad = ObjectType::new("broken").with_validator(Validator::Regex("(".into()));
        assert!(matches!(
            registry.register_object_type(bad),
            Err(RegistryError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn retraction_type_is_stable() {
        let registry = TypeRegistry::new();
        let first = registry.retraction_type();
        let second = registry.retraction_type();
        assert_eq!(first.id, RETRACTION_TYPE_ID);
        assert_eq!(first.id, second.id);
        assert_eq!(registry.fact_type_by_name(RETRACTION_TYPE_NAME).unwrap().id, RETRACTION_TYPE_ID);
    }

    #[test]
    fn label_resolution_drops_unknown_names() {
        let registry = TypeRegistry::new();
        let resolves = FactType::new("resolvesTo");
        let id = resolves.id;
        registry.register_fact_type(resolves).unwrap();

        let ids = registry.fact_type_names_to_ids(&["resolvesTo".into(), "unknown".into()]);
        assert_eq!(ids, vec![id]);
    }
}
