//! Core entity types of the Object-Fact model.
//!
//! Objects are typed entities (IPs, domains, actors); Facts are typed,
//! attributable statements binding one or more Objects together, or referencing
//! another Fact (meta-facts). Both are immutable once observable — construction
//! happens through value constructors and `with_*` builders returning
//! fully-formed values, never through partially initialized mutable state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of an ObjectType or FactType.
pub type TypeId = Uuid;
/// Identifier of an Origin (the source a Fact was received from).
pub type OriginId = Uuid;
/// Identifier of an Organization owning a Fact.
pub type OrganizationId = Uuid;
/// Identifier of a Subject granted access through a Fact's ACL.
pub type SubjectId = Uuid;
/// Identifier of the user performing an operation.
pub type UserId = Uuid;

/// Unique identifier of an Object. Vertex identity equals Object identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(Uuid);

impl ObjectId {
    /// Generate a fresh random id.
    pub fn random() -> Self {
        ObjectId(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    pub fn get(self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for ObjectId {
    fn from(raw: Uuid) -> Self {
        ObjectId(raw)
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "obj:{}", self.0)
    }
}

/// Unique identifier of a Fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactId(Uuid);

impl FactId {
    /// Generate a fresh random id.
    pub fn random() -> Self {
        FactId(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    pub fn get(self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for FactId {
    fn from(raw: Uuid) -> Self {
        FactId(raw)
    }
}

impl std::fmt::Display for FactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fact:{}", self.0)
    }
}

/// Unique identifier of a projected Edge.
///
/// Edge identity is **not** Fact identity: a Fact bound to N Objects is
/// projected as up to N−1 edges per traversed Object, each with a freshly
/// generated id. The owning Fact id is available as an edge property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(Uuid);

impl EdgeId {
    /// Generate a fresh random id.
    pub fn random() -> Self {
        EdgeId(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    pub fn get(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "edge:{}", self.0)
    }
}

/// Role of an Object within a Fact's binding.
///
/// The role describes where the Fact points *relative to the Object*:
/// `Destination` means the Fact leads away from the Object (an outgoing edge
/// when traversing), `Source` means the Fact arrives at the Object (incoming),
/// `Bidirectional` matches every traversal direction and `None` carries no
/// direction at all (used by retraction Facts; never traversable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BindingRole {
    Source,
    Destination,
    Bidirectional,
    None,
}

impl std::fmt::Display for BindingRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BindingRole::Source => write!(f, "source"),
            BindingRole::Destination => write!(f, "destination"),
            BindingRole::Bidirectional => write!(f, "bidirectional"),
            BindingRole::None => write!(f, "none"),
        }
    }
}

/// Membership of an Object in a Fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Binding {
    /// The bound Object.
    pub object: ObjectId,
    /// The Object's role within the Fact.
    pub role: BindingRole,
}

impl Binding {
    pub fn new(object: ObjectId, role: BindingRole) -> Self {
        Binding { object, role }
    }
}

/// Visibility class of a Fact.
///
/// Variants are ordered from least to most restrictive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AccessMode {
    /// Readable by everyone.
    Public,
    /// Readable by members of the owning organization.
    RoleBased,
    /// Readable only by subjects on the Fact's ACL (plus the creator).
    Explicit,
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessMode::Public => write!(f, "Public"),
            AccessMode::RoleBased => write!(f, "RoleBased"),
            AccessMode::Explicit => write!(f, "Explicit"),
        }
    }
}

/// Flags attached to Objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectFlag {
    /// The Object participates in the globally time-indexed view.
    TimeGlobalIndex,
}

/// Flags attached to Facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FactFlag {
    /// The Fact participates in the globally time-indexed view.
    TimeGlobalIndex,
}

/// A typed entity in the knowledge base.
///
/// Immutable once created and never deleted. Uniqueness is enforced both by
/// id and by (type, value).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Object {
    pub id: ObjectId,
    pub type_id: TypeId,
    pub value: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<ObjectFlag>,
}

impl Object {
    /// Create an Object with no flags.
    pub fn new(id: ObjectId, type_id: TypeId, value: impl Into<String>) -> Self {
        Object {
            id,
            type_id,
            value: value.into(),
            flags: Vec::new(),
        }
    }

    /// Attach a flag.
    pub fn with_flag(mut self, flag: ObjectFlag) -> Self {
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
        self
    }
}

/// A single grant on a Fact's ACL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclEntry {
    pub id: Uuid,
    /// The subject granted read access.
    pub subject: SubjectId,
    /// The origin through which the grant was made.
    pub origin: OriginId,
    pub timestamp: DateTime<Utc>,
}

impl AclEntry {
    pub fn new(subject: SubjectId, origin: OriginId, timestamp: DateTime<Utc>) -> Self {
        AclEntry {
            id: Uuid::new_v4(),
            subject,
            origin,
            timestamp,
        }
    }
}

/// A comment attached to a Fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactComment {
    pub id: Uuid,
    pub fact: FactId,
    /// Another comment this one replies to, if any.
    pub reply_to: Option<Uuid>,
    /// The user who wrote the comment.
    pub author: UserId,
    pub comment: String,
    pub timestamp: DateTime<Utc>,
}

/// A typed, attributable statement in the knowledge base.
///
/// A Fact binds one or two Objects (via `bindings`), or references another
/// Fact (via `in_reference_to`, making it a meta-fact). Facts are never
/// updated in place except for `last_seen_timestamp` refreshes and ACL
/// appends, and never deleted — retraction creates a new Fact instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub id: FactId,
    pub type_id: TypeId,
    /// Statement value; may be empty for purely structural Facts.
    pub value: String,
    /// Confidence in [0.0, 1.0] as stated by the origin.
    pub confidence: f32,
    /// Trust in [0.0, 1.0], inherited from the origin.
    pub trust: f32,
    pub access_mode: AccessMode,
    pub origin: OriginId,
    pub organization: OrganizationId,
    pub added_by: UserId,
    pub timestamp: DateTime<Utc>,
    pub last_seen_timestamp: DateTime<Utc>,
    /// Referenced Fact if this is a meta-fact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_reference_to: Option<FactId>,
    /// Ordered Object bindings. Empty for pure meta-facts.
    #[serde(default)]
    pub bindings: Vec<Binding>,
    /// Subjects granted explicit read access.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub acl: Vec<AclEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<FactFlag>,
}

impl Fact {
    /// Create a Fact with defaults: full confidence and trust, public access,
    /// current timestamps, no bindings.
    pub fn new(id: FactId, type_id: TypeId) -> Self {
        let now = Utc::now();
        Fact {
            id,
            type_id,
            value: String::new(),
            confidence: 1.0,
            trust: 1.0,
            access_mode: AccessMode::Public,
            origin: Uuid::nil(),
            organization: Uuid::nil(),
            added_by: Uuid::nil(),
            timestamp: now,
            last_seen_timestamp: now,
            in_reference_to: None,
            bindings: Vec::new(),
            acl: Vec::new(),
            flags: Vec::new(),
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_trust(mut self, trust: f32) -> Self {
        self.trust = trust.clamp(0.0, 1.0);
        self
    }

    pub fn with_access_mode(mut self, access_mode: AccessMode) -> Self {
        self.access_mode = access_mode;
        self
    }

    pub fn with_origin(mut self, origin: OriginId) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_organization(mut self, organization: OrganizationId) -> Self {
        self.organization = organization;
        self
    }

    pub fn with_added_by(mut self, added_by: UserId) -> Self {
        self.added_by = added_by;
        self
    }

    pub fn with_timestamps(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self.last_seen_timestamp = timestamp;
        self
    }

    pub fn with_in_reference_to(mut self, fact: FactId) -> Self {
        self.in_reference_to = Some(fact);
        self
    }

    pub fn with_bindings(mut self, bindings: Vec<Binding>) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn with_acl(mut self, acl: Vec<AclEntry>) -> Self {
        self.acl = acl;
        self
    }

    pub fn with_flag(mut self, flag: FactFlag) -> Self {
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
        self
    }

    /// Whether this Fact references another Fact instead of binding Objects.
    pub fn is_meta(&self) -> bool {
        self.in_reference_to.is_some()
    }

    /// Derived certainty: confidence × trust, rounded to two decimals.
    pub fn certainty(&self) -> f32 {
        ((self.confidence * self.trust) * 100.0).round() / 100.0
    }

    /// The binding of the given Object within this Fact, if any.
    pub fn binding_of(&self, object: ObjectId) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.object == object)
    }
}

/// The source a Fact was received from, carrying the trust assigned to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Origin {
    pub id: OriginId,
    pub name: String,
    /// Trust in [0.0, 1.0] inherited by Facts from this origin.
    pub trust: f32,
    /// Organization Facts from this origin default to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<OrganizationId>,
}

impl Origin {
    pub fn new(id: OriginId, name: impl Into<String>, trust: f32) -> Self {
        Origin {
            id,
            name: name.into(),
            trust: trust.clamp(0.0, 1.0),
            organization: None,
        }
    }

    pub fn with_organization(mut self, organization: OrganizationId) -> Self {
        self.organization = Some(organization);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tid() -> TypeId {
        Uuid::new_v4()
    }

    #[test]
    fn certainty_rounds_to_two_decimals() {
        let fact = Fact::new(FactId::random(), tid())
            .with_confidence(0.7)
            .with_trust(0.8);
        assert!((fact.certainty() - 0.56).abs() < f32::EPSILON);
    }

    #[test]
    fn confidence_is_clamped() {
        let fact = Fact::new(FactId::random(), tid()).with_confidence(1.5);
        assert!((fact.confidence - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn meta_fact_detection() {
        let base = Fact::new(FactId::random(), tid());
        assert!(!base.is_meta());
        let meta = Fact::new(FactId::random(), tid()).with_in_reference_to(base.id);
        assert!(meta.is_meta());
    }

    #[test]
    fn binding_lookup_by_object() {
        let a = ObjectId::random();
        let b = ObjectId::random();
        let fact = Fact::new(FactId::random(), tid()).with_bindings(vec![
            Binding::new(a, BindingRole::Destination),
            Binding::new(b, BindingRole::Source),
        ]);
        assert_eq!(fact.binding_of(a).unwrap().role, BindingRole::Destination);
        assert_eq!(fact.binding_of(b).unwrap().role, BindingRole::Source);
        assert!(fact.binding_of(ObjectId::random()).is_none());
    }

    #[test]
    fn access_mode_orders_by_restrictiveness() {
        assert!(AccessMode::Public < AccessMode::RoleBased);
        assert!(AccessMode::RoleBased < AccessMode::Explicit);
    }

    #[test]
    fn flags_deduplicate() {
        let object = Object::new(ObjectId::random(), tid(), "1.2.3.4")
            .with_flag(ObjectFlag::TimeGlobalIndex)
            .with_flag(ObjectFlag::TimeGlobalIndex);
        assert_eq!(object.flags.len(), 1);
    }
}
