//! Fact lifecycle: creation with dedup-or-refresh, meta-facts, retraction.
//!
//! All three operations keep the hyperedge structure consistent: the Fact
//! record (which embeds its full binding list) is persisted before the
//! reciprocal Object → Fact binding records, and traversal discovers Facts
//! only through those records — so a concurrently running traversal never
//! observes a half-bound Fact.
//!
//! The create-or-refresh decision is a read-then-write: two concurrent
//! creates of an identical Fact may both insert when the backing store has
//! no atomic compare-and-insert on the dedup key. The duplicate is
//! tolerated; last write wins on the last-seen timestamp.

use std::sync::Arc;

use chrono::Utc;

use crate::access::{AccessDecider, PermissionFunction};
use crate::error::{GraphError, InvalidArgument, WeftError, WeftResult};
use crate::model::{
    AccessMode, AclEntry, Binding, BindingRole, Fact, FactComment, FactFlag, FactId, Object,
    ObjectId, OrganizationId, Origin, OriginId, SubjectId,
};
use crate::registry::{FactType, RETRACTION_TYPE_ID, TypeRegistry};
use crate::store::{FactStore, ObjectFactBinding, ObjectStore, OriginStore, RetractionIndex};

/// An Object referenced by a lifecycle request: by id, or by (type, value) —
/// the latter creates the Object on first use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectSpec {
    Id(ObjectId),
    TypeValue { type_name: String, value: String },
}

impl ObjectSpec {
    pub fn by_value(type_name: impl Into<String>, value: impl Into<String>) -> Self {
        ObjectSpec::TypeValue {
            type_name: type_name.into(),
            value: value.into(),
        }
    }
}

impl std::fmt::Display for ObjectSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectSpec::Id(id) => write!(f, "{id}"),
            ObjectSpec::TypeValue { type_name, value } => write!(f, "{type_name}/{value}"),
        }
    }
}

/// Request to create a non-meta Fact.
#[derive(Debug, Clone)]
pub struct CreateFactSpec {
    pub type_name: String,
    pub value: String,
    pub source: Option<ObjectSpec>,
    pub destination: Option<ObjectSpec>,
    pub bidirectional: bool,
    pub organization: Option<OrganizationId>,
    pub origin: Option<OriginId>,
    pub confidence: Option<f32>,
    pub access_mode: AccessMode,
    pub comment: Option<String>,
    pub acl: Vec<SubjectId>,
}

impl CreateFactSpec {
    pub fn new(type_name: impl Into<String>, value: impl Into<String>) -> Self {
        CreateFactSpec {
            type_name: type_name.into(),
            value: value.into(),
            source: None,
            destination: None,
            bidirectional: false,
            organization: None,
            origin: None,
            confidence: None,
            access_mode: AccessMode::RoleBased,
            comment: None,
            acl: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: ObjectSpec) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_destination(mut self, destination: ObjectSpec) -> Self {
        self.destination = Some(destination);
        self
    }

    pub fn with_bidirectional(mut self, bidirectional: bool) -> Self {
        self.bidirectional = bidirectional;
        self
    }

    pub fn with_organization(mut self, organization: OrganizationId) -> Self {
        self.organization = Some(organization);
        self
    }

    pub fn with_origin(mut self, origin: OriginId) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_access_mode(mut self, access_mode: AccessMode) -> Self {
        self.access_mode = access_mode;
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_acl(mut self, acl: Vec<SubjectId>) -> Self {
        self.acl = acl;
        self
    }
}

/// Request to create a meta-fact referencing another Fact.
#[derive(Debug, Clone)]
pub struct CreateMetaFactSpec {
    pub referenced: FactId,
    pub type_name: String,
    pub value: String,
    pub organization: Option<OrganizationId>,
    pub origin: Option<OriginId>,
    pub confidence: Option<f32>,
    /// Defaults to the referenced Fact's access mode.
    pub access_mode: Option<AccessMode>,
    pub comment: Option<String>,
    pub acl: Vec<SubjectId>,
}

impl CreateMetaFactSpec {
    pub fn new(
        referenced: FactId,
        type_name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        CreateMetaFactSpec {
            referenced,
            type_name: type_name.into(),
            value: value.into(),
            organization: None,
            origin: None,
            confidence: None,
            access_mode: None,
            comment: None,
            acl: Vec::new(),
        }
    }

    pub fn with_access_mode(mut self, access_mode: AccessMode) -> Self {
        self.access_mode = Some(access_mode);
        self
    }

    pub fn with_origin(mut self, origin: OriginId) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn with_organization(mut self, organization: OrganizationId) -> Self {
        self.organization = Some(organization);
        self
    }
}

/// Request to retract a Fact.
#[derive(Debug, Clone)]
pub struct RetractFactSpec {
    pub fact: FactId,
    pub organization: Option<OrganizationId>,
    pub origin: Option<OriginId>,
    pub confidence: Option<f32>,
    /// Defaults to the retracted Fact's access mode.
    pub access_mode: Option<AccessMode>,
    pub comment: Option<String>,
    pub acl: Vec<SubjectId>,
}

impl RetractFactSpec {
    pub fn new(fact: FactId) -> Self {
        RetractFactSpec {
            fact,
            organization: None,
            origin: None,
            confidence: None,
            access_mode: None,
            comment: None,
            acl: Vec::new(),
        }
    }

    pub fn with_origin(mut self, origin: OriginId) -> Self {
        self.origin = Some(origin);
        self
    }
}

/// Creates, refreshes and retracts Facts while keeping the binding graph
/// consistent.
pub struct FactLifecycle {
    objects: Arc<dyn ObjectStore>,
    facts: Arc<dyn FactStore>,
    origins: Arc<dyn OriginStore>,
    registry: Arc<TypeRegistry>,
    retractions: Arc<dyn RetractionIndex>,
    access: Arc<dyn AccessDecider>,
    /// Origin applied when a request does not name one.
    default_origin: OriginId,
}

impl FactLifecycle {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        facts: Arc<dyn FactStore>,
        origins: Arc<dyn OriginStore>,
        registry: Arc<TypeRegistry>,
        retractions: Arc<dyn RetractionIndex>,
        access: Arc<dyn AccessDecider>,
        default_origin: OriginId,
    ) -> Self {
        FactLifecycle {
            objects,
            facts,
            origins,
            registry,
            retractions,
            access,
            default_origin,
        }
    }

    /// Create a non-meta Fact, or refresh an existing identical one.
    ///
    /// An existing Fact with the same (type, value, bindings, organization,
    /// access mode) that the caller can read is refreshed: its last-seen
    /// timestamp is bumped and the newly supplied ACL subjects and comment
    /// are merged on. An unreadable match is invisible to the caller and a
    /// brand-new Fact is created instead.
    pub fn create(&self, spec: CreateFactSpec) -> WeftResult<Fact> {
        let origin = self.resolve_origin(spec.origin)?;
        let organization = self.resolve_organization(spec.organization, &origin)?;
        let fact_type = self.resolve_fact_type(&spec.type_name)?;
        self.reject_reserved_type(&fact_type)?;
        self.access
            .check_permission(PermissionFunction::AddFact, Some(organization))?;

        let mut invalid = InvalidArgument::new();
        invalid = self.validate_value(invalid, &fact_type, &spec.value);
        invalid = self.validate_acl(invalid, spec.access_mode, &spec.acl);

        let (bindings, invalid) = self.resolve_bindings(invalid, &spec, &fact_type)?;
        invalid.into_result()?;

        if let Some(existing) = self.find_existing(&spec, &fact_type, organization, &bindings)? {
            return self.refresh(existing, &origin, &spec.acl, spec.comment.as_deref());
        }

        let now = Utc::now();
        let fact = Fact::new(FactId::random(), fact_type.id)
            .with_value(spec.value.clone())
            .with_confidence(spec.confidence.unwrap_or(fact_type.default_confidence))
            .with_trust(origin.trust)
            .with_access_mode(spec.access_mode)
            .with_origin(origin.id)
            .with_organization(organization)
            .with_added_by(self.access.current_user())
            .with_timestamps(now)
            .with_bindings(bindings)
            .with_acl(self.initial_acl(spec.access_mode, &spec.acl, &origin));

        let fact = self.facts.save_fact(fact).map_err(WeftError::Store)?;
        self.save_binding_records(&fact)?;
        self.save_comment(&fact, spec.comment.as_deref())?;

        tracing::info!(fact = %fact.id, fact_type = %spec.type_name, "created fact");
        Ok(fact)
    }

    /// Create a meta-fact referencing an existing, readable Fact.
    pub fn create_meta(&self, spec: CreateMetaFactSpec) -> WeftResult<Fact> {
        let referenced = self.resolve_fact(spec.referenced)?;
        self.access.check_read(&referenced)?;

        let origin = self.resolve_origin(spec.origin)?;
        let organization = self.resolve_organization(spec.organization, &origin)?;
        let fact_type = self.resolve_fact_type(&spec.type_name)?;
        self.reject_reserved_type(&fact_type)?;
        self.access
            .check_permission(PermissionFunction::AddFact, Some(organization))?;

        let access_mode = spec.access_mode.unwrap_or(referenced.access_mode);

        let mut invalid = InvalidArgument::new();
        invalid = self.validate_value(invalid, &fact_type, &spec.value);
        invalid = self.validate_acl(invalid, access_mode, &spec.acl);
        if !fact_type
            .relevant_fact_bindings
            .iter()
            .any(|b| b.fact_type == referenced.type_id)
        {
            invalid = invalid.add(
                format!(
                    "Requested binding between Facts is not allowed for FactType \"{}\".",
                    fact_type.name
                ),
                "invalid.meta.fact.binding",
                "type",
                spec.type_name.clone(),
            );
        }
        invalid.into_result()?;

        if let Some(existing) =
            self.find_existing_meta(&spec, &fact_type, organization, access_mode, referenced.id)?
        {
            return self.refresh(existing, &origin, &spec.acl, spec.comment.as_deref());
        }

        let now = Utc::now();
        let fact = Fact::new(FactId::random(), fact_type.id)
            .with_value(spec.value.clone())
            .with_confidence(spec.confidence.unwrap_or(fact_type.default_confidence))
            .with_trust(origin.trust)
            .with_access_mode(access_mode)
            .with_origin(origin.id)
            .with_organization(organization)
            .with_added_by(self.access.current_user())
            .with_timestamps(now)
            .with_in_reference_to(referenced.id)
            .with_acl(self.initial_acl(access_mode, &spec.acl, &origin));

        let fact = self.facts.save_fact(fact).map_err(WeftError::Store)?;
        self.facts
            .save_meta_ref(referenced.id, fact.id)
            .map_err(WeftError::Store)?;
        self.save_comment(&fact, spec.comment.as_deref())?;

        tracing::info!(fact = %fact.id, referenced = %referenced.id, "created meta-fact");
        Ok(fact)
    }

    /// Retract a Fact by creating a Retraction Fact referencing it.
    ///
    /// The retracted Fact is never deleted; it only gains a marker in the
    /// external retraction index. The Retraction Fact inherits the retracted
    /// Fact's bindings with the role forced to `None`, so it is discoverable
    /// from the same Objects without implying a new directed relationship.
    pub fn retract(&self, spec: RetractFactSpec) -> WeftResult<Fact> {
        let to_retract = self.resolve_fact(spec.fact)?;
        self.access.check_read(&to_retract)?;

        let retraction_type = self.registry.retraction_type();
        let origin = self.resolve_origin(spec.origin)?;
        let organization = self.resolve_organization(spec.organization, &origin)?;
        self.access
            .check_permission(PermissionFunction::AddFact, Some(organization))?;

        let access_mode = spec.access_mode.unwrap_or(to_retract.access_mode);
        let mut invalid = InvalidArgument::new();
        invalid = self.validate_acl(invalid, access_mode, &spec.acl);
        invalid.into_result()?;

        let bindings: Vec<Binding> = to_retract
            .bindings
            .iter()
            .map(|b| Binding::new(b.object, BindingRole::None))
            .collect();

        let now = Utc::now();
        let retraction = Fact::new(FactId::random(), retraction_type.id)
            .with_confidence(spec.confidence.unwrap_or(retraction_type.default_confidence))
            .with_trust(origin.trust)
            .with_access_mode(access_mode)
            .with_origin(origin.id)
            .with_organization(organization)
            .with_added_by(self.access.current_user())
            .with_timestamps(now)
            .with_in_reference_to(to_retract.id)
            .with_bindings(bindings)
            .with_acl(self.initial_acl(access_mode, &spec.acl, &origin))
            .with_flag(FactFlag::TimeGlobalIndex);

        let retraction = self.facts.save_fact(retraction).map_err(WeftError::Store)?;
        self.save_binding_records(&retraction)?;
        self.facts
            .save_meta_ref(to_retract.id, retraction.id)
            .map_err(WeftError::Store)?;
        self.save_comment(&retraction, spec.comment.as_deref())?;
        self.retractions.mark_retracted(to_retract.id);

        tracing::info!(fact = %to_retract.id, retraction = %retraction.id, "retracted fact");
        Ok(retraction)
    }

    // -----------------------------------------------------------------------
    // Resolution helpers
    // -----------------------------------------------------------------------

    fn resolve_origin(&self, requested: Option<OriginId>) -> WeftResult<Origin> {
        let id = requested.unwrap_or(self.default_origin);
        match self.origins.origin(id).map_err(WeftError::Store)? {
            Some(origin) => Ok(origin),
            None => Err(InvalidArgument::new()
                .add(
                    format!("Requested origin {id} could not be resolved."),
                    "invalid.origin",
                    "origin",
                    id.to_string(),
                )
                .into()),
        }
    }

    fn resolve_organization(
        &self,
        requested: Option<OrganizationId>,
        origin: &Origin,
    ) -> WeftResult<OrganizationId> {
        requested.or(origin.organization).ok_or_else(|| {
            InvalidArgument::new()
                .add(
                    "No organization was requested and the origin provides no default.",
                    "invalid.organization",
                    "organization",
                    "",
                )
                .into()
        })
    }

    fn resolve_fact_type(&self, name: &str) -> WeftResult<FactType> {
        self.registry.fact_type_by_name(name).ok_or_else(|| {
            InvalidArgument::new()
                .add(
                    format!("FactType \"{name}\" does not exist."),
                    "invalid.fact.type",
                    "type",
                    name.to_string(),
                )
                .into()
        })
    }

    fn reject_reserved_type(&self, fact_type: &FactType) -> WeftResult<()> {
        if fact_type.id == RETRACTION_TYPE_ID {
            return Err(crate::error::AccessError::denied(
                "Not allowed to manually use the system-defined Retraction FactType. \
                 Use the retract operation instead.",
            )
            .into());
        }
        Ok(())
    }

    fn resolve_fact(&self, id: FactId) -> WeftResult<Fact> {
        self.facts
            .fact(id)
            .map_err(WeftError::Store)?
            .ok_or(WeftError::Graph(GraphError::FactNotFound { id }))
    }

    /// Resolve an Object spec. Id specs must reference an existing Object;
    /// (type, value) specs create the Object on first use after validating
    /// the value against the ObjectType's validator.
    fn resolve_object(
        &self,
        invalid: InvalidArgument,
        spec: &ObjectSpec,
        field: &'static str,
    ) -> WeftResult<(InvalidArgument, Option<Object>)> {
        match spec {
            ObjectSpec::Id(id) => match self.objects.object(*id).map_err(WeftError::Store)? {
                Some(object) => Ok((invalid, Some(object))),
                None => Ok((
                    invalid.add(
                        format!("Requested object {id} could not be resolved."),
                        "invalid.object",
                        field,
                        id.to_string(),
                    ),
                    None,
                )),
            },
            ObjectSpec::TypeValue { type_name, value } => {
                let Some(object_type) = self.registry.object_type_by_name(type_name) else {
                    return Ok((
                        invalid.add(
                            format!("ObjectType \"{type_name}\" does not exist."),
                            "invalid.object.type",
                            field,
                            spec.to_string(),
                        ),
                        None,
                    ));
                };
                if let Some(existing) = self
                    .objects
                    .object_by_value(object_type.id, value)
                    .map_err(WeftError::Store)?
                {
                    return Ok((invalid, Some(existing)));
                }
                let valid = self
                    .registry
                    .validator(object_type.id)
                    .map(|v| v.is_valid(value))
                    .unwrap_or(false);
                if !valid {
                    return Ok((
                        invalid.add(
                            format!("Object value \"{value}\" is not valid for type \"{type_name}\"."),
                            "invalid.object.value",
                            field,
                            spec.to_string(),
                        ),
                        None,
                    ));
                }
                let object = self
                    .objects
                    .save_object(Object::new(ObjectId::random(), object_type.id, value))
                    .map_err(WeftError::Store)?;
                Ok((invalid, Some(object)))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Validation helpers
    // -----------------------------------------------------------------------

    fn validate_value(
        &self,
        invalid: InvalidArgument,
        fact_type: &FactType,
        value: &str,
    ) -> InvalidArgument {
        let valid = self
            .registry
            .validator(fact_type.id)
            .map(|v| v.is_valid(value))
            .unwrap_or(false);
        if valid {
            invalid
        } else {
            invalid.add(
                format!(
                    "Fact value \"{value}\" is not valid for FactType \"{}\".",
                    fact_type.name
                ),
                "invalid.fact.value",
                "value",
                value.to_string(),
            )
        }
    }

    fn validate_acl(
        &self,
        invalid: InvalidArgument,
        access_mode: AccessMode,
        acl: &[SubjectId],
    ) -> InvalidArgument {
        if access_mode == AccessMode::Public && !acl.is_empty() {
            invalid.add(
                "Cannot grant explicit access to a public Fact.",
                "invalid.fact.acl",
                "acl",
                format!("{} subject(s)", acl.len()),
            )
        } else {
            invalid
        }
    }

    /// Resolve both Object specs into the Fact's binding list, validating the
    /// combination against the FactType's binding definitions. A definition
    /// matches directly, or — for bidirectional definitions — with source and
    /// destination swapped.
    fn resolve_bindings(
        &self,
        invalid: InvalidArgument,
        spec: &CreateFactSpec,
        fact_type: &FactType,
    ) -> WeftResult<(Vec<Binding>, InvalidArgument)> {
        let (invalid, source) = match &spec.source {
            Some(s) => self.resolve_object(invalid, s, "sourceObject")?,
            None => (invalid, None),
        };
        let (mut invalid, destination) = match &spec.destination {
            Some(s) => self.resolve_object(invalid, s, "destinationObject")?,
            None => (invalid, None),
        };

        if spec.source.is_none() && spec.destination.is_none() {
            invalid = invalid
                .add(
                    "Requested source Object could not be resolved.",
                    "invalid.source.object",
                    "sourceObject",
                    "",
                )
                .add(
                    "Requested destination Object could not be resolved.",
                    "invalid.destination.object",
                    "destinationObject",
                    "",
                );
            return Ok((Vec::new(), invalid));
        }

        // Unresolvable Objects already produced entries; the binding check
        // needs the resolved ones.
        if (spec.source.is_some() && source.is_none())
            || (spec.destination.is_some() && destination.is_none())
        {
            return Ok((Vec::new(), invalid));
        }

        let source_type = source.as_ref().map(|o| o.type_id);
        let destination_type = destination.as_ref().map(|o| o.type_id);
        let matches = fact_type.relevant_object_bindings.iter().any(|def| {
            let direct = def.source_type == source_type
                && def.destination_type == destination_type
                && def.bidirectional == spec.bidirectional;
            let swapped = def.bidirectional
                && spec.bidirectional
                && def.source_type == destination_type
                && def.destination_type == source_type;
            direct || swapped
        });
        if !matches {
            invalid = invalid.add(
                format!(
                    "Requested binding between Fact and Object(s) is not allowed for FactType \"{}\".",
                    fact_type.name
                ),
                "invalid.fact.object.binding",
                "sourceObject|destinationObject|bidirectionalBinding",
                format!(
                    "sourceObject = {:?}|destinationObject = {:?}|bidirectionalBinding = {}",
                    spec.source.as_ref().map(|s| s.to_string()),
                    spec.destination.as_ref().map(|s| s.to_string()),
                    spec.bidirectional
                ),
            );
            return Ok((Vec::new(), invalid));
        }

        let mut bindings = Vec::new();
        if let Some(source) = source {
            bindings.push(Binding::new(
                source.id,
                if spec.bidirectional {
                    BindingRole::Bidirectional
                } else {
                    BindingRole::Destination
                },
            ));
        }
        if let Some(destination) = destination {
            bindings.push(Binding::new(
                destination.id,
                if spec.bidirectional {
                    BindingRole::Bidirectional
                } else {
                    BindingRole::Source
                },
            ));
        }
        Ok((bindings, invalid))
    }

    // -----------------------------------------------------------------------
    // Dedup / persistence helpers
    // -----------------------------------------------------------------------

    /// Find an existing, readable Fact identical in (type, value, bindings,
    /// organization, access mode).
    fn find_existing(
        &self,
        spec: &CreateFactSpec,
        fact_type: &FactType,
        organization: OrganizationId,
        bindings: &[Binding],
    ) -> WeftResult<Option<Fact>> {
        let candidates = self
            .facts
            .facts_by_value(&spec.value)
            .map_err(WeftError::Store)?;
        Ok(candidates.into_iter().find(|candidate| {
            candidate.type_id == fact_type.id
                && candidate.organization == organization
                && candidate.access_mode == spec.access_mode
                && candidate.in_reference_to.is_none()
                && same_bindings(&candidate.bindings, bindings)
                && self.access.can_read(candidate)
        }))
    }

    fn find_existing_meta(
        &self,
        spec: &CreateMetaFactSpec,
        fact_type: &FactType,
        organization: OrganizationId,
        access_mode: AccessMode,
        referenced: FactId,
    ) -> WeftResult<Option<Fact>> {
        let candidates = self
            .facts
            .facts_by_value(&spec.value)
            .map_err(WeftError::Store)?;
        Ok(candidates.into_iter().find(|candidate| {
            candidate.type_id == fact_type.id
                && candidate.organization == organization
                && candidate.access_mode == access_mode
                && candidate.in_reference_to == Some(referenced)
                && self.access.can_read(candidate)
        }))
    }

    /// Refresh an existing Fact: bump last-seen, merge ACL subjects, append
    /// the comment.
    fn refresh(
        &self,
        existing: Fact,
        origin: &Origin,
        acl: &[SubjectId],
        comment: Option<&str>,
    ) -> WeftResult<Fact> {
        let now = Utc::now();
        let mut fact = self
            .facts
            .refresh_fact(existing.id, now)
            .map_err(WeftError::Store)?;
        if !acl.is_empty() {
            let entries = acl
                .iter()
                .map(|subject| AclEntry::new(*subject, origin.id, now))
                .collect();
            fact = self
                .facts
                .append_acl(existing.id, entries)
                .map_err(WeftError::Store)?;
        }
        self.save_comment(&fact, comment)?;
        tracing::debug!(fact = %fact.id, "refreshed existing fact");
        Ok(fact)
    }

    /// The initial ACL of a new Fact. Explicit-mode Facts always grant the
    /// creating user access, whether or not the request listed them.
    fn initial_acl(
        &self,
        access_mode: AccessMode,
        acl: &[SubjectId],
        origin: &Origin,
    ) -> Vec<AclEntry> {
        let now = Utc::now();
        let mut entries: Vec<AclEntry> = Vec::new();
        let mut grant = |subject: SubjectId| {
            if !entries.iter().any(|e| e.subject == subject) {
                entries.push(AclEntry::new(subject, origin.id, now));
            }
        };
        for subject in acl {
            grant(*subject);
        }
        if access_mode == AccessMode::Explicit {
            grant(self.access.current_user());
        }
        entries
    }

    /// Persist the reciprocal Object → Fact binding records. The Fact record
    /// itself is already stored at this point.
    fn save_binding_records(&self, fact: &Fact) -> WeftResult<()> {
        for binding in &fact.bindings {
            self.objects
                .save_binding(ObjectFactBinding {
                    object: binding.object,
                    fact: fact.id,
                    role: binding.role,
                })
                .map_err(WeftError::Store)?;
        }
        Ok(())
    }

    fn save_comment(&self, fact: &Fact, comment: Option<&str>) -> WeftResult<()> {
        let Some(text) = comment else {
            return Ok(());
        };
        self.facts
            .append_comment(FactComment {
                id: uuid::Uuid::new_v4(),
                fact: fact.id,
                reply_to: None,
                author: self.access.current_user(),
                comment: text.to_string(),
                timestamp: Utc::now(),
            })
            .map_err(WeftError::Store)
    }
}

/// Binding lists are compared as unordered sets of (object, role) pairs.
fn same_bindings(a: &[Binding], b: &[Binding]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().all(|binding| b.contains(binding))
}
