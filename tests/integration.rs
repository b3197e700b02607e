//! End-to-end integration tests for the weft core.
//!
//! These tests exercise the full pipeline: type registration, fact creation
//! through the lifecycle manager, graph projection, and sandboxed traversal
//! through the service facade.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use weft::access::{AccessDecider, SubjectAccess};
use weft::error::WeftError;
use weft::graph::TraverseParams;
use weft::lifecycle::{CreateFactSpec, ObjectSpec, RetractFactSpec};
use weft::model::{AccessMode, OrganizationId};
use weft::query::TraversalValue;
use weft::registry::{FactType, ObjectType, TypeRegistry, RETRACTION_TYPE_ID};
use weft::response::ModelConverter;
use weft::service::{GraphService, ServiceConfig, ServiceParts};
use weft::store::mem::{MemFactStore, MemObjectStore, MemOriginStore, MemRetractionIndex};
use weft::store::OriginStore;
use weft::validator::Validator;

struct Harness {
    organization: OrganizationId,
    registry: Arc<TypeRegistry>,
    objects: Arc<MemObjectStore>,
    facts: Arc<MemFactStore>,
    origins: Arc<MemOriginStore>,
    retractions: Arc<MemRetractionIndex>,
    default_origin: Uuid,
}

impl Harness {
    fn new() -> Self {
        let registry = Arc::new(TypeRegistry::new());

        let ip = ObjectType::new("ip")
            .with_validator(Validator::Regex(r"\d{1,3}(\.\d{1,3}){3}".into()));
        let domain = ObjectType::new("domain");
        let ip_id = ip.id;
        let domain_id = domain.id;
        registry.register_object_type(ip).unwrap();
        registry.register_object_type(domain).unwrap();

        let resolves = FactType::new("resolvesTo")
            .with_default_confidence(0.9)
            .with_object_binding(Some(ip_id), Some(domain_id), false);
        registry.register_fact_type(resolves).unwrap();

        let organization = Uuid::new_v4();
        let origins = Arc::new(MemOriginStore::new());
        let origin = weft::model::Origin::new(Uuid::new_v4(), "test-feed", 1.0)
            .with_organization(organization);
        let default_origin = origin.id;
        origins.save_origin(origin).unwrap();

        Harness {
            organization,
            registry,
            objects: Arc::new(MemObjectStore::new()),
            facts: Arc::new(MemFactStore::new()),
            origins,
            retractions: Arc::new(MemRetractionIndex::new()),
            default_origin,
        }
    }

    fn service_for(&self, access: Arc<dyn AccessDecider>, config: ServiceConfig) -> GraphService {
        GraphService::new(
            ServiceParts {
                objects: Arc::clone(&self.objects) as _,
                facts: Arc::clone(&self.facts) as _,
                origins: Arc::clone(&self.origins) as _,
                registry: Arc::clone(&self.registry),
                retractions: Arc::clone(&self.retractions) as _,
                access,
                converter: Arc::new(ModelConverter::new()),
                default_origin: self.default_origin,
            },
            config,
        )
    }

    fn service(&self) -> GraphService {
        self.service_for(
            Arc::new(SubjectAccess::new(Uuid::new_v4(), [self.organization])),
            ServiceConfig::default(),
        )
    }

    fn resolve_spec(&self) -> CreateFactSpec {
        CreateFactSpec::new("resolvesTo", "resolved")
            .with_source(ObjectSpec::by_value("ip", "1.2.3.4"))
            .with_destination(ObjectSpec::by_value("domain", "test.example.org"))
    }
}

#[test]
fn end_to_end_resolve_scenario() {
    let harness = Harness::new();
    let service = harness.service();

    let fact = service.create_fact(harness.resolve_spec()).unwrap();
    assert_eq!(fact.type_name, "resolvesTo");
    assert!((fact.confidence - 0.9).abs() < f32::EPSILON);

    // First hop: all outbound edges from the ip yield exactly the resolve Fact.
    let result = service
        .traverse_by_type_value("ip", "1.2.3.4", "g.outE()", TraverseParams::new())
        .unwrap();
    assert!(result.is_complete());
    assert_eq!(result.values.len(), 1);
    match &result.values[0] {
        TraversalValue::Fact(model) => assert_eq!(model.id, fact.id),
        other => panic!("expected a Fact, got {other:?}"),
    }

    // Second hop: outbound edges then destination vertices yield exactly the
    // domain Object.
    let result = service
        .traverse_by_type_value("ip", "1.2.3.4", "g.out()", TraverseParams::new())
        .unwrap();
    assert_eq!(result.values.len(), 1);
    match &result.values[0] {
        TraversalValue::Object(model) => {
            assert_eq!(model.type_name, "domain");
            assert_eq!(model.value, "test.example.org");
        }
        other => panic!("expected an Object, got {other:?}"),
    }

    // The domain sees the edge inbound, not outbound.
    let inbound = service
        .traverse_by_type_value("domain", "test.example.org", "g.inE()", TraverseParams::new())
        .unwrap();
    assert_eq!(inbound.values.len(), 1);
    let outbound = service
        .traverse_by_type_value("domain", "test.example.org", "g.outE()", TraverseParams::new())
        .unwrap();
    assert!(outbound.values.is_empty());
}

#[test]
fn traversal_respects_access_control_per_edge() {
    let harness = Harness::new();
    let owner = harness.service();
    owner
        .create_fact(harness.resolve_spec().with_access_mode(AccessMode::RoleBased))
        .unwrap();

    // An outsider shares no organization with the fact: the edge must be
    // invisible in every direction, even though the Objects exist.
    let outsider = harness.service_for(
        Arc::new(SubjectAccess::new(Uuid::new_v4(), [])),
        ServiceConfig::default(),
    );
    for query in ["g.outE()", "g.inE()", "g.bothE()", "g.out()", "g.both()"] {
        let result = outsider
            .traverse_by_type_value("ip", "1.2.3.4", query, TraverseParams::new())
            .unwrap();
        assert!(result.values.is_empty(), "query {query} leaked an edge");
    }
}

#[test]
fn dedup_refresh_keeps_one_fact() {
    let harness = Harness::new();
    let service = harness.service();

    let first = service.create_fact(harness.resolve_spec()).unwrap();
    let second = service
        .create_fact(harness.resolve_spec().with_comment("seen again"))
        .unwrap();

    assert_eq!(first.id, second.id);
    assert!(second.last_seen_timestamp >= first.last_seen_timestamp);
    assert_eq!(harness.facts.len(), 1);
}

#[test]
fn retraction_hides_edges_unless_requested() {
    let harness = Harness::new();
    let service = harness.service();
    let fact = service.create_fact(harness.resolve_spec()).unwrap();

    let retraction = service.retract_fact(RetractFactSpec::new(fact.id)).unwrap();
    assert_eq!(retraction.in_reference_to, Some(fact.id));
    assert_eq!(
        harness.registry.fact_type_by_name("Retraction").unwrap().id,
        RETRACTION_TYPE_ID
    );

    // Retracted facts disappear from traversal by default.
    let hidden = service
        .traverse_by_type_value("ip", "1.2.3.4", "g.outE()", TraverseParams::new())
        .unwrap();
    assert!(hidden.values.is_empty());

    // With include_retracted the edge is back.
    let visible = service
        .traverse_by_type_value(
            "ip",
            "1.2.3.4",
            "g.outE()",
            TraverseParams::new().with_include_retracted(true),
        )
        .unwrap();
    assert_eq!(visible.values.len(), 1);
}

#[test]
fn timeout_contains_unbounded_queries() {
    let harness = Harness::new();
    let service = harness.service_for(
        Arc::new(SubjectAccess::new(Uuid::new_v4(), [harness.organization])),
        ServiceConfig::default().with_traversal_timeout(Duration::from_millis(250)),
    );
    service.create_fact(harness.resolve_spec()).unwrap();

    let started = std::time::Instant::now();
    let result = service
        .traverse_by_type_value("ip", "1.2.3.4", "g.repeat(both)", TraverseParams::new())
        .unwrap();
    assert!(result.is_timed_out());
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn sandbox_rejects_disallowed_operations() {
    let harness = Harness::new();
    let service = harness.service();
    service.create_fact(harness.resolve_spec()).unwrap();

    let result = service
        .traverse_by_type_value("ip", "1.2.3.4", "g.addE('x')", TraverseParams::new())
        .unwrap();
    assert!(result.is_failed());
    assert!(result.values.is_empty());
    assert!(
        result.messages[0]
            .message
            .contains("not allowed by the sandbox")
    );
}

#[test]
fn traversal_by_missing_object_fails_up_front() {
    let harness = Harness::new();
    let service = harness.service();
    let err = service
        .traverse_by_type_value("ip", "9.9.9.9", "g.out()", TraverseParams::new())
        .unwrap_err();
    assert!(matches!(err, WeftError::Graph(_)));
}

#[test]
fn search_based_traversal_handles_empty_and_bulk_roots() {
    let harness = Harness::new();
    let service = harness.service();
    let fact = service.create_fact(harness.resolve_spec()).unwrap();
    let roots: Vec<_> = fact.bindings.iter().map(|b| b.object).collect();

    let empty = service
        .traverse_by_search(Vec::new(), "g.outE()", TraverseParams::new())
        .unwrap();
    assert!(empty.is_complete());
    assert!(empty.values.is_empty());

    // Both bound Objects as roots in one evaluation; dedup collapses the
    // shared edge to one value.
    let result = service
        .traverse_by_search(roots, "g.bothE().dedup()", TraverseParams::new())
        .unwrap();
    assert_eq!(result.values.len(), 1);
}

#[test]
fn scalar_projection_and_limit() {
    let harness = Harness::new();
    let service = harness.service();
    service.create_fact(harness.resolve_spec()).unwrap();

    let values = service
        .traverse_by_type_value(
            "ip",
            "1.2.3.4",
            "g.out().values('value')",
            TraverseParams::new(),
        )
        .unwrap();
    assert_eq!(
        values.values,
        vec![TraversalValue::Scalar("test.example.org".into())]
    );

    let limited = service
        .traverse_by_type_value(
            "ip",
            "1.2.3.4",
            "g.bothE()",
            TraverseParams::new().with_limit(0),
        )
        .unwrap();
    assert!(limited.values.is_empty());
}

#[test]
fn object_values_are_validated_on_creation() {
    let harness = Harness::new();
    let service = harness.service();
    let err = service
        .create_fact(
            CreateFactSpec::new("resolvesTo", "resolved")
                .with_source(ObjectSpec::by_value("ip", "not-an-ip"))
                .with_destination(ObjectSpec::by_value("domain", "test.example.org")),
        )
        .unwrap_err();
    assert!(matches!(err, WeftError::Invalid(_)));
}
