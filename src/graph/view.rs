//! The access-controlled lazy graph.
//!
//! A [`GraphView`] is a single-shot, read-only view over the Object-Fact
//! stores, built per traversal. Nothing is materialized up front: expanding a
//! vertex reads its binding records, loads each candidate Fact, and consults
//! the read-permission predicate before an edge is ever produced. An edge for
//! which the predicate denies access is silently omitted; a dangling
//! reference (Object or Fact deleted concurrently, type unregistered) is
//! treated as "no such neighbor", never as a traversal failure.
//!
//! Elements are cached for the view's lifetime so that repeated visits to a
//! vertex reuse the same immutable snapshot, and re-expanding the same
//! logical edge returns the same edge id.

use std::sync::Arc;

use dashmap::DashMap;

use crate::access::AccessDecider;
use crate::error::GraphError;
use crate::model::{EdgeId, Fact, ObjectId};
use crate::registry::TypeRegistry;
use crate::store::{FactStore, ObjectStore, RetractionIndex};

use super::element::{FactEdge, ObjectVertex};
use super::expand::{EdgeSpec, expand};
use super::{Direction, TraverseParams};

/// Access-controlled lazy graph over the Object-Fact stores.
pub struct GraphView {
    objects: Arc<dyn ObjectStore>,
    facts: Arc<dyn FactStore>,
    registry: Arc<TypeRegistry>,
    access: Arc<dyn AccessDecider>,
    retractions: Arc<dyn RetractionIndex>,
    params: TraverseParams,
    vertices: DashMap<ObjectId, Arc<ObjectVertex>>,
    edges: DashMap<EdgeId, Arc<FactEdge>>,
    // Maps the logical (fact, from, to) triple to the edge id assigned on
    // first materialization.
    edge_ids: DashMap<EdgeSpec, EdgeId>,
}

impl GraphView {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        facts: Arc<dyn FactStore>,
        registry: Arc<TypeRegistry>,
        access: Arc<dyn AccessDecider>,
        retractions: Arc<dyn RetractionIndex>,
        params: TraverseParams,
    ) -> Self {
        GraphView {
            objects,
            facts,
            registry,
            access,
            retractions,
            params,
            vertices: DashMap::new(),
            edges: DashMap::new(),
            edge_ids: DashMap::new(),
        }
    }

    /// The view's traverse parameters.
    pub fn params(&self) -> &TraverseParams {
        &self.params
    }

    /// Whether the current user may read the given Fact.
    pub fn can_read(&self, fact: &Fact) -> bool {
        self.access.can_read(fact)
    }

    /// Project the Object with the given id into a vertex.
    ///
    /// Direct-entry lookup: fails with [`GraphError`] when the Object or its
    /// type is missing. Used for traversal starting points.
    pub fn vertex(&self, id: ObjectId) -> Result<Arc<ObjectVertex>, GraphError> {
        if let Some(cached) = self.vertices.get(&id) {
            return Ok(Arc::clone(cached.value()));
        }
        let object = self
            .objects
            .object(id)
            .ok()
            .flatten()
            .ok_or(GraphError::ObjectNotFound { id })?;
        let object_type = self
            .registry
            .object_type(object.type_id)
            .ok_or(GraphError::ObjectTypeNotFound {
                id: object.type_id,
            })?;
        let vertex = Arc::new(ObjectVertex::new(object, object_type.name));
        self.vertices.insert(id, Arc::clone(&vertex));
        Ok(vertex)
    }

    /// Like [`GraphView::vertex`], but a missing Object is "no such
    /// neighbor". Used during lazy expansion.
    pub fn try_vertex(&self, id: ObjectId) -> Option<Arc<ObjectVertex>> {
        self.vertex(id).ok()
    }

    /// Retrieve a previously materialized edge by id.
    pub fn edge(&self, id: EdgeId) -> Option<Arc<FactEdge>> {
        self.edges.get(&id).map(|r| Arc::clone(r.value()))
    }

    /// The edges of a vertex for the requested direction and label filter.
    ///
    /// Filtering order per candidate Fact: dangling → skip, time window →
    /// skip, retracted (unless included) → skip, `can_read` denies → skip.
    /// Labels filter after expansion; an empty label slice matches all.
    pub fn edges_of(
        &self,
        object: ObjectId,
        direction: Direction,
        labels: &[String],
    ) -> Vec<Arc<FactEdge>> {
        let bindings = match self.objects.bindings(object) {
            Ok(bindings) => bindings,
            Err(_) => return Vec::new(),
        };

        let mut result = Vec::new();
        let mut seen_edges = std::collections::HashSet::new();
        for record in bindings {
            let fact = match self.facts.fact(record.fact) {
                Ok(Some(fact)) => fact,
                // Dangling or failing reference: no such neighbor.
                _ => continue,
            };
            if !self.params.within_window(fact.timestamp) {
                continue;
            }
            if !self.params.include_retracted && self.retractions.is_retracted(fact.id) {
                continue;
            }
            if !self.access.can_read(&fact) {
                continue;
            }
            for spec in expand(&fact, object, direction) {
                if !seen_edges.insert(spec) {
                    continue;
                }
                if let Some(edge) = self.materialize(&fact, spec) {
                    if labels.is_empty() || labels.iter().any(|l| l == edge.label()) {
                        result.push(edge);
                    }
                }
            }
        }
        result
    }

    /// Neighbor vertices: the deduplicated far endpoints of
    /// [`GraphView::edges_of`].
    pub fn neighbors_of(
        &self,
        object: ObjectId,
        direction: Direction,
        labels: &[String],
    ) -> Vec<Arc<ObjectVertex>> {
        let mut seen = std::collections::HashSet::new();
        let mut neighbors = Vec::new();
        for edge in self.edges_of(object, direction, labels) {
            for endpoint in edge.vertices(direction) {
                if seen.insert(endpoint) {
                    if let Some(vertex) = self.try_vertex(endpoint) {
                        neighbors.push(vertex);
                    }
                }
            }
        }
        neighbors
    }

    /// Graph mutation is unsupported: the view is derived, not authoritative.
    pub fn add_vertex(&self) -> Result<(), GraphError> {
        Err(GraphError::MutationUnsupported {
            operation: "add vertex",
        })
    }

    /// Graph mutation is unsupported: the view is derived, not authoritative.
    pub fn add_edge(&self) -> Result<(), GraphError> {
        Err(GraphError::MutationUnsupported {
            operation: "add edge",
        })
    }

    /// Graph mutation is unsupported: the view is derived, not authoritative.
    pub fn remove_element(&self) -> Result<(), GraphError> {
        Err(GraphError::MutationUnsupported {
            operation: "remove element",
        })
    }

    /// Transactions are unsupported: views are single-shot.
    pub fn begin_transaction(&self) -> Result<(), GraphError> {
        Err(GraphError::TransactionsUnsupported)
    }

    fn materialize(&self, fact: &Fact, spec: EdgeSpec) -> Option<Arc<FactEdge>> {
        if let Some(id) = self.edge_ids.get(&spec).map(|r| *r.value()) {
            if let Some(edge) = self.edges.get(&id) {
                return Some(Arc::clone(edge.value()));
            }
        }
        // Unregistered FactType mid-traversal: skip, like any dangling
        // reference.
        let fact_type = self.registry.fact_type(fact.type_id)?;
        let edge = Arc::new(FactEdge::new(
            fact.clone(),
            fact_type.name,
            spec.from,
            spec.to,
        ));
        self.edge_ids.insert(spec, edge.id());
        self.edges.insert(edge.id(), Arc::clone(&edge));
        Some(edge)
    }
}

impl std::fmt::Debug for GraphView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphView")
            .field("vertices", &self.vertices.len())
            .field("edges", &self.edges.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{AllowAll, SubjectAccess};
    use crate::model::{AccessMode, Binding, BindingRole, FactId, Object};
    use crate::registry::{FactType, ObjectType};
    use crate::store::mem::{MemFactStore, MemObjectStore, MemRetractionIndex};
    use crate::store::ObjectFactBinding;
    use chrono::Utc;
    use uuid::Uuid;

    struct Fixture {
        objects: Arc<MemObjectStore>,
        facts: Arc<MemFactStore>,
        registry: Arc<TypeRegistry>,
        retractions: Arc<MemRetractionIndex>,
        ip_type: ObjectType,
        resolves_type: FactType,
    }

    impl Fixture {
        fn new() -> Self {
            let registry = Arc::new(TypeRegistry::new());
            let ip_type = ObjectType::new("ip");
            let resolves_type = FactType::new("resolvesTo");
            registry.register_object_type(ip_type.clone()).unwrap();
            registry.register_fact_type(resolves_type.clone()).unwrap();
            Fixture {
                objects: Arc::new(MemObjectStore::new()),
                facts: Arc::new(MemFactStore::new()),
                registry,
                retractions: Arc::new(MemRetractionIndex::new()),
                ip_type,
                resolves_type,
            }
        }

        fn add_object(&self, value: &str) -> ObjectId {
            let object = Object::new(ObjectId::random(), self.ip_type.id, value);
            self.objects.save_object(object.clone()).unwrap();
            object.id
        }

        fn link(&self, from: ObjectId, to: ObjectId, access_mode: AccessMode) -> FactId {
            let fact = Fact::new(FactId::random(), self.resolves_type.id)
                .with_value("resolved")
                .with_access_mode(access_mode)
                .with_organization(Uuid::new_v4())
                .with_bindings(vec![
                    Binding::new(from, BindingRole::Destination),
                    Binding::new(to, BindingRole::Source),
                ]);
            let id = fact.id;
            self.facts.save_fact(fact).unwrap();
            for (object, role) in [(from, BindingRole::Destination), (to, BindingRole::Source)] {
                self.objects
                    .save_binding(ObjectFactBinding { object, fact: id, role })
                    .unwrap();
            }
            id
        }

        fn view(&self, access: Arc<dyn AccessDecider>, params: TraverseParams) -> GraphView {
            GraphView::new(
                Arc::clone(&self.objects) as Arc<dyn ObjectStore>,
                Arc::clone(&self.facts) as Arc<dyn FactStore>,
                Arc::clone(&self.registry),
                access,
                Arc::clone(&self.retractions) as Arc<dyn RetractionIndex>,
                params,
            )
        }
    }

    fn allow_all() -> Arc<dyn AccessDecider> {
        Arc::new(AllowAll::new(Uuid::new_v4()))
    }

    #[test]
    fn vertex_lookup_fails_on_missing_object() {
        let fixture = Fixture::new();
        let view = fixture.view(allow_all(), TraverseParams::new());
        let missing = ObjectId::random();
        assert!(matches!(
            view.vertex(missing),
            Err(GraphError::ObjectNotFound { .. })
        ));
        assert!(view.try_vertex(missing).is_none());
    }

    #[test]
    fn edges_follow_direction_mapping() {
        let fixture = Fixture::new();
        let a = fixture.add_object("1.2.3.4");
        let b = fixture.add_object("5.6.7.8");
        fixture.link(a, b, AccessMode::Public);
        let view = fixture.view(allow_all(), TraverseParams::new());

        assert_eq!(view.edges_of(a, Direction::Out, &[]).len(), 1);
        assert!(view.edges_of(a, Direction::In, &[]).is_empty());
        assert_eq!(view.edges_of(b, Direction::In, &[]).len(), 1);
        assert!(view.edges_of(b, Direction::Out, &[]).is_empty());
        assert_eq!(view.edges_of(a, Direction::Both, &[]).len(), 1);
        assert_eq!(view.edges_of(b, Direction::Both, &[]).len(), 1);
    }

    #[test]
    fn same_logical_edge_reuses_edge_id() {
        let fixture = Fixture::new();
        let a = fixture.add_object("1.2.3.4");
        let b = fixture.add_object("5.6.7.8");
        fixture.link(a, b, AccessMode::Public);
        let view = fixture.view(allow_all(), TraverseParams::new());

        let from_a = view.edges_of(a, Direction::Out, &[]);
        let from_b = view.edges_of(b, Direction::In, &[]);
        assert_eq!(from_a[0].id(), from_b[0].id());
    }

    #[test]
    fn unreadable_fact_never_becomes_an_edge() {
        let fixture = Fixture::new();
        let a = fixture.add_object("1.2.3.4");
        let b = fixture.add_object("5.6.7.8");
        fixture.link(a, b, AccessMode::Explicit);

        let outsider: Arc<dyn AccessDecider> = Arc::new(SubjectAccess::new(Uuid::new_v4(), []));
        let view = fixture.view(outsider, TraverseParams::new());
        for direction in [Direction::Out, Direction::In, Direction::Both] {
            assert!(view.edges_of(a, direction, &[]).is_empty());
        }
    }

    #[test]
    fn label_filter_narrows_edges() {
        let fixture = Fixture::new();
        let a = fixture.add_object("1.2.3.4");
        let b = fixture.add_object("5.6.7.8");
        fixture.link(a, b, AccessMode::Public);
        let view = fixture.view(allow_all(), TraverseParams::new());

        assert_eq!(
            view.edges_of(a, Direction::Out, &["resolvesTo".to_string()]).len(),
            1
        );
        assert!(view
            .edges_of(a, Direction::Out, &["somethingElse".to_string()])
            .is_empty());
    }

    #[test]
    fn retracted_facts_are_skipped_unless_included() {
        let fixture = Fixture::new();
        let a = fixture.add_object("1.2.3.4");
        let b = fixture.add_object("5.6.7.8");
        let fact = fixture.link(a, b, AccessMode::Public);
        fixture.retractions.mark_retracted(fact);

        let view = fixture.view(allow_all(), TraverseParams::new());
        assert!(view.edges_of(a, Direction::Out, &[]).is_empty());

        let view = fixture.view(
            allow_all(),
            TraverseParams::new().with_include_retracted(true),
        );
        assert_eq!(view.edges_of(a, Direction::Out, &[]).len(), 1);
    }

    #[test]
    fn time_window_filters_facts() {
        let fixture = Fixture::new();
        let a = fixture.add_object("1.2.3.4");
        let b = fixture.add_object("5.6.7.8");
        fixture.link(a, b, AccessMode::Public);

        let future = Utc::now() + chrono::Duration::hours(1);
        let view = fixture.view(allow_all(), TraverseParams::new().with_after_timestamp(future));
        assert!(view.edges_of(a, Direction::Out, &[]).is_empty());
    }

    #[test]
    fn neighbors_are_deduplicated_endpoints() {
        let fixture = Fixture::new();
        let a = fixture.add_object("1.2.3.4");
        let b = fixture.add_object("5.6.7.8");
        fixture.link(a, b, AccessMode::Public);
        let view = fixture.view(allow_all(), TraverseParams::new());

        let neighbors = view.neighbors_of(a, Direction::Out, &[]);
        assert_eq!(neighbors.len(), 1);
        assert_eq!(neighbors[0].id(), b);
    }

    #[test]
    fn mutation_and_transactions_unsupported() {
        let fixture = Fixture::new();
        let view = fixture.view(allow_all(), TraverseParams::new());
        assert!(matches!(
            view.add_vertex(),
            Err(GraphError::MutationUnsupported { .. })
        ));
        assert!(matches!(
            view.add_edge(),
            Err(GraphError::MutationUnsupported { .. })
        ));
        assert!(matches!(
            view.begin_transaction(),
            Err(GraphError::TransactionsUnsupported)
        ));
    }
}
