//! Service facade: wires stores, registry, access control, traversal and
//! lifecycle into one entry point.
//!
//! The facade owns nothing ambient: every collaborator — stores, the type
//! registry, the access decider, the response converter — is injected at
//! construction. Traversals accept starting Objects by id, by (type, value),
//! or as an opaque id set produced by an external bulk search.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::access::{AccessDecider, PermissionFunction};
use crate::error::{GraphError, WeftError, WeftResult};
use crate::graph::TraverseParams;
use crate::graph::view::GraphView;
use crate::lifecycle::{CreateFactSpec, CreateMetaFactSpec, FactLifecycle, RetractFactSpec};
use crate::model::{Fact, ObjectId, OriginId};
use crate::query::executor::TraversalExecutor;
use crate::query::{TraversalResult, default_step_whitelist};
use crate::registry::TypeRegistry;
use crate::response::{FactModel, ResponseConverter};
use crate::store::{FactStore, ObjectStore, OriginStore, RetractionIndex};

/// Tunable service defaults.
///
/// The traversal timeout is an operational value, not an invariant; 15
/// seconds matches interactive use.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Wall-clock budget for one traversal query.
    pub traversal_timeout: Duration,
    /// Steps the sandbox allows. Narrowing this set disables steps;
    /// widening it has no effect beyond the evaluator's vocabulary.
    pub step_whitelist: HashSet<String>,
    /// Cap on starting Objects accepted from a bulk search result.
    pub max_search_roots: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            traversal_timeout: Duration::from_secs(15),
            step_whitelist: default_step_whitelist(),
            max_search_roots: 1000,
        }
    }
}

impl ServiceConfig {
    pub fn with_traversal_timeout(mut self, timeout: Duration) -> Self {
        self.traversal_timeout = timeout;
        self
    }

    pub fn with_step_whitelist(mut self, whitelist: HashSet<String>) -> Self {
        self.step_whitelist = whitelist;
        self
    }

    pub fn with_max_search_roots(mut self, max: usize) -> Self {
        self.max_search_roots = max;
        self
    }
}

/// The injected collaborators of a [`GraphService`].
pub struct ServiceParts {
    pub objects: Arc<dyn ObjectStore>,
    pub facts: Arc<dyn FactStore>,
    pub origins: Arc<dyn OriginStore>,
    pub registry: Arc<TypeRegistry>,
    pub retractions: Arc<dyn RetractionIndex>,
    pub access: Arc<dyn AccessDecider>,
    pub converter: Arc<dyn ResponseConverter>,
    /// Origin applied to lifecycle requests that do not name one.
    pub default_origin: OriginId,
}

/// Top-level entry point of the weft core.
pub struct GraphService {
    objects: Arc<dyn ObjectStore>,
    facts: Arc<dyn FactStore>,
    registry: Arc<TypeRegistry>,
    retractions: Arc<dyn RetractionIndex>,
    access: Arc<dyn AccessDecider>,
    converter: Arc<dyn ResponseConverter>,
    lifecycle: FactLifecycle,
    executor: TraversalExecutor,
    config: ServiceConfig,
}

impl GraphService {
    pub fn new(parts: ServiceParts, config: ServiceConfig) -> Self {
        tracing::info!(
            timeout_ms = config.traversal_timeout.as_millis() as u64,
            whitelisted_steps = config.step_whitelist.len(),
            max_search_roots = config.max_search_roots,
            "initializing weft graph service"
        );
        let lifecycle = FactLifecycle::new(
            Arc::clone(&parts.objects),
            Arc::clone(&parts.facts),
            Arc::clone(&parts.origins),
            Arc::clone(&parts.registry),
            Arc::clone(&parts.retractions),
            Arc::clone(&parts.access),
            parts.default_origin,
        );
        let executor = TraversalExecutor::new(
            config.traversal_timeout,
            config.step_whitelist.clone(),
            Arc::clone(&parts.converter),
        );
        GraphService {
            objects: parts.objects,
            facts: parts.facts,
            registry: parts.registry,
            retractions: parts.retractions,
            access: parts.access,
            converter: parts.converter,
            lifecycle,
            executor,
            config,
        }
    }

    /// The type registry backing this service.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// The service configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Traversal
    // -----------------------------------------------------------------------

    /// Traverse the graph from one or more Objects given by id.
    ///
    /// Every starting Object must exist; a missing one fails the request
    /// with `NotFound` before any traversal work starts.
    pub fn traverse_by_objects(
        &self,
        ids: &[ObjectId],
        query: &str,
        params: TraverseParams,
    ) -> WeftResult<TraversalResult> {
        self.access
            .check_permission(PermissionFunction::TraverseGraph, None)?;
        for id in ids {
            if self
                .objects
                .object(*id)
                .map_err(WeftError::Store)?
                .is_none()
            {
                return Err(GraphError::ObjectNotFound { id: *id }.into());
            }
        }
        Ok(self.execute(ids, query, params))
    }

    /// Traverse the graph from the Object with the given (type, value) key.
    pub fn traverse_by_type_value(
        &self,
        type_name: &str,
        value: &str,
        query: &str,
        params: TraverseParams,
    ) -> WeftResult<TraversalResult> {
        self.access
            .check_permission(PermissionFunction::TraverseGraph, None)?;
        let object_type = self.registry.object_type_by_name(type_name).ok_or_else(|| {
            WeftError::Graph(GraphError::ObjectNotResolved {
                type_name: type_name.to_string(),
                value: value.to_string(),
            })
        })?;
        let object = self
            .objects
            .object_by_value(object_type.id, value)
            .map_err(WeftError::Store)?
            .ok_or_else(|| {
                WeftError::Graph(GraphError::ObjectNotResolved {
                    type_name: type_name.to_string(),
                    value: value.to_string(),
                })
            })?;
        Ok(self.execute(&[object.id], query, params))
    }

    /// Traverse the graph from an opaque id set produced by an external bulk
    /// search. An empty set short-circuits to an empty result; ids beyond
    /// the configured cap are dropped; missing ids are skipped silently (the
    /// search index may lag the stores).
    pub fn traverse_by_search(
        &self,
        ids: Vec<ObjectId>,
        query: &str,
        params: TraverseParams,
    ) -> WeftResult<TraversalResult> {
        self.access
            .check_permission(PermissionFunction::TraverseGraph, None)?;
        if ids.is_empty() {
            return Ok(TraversalResult::empty());
        }
        let mut roots = ids;
        if roots.len() > self.config.max_search_roots {
            tracing::warn!(
                requested = roots.len(),
                cap = self.config.max_search_roots,
                "truncating search-based traversal roots"
            );
            roots.truncate(self.config.max_search_roots);
        }
        Ok(self.execute(&roots, query, params))
    }

    fn execute(&self, roots: &[ObjectId], query: &str, params: TraverseParams) -> TraversalResult {
        let view = Arc::new(GraphView::new(
            Arc::clone(&self.objects),
            Arc::clone(&self.facts),
            Arc::clone(&self.registry),
            Arc::clone(&self.access),
            Arc::clone(&self.retractions),
            params,
        ));
        self.executor.execute(view, roots, query)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Create a Fact (or refresh an identical existing one).
    pub fn create_fact(&self, spec: CreateFactSpec) -> WeftResult<FactModel> {
        let fact = self.lifecycle.create(spec)?;
        Ok(self.to_model(&fact))
    }

    /// Create a meta-fact referencing an existing Fact.
    pub fn create_meta_fact(&self, spec: CreateMetaFactSpec) -> WeftResult<FactModel> {
        let fact = self.lifecycle.create_meta(spec)?;
        Ok(self.to_model(&fact))
    }

    /// Retract a Fact, returning the Retraction Fact.
    pub fn retract_fact(&self, spec: RetractFactSpec) -> WeftResult<FactModel> {
        let fact = self.lifecycle.retract(spec)?;
        Ok(self.to_model(&fact))
    }

    fn to_model(&self, fact: &Fact) -> FactModel {
        let type_name = self
            .registry
            .fact_type(fact.type_id)
            .map(|t| t.name)
            .unwrap_or_else(|| fact.type_id.to_string());
        self.converter.fact(fact, &type_name)
    }
}

impl std::fmt::Debug for GraphService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphService")
            .field("timeout", &self.config.traversal_timeout)
            .field("max_search_roots", &self.config.max_search_roots)
            .finish()
    }
}
