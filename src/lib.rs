//! # weft
//!
//! A threat-intelligence knowledge base core built on an Object-Fact
//! hypergraph: typed Objects (IPs, domains, actors) related by typed,
//! attributable, access-controlled Facts.
//!
//! ## Architecture
//!
//! - **Data model** (`model`, `registry`, `validator`): Objects, Facts,
//!   bindings and their type definitions
//! - **Graph projection** (`graph`): the hypergraph as a lazily derived,
//!   access-controlled property graph — vertices are Objects, edges are
//!   Facts, N-ary Facts expand into pairwise edges
//! - **Traversal engine** (`query`): a sandboxed traversal DSL executed on a
//!   worker under a hard wall-clock timeout
//! - **Fact lifecycle** (`lifecycle`): creation with dedup-or-refresh
//!   semantics, meta-facts, retraction
//! - **Facade** (`service`): wires stores, access control and conversion
//!   into one entry point
//!
//! ## Library usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use weft::access::AllowAll;
//! use weft::graph::TraverseParams;
//! use weft::registry::TypeRegistry;
//! use weft::response::ModelConverter;
//! use weft::service::{GraphService, ServiceConfig, ServiceParts};
//! use weft::store::mem::{MemFactStore, MemObjectStore, MemOriginStore, MemRetractionIndex};
//!
//! let registry = Arc::new(TypeRegistry::new());
//! let service = GraphService::new(
//!     ServiceParts {
//!         objects: Arc::new(MemObjectStore::new()),
//!         facts: Arc::new(MemFactStore::new()),
//!         origins: Arc::new(MemOriginStore::new()),
//!         registry,
//!         retractions: Arc::new(MemRetractionIndex::new()),
//!         access: Arc::new(AllowAll::new(uuid::Uuid::new_v4())),
//!         converter: Arc::new(ModelConverter::new()),
//!         default_origin: uuid::Uuid::new_v4(),
//!     },
//!     ServiceConfig::default(),
//! );
//! let result = service
//!     .traverse_by_type_value("ip", "1.2.3.4", "g.out()", TraverseParams::new())
//!     .unwrap();
//! ```

pub mod access;
pub mod error;
pub mod graph;
pub mod lifecycle;
pub mod model;
pub mod query;
pub mod registry;
pub mod response;
pub mod service;
pub mod store;
pub mod validator;
