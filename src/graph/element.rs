//! Vertex and Edge projection.
//!
//! A vertex represents an Object one-to-one, so vertex identity is the Object
//! id. An edge represents a binding between two Objects by one Fact; a Fact
//! bound to more than two Objects is represented by multiple edges, so edge
//! identity is a freshly generated id, never the Fact id. Elements are
//! immutable snapshots: their property tables are computed once at
//! instantiation and shared read-only for the rest of the traversal.

use crate::model::{EdgeId, Fact, FactId, Object, ObjectId};

use super::Direction;
use super::property::{PropertyTable, fact_properties, object_properties};

/// A vertex in the projected graph: one Object plus its resolved type name.
#[derive(Debug, Clone)]
pub struct ObjectVertex {
    object: Object,
    type_name: String,
    properties: PropertyTable,
}

impl ObjectVertex {
    /// Project an Object (with its resolved type name) into a vertex.
    pub fn new(object: Object, type_name: impl Into<String>) -> Self {
        let properties = object_properties(&object);
        ObjectVertex {
            object,
            type_name: type_name.into(),
            properties,
        }
    }

    /// Vertex identity — the Object id.
    pub fn id(&self) -> ObjectId {
        self.object.id
    }

    /// Vertex label — the ObjectType name.
    pub fn label(&self) -> &str {
        &self.type_name
    }

    /// The underlying Object record.
    pub fn object(&self) -> &Object {
        &self.object
    }

    /// The cached property table.
    pub fn properties(&self) -> &PropertyTable {
        &self.properties
    }
}

impl PartialEq for ObjectVertex {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for ObjectVertex {}

impl std::hash::Hash for ObjectVertex {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

/// An edge in the projected graph: one (Fact, endpoint pair) combination.
///
/// The edge is directed `from → to`. Endpoints are stored as Object ids and
/// dereferenced lazily through the graph view, so constructing an edge never
/// recursively loads its neighbor Objects.
#[derive(Debug, Clone)]
pub struct FactEdge {
    edge_id: EdgeId,
    fact: Fact,
    type_name: String,
    from: ObjectId,
    to: ObjectId,
    properties: PropertyTable,
}

impl FactEdge {
    /// Project a Fact (with its resolved type name) into an edge between the
    /// given endpoints. A fresh random edge id is assigned.
    pub fn new(fact: Fact, type_name: impl Into<String>, from: ObjectId, to: ObjectId) -> Self {
        let properties = fact_properties(&fact);
        FactEdge {
            edge_id: EdgeId::random(),
            fact,
            type_name: type_name.into(),
            from,
            to,
            properties,
        }
    }

    /// Edge identity — distinct from the owning Fact id.
    pub fn id(&self) -> EdgeId {
        self.edge_id
    }

    /// Edge label — the FactType name.
    pub fn label(&self) -> &str {
        &self.type_name
    }

    /// The owning Fact id.
    pub fn fact_id(&self) -> FactId {
        self.fact.id
    }

    /// The underlying Fact record.
    pub fn fact(&self) -> &Fact {
        &self.fact
    }

    /// The endpoint the edge leaves.
    pub fn from(&self) -> ObjectId {
        self.from
    }

    /// The endpoint the edge arrives at.
    pub fn to(&self) -> ObjectId {
        self.to
    }

    /// Endpoint ids for the requested direction: `Out` yields the far end of
    /// an outgoing hop, `In` the near end, `Both` both.
    pub fn vertices(&self, direction: Direction) -> Vec<ObjectId> {
        match direction {
            Direction::Out => vec![self.to],
            Direction::In => vec![self.from],
            Direction::Both => vec![self.from, self.to],
        }
    }

    /// Whether the edge is a self-loop.
    pub fn is_loop(&self) -> bool {
        self.from == self.to
    }

    /// The cached property table.
    pub fn properties(&self) -> &PropertyTable {
        &self.properties
    }
}

impl PartialEq for FactEdge {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for FactEdge {}

impl std::hash::Hash for FactEdge {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::property::PropertyValue;
    use uuid::Uuid;

    fn edge_between(from: ObjectId, to: ObjectId) -> FactEdge {
        let fact = Fact::new(FactId::random(), Uuid::new_v4()).with_value("resolved");
        FactEdge::new(fact, "resolvesTo", from, to)
    }

    #[test]
    fn edge_id_differs_from_fact_id() {
        let edge = edge_between(ObjectId::random(), ObjectId::random());
        assert_ne!(edge.id().get(), edge.fact_id().get());
        // The owning Fact stays reachable through the property table.
        assert_eq!(
            edge.properties().get("factID"),
            Some(&PropertyValue::Id(edge.fact_id().get()))
        );
    }

    #[test]
    fn two_edges_of_one_fact_have_distinct_ids() {
        let fact = Fact::new(FactId::random(), Uuid::new_v4());
        let a = FactEdge::new(fact.clone(), "t", ObjectId::random(), ObjectId::random());
        let b = FactEdge::new(fact, "t", ObjectId::random(), ObjectId::random());
        assert_ne!(a.id(), b.id());
        assert_eq!(a.fact_id(), b.fact_id());
    }

    #[test]
    fn edge_vertices_by_direction() {
        let from = ObjectId::random();
        let to = ObjectId::random();
        let edge = edge_between(from, to);
        assert_eq!(edge.vertices(Direction::Out), vec![to]);
        assert_eq!(edge.vertices(Direction::In), vec![from]);
        assert_eq!(edge.vertices(Direction::Both), vec![from, to]);
    }

    #[test]
    fn loop_edge_detection() {
        let object = ObjectId::random();
        assert!(edge_between(object, object).is_loop());
        assert!(!edge_between(object, ObjectId::random()).is_loop());
    }

    #[test]
    fn vertex_identity_is_object_id() {
        let object = Object::new(ObjectId::random(), Uuid::new_v4(), "1.2.3.4");
        let vertex = ObjectVertex::new(object.clone(), "ip");
        assert_eq!(vertex.id(), object.id);
        assert_eq!(vertex.label(), "ip");
    }
}
