//! Hyperedge expansion: N-ary Fact bindings to pairwise edges.
//!
//! A Fact bound to N Objects is not representable as one edge. Seen from one
//! bound Object, the Fact expands into one edge per *other* bound Object
//! whose binding role fits, or into a single self-loop when the Fact has
//! exactly one binding. The expansion is pure: it reads only the Fact's
//! binding list and produces endpoint pairs; materializing elements and
//! enforcing access happen in the graph view.
//!
//! Role → direction table (relative to the Object being expanded):
//!
//! | role          | edge included for |
//! |---------------|-------------------|
//! | Destination   | Out, Both         |
//! | Source        | In, Both          |
//! | Bidirectional | always            |
//! | None          | never             |

use std::collections::HashSet;

use crate::model::{BindingRole, Fact, FactId, ObjectId};

use super::Direction;

/// An endpoint pair produced by expansion, before materialization.
///
/// The logical edge identity is the whole triple (fact, from, to) — expanding
/// the same Fact from either endpoint yields the same pair for directed
/// bindings, which is what makes edge dedup across traversal steps work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeSpec {
    pub fact: FactId,
    /// Endpoint the edge leaves.
    pub from: ObjectId,
    /// Endpoint the edge arrives at.
    pub to: ObjectId,
}

/// Whether a binding with the given role is traversable in the requested
/// direction.
fn matches_direction(role: BindingRole, direction: Direction) -> bool {
    match role {
        BindingRole::Bidirectional => true,
        BindingRole::Destination => matches!(direction, Direction::Out | Direction::Both),
        BindingRole::Source => matches!(direction, Direction::In | Direction::Both),
        BindingRole::None => false,
    }
}

/// Expand a Fact as seen from one of its bound Objects.
///
/// Produces the deduplicated endpoint pairs visible from `object` under the
/// requested direction. An Object the Fact does not bind expands to nothing.
pub fn expand(fact: &Fact, object: ObjectId, direction: Direction) -> Vec<EdgeSpec> {
    let mut specs = Vec::new();
    let mut seen: HashSet<EdgeSpec> = HashSet::new();

    // An Object may appear in several bindings of the same Fact; each
    // qualifying binding contributes its own pairings.
    for own in fact.bindings.iter().filter(|b| b.object == object) {
        if own.role == BindingRole::None {
            continue;
        }

        // A Fact with exactly one binding is a self-loop, visible in every
        // requested direction.
        if fact.bindings.len() == 1 {
            let spec = EdgeSpec {
                fact: fact.id,
                from: object,
                to: object,
            };
            if seen.insert(spec) {
                specs.push(spec);
            }
            continue;
        }

        if !matches_direction(own.role, direction) {
            continue;
        }

        for other in fact.bindings.iter().filter(|b| b.object != object) {
            // Only role pairs that fit together produce an edge.
            let spec = match (own.role, other.role) {
                (BindingRole::Bidirectional, BindingRole::Bidirectional) => EdgeSpec {
                    fact: fact.id,
                    from: object,
                    to: other.object,
                },
                (BindingRole::Destination, BindingRole::Source) => EdgeSpec {
                    fact: fact.id,
                    from: object,
                    to: other.object,
                },
                (BindingRole::Source, BindingRole::Destination) => EdgeSpec {
                    fact: fact.id,
                    from: other.object,
                    to: object,
                },
                _ => continue,
            };
            if seen.insert(spec) {
                specs.push(spec);
            }
        }
    }

    specs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Binding;
    use uuid::Uuid;

    fn fact_with(bindings: Vec<Binding>) -> Fact {
        Fact::new(FactId::random(), Uuid::new_v4()).with_bindings(bindings)
    }

    #[test]
    fn directed_fact_expands_out_from_destination_role() {
        let a = ObjectId::random();
        let b = ObjectId::random();
        let fact = fact_with(vec![
            Binding::new(a, BindingRole::Destination),
            Binding::new(b, BindingRole::Source),
        ]);

        // a --fact--> b
        let out = expand(&fact, a, Direction::Out);
        assert_eq!(out, vec![EdgeSpec { fact: fact.id, from: a, to: b }]);

        assert!(expand(&fact, a, Direction::In).is_empty());
        assert!(expand(&fact, b, Direction::Out).is_empty());

        // Same logical pair from the other side.
        let incoming = expand(&fact, b, Direction::In);
        assert_eq!(incoming, vec![EdgeSpec { fact: fact.id, from: a, to: b }]);

        assert_eq!(expand(&fact, a, Direction::Both), out);
        assert_eq!(expand(&fact, b, Direction::Both), incoming);
    }

    #[test]
    fn bidirectional_fact_expands_in_every_direction() {
        let a = ObjectId::random();
        let b = ObjectId::random();
        let fact = fact_with(vec![
            Binding::new(a, BindingRole::Bidirectional),
            Binding::new(b, BindingRole::Bidirectional),
        ]);

        for direction in [Direction::Out, Direction::In, Direction::Both] {
            let specs = expand(&fact, a, direction);
            assert_eq!(specs, vec![EdgeSpec { fact: fact.id, from: a, to: b }]);
        }
    }

    #[test]
    fn single_binding_yields_loop_in_every_direction() {
        let a = ObjectId::random();
        let fact = fact_with(vec![Binding::new(a, BindingRole::Destination)]);

        for direction in [Direction::Out, Direction::In, Direction::Both] {
            let specs = expand(&fact, a, direction);
            assert_eq!(specs, vec![EdgeSpec { fact: fact.id, from: a, to: a }]);
        }
    }

    #[test]
    fn nary_fact_yields_one_edge_per_other_object() {
        let a = ObjectId::random();
        let b = ObjectId::random();
        let c = ObjectId::random();
        let d = ObjectId::random();
        let fact = fact_with(vec![
            Binding::new(a, BindingRole::Bidirectional),
            Binding::new(b, BindingRole::Bidirectional),
            Binding::new(c, BindingRole::Bidirectional),
            Binding::new(d, BindingRole::Bidirectional),
        ]);

        let specs = expand(&fact, a, Direction::Both);
        assert_eq!(specs.len(), 3);
        assert!(specs.iter().all(|s| s.fact == fact.id && s.from == a));
        let targets: HashSet<ObjectId> = specs.iter().map(|s| s.to).collect();
        assert_eq!(targets, HashSet::from([b, c, d]));
    }

    #[test]
    fn none_role_is_never_traversable() {
        let a = ObjectId::random();
        let b = ObjectId::random();
        let fact = fact_with(vec![
            Binding::new(a, BindingRole::None),
            Binding::new(b, BindingRole::None),
        ]);

        for direction in [Direction::Out, Direction::In, Direction::Both] {
            assert!(expand(&fact, a, direction).is_empty());
        }
    }

    #[test]
    fn mismatched_roles_produce_no_edge() {
        let a = ObjectId::random();
        let b = ObjectId::random();
        // Both claim the Destination role; the pairing does not fit.
        let fact = fact_with(vec![
            Binding::new(a, BindingRole::Destination),
            Binding::new(b, BindingRole::Destination),
        ]);
        assert!(expand(&fact, a, Direction::Both).is_empty());
    }

    #[test]
    fn unbound_object_expands_to_nothing() {
        let a = ObjectId::random();
        let fact = fact_with(vec![Binding::new(a, BindingRole::Bidirectional)]);
        assert!(expand(&fact, ObjectId::random(), Direction::Both).is_empty());
    }
}
