//! Compilation and evaluation of traversal steps.
//!
//! Compilation maps the parser's generic calls onto the closed step set,
//! consulting the operation whitelist first: a step outside the whitelist is
//! a sandbox violation and nothing is evaluated. Evaluation is a frontier
//! machine — every step transforms the current item set against the lazy
//! graph view — and checks the cooperative cancellation token on every
//! iteration, so even an unbounded `repeat` can be aborted from outside.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::QueryError;
use crate::graph::Direction;
use crate::graph::element::{FactEdge, ObjectVertex};
use crate::graph::property::PropertyValue;
use crate::graph::view::GraphView;

use super::CancelToken;
use super::parse::{Arg, Call};

/// A compiled traversal step.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Neighbor vertices over outgoing/incoming/undirected edges.
    Out(Vec<String>),
    In(Vec<String>),
    Both(Vec<String>),
    /// Incident edges.
    OutE(Vec<String>),
    InE(Vec<String>),
    BothE(Vec<String>),
    /// Edge endpoints.
    OutV,
    InV,
    BothV,
    /// Keep elements whose property equals the given value.
    Has { key: String, value: String },
    /// Keep elements with one of the given labels.
    HasLabel(Vec<String>),
    /// Project elements onto property values.
    Values(Vec<String>),
    Id,
    Label,
    Count,
    Dedup,
    Limit(usize),
    /// Repeat a sub-step; without a count the repetition is unbounded and
    /// only the cancellation token (or an emptied frontier) stops it.
    Repeat {
        step: Box<Step>,
        times: Option<usize>,
    },
}

/// One element of the evaluation frontier.
#[derive(Debug, Clone)]
pub enum Item {
    Vertex(Arc<ObjectVertex>),
    Edge(Arc<FactEdge>),
    Scalar(PropertyValue),
}

impl Item {
    /// Identity key used by `dedup()`.
    fn dedup_key(&self) -> String {
        match self {
            Item::Vertex(v) => format!("v:{}", v.id()),
            Item::Edge(e) => format!("e:{}", e.id()),
            Item::Scalar(s) => format!("s:{s}"),
        }
    }
}

fn evaluation(message: impl Into<String>) -> QueryError {
    QueryError::Evaluation {
        message: message.into(),
    }
}

fn string_args(call: &Call) -> Result<Vec<String>, QueryError> {
    call.args
        .iter()
        .map(|arg| match arg {
            Arg::Str(s) => Ok(s.clone()),
            _ => Err(evaluation(format!(
                "step {}() only takes string arguments",
                call.name
            ))),
        })
        .collect()
}

/// Compile parsed calls into steps, enforcing the operation whitelist.
///
/// The whitelist check runs first, for every call including nested ones, so
/// a disallowed operation is rejected before any evaluation starts.
pub fn compile(calls: &[Call], whitelist: &HashSet<String>) -> Result<Vec<Step>, QueryError> {
    calls.iter().map(|c| compile_call(c, whitelist)).collect()
}

fn compile_call(call: &Call, whitelist: &HashSet<String>) -> Result<Step, QueryError> {
    if !whitelist.contains(&call.name) {
        return Err(QueryError::SandboxViolation {
            step: call.name.clone(),
        });
    }

    match call.name.as_str() {
        "out" => Ok(Step::Out(string_args(call)?)),
        "in" => Ok(Step::In(string_args(call)?)),
        "both" => Ok(Step::Both(string_args(call)?)),
        "outE" => Ok(Step::OutE(string_args(call)?)),
        "inE" => Ok(Step::InE(string_args(call)?)),
        "bothE" => Ok(Step::BothE(string_args(call)?)),
        "outV" | "inV" | "bothV" | "id" | "label" | "count" | "dedup" => {
            if !call.args.is_empty() {
                return Err(evaluation(format!("step {}() takes no arguments", call.name)));
            }
            Ok(match call.name.as_str() {
                "outV" => Step::OutV,
                "inV" => Step::InV,
                "bothV" => Step::BothV,
                "id" => Step::Id,
                "label" => Step::Label,
                "count" => Step::Count,
                _ => Step::Dedup,
            })
        }
        "has" => match call.args.as_slice() {
            [Arg::Str(key), Arg::Str(value)] => Ok(Step::Has {
                key: key.clone(),
                value: value.clone(),
            }),
            [Arg::Str(key), Arg::Int(value)] => Ok(Step::Has {
                key: key.clone(),
                value: value.to_string(),
            }),
            _ => Err(evaluation("step has() takes a key and a value")),
        },
        "hasLabel" => Ok(Step::HasLabel(string_args(call)?)),
        "values" => Ok(Step::Values(string_args(call)?)),
        "limit" => match call.args.as_slice() {
            [Arg::Int(n)] if *n >= 0 => Ok(Step::Limit(*n as usize)),
            _ => Err(evaluation("step limit() takes a non-negative count")),
        },
        "repeat" => {
            let (inner, times) = match call.args.as_slice() {
                [inner] => (inner, None),
                [inner, Arg::Int(n)] if *n > 0 => (inner, Some(*n as usize)),
                _ => {
                    return Err(evaluation(
                        "step repeat() takes a traversal step and an optional positive count",
                    ));
                }
            };
            let step = match inner {
                Arg::Call(inner_call) => compile_call(inner_call, whitelist)?,
                Arg::Ident(name) => compile_call(
                    &Call {
                        name: name.clone(),
                        args: Vec::new(),
                        position: call.position,
                    },
                    whitelist,
                )?,
                _ => return Err(evaluation("repeat() requires a traversal step argument")),
            };
            Ok(Step::Repeat {
                step: Box::new(step),
                times,
            })
        }
        other => Err(QueryError::SandboxViolation {
            step: other.to_string(),
        }),
    }
}

/// The step machine running compiled steps over a graph view.
pub struct Evaluator<'a> {
    view: &'a GraphView,
    cancel: &'a CancelToken,
}

impl<'a> Evaluator<'a> {
    pub fn new(view: &'a GraphView, cancel: &'a CancelToken) -> Self {
        Evaluator { view, cancel }
    }

    /// Run the steps from a starting vertex set to the final frontier.
    pub fn run(
        &self,
        roots: Vec<Arc<ObjectVertex>>,
        steps: &[Step],
    ) -> Result<Vec<Item>, QueryError> {
        let mut items: Vec<Item> = roots.into_iter().map(Item::Vertex).collect();
        for step in steps {
            items = self.apply(items, step)?;
        }
        Ok(items)
    }

    fn check_cancelled(&self) -> Result<(), QueryError> {
        if self.cancel.is_cancelled() {
            Err(QueryError::Interrupted)
        } else {
            Ok(())
        }
    }

    fn apply(&self, items: Vec<Item>, step: &Step) -> Result<Vec<Item>, QueryError> {
        self.check_cancelled()?;
        match step {
            Step::Out(labels) => self.neighbors(items, Direction::Out, labels),
            Step::In(labels) => self.neighbors(items, Direction::In, labels),
            Step::Both(labels) => self.neighbors(items, Direction::Both, labels),
            Step::OutE(labels) => self.edges(items, Direction::Out, labels),
            Step::InE(labels) => self.edges(items, Direction::In, labels),
            Step::BothE(labels) => self.edges(items, Direction::Both, labels),
            Step::OutV => self.endpoints(items, Direction::Out),
            Step::InV => self.endpoints(items, Direction::In),
            Step::BothV => self.endpoints(items, Direction::Both),
            Step::Has { key, value } => {
                let mut kept = Vec::new();
                for item in items {
                    self.check_cancelled()?;
                    let matches = match &item {
                        Item::Vertex(v) => v
                            .properties()
                            .get(key)
                            .is_some_and(|p| p.to_string() == *value),
                        Item::Edge(e) => e
                            .properties()
                            .get(key)
                            .is_some_and(|p| p.to_string() == *value),
                        Item::Scalar(_) => false,
                    };
                    if matches {
                        kept.push(item);
                    }
                }
                Ok(kept)
            }
            Step::HasLabel(labels) => {
                let mut kept = Vec::new();
                for item in items {
                    self.check_cancelled()?;
                    let label = match &item {
                        Item::Vertex(v) => Some(v.label().to_string()),
                        Item::Edge(e) => Some(e.label().to_string()),
                        Item::Scalar(_) => None,
                    };
                    if label.is_some_and(|l| labels.iter().any(|x| *x == l)) {
                        kept.push(item);
                    }
                }
                Ok(kept)
            }
            Step::Values(keys) => {
                let mut values = Vec::new();
                for item in items {
                    self.check_cancelled()?;
                    let table = match &item {
                        Item::Vertex(v) => v.properties().clone(),
                        Item::Edge(e) => e.properties().clone(),
                        Item::Scalar(_) => {
                            return Err(evaluation("step values() requires vertices or edges"));
                        }
                    };
                    for (_, value) in table.lookup(keys) {
                        values.push(Item::Scalar(value.clone()));
                    }
                }
                Ok(values)
            }
            Step::Id => items
                .into_iter()
                .map(|item| match item {
                    Item::Vertex(v) => Ok(Item::Scalar(PropertyValue::Id(v.id().get()))),
                    Item::Edge(e) => Ok(Item::Scalar(PropertyValue::Id(e.id().get()))),
                    Item::Scalar(_) => Err(evaluation("step id() requires vertices or edges")),
                })
                .collect(),
            Step::Label => items
                .into_iter()
                .map(|item| match item {
                    Item::Vertex(v) => Ok(Item::Scalar(PropertyValue::Str(v.label().into()))),
                    Item::Edge(e) => Ok(Item::Scalar(PropertyValue::Str(e.label().into()))),
                    Item::Scalar(_) => Err(evaluation("step label() requires vertices or edges")),
                })
                .collect(),
            Step::Count => Ok(vec![Item::Scalar(PropertyValue::Int(items.len() as i64))]),
            Step::Dedup => {
                let mut seen = HashSet::new();
                Ok(items
                    .into_iter()
                    .filter(|item| seen.insert(item.dedup_key()))
                    .collect())
            }
            Step::Limit(n) => Ok(items.into_iter().take(*n).collect()),
            Step::Repeat { step, times } => {
                let mut frontier = items;
                match times {
                    Some(n) => {
                        for _ in 0..*n {
                            frontier = self.apply(frontier, step)?;
                        }
                    }
                    None => {
                        // Unbounded: runs until the frontier empties or the
                        // token aborts it.
                        while !frontier.is_empty() {
                            frontier = self.apply(frontier, step)?;
                        }
                    }
                }
                Ok(frontier)
            }
        }
    }

    fn neighbors(
        &self,
        items: Vec<Item>,
        direction: Direction,
        labels: &[String],
    ) -> Result<Vec<Item>, QueryError> {
        let mut result = Vec::new();
        for item in items {
            self.check_cancelled()?;
            match item {
                Item::Vertex(v) => {
                    result.extend(
                        self.view
                            .neighbors_of(v.id(), direction, labels)
                            .into_iter()
                            .map(Item::Vertex),
                    );
                }
                _ => {
                    return Err(evaluation(format!(
                        "step {direction}() requires vertices"
                    )));
                }
            }
        }
        Ok(result)
    }

    fn edges(
        &self,
        items: Vec<Item>,
        direction: Direction,
        labels: &[String],
    ) -> Result<Vec<Item>, QueryError> {
        let mut result = Vec::new();
        for item in items {
            self.check_cancelled()?;
            match item {
                Item::Vertex(v) => {
                    result.extend(
                        self.view
                            .edges_of(v.id(), direction, labels)
                            .into_iter()
                            .map(Item::Edge),
                    );
                }
                _ => {
                    return Err(evaluation(format!(
                        "step {direction}E() requires vertices"
                    )));
                }
            }
        }
        Ok(result)
    }

    fn endpoints(&self, items: Vec<Item>, direction: Direction) -> Result<Vec<Item>, QueryError> {
        let mut result = Vec::new();
        for item in items {
            self.check_cancelled()?;
            match item {
                Item::Edge(e) => {
                    for endpoint in e.vertices(direction) {
                        // A concurrently removed endpoint is no neighbor.
                        if let Some(vertex) = self.view.try_vertex(endpoint) {
                            result.push(Item::Vertex(vertex));
                        }
                    }
                }
                _ => {
                    return Err(evaluation(format!(
                        "step {direction}V() requires edges"
                    )));
                }
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::default_step_whitelist;
    use crate::query::parse::parse;

    fn compiled(query: &str) -> Result<Vec<Step>, QueryError> {
        compile(&parse(query)?, &default_step_whitelist())
    }

    #[test]
    fn compiles_known_steps() {
        let steps = compiled("g.out('a').has('value', '1').values('value').limit(3)").unwrap();
        assert_eq!(steps.len(), 4);
        assert_eq!(steps[0], Step::Out(vec!["a".into()]));
        assert_eq!(
            steps[1],
            Step::Has {
                key: "value".into(),
                value: "1".into()
            }
        );
        assert_eq!(steps[3], Step::Limit(3));
    }

    #[test]
    fn disallowed_step_is_a_sandbox_violation() {
        let err = compiled("g.system('rm')").unwrap_err();
        assert!(matches!(err, QueryError::SandboxViolation { step } if step == "system"));
    }

    #[test]
    fn nested_repeat_step_is_sandbox_checked() {
        let err = compiled("g.repeat(system('rm'), 2)").unwrap_err();
        assert!(matches!(err, QueryError::SandboxViolation { step } if step == "system"));
    }

    #[test]
    fn narrowed_whitelist_rejects_known_step() {
        let mut whitelist = default_step_whitelist();
        whitelist.remove("repeat");
        let calls = parse("g.repeat(out)").unwrap();
        assert!(matches!(
            compile(&calls, &whitelist),
            Err(QueryError::SandboxViolation { .. })
        ));
    }

    #[test]
    fn repeat_compiles_with_and_without_count() {
        let unbounded = compiled("g.repeat(both)").unwrap();
        assert_eq!(
            unbounded[0],
            Step::Repeat {
                step: Box::new(Step::Both(Vec::new())),
                times: None
            }
        );
        let bounded = compiled("g.repeat(out('x'), 3)").unwrap();
        assert_eq!(
            bounded[0],
            Step::Repeat {
                step: Box::new(Step::Out(vec!["x".into()])),
                times: Some(3)
            }
        );
    }

    #[test]
    fn limit_rejects_negative_count() {
        assert!(matches!(
            compiled("g.limit(-1)"),
            Err(QueryError::Evaluation { .. })
        ));
    }
}
