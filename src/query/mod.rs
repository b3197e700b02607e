//! Traversal query engine.
//!
//! Queries are written in a small, purpose-built traversal DSL: a chain of
//! step calls rooted at the bound starting set `g`, e.g.
//!
//! ```text
//! g.out('resolvesTo').values('value')
//! g.outE().has('confidence', '1').bothV().dedup()
//! g.repeat(out, 3).dedup().limit(25)
//! ```
//!
//! The pipeline is parse → sandbox check → evaluate → convert:
//!
//! - [`parse`] turns the query text into generic step calls
//! - [`eval`] compiles calls against the configured **operation whitelist**
//!   (a step outside the whitelist is rejected before any graph work) and
//!   runs the step machine over the lazy graph view, honouring a cooperative
//!   [`CancelToken`]
//! - [`executor`] runs evaluation on a dedicated worker under a wall-clock
//!   timeout and converts raw elements into response values
//!
//! A bad query degrades to a result carrying an explanatory message; it
//! never raises past the executor.

pub mod eval;
pub mod executor;
pub mod parse;

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::response::{FactModel, ObjectModel};

/// Message code attached when a traversal hits the wall-clock timeout.
pub const CODE_TIMEOUT: &str = "graph.traversal.timeout";
/// Message code attached when a traversal fails (syntax, sandbox, runtime).
pub const CODE_FAILURE: &str = "graph.traversal.failure";

/// A user-facing message attached to a traversal result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalMessage {
    pub message: String,
    pub code: String,
}

impl TraversalMessage {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        TraversalMessage {
            message: message.into(),
            code: code.into(),
        }
    }
}

/// One converted traversal output value.
///
/// The closed union the evaluator's raw output is adapted into at the
/// traversal boundary: vertices become Object responses, edges become Fact
/// responses (resolved through the owning Fact), anything else is carried as
/// its string form, mirroring exploratory console usage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "value")]
pub enum TraversalValue {
    Object(ObjectModel),
    Fact(FactModel),
    Scalar(String),
}

/// The buffered result of one traversal execution.
///
/// An ordered, append-only sequence of converted values plus zero or more
/// messages. The overall status is implied by the messages present: none
/// means the traversal completed, a timeout or failure message means it was
/// cut short — in both cases the values already produced are retained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraversalResult {
    pub values: Vec<TraversalValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<TraversalMessage>,
}

impl TraversalResult {
    /// An empty, completed result.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the traversal ran to completion without messages.
    pub fn is_complete(&self) -> bool {
        self.messages.is_empty()
    }

    /// Whether a timeout message is attached.
    pub fn is_timed_out(&self) -> bool {
        self.messages.iter().any(|m| m.code == CODE_TIMEOUT)
    }

    /// Whether a failure message is attached.
    pub fn is_failed(&self) -> bool {
        self.messages.iter().any(|m| m.code == CODE_FAILURE)
    }
}

/// Cooperative cancellation token shared between the executor and its worker.
///
/// The evaluator checks the token on every step iteration, which is what
/// allows the executor to abort CPU-bound loops (`repeat` without a count)
/// at the timeout boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The full built-in step vocabulary, used as the default operation
/// whitelist. Deployments can narrow this set through the service
/// configuration; they cannot widen it beyond what the evaluator knows.
pub fn default_step_whitelist() -> HashSet<String> {
    [
        "out", "in", "both", "outE", "inE", "bothE", "outV", "inV", "bothV", "has", "hasLabel",
        "values", "id", "label", "count", "dedup", "limit", "repeat",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_status_from_messages() {
        let complete = TraversalResult::empty();
        assert!(complete.is_complete());

        let timed_out = TraversalResult {
            values: Vec::new(),
            messages: vec![TraversalMessage::new("timed out", CODE_TIMEOUT)],
        };
        assert!(timed_out.is_timed_out());
        assert!(!timed_out.is_failed());

        let failed = TraversalResult {
            values: Vec::new(),
            messages: vec![TraversalMessage::new("boom", CODE_FAILURE)],
        };
        assert!(failed.is_failed());
        assert!(!failed.is_timed_out());
    }

    #[test]
    fn cancel_token_flips_once() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
        // Clones observe the same flag.
        let clone = token.clone();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn whitelist_contains_core_steps() {
        let whitelist = default_step_whitelist();
        for step in ["out", "in", "both", "repeat", "values"] {
            assert!(whitelist.contains(step));
        }
        assert!(!whitelist.contains("system"));
    }
}
