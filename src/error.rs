//! Rich diagnostic error types for the weft core.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text. Lookup and permission failures on direct
//! entry points propagate to the caller as typed errors; failures occurring
//! *during* lazy traversal never do — they are absorbed into the traversal
//! result's message list (see `query::TraversalResult`).

use miette::Diagnostic;
use thiserror::Error;

use crate::model::{FactId, ObjectId, TypeId};

/// Top-level error type for the weft core.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum WeftError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Invalid(#[from] InvalidArgument),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),
}

// ---------------------------------------------------------------------------
// Graph errors
// ---------------------------------------------------------------------------

/// Errors from graph projection and direct element lookup.
///
/// These are only raised at direct-entry points (resolving a traversal's
/// starting vertex, projecting an explicitly requested edge). A dangling
/// reference encountered mid-traversal is treated as "no such neighbor"
/// and skipped instead.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("object not found: {id}")]
    #[diagnostic(
        code(weft::graph::object_not_found),
        help(
            "No Object with this id exists in the object store. \
             Verify the id, or resolve the Object by (type, value) instead."
        )
    )]
    ObjectNotFound { id: ObjectId },

    #[error("object type not found: {id}")]
    #[diagnostic(
        code(weft::graph::object_type_not_found),
        help(
            "The Object references an ObjectType that is not registered. \
             Register the type before projecting this Object into the graph."
        )
    )]
    ObjectTypeNotFound { id: TypeId },

    #[error("object not found: {type_name}/{value}")]
    #[diagnostic(
        code(weft::graph::object_not_resolved),
        help("No Object with this (type, value) key exists in the object store.")
    )]
    ObjectNotResolved { type_name: String, value: String },

    #[error("fact not found: {id}")]
    #[diagnostic(
        code(weft::graph::fact_not_found),
        help("No Fact with this id exists in the fact store. Verify the id.")
    )]
    FactNotFound { id: FactId },

    #[error("fact type not found: {id}")]
    #[diagnostic(
        code(weft::graph::fact_type_not_found),
        help(
            "The Fact references a FactType that is not registered. \
             Register the type before projecting this Fact into the graph."
        )
    )]
    FactTypeNotFound { id: TypeId },

    #[error("graph mutation not supported: {operation}")]
    #[diagnostic(
        code(weft::graph::mutation_unsupported),
        help(
            "The projected graph is a read-only, derived view over the Object-Fact \
             model. Create or retract Facts through the lifecycle manager instead."
        )
    )]
    MutationUnsupported { operation: &'static str },

    #[error("transactions not supported")]
    #[diagnostic(
        code(weft::graph::transactions_unsupported),
        help("The projected graph only offers single-shot read views.")
    )]
    TransactionsUnsupported,
}

// ---------------------------------------------------------------------------
// Access errors
// ---------------------------------------------------------------------------

/// Permission failures on direct-entry operations.
///
/// During traversal, access-denied on a candidate edge means "omit this edge",
/// never a request-level failure.
#[derive(Debug, Error, Diagnostic)]
pub enum AccessError {
    #[error("access denied: {message}")]
    #[diagnostic(
        code(weft::access::denied),
        help(
            "The current user lacks the required permission. Check the user's \
             organization memberships and the Fact's access mode and ACL."
        )
    )]
    Denied { message: String },
}

impl AccessError {
    /// Construct a denial with the given message.
    pub fn denied(message: impl Into<String>) -> Self {
        AccessError::Denied {
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

/// A single failed validation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationItem {
    /// Human-readable description of the failed check.
    pub message: String,
    /// Stable machine-readable code, e.g. `invalid.fact.value`.
    pub code: &'static str,
    /// The request field that failed validation.
    pub field: &'static str,
    /// The offending value, stringified.
    pub value: String,
}

/// Collected validation failures for a lifecycle request.
///
/// Independent checks never fail fast; every violated check contributes one
/// entry so the caller can fix all problems in a single round trip.
#[derive(Debug, Error, Diagnostic)]
#[error("invalid argument: {}", self.summary())]
#[diagnostic(
    code(weft::invalid_argument),
    help("Fix the listed request fields and retry. Each entry names the field and the violated check.")
)]
pub struct InvalidArgument {
    /// One entry per violated check.
    pub items: Vec<ValidationItem>,
}

impl InvalidArgument {
    /// Create an empty error to collect entries into.
    pub fn new() -> Self {
        InvalidArgument { items: Vec::new() }
    }

    /// Append a validation failure.
    pub fn add(
        mut self,
        message: impl Into<String>,
        code: &'static str,
        field: &'static str,
        value: impl Into<String>,
    ) -> Self {
        self.items.push(ValidationItem {
            message: message.into(),
            code,
            field,
            value: value.into(),
        });
        self
    }

    /// Whether any check failed.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Return `Err(self)` if any check failed, `Ok(())` otherwise.
    pub fn into_result(self) -> Result<(), InvalidArgument> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    fn summary(&self) -> String {
        self.items
            .iter()
            .map(|i| i.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl Default for InvalidArgument {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

/// Errors from the entity store backends.
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("duplicate key: {key}")]
    #[diagnostic(
        code(weft::store::duplicate_key),
        help("An entity with this unique key already exists. Resolve the existing entity instead.")
    )]
    DuplicateKey { key: String },

    #[error("store backend error: {message}")]
    #[diagnostic(
        code(weft::store::backend),
        help("The storage backend failed. Check the backend's own logs for details.")
    )]
    Backend { message: String },
}

// ---------------------------------------------------------------------------
// Registry errors
// ---------------------------------------------------------------------------

/// Errors from type registration.
#[derive(Debug, Error, Diagnostic)]
pub enum RegistryError {
    #[error("duplicate type name: \"{name}\"")]
    #[diagnostic(
        code(weft::registry::duplicate_name),
        help("A type with this name is already registered. Type names must be unique.")
    )]
    DuplicateName { name: String },

    #[error("invalid validator pattern for type \"{name}\": {message}")]
    #[diagnostic(
        code(weft::registry::invalid_pattern),
        help("The type's value validator must be a valid regular expression.")
    )]
    InvalidPattern { name: String, message: String },

    #[error("fact type declares both object and fact bindings: \"{name}\"")]
    #[diagnostic(
        code(weft::registry::ambiguous_bindings),
        help(
            "A FactType binds either Objects (relevant object bindings) or other \
             Facts (relevant fact bindings), never both. Split it into two types."
        )
    )]
    AmbiguousBindings { name: String },
}

// ---------------------------------------------------------------------------
// Query errors (internal to the traversal engine)
// ---------------------------------------------------------------------------

/// Errors raised while parsing or evaluating a traversal query.
///
/// These never cross the public `traverse` entry point as errors; the executor
/// folds them into the traversal result's message list.
#[derive(Debug, Error, Diagnostic)]
pub enum QueryError {
    #[error("query syntax error at byte {position}: {message}")]
    #[diagnostic(
        code(weft::query::syntax),
        help("Queries are step chains rooted at 'g', e.g. g.out('resolvesTo').values('value').")
    )]
    Syntax { message: String, position: usize },

    #[error("operation not allowed by the sandbox: {step}()")]
    #[diagnostic(
        code(weft::query::sandbox),
        help("Only whitelisted traversal steps may be used. Check the configured step whitelist.")
    )]
    SandboxViolation { step: String },

    #[error("traversal evaluation failed: {message}")]
    #[diagnostic(
        code(weft::query::evaluation),
        help("The query failed at runtime, e.g. a step was applied to an incompatible element.")
    )]
    Evaluation { message: String },

    #[error("traversal interrupted")]
    #[diagnostic(
        code(weft::query::interrupted),
        help("The cancellation token was set, usually because the wall-clock timeout expired.")
    )]
    Interrupted,
}

/// Convenience alias for functions returning weft results.
pub type WeftResult<T> = std::result::Result<T, WeftError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn graph_error_converts_to_weft_error() {
        let err = GraphError::ObjectNotFound {
            id: ObjectId::from(Uuid::nil()),
        };
        let weft: WeftError = err.into();
        assert!(matches!(
            weft,
            WeftError::Graph(GraphError::ObjectNotFound { .. })
        ));
    }

    #[test]
    fn invalid_argument_collects_all_items() {
        let err = InvalidArgument::new()
            .add("bad value", "invalid.fact.value", "value", "xyz")
            .add("bad binding", "invalid.fact.object.binding", "sourceObject", "a/b");
        assert_eq!(err.items.len(), 2);
        let msg = format!("{err}");
        assert!(msg.contains("bad value"));
        assert!(msg.contains("bad binding"));
    }

    #[test]
    fn empty_invalid_argument_is_ok() {
        assert!(InvalidArgument::new().into_result().is_ok());
    }

    #[test]
    fn populated_invalid_argument_is_err() {
        let result = InvalidArgument::new()
            .add("x", "code", "field", "v")
            .into_result();
        assert!(result.is_err());
    }
}
