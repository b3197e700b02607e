//! Traversal execution: dedicated worker, wall-clock timeout, conversion.
//!
//! Execution walks the state machine Idle → Running → {Completed, TimedOut,
//! Failed}. The evaluator runs on its own worker thread while the caller
//! blocks on a bounded channel; hitting the timeout sets the cancellation
//! token, abandons the worker and returns whatever the worker pushed into
//! the per-query sink so far. Sinks are per-query, so a worker that ignores
//! the token can never contaminate a later traversal.
//!
//! Every failure mode — syntax error, sandbox violation, runtime evaluation
//! error, timeout — is folded into the result's message list. A traversal
//! never raises past [`TraversalExecutor::execute`].

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, bounded};

use crate::error::QueryError;
use crate::graph::view::GraphView;
use crate::model::ObjectId;
use crate::response::ResponseConverter;

use super::eval::{Evaluator, Item, compile};
use super::parse::parse;
use super::{
    CODE_FAILURE, CODE_TIMEOUT, CancelToken, TraversalMessage, TraversalResult, TraversalValue,
};

/// Message text attached when the wall-clock timeout expires.
const TIMEOUT_MESSAGE: &str = "The performed graph traversal query timed out.";

/// Runs traversal queries against graph views.
pub struct TraversalExecutor {
    timeout: Duration,
    whitelist: Arc<HashSet<String>>,
    converter: Arc<dyn ResponseConverter>,
}

impl TraversalExecutor {
    pub fn new(
        timeout: Duration,
        whitelist: HashSet<String>,
        converter: Arc<dyn ResponseConverter>,
    ) -> Self {
        TraversalExecutor {
            timeout,
            whitelist: Arc::new(whitelist),
            converter,
        }
    }

    /// Execute a query from the given starting Objects.
    ///
    /// Starting ids that cannot be resolved are skipped; validating their
    /// existence is the caller's concern for direct lookups.
    pub fn execute(&self, view: Arc<GraphView>, roots: &[ObjectId], query: &str) -> TraversalResult {
        // Parse and sandbox-check before any worker is spawned; a disallowed
        // operation must be rejected before execution, not during it.
        let steps = match parse(query).and_then(|calls| compile(&calls, &self.whitelist)) {
            Ok(steps) => steps,
            Err(e) => {
                return TraversalResult {
                    values: Vec::new(),
                    messages: vec![TraversalMessage::new(e.to_string(), CODE_FAILURE)],
                };
            }
        };

        let starting: Vec<_> = roots.iter().filter_map(|id| view.try_vertex(*id)).collect();

        let limit = view.params().limit;
        let sink: Arc<Mutex<Vec<TraversalValue>>> = Arc::new(Mutex::new(Vec::new()));
        let cancel = CancelToken::new();
        let (done_tx, done_rx) = bounded::<Result<(), QueryError>>(1);

        tracing::debug!(
            roots = starting.len(),
            query,
            timeout_ms = self.timeout.as_millis() as u64,
            "starting traversal"
        );

        let worker_view = Arc::clone(&view);
        let worker_sink = Arc::clone(&sink);
        let worker_cancel = cancel.clone();
        let worker_converter = Arc::clone(&self.converter);
        thread::spawn(move || {
            let evaluator = Evaluator::new(&worker_view, &worker_cancel);
            let outcome = evaluator.run(starting, &steps).map(|items| {
                // Drain the final frontier one element at a time so values
                // produced before an abort survive it.
                for item in items {
                    if worker_cancel.is_cancelled() {
                        break;
                    }
                    if let Some(max) = limit {
                        if worker_sink.lock().map(|s| s.len() >= max).unwrap_or(true) {
                            break;
                        }
                    }
                    let value = match item {
                        Item::Vertex(v) => {
                            // Rely on the access control enforced during
                            // traversal; an Object reached here leaks at most
                            // its existence.
                            Some(TraversalValue::Object(
                                worker_converter.object(v.object(), v.label()),
                            ))
                        }
                        Item::Edge(e) => {
                            // Re-check the Fact behind the edge; skip silently
                            // when denied.
                            if worker_view.can_read(e.fact()) {
                                Some(TraversalValue::Fact(
                                    worker_converter.fact(e.fact(), e.label()),
                                ))
                            } else {
                                None
                            }
                        }
                        Item::Scalar(s) => Some(TraversalValue::Scalar(s.to_string())),
                    };
                    if let (Some(value), Ok(mut guard)) = (value, worker_sink.lock()) {
                        guard.push(value);
                    }
                }
            });
            // The receiver may be gone after a timeout; nothing to do then.
            let _ = done_tx.send(outcome);
        });

        let messages = match done_rx.recv_timeout(self.timeout) {
            Ok(Ok(())) => Vec::new(),
            Ok(Err(e)) => vec![TraversalMessage::new(e.to_string(), CODE_FAILURE)],
            Err(RecvTimeoutError::Timeout) => {
                cancel.cancel();
                tracing::warn!(query, "traversal timed out, abandoning worker");
                vec![TraversalMessage::new(TIMEOUT_MESSAGE, CODE_TIMEOUT)]
            }
            Err(RecvTimeoutError::Disconnected) => {
                // The worker died without reporting; surface it like any
                // other evaluation failure.
                vec![TraversalMessage::new(
                    "traversal worker terminated unexpectedly",
                    CODE_FAILURE,
                )]
            }
        };

        let values = sink.lock().map(|mut s| std::mem::take(&mut *s)).unwrap_or_default();
        TraversalResult { values, messages }
    }
}
