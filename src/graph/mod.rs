//! Graph projection: the Object-Fact hypergraph as a traversable property graph.
//!
//! Vertices are Objects, edges are Facts. The projection is lazy and derived:
//! elements exist only for the duration of one traversal and are never
//! persisted.
//!
//! - [`element`] — Vertex/Edge projection with cached property tables
//! - [`expand`] — hyperedge expansion (N-ary Fact → pairwise edges)
//! - [`property`] — typed, read-only property exposure
//! - [`view`] — the access-controlled lazy graph the traversal engine runs on

pub mod element;
pub mod expand;
pub mod property;
pub mod view;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Traversal direction relative to a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    Out,
    In,
    Both,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Out => write!(f, "out"),
            Direction::In => write!(f, "in"),
            Direction::Both => write!(f, "both"),
        }
    }
}

/// Per-traversal parameters narrowing which Facts become edges.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraverseParams {
    /// Expose edges for Facts flagged as retracted.
    #[serde(default)]
    pub include_retracted: bool,
    /// Only Facts with `timestamp` at or after this instant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_timestamp: Option<DateTime<Utc>>,
    /// Only Facts with `timestamp` at or before this instant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before_timestamp: Option<DateTime<Utc>>,
    /// Cap on the number of values a traversal may return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl TraverseParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_include_retracted(mut self, include: bool) -> Self {
        self.include_retracted = include;
        self
    }

    pub fn with_after_timestamp(mut self, after: DateTime<Utc>) -> Self {
        self.after_timestamp = Some(after);
        self
    }

    pub fn with_before_timestamp(mut self, before: DateTime<Utc>) -> Self {
        self.before_timestamp = Some(before);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a Fact timestamp falls inside the configured window.
    pub fn within_window(&self, timestamp: DateTime<Utc>) -> bool {
        if let Some(after) = self.after_timestamp {
            if timestamp < after {
                return false;
            }
        }
        if let Some(before) = self.before_timestamp {
            if timestamp > before {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_is_inclusive() {
        let now = Utc::now();
        let params = TraverseParams::new()
            .with_after_timestamp(now)
            .with_before_timestamp(now + chrono::Duration::seconds(10));
        assert!(params.within_window(now));
        assert!(params.within_window(now + chrono::Duration::seconds(10)));
        assert!(!params.within_window(now - chrono::Duration::seconds(1)));
        assert!(!params.within_window(now + chrono::Duration::seconds(11)));
    }

    #[test]
    fn no_window_accepts_everything() {
        assert!(TraverseParams::new().within_window(Utc::now()));
    }
}
