//! Edge records and traversal direction.

use serde::{Deserialize, Serialize};

use super::attributes::Attributes;
use super::node::NodeId;

/// Direction of a traversal relative to the edge direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Toward dependencies (ancestors).
    Up,
    /// Toward dependents (descendants).
    Down,
}

impl Default for Direction {
    fn default() -> Self {
        Self::Down
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
        }
    }
}

/// Owned snapshot of one directed edge.
///
/// `source` must finish before `target`; `target` is a dependent of `source`.
/// Implements `Ord` for deterministic ordering: (source, target).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Dependency end.
    pub source: NodeId,
    /// Dependent end.
    pub target: NodeId,
    /// Attributes stored on the edge.
    pub attributes: Attributes,
}

impl Edge {
    /// Create a new edge.
    pub fn new(source: NodeId, target: NodeId, attributes: Attributes) -> Self {
        Self {
            source,
            target,
            attributes,
        }
    }

    /// Endpoints as a `(source, target)` pair.
    pub fn endpoints(&self) -> (NodeId, NodeId) {
        (self.source, self.target)
    }
}

impl Eq for Edge {}

// Canonical ordering: source, then target. Attributes do not participate.
impl PartialOrd for Edge {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Edge {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.endpoints().cmp(&other.endpoints())
    }
}
