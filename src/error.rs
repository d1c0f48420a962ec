//! Error types for the DAG kernel.
//!
//! Construction of a graph can only ever fail with [`GraphError::Cycle`] or
//! [`GraphError::Consistency`]. The remaining variants come from lookups and
//! from handing the kernel a handle it does not know.

use crate::types::NodeId;

/// Error type for node and graph operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// An operation would create, or found, a directed cycle.
    ///
    /// `cycle` is ordered along the dependents direction and ends on the node
    /// it starts from, so walking it returns to the start.
    #[error("{message}")]
    Cycle {
        /// Human readable description including the rendered cycle.
        message: String,
        /// The offending cycle.
        cycle: Vec<NodeId>,
    },

    /// Bidirectional edge bookkeeping is broken.
    #[error("Consistency violation: {0}")]
    Consistency(String),

    /// Reference-based lookup found nothing.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The handle does not resolve to a live node in the store.
    #[error("Unknown node handle: {0}")]
    UnknownNode(NodeId),

    /// The node is alive but not a member of the graph being queried.
    #[error("Node {0} is not a member of this graph")]
    NotMember(NodeId),

    /// No edge exists between the two nodes, in either direction.
    #[error("No edge between '{a}' and '{b}'")]
    NoEdge {
        /// First endpoint, rendered.
        a: String,
        /// Second endpoint, rendered.
        b: String,
    },
}

impl GraphError {
    /// Build a cycle error, rendering the cycle with the supplied labels.
    pub fn cycle(context: impl Into<String>, cycle: Vec<NodeId>, labels: &[String]) -> Self {
        let message = format!("{}: {}", context.into(), labels.join(" -> "));
        Self::Cycle { message, cycle }
    }

    /// The offending cycle, if this is a cycle error.
    pub fn cycle_nodes(&self) -> Option<&[NodeId]> {
        match self {
            Self::Cycle { cycle, .. } => Some(cycle),
            _ => None,
        }
    }

    /// Whether this is a cycle error.
    pub fn is_cycle(&self) -> bool {
        matches!(self, Self::Cycle { .. })
    }

    /// Whether this is a consistency error.
    pub fn is_consistency(&self) -> bool {
        matches!(self, Self::Consistency(_))
    }
}
