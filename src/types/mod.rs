//! Core types for the DAG kernel.

pub mod attributes;
pub mod edge;
pub mod node;

pub use attributes::{render_value, Attributes};
pub use edge::{Direction, Edge};
pub use node::{Node, NodeId, DEFAULT_STATUS};
