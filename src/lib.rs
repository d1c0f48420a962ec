//! # dag-kernel
//!
//! Mutable dependency DAGs with deterministic checksums.
//!
//! The kernel answers questions about a set of tasks and the dependencies
//! between them:
//!
//! > In what order can these run, which of them could run together, and
//! > which ones decide when the whole thing finishes?
//!
//! ## Core Contract
//!
//! 1. Nodes live in a [`NodeStore`] and are addressed by generation-checked
//!    [`NodeId`] handles; edges are mirrored on both endpoints
//! 2. A [`Graph`] is a view over some of those nodes, with cached orders and
//!    a cached checksum that go stale as soon as a member changes
//! 3. No operation through the graph API can introduce a cycle
//!
//! ## Architecture
//!
//! ```text
//! NodeStore (arena, revision clock)
//!     ↓ handles
//! Graph views → topological order / layers / CPM / checksum / diff
//!     ↓
//! GraphDocument (JSON, embedded checksum)
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Orders break ties by handle, so the same build sequence gives the same
//!   order every time
//! - Checksums depend only on references, metadata and internal edges, never
//!   on insertion order
//!
//! ## Example
//!
//! ```
//! use dag_kernel::{Attributes, Graph, NodeStore};
//!
//! let mut store = NodeStore::new();
//! let fetch = store.insert("fetch");
//! let build = store.insert("build");
//! store.set_duration(fetch, 2.0).unwrap();
//! store.set_duration(build, 3.0).unwrap();
//!
//! let mut graph = Graph::new();
//! graph.add_edge(&mut store, fetch, build, Attributes::new()).unwrap();
//!
//! assert_eq!(graph.topological_order(&store).unwrap(), vec![fetch, build]);
//! assert_eq!(graph.project_duration(&store).unwrap(), 5.0);
//! assert!(graph.add_edge(&mut store, build, fetch, Attributes::new()).is_err());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;
pub mod store;
pub mod traverse;
pub mod graph;
pub mod checksum;
pub mod cpm;
pub mod diff;
pub mod style;
pub mod document;

// Re-exports
pub use error::GraphError;
pub use types::{render_value, Attributes, Direction, Edge, Node, NodeId, DEFAULT_STATUS};
pub use store::NodeStore;
pub use traverse::{Bfs, Dfs};
pub use graph::{Copied, Graph, GraphRef};
pub use checksum::{
    compute_checksum, extract_checksum, format_duration, read_checksum,
    wrap_with_checksum, ChecksumValidation, CHECKSUM_ALGORITHM,
};
pub use cpm::{CpmAnalysis, CpmEntry, CpmOptions, DEFAULT_SLACK_TOLERANCE};
pub use diff::{DiffProjection, DiffStatus, GraphDiff};
pub use style::{EdgeStyler, NodeLabeler, PlainEdgeStyler, ReferenceLabeler, TagColorStyler};
pub use document::{DocumentError, EdgeRecord, GraphDocument, LoadedGraph, NodeRecord, Source};
