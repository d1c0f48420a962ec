//! Node storage.
//!
//! All nodes live in a single [`NodeStore`] arena and are addressed by
//! generation-checked [`NodeId`](crate::types::NodeId) handles. Nodes point
//! at each other in both directions by construction; the arena owns them all
//! so no node ever owns another.

mod arena;
mod links;

pub use arena::NodeStore;
