//! Node handles and node records.
//!
//! A [`Node`] lives inside a [`NodeStore`](crate::store::NodeStore) and is
//! addressed by a [`NodeId`]. Each node keeps both directions of its edges:
//! `depends_on` maps a dependency to the edge attributes, `dependents` maps a
//! dependent to the same attributes. The store keeps the two maps mirrored.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::attributes::Attributes;

/// Status assigned to freshly created nodes.
pub const DEFAULT_STATUS: &str = "pending";

/// Generation-checked handle to a node in a store.
///
/// A handle stays valid until its node is removed. Slots are reused, so a
/// stale handle never resolves to the node that replaced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index inside the store.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Generation of the slot when this handle was issued.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

/// A unit of work in the dependency graph.
#[derive(Debug, Clone)]
pub struct Node<T> {
    pub(crate) reference: T,
    pub(crate) depends_on: BTreeMap<NodeId, Attributes>,
    pub(crate) dependents: BTreeMap<NodeId, Attributes>,
    pub(crate) tags: BTreeSet<String>,
    pub(crate) duration: f64,
    pub(crate) status: String,
    pub(crate) revision: u64,
}

impl<T> Node<T> {
    pub(crate) fn new(reference: T, revision: u64) -> Self {
        Self {
            reference,
            depends_on: BTreeMap::new(),
            dependents: BTreeMap::new(),
            tags: BTreeSet::new(),
            duration: 0.0,
            status: DEFAULT_STATUS.to_string(),
            revision,
        }
    }

    /// Copy of this node with the same reference, tags, duration and status
    /// but no edges.
    pub(crate) fn detached(&self, revision: u64) -> Self
    where
        T: Clone,
    {
        Self {
            reference: self.reference.clone(),
            depends_on: BTreeMap::new(),
            dependents: BTreeMap::new(),
            tags: self.tags.clone(),
            duration: self.duration,
            status: self.status.clone(),
            revision,
        }
    }

    /// The wrapped reference value.
    pub fn reference(&self) -> &T {
        &self.reference
    }

    /// Snapshot of the nodes this node depends on.
    pub fn depends_on(&self) -> BTreeSet<NodeId> {
        self.depends_on.keys().copied().collect()
    }

    /// Snapshot of the nodes depending on this node.
    pub fn dependents(&self) -> BTreeSet<NodeId> {
        self.dependents.keys().copied().collect()
    }

    /// Snapshot of this node's tags.
    pub fn tags(&self) -> BTreeSet<String> {
        self.tags.clone()
    }

    /// Iterate dependencies with their edge attributes, in handle order.
    pub fn iter_depends_on(&self) -> impl Iterator<Item = (NodeId, &Attributes)> {
        self.depends_on.iter().map(|(id, attrs)| (*id, attrs))
    }

    /// Iterate dependents with their edge attributes, in handle order.
    pub fn iter_dependents(&self) -> impl Iterator<Item = (NodeId, &Attributes)> {
        self.dependents.iter().map(|(id, attrs)| (*id, attrs))
    }

    /// Iterate tags in sorted order.
    pub fn iter_tags(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    /// Whether the node carries `tag`.
    pub fn is_tagged(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Whether `id` is a direct dependent.
    pub fn has_dependent(&self, id: NodeId) -> bool {
        self.dependents.contains_key(&id)
    }

    /// Number of direct dependents.
    pub fn dependent_count(&self) -> usize {
        self.dependents.len()
    }

    /// Estimated duration, never negative.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Free-form status string.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Store clock value at this node's last change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn neighbors(&self, direction: super::Direction) -> Vec<NodeId> {
        match direction {
            super::Direction::Up => self.depends_on.keys().copied().collect(),
            super::Direction::Down => self.dependents.keys().copied().collect(),
        }
    }
}

/// Clamp a duration into the valid range: negative and NaN become zero.
pub(crate) fn clamp_duration(duration: f64) -> f64 {
    if duration.is_nan() {
        0.0
    } else {
        duration.max(0.0)
    }
}
