//! Generation-checked node arena.

use std::collections::BTreeSet;
use std::fmt;

use crate::error::GraphError;
use crate::types::node::clamp_duration;
use crate::types::{Node, NodeId};

#[derive(Debug, Clone)]
struct Slot<T> {
    generation: u32,
    node: Option<Node<T>>,
}

/// Owner of every node and every edge.
///
/// Graphs are views over a store: they hold handles, never nodes. Each
/// logical change to a node advances the store clock once and stamps the
/// node with the new clock value; graph caches compare those stamps to decide
/// whether they are still fresh. Operations that change nothing leave the
/// clock alone.
#[derive(Debug, Clone)]
pub struct NodeStore<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
    clock: u64,
}

impl<T> Default for NodeStore<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            clock: 0,
        }
    }
}

impl<T> NodeStore<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with room for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether the store holds no live nodes.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Current clock value.
    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Create a node wrapping `reference`.
    pub fn insert(&mut self, reference: T) -> NodeId {
        let id = self.insert_node(Node::new(reference, 0));
        tracing::debug!(node = %id, "Created node");
        id
    }

    /// Place a prepared node in a free slot, stamping it with a new clock.
    pub(crate) fn insert_node(&mut self, mut node: Node<T>) -> NodeId {
        self.clock += 1;
        node.revision = self.clock;
        self.live += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId::new(index, slot.generation);
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId::new(index, 0)
    }

    /// Insert a detached copy of `id`: same reference, tags, duration and
    /// status, no edges.
    pub(crate) fn insert_detached(&mut self, id: NodeId) -> Result<NodeId, GraphError>
    where
        T: Clone,
    {
        let copy = self.try_node(id)?.detached(0);
        Ok(self.insert_node(copy))
    }

    /// Whether `id` resolves to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Resolve a handle.
    pub fn node(&self, id: NodeId) -> Option<&Node<T>> {
        self.slots
            .get(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_ref())
    }

    /// Resolve a handle or fail with [`GraphError::UnknownNode`].
    pub fn try_node(&self, id: NodeId) -> Result<&Node<T>, GraphError> {
        self.node(id).ok_or(GraphError::UnknownNode(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node<T>, GraphError> {
        self.slots
            .get_mut(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_mut())
            .ok_or(GraphError::UnknownNode(id))
    }

    /// The reference wrapped by `id`.
    pub fn reference(&self, id: NodeId) -> Option<&T> {
        self.node(id).map(Node::reference)
    }

    /// Revision stamp of `id`, `None` if the node is gone.
    pub fn revision(&self, id: NodeId) -> Option<u64> {
        self.node(id).map(Node::revision)
    }

    /// Live handles in slot order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.iter().map(|(id, _)| id)
    }

    /// Live nodes in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node<T>)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.node
                .as_ref()
                .map(|node| (NodeId::new(index as u32, slot.generation), node))
        })
    }

    /// Advance the clock and stamp `id` with it.
    pub(crate) fn touch(&mut self, id: NodeId) {
        let next = self.clock + 1;
        if let Ok(node) = self.node_mut(id) {
            node.revision = next;
            self.clock = next;
        }
    }

    /// Remove a node, detaching it from every neighbour first.
    ///
    /// Each neighbour counts as changed, so graph views holding any of them
    /// drop their caches.
    pub fn remove(&mut self, id: NodeId) -> Result<T, GraphError> {
        let (dependencies, dependents) = {
            let node = self.try_node(id)?;
            (node.depends_on(), node.dependents())
        };

        for dependency in dependencies {
            if let Ok(node) = self.node_mut(dependency) {
                node.dependents.remove(&id);
                self.touch(dependency);
            }
        }
        for dependent in dependents {
            if let Ok(node) = self.node_mut(dependent) {
                node.depends_on.remove(&id);
                self.touch(dependent);
            }
        }

        let slot = &mut self.slots[id.index() as usize];
        let node = slot.node.take().ok_or(GraphError::UnknownNode(id))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index());
        self.live -= 1;
        self.clock += 1;

        tracing::debug!(node = %id, "Removed node");
        Ok(node.reference)
    }

    /// Add a tag. Returns whether the tag was new.
    pub fn add_tag(&mut self, id: NodeId, tag: impl Into<String>) -> Result<bool, GraphError> {
        let added = self.node_mut(id)?.tags.insert(tag.into());
        if added {
            self.touch(id);
        }
        Ok(added)
    }

    /// Remove a tag. Returns whether it was present.
    pub fn remove_tag(&mut self, id: NodeId, tag: &str) -> Result<bool, GraphError> {
        let removed = self.node_mut(id)?.tags.remove(tag);
        if removed {
            self.touch(id);
        }
        Ok(removed)
    }

    /// Whether `id` is alive and carries `tag`.
    pub fn is_tagged(&self, id: NodeId, tag: &str) -> bool {
        self.node(id).map_or(false, |node| node.is_tagged(tag))
    }

    /// Set the duration. Negative and NaN values are stored as zero.
    pub fn set_duration(&mut self, id: NodeId, duration: f64) -> Result<(), GraphError> {
        let duration = clamp_duration(duration);
        let node = self.node_mut(id)?;
        if node.duration != duration {
            node.duration = duration;
            self.touch(id);
        }
        Ok(())
    }

    /// Set the status string.
    pub fn set_status(&mut self, id: NodeId, status: impl Into<String>) -> Result<(), GraphError> {
        let status = status.into();
        let node = self.node_mut(id)?;
        if node.status != status {
            node.status = status;
            self.touch(id);
        }
        Ok(())
    }

    /// Snapshot of the dependents of `id`.
    pub fn dependents(&self, id: NodeId) -> Result<BTreeSet<NodeId>, GraphError> {
        Ok(self.try_node(id)?.dependents())
    }

    /// Snapshot of the dependencies of `id`.
    pub fn depends_on(&self, id: NodeId) -> Result<BTreeSet<NodeId>, GraphError> {
        Ok(self.try_node(id)?.depends_on())
    }

    /// Snapshot of the tags of `id`.
    pub fn tags(&self, id: NodeId) -> Result<BTreeSet<String>, GraphError> {
        Ok(self.try_node(id)?.tags())
    }
}

impl<T: fmt::Display> NodeStore<T> {
    /// Render a node for messages: its reference, or the handle if it is gone.
    pub fn label(&self, id: NodeId) -> String {
        match self.node(id) {
            Some(node) => node.reference().to_string(),
            None => id.to_string(),
        }
    }

    pub(crate) fn labels(&self, ids: &[NodeId]) -> Vec<String> {
        ids.iter().map(|id| self.label(*id)).collect()
    }
}
