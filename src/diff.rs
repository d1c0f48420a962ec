//! Structural diff between two graphs.
//!
//! Graphs are compared by node reference, not by handle, so two graphs in
//! different stores can be diffed. When a graph holds several nodes with the
//! same reference, the one with the lowest handle represents it.
//!
//! [`Graph::diff_graph`] projects the diff into a fresh store for display:
//! every node carries a `diff:<status>` and a `color:<color>` tag, and every
//! edge that changed carries `diff_status` and `color` attributes.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::graph::{Graph, GraphRef};
use crate::store::NodeStore;
use crate::types::{Attributes, Node, NodeId};

/// Category of a node or edge in a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffStatus {
    /// Only in the other graph.
    Added,
    /// Only in this graph.
    Removed,
    /// In both, with different metadata or attributes.
    Modified,
    /// In both and identical.
    Unchanged,
}

impl DiffStatus {
    /// Lowercase name, as used in tags and attributes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Modified => "modified",
            Self::Unchanged => "unchanged",
        }
    }

    /// Suggested display color.
    pub fn color(&self) -> &'static str {
        match self {
            Self::Added => "green",
            Self::Removed => "red",
            Self::Modified => "orange",
            Self::Unchanged => "grey",
        }
    }
}

impl fmt::Display for DiffStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Differences between two graphs, keyed by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphDiff<T> {
    /// References only in the other graph.
    pub added_nodes: BTreeSet<T>,
    /// References only in this graph.
    pub removed_nodes: BTreeSet<T>,
    /// References in both whose tags, duration or status differ.
    pub modified_nodes: BTreeSet<T>,
    /// Internal edges only in the other graph.
    pub added_edges: BTreeSet<(T, T)>,
    /// Internal edges only in this graph.
    pub removed_edges: BTreeSet<(T, T)>,
    /// Internal edges in both with different attributes.
    pub modified_edges: BTreeSet<(T, T)>,
}

impl<T> Default for GraphDiff<T> {
    fn default() -> Self {
        Self {
            added_nodes: BTreeSet::new(),
            removed_nodes: BTreeSet::new(),
            modified_nodes: BTreeSet::new(),
            added_edges: BTreeSet::new(),
            removed_edges: BTreeSet::new(),
            modified_edges: BTreeSet::new(),
        }
    }
}

impl<T: Ord> GraphDiff<T> {
    /// Whether the graphs are structurally identical.
    pub fn is_empty(&self) -> bool {
        self.added_nodes.is_empty()
            && self.removed_nodes.is_empty()
            && self.modified_nodes.is_empty()
            && self.added_edges.is_empty()
            && self.removed_edges.is_empty()
            && self.modified_edges.is_empty()
    }

    /// Category of a node reference. Modification wins over membership.
    pub fn node_status(&self, reference: &T) -> DiffStatus {
        if self.modified_nodes.contains(reference) {
            DiffStatus::Modified
        } else if self.added_nodes.contains(reference) {
            DiffStatus::Added
        } else if self.removed_nodes.contains(reference) {
            DiffStatus::Removed
        } else {
            DiffStatus::Unchanged
        }
    }

    /// Category of an edge given as a `(source, target)` reference pair.
    pub fn edge_status(&self, edge: &(T, T)) -> DiffStatus {
        if self.removed_edges.contains(edge) {
            DiffStatus::Removed
        } else if self.modified_edges.contains(edge) {
            DiffStatus::Modified
        } else if self.added_edges.contains(edge) {
            DiffStatus::Added
        } else {
            DiffStatus::Unchanged
        }
    }
}

impl<T: fmt::Display> fmt::Display for GraphDiff<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for reference in &self.added_nodes {
            writeln!(f, "+ {}", reference)?;
        }
        for reference in &self.removed_nodes {
            writeln!(f, "- {}", reference)?;
        }
        for reference in &self.modified_nodes {
            writeln!(f, "~ {}", reference)?;
        }
        for (source, target) in &self.added_edges {
            writeln!(f, "+ {} -> {}", source, target)?;
        }
        for (source, target) in &self.removed_edges {
            writeln!(f, "- {} -> {}", source, target)?;
        }
        for (source, target) in &self.modified_edges {
            writeln!(f, "~ {} -> {}", source, target)?;
        }
        Ok(())
    }
}

/// A diff rendered as its own graph, in its own store.
#[derive(Debug)]
pub struct DiffProjection<T> {
    /// Store holding the projected nodes.
    pub store: NodeStore<T>,
    /// Graph over every projected node.
    pub graph: Graph<T>,
    /// The diff the projection was built from.
    pub diff: GraphDiff<T>,
}

/// First member per reference, in handle order.
fn index_by_reference<'a, T: Ord + Clone>(
    graph: &'a Graph<T>,
    store: &'a NodeStore<T>,
) -> BTreeMap<T, (NodeId, &'a Node<T>)> {
    let mut index = BTreeMap::new();
    for (id, node) in graph.live_members(store) {
        index.entry(node.reference().clone()).or_insert((id, node));
    }
    index
}

/// Internal edges keyed by reference pair; first occurrence wins.
fn edges_by_reference<'a, T: Ord + Clone>(
    graph: &'a Graph<T>,
    store: &'a NodeStore<T>,
) -> BTreeMap<(T, T), &'a Attributes> {
    let mut edges = BTreeMap::new();
    for (id, node) in graph.live_members(store) {
        for (dependent, attributes) in graph.internal_dependents(store, id) {
            if let Some(target) = store.reference(dependent) {
                edges
                    .entry((node.reference().clone(), target.clone()))
                    .or_insert(attributes);
            }
        }
    }
    edges
}

fn metadata_differs<T>(a: &Node<T>, b: &Node<T>) -> bool {
    a.tags != b.tags || a.duration() != b.duration() || a.status() != b.status()
}

impl<T: Ord + Clone> Graph<T> {
    /// Compare this graph against `other`.
    pub fn diff(&self, store: &NodeStore<T>, other: GraphRef<'_, T>) -> GraphDiff<T> {
        let ours = index_by_reference(self, store);
        let theirs = index_by_reference(other.graph(), other.store());

        let mut diff = GraphDiff::default();
        for (reference, (_, node)) in &ours {
            match theirs.get(reference) {
                None => {
                    diff.removed_nodes.insert(reference.clone());
                }
                Some((_, other_node)) if metadata_differs(node, other_node) => {
                    diff.modified_nodes.insert(reference.clone());
                }
                Some(_) => {}
            }
        }
        for reference in theirs.keys() {
            if !ours.contains_key(reference) {
                diff.added_nodes.insert(reference.clone());
            }
        }

        let our_edges = edges_by_reference(self, store);
        let their_edges = edges_by_reference(other.graph(), other.store());
        for (edge, attributes) in &our_edges {
            match their_edges.get(edge) {
                None => {
                    diff.removed_edges.insert(edge.clone());
                }
                Some(other_attributes) if other_attributes != attributes => {
                    diff.modified_edges.insert(edge.clone());
                }
                Some(_) => {}
            }
        }
        for edge in their_edges.keys() {
            if !our_edges.contains_key(edge) {
                diff.added_edges.insert(edge.clone());
            }
        }

        diff
    }
}

impl<T: Ord + Clone> GraphRef<'_, T> {
    /// Compare against another bound graph.
    pub fn diff(&self, other: GraphRef<'_, T>) -> GraphDiff<T> {
        self.graph().diff(self.store(), other)
    }
}

impl<T: Ord + Clone + fmt::Display> Graph<T> {
    /// Merge this graph and `other` into a new graph annotated with the
    /// diff between them.
    ///
    /// Node copies carry their original metadata plus `diff:<status>` and
    /// `color:<color>` tags. Removed edges keep only the diff annotations;
    /// modified and added edges keep their attributes plus the annotations;
    /// unchanged edges are copied as is.
    pub fn diff_graph(&self, store: &NodeStore<T>, other: GraphRef<'_, T>) -> Result<DiffProjection<T>, GraphError> {
        let diff = self.diff(store, other);
        let mut projected: NodeStore<T> = NodeStore::new();
        let mut merged: BTreeMap<T, NodeId> = BTreeMap::new();

        let sides = [(self, store), (other.graph(), other.store())];
        for (graph, source) in sides {
            for (_, node) in graph.live_members(source) {
                if merged.contains_key(node.reference()) {
                    continue;
                }
                let status = diff.node_status(node.reference());
                let copy = projected.insert_node(node.detached(0));
                projected.add_tag(copy, format!("diff:{}", status))?;
                projected.add_tag(copy, format!("color:{}", status.color()))?;
                merged.insert(node.reference().clone(), copy);
            }
        }

        let mut graph = Graph::from_nodes(&projected, merged.values().copied(), false)?;

        for (edge, attributes) in edges_by_reference(self, store) {
            let status = diff.edge_status(&edge);
            let attributes = match status {
                DiffStatus::Removed => annotate(Attributes::new(), status),
                DiffStatus::Modified => annotate(attributes.clone(), status),
                _ => attributes.clone(),
            };
            link_projected(&mut graph, &mut projected, &merged, &edge, attributes)?;
        }

        for (edge, attributes) in edges_by_reference(other.graph(), other.store()) {
            if diff.added_edges.contains(&edge) {
                let attributes = annotate(attributes.clone(), DiffStatus::Added);
                link_projected(&mut graph, &mut projected, &merged, &edge, attributes)?;
            }
        }

        tracing::debug!(
            nodes = graph.len(),
            changed = !diff.is_empty(),
            "Built diff projection"
        );
        Ok(DiffProjection {
            store: projected,
            graph,
            diff,
        })
    }
}

fn annotate(mut attributes: Attributes, status: DiffStatus) -> Attributes {
    attributes.insert("diff_status", status.as_str());
    attributes.insert("color", status.color());
    attributes
}

fn link_projected<T: Ord + fmt::Display>(
    graph: &mut Graph<T>,
    store: &mut NodeStore<T>,
    merged: &BTreeMap<T, NodeId>,
    edge: &(T, T),
    attributes: Attributes,
) -> Result<(), GraphError> {
    if let (Some(&source), Some(&target)) = (merged.get(&edge.0), merged.get(&edge.1)) {
        graph.add_edge(store, source, target, attributes)?;
    }
    Ok(())
}
