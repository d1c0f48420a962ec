//! Graph views over a node store.
//!
//! A [`Graph`] is a set of member handles plus a cache of derived results.
//! It never owns nodes: every method takes the [`NodeStore`] it views, `&`
//! for queries and `&mut` for mutations. Several graphs may share nodes; a
//! change made through any of them (or directly on the store) is visible to
//! all, and each graph notices on its next query that its cache is stale.
//!
//! ## Scope
//!
//! Nodes may have edges to nodes outside the graph. Graph-scoped results
//! (sources, sinks, topological orders, layers, CPM, checksum, reductions)
//! only see edges whose endpoints are both members. Ancestors, descendants
//! and unrestricted walks follow every edge.
//!
//! ## Invariants
//!
//! Construction and [`Graph::add_node`] reject nodes that sit on a cycle or
//! whose edge maps disagree with their neighbours. [`Graph::add_edge`]
//! refuses self-loops and edges that would close a cycle.

mod cache;
mod order;
mod paths;
mod transform;

pub use transform::Copied;

use std::collections::BTreeSet;
use std::fmt;
use std::marker::PhantomData;

use parking_lot::RwLock;

use crate::error::GraphError;
use crate::store::NodeStore;
use crate::traverse::{Bfs, Dfs, Scope};
use crate::types::{Attributes, Direction, Edge, Node, NodeId};

use cache::GraphCache;

/// A view over a subset of a store's nodes.
pub struct Graph<T> {
    members: BTreeSet<NodeId>,
    cache: RwLock<GraphCache>,
    _reference: PhantomData<fn() -> T>,
}

impl<T> Default for Graph<T> {
    fn default() -> Self {
        Self {
            members: BTreeSet::new(),
            cache: RwLock::new(GraphCache::default()),
            _reference: PhantomData,
        }
    }
}

/// Another view over the same nodes. The copy starts with an empty cache.
impl<T> Clone for Graph<T> {
    fn clone(&self) -> Self {
        Self {
            members: self.members.clone(),
            cache: RwLock::new(GraphCache::default()),
            _reference: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Graph<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("members", &self.members)
            .finish_non_exhaustive()
    }
}

impl<T> Graph<T> {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair this graph with its store for whole-graph comparisons.
    pub fn bind<'a>(&'a self, store: &'a NodeStore<T>) -> GraphRef<'a, T> {
        GraphRef { graph: self, store }
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the graph has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether `id` is a member.
    pub fn contains(&self, id: NodeId) -> bool {
        self.members.contains(&id)
    }

    /// Member handles in handle order.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.members.iter().copied()
    }

    /// The member set.
    pub fn members(&self) -> &BTreeSet<NodeId> {
        &self.members
    }

    /// Members still alive in `store`.
    pub(crate) fn live_members<'a>(&'a self, store: &'a NodeStore<T>) -> impl Iterator<Item = (NodeId, &'a Node<T>)> + 'a {
        self.members
            .iter()
            .filter_map(move |id| store.node(*id).map(|node| (*id, node)))
    }

    /// Drop members whose nodes were removed from the store. Returns how
    /// many were dropped.
    pub fn prune(&mut self, store: &NodeStore<T>) -> usize {
        let before = self.members.len();
        self.members.retain(|id| store.contains(*id));
        let dropped = before - self.members.len();
        if dropped > 0 {
            self.invalidate();
        }
        dropped
    }

    /// Whether a cached result exists and is still valid for `store`.
    pub fn has_fresh_cache(&self, store: &NodeStore<T>) -> bool {
        let cache = self.cache.read();
        !cache.is_empty() && cache.is_fresh(&self.members, store)
    }

    fn invalidate(&mut self) {
        self.cache.get_mut().clear();
    }

    /// Return a cached value, or compute and cache it.
    pub(crate) fn cached<R: Clone, E>(
        &self,
        store: &NodeStore<T>,
        read: impl Fn(&GraphCache) -> Option<R>,
        compute: impl FnOnce() -> Result<R, E>,
        write: impl FnOnce(&mut GraphCache, R),
    ) -> Result<R, E> {
        {
            let cache = self.cache.read();
            if cache.is_fresh(&self.members, store) {
                if let Some(value) = read(&cache) {
                    return Ok(value);
                }
            }
        }

        let value = compute()?;
        let mut cache = self.cache.write();
        cache.refresh(&self.members, store);
        write(&mut cache, value.clone());
        Ok(value)
    }

    /// Neighbours of `id` inside this graph with their edge attributes.
    pub fn neighbors<'a>(
        &'a self,
        store: &'a NodeStore<T>,
        id: NodeId,
        direction: Direction,
    ) -> impl Iterator<Item = (NodeId, &'a Attributes)> + 'a {
        let node = store.node(id);
        let edges: Box<dyn Iterator<Item = (NodeId, &'a Attributes)> + 'a> = match (node, direction) {
            (Some(node), Direction::Down) => Box::new(node.iter_dependents()),
            (Some(node), Direction::Up) => Box::new(node.iter_depends_on()),
            (None, _) => Box::new(std::iter::empty()),
        };
        edges.filter(move |(neighbor, _)| self.members.contains(neighbor))
    }

    /// Dependents of `id` inside this graph.
    pub fn internal_dependents<'a>(
        &'a self,
        store: &'a NodeStore<T>,
        id: NodeId,
    ) -> impl Iterator<Item = (NodeId, &'a Attributes)> + 'a {
        self.neighbors(store, id, Direction::Down)
    }

    /// Dependencies of `id` inside this graph.
    pub fn internal_depends_on<'a>(
        &'a self,
        store: &'a NodeStore<T>,
        id: NodeId,
    ) -> impl Iterator<Item = (NodeId, &'a Attributes)> + 'a {
        self.neighbors(store, id, Direction::Up)
    }

    /// Edges whose endpoints are both members, in `(source, target)` order.
    pub fn edges(&self, store: &NodeStore<T>) -> Vec<Edge> {
        let members = &self.members;
        self.live_members(store)
            .flat_map(move |(id, node)| {
                node.iter_dependents()
                    .filter(move |(dependent, _)| members.contains(dependent))
                    .map(move |(dependent, attributes)| Edge::new(id, dependent, attributes.clone()))
            })
            .collect()
    }

    /// Number of internal edges.
    pub fn edge_count(&self, store: &NodeStore<T>) -> usize {
        self.live_members(store)
            .map(|(_, node)| {
                node.iter_dependents()
                    .filter(|(dependent, _)| self.members.contains(dependent))
                    .count()
            })
            .sum()
    }

    /// Members with no dependencies inside the graph.
    pub fn sources(&self, store: &NodeStore<T>) -> Vec<NodeId> {
        self.live_members(store)
            .filter(|(id, _)| self.internal_depends_on(store, *id).next().is_none())
            .map(|(id, _)| id)
            .collect()
    }

    /// Members with no dependents inside the graph.
    pub fn sinks(&self, store: &NodeStore<T>) -> Vec<NodeId> {
        self.live_members(store)
            .filter(|(id, _)| self.internal_dependents(store, *id).next().is_none())
            .map(|(id, _)| id)
            .collect()
    }

    /// Transitive dependencies of `id`, not limited to this graph.
    pub fn ancestors<'a>(&'a self, store: &'a NodeStore<T>, id: NodeId) -> Dfs<'a, T> {
        store.ancestors(id)
    }

    /// Transitive dependents of `id`, not limited to this graph.
    pub fn descendants<'a>(&'a self, store: &'a NodeStore<T>, id: NodeId) -> Dfs<'a, T> {
        store.descendants(id)
    }

    /// Breadth-first walk from `start`, which comes first.
    ///
    /// With `limit_to_graph`, the walk never leaves the member set and yields
    /// nothing at all if `start` is not a member.
    pub fn bfs<'a>(
        &'a self,
        store: &'a NodeStore<T>,
        start: NodeId,
        direction: Direction,
        limit_to_graph: bool,
    ) -> Bfs<'a, T> {
        Bfs::new(store, start, direction, self.scope(limit_to_graph))
    }

    /// Depth-first pre-order walk from `start`.
    ///
    /// With `limit_to_graph`, only members are yielded; `start` is skipped if
    /// it is not a member, but its neighbours are still explored.
    pub fn dfs<'a>(
        &'a self,
        store: &'a NodeStore<T>,
        start: NodeId,
        direction: Direction,
        limit_to_graph: bool,
    ) -> Dfs<'a, T> {
        Dfs::new(store, start, direction, self.scope(limit_to_graph), true)
    }

    fn scope(&self, limit_to_graph: bool) -> Scope<'_> {
        if limit_to_graph {
            Scope::Members(&self.members)
        } else {
            Scope::Unrestricted
        }
    }

    /// Whether any member wraps `reference`.
    pub fn contains_reference(&self, store: &NodeStore<T>, reference: &T) -> bool
    where
        T: PartialEq,
    {
        self.live_members(store)
            .any(|(_, node)| node.reference() == reference)
    }

    /// Remove the edge `dependency -> dependent` if both are members.
    /// Returns whether an edge was removed.
    pub fn remove_edge(
        &mut self,
        store: &mut NodeStore<T>,
        dependency: NodeId,
        dependent: NodeId,
    ) -> Result<bool, GraphError> {
        if !self.contains(dependency) || !self.contains(dependent) {
            return Ok(false);
        }
        let removed = store.unlink(dependency, dependent)?;
        if removed {
            tracing::debug!(dependency = %dependency, dependent = %dependent, "Removed edge");
            self.invalidate();
        }
        Ok(removed)
    }

    /// Detach `id` from all its neighbours and drop it from the graph.
    ///
    /// The node itself stays in the store, edgeless. Returns whether `id`
    /// was a member.
    pub fn remove_node(&mut self, store: &mut NodeStore<T>, id: NodeId) -> Result<bool, GraphError> {
        if !self.contains(id) {
            return Ok(false);
        }
        if let Some(node) = store.node(id) {
            let dependencies = node.depends_on();
            let dependents = node.dependents();
            for dependency in dependencies {
                store.unlink(dependency, id)?;
            }
            for dependent in dependents {
                store.unlink(id, dependent)?;
            }
        }
        self.members.remove(&id);
        tracing::debug!(node = %id, "Removed node from graph");
        self.invalidate();
        Ok(true)
    }
}

impl<T: fmt::Display> Graph<T> {
    /// Build a graph from existing nodes.
    ///
    /// With `discover`, every ancestor and descendant of the given nodes is
    /// pulled in as well. The result is checked for consistency and cycles.
    pub fn from_nodes(
        store: &NodeStore<T>,
        nodes: impl IntoIterator<Item = NodeId>,
        discover: bool,
    ) -> Result<Self, GraphError> {
        let mut graph = Self::new();
        for id in nodes {
            graph.add_node(store, id)?;
        }
        if discover {
            graph.discover(store)?;
        }
        graph.check_consistency(store)?;
        graph.check_cycles(store)?;
        Ok(graph)
    }

    /// Member wrapping `reference`.
    pub fn get(&self, store: &NodeStore<T>, reference: &T) -> Result<NodeId, GraphError>
    where
        T: PartialEq,
    {
        self.live_members(store)
            .find(|(_, node)| node.reference() == reference)
            .map(|(id, _)| id)
            .ok_or_else(|| GraphError::NotFound(format!("No node found with reference: {}", reference)))
    }

    /// Add an existing node to the graph.
    ///
    /// Returns `false` if it was already a member. Fails if the node lies on
    /// a cycle or its edges disagree with its neighbours.
    pub fn add_node(&mut self, store: &NodeStore<T>, id: NodeId) -> Result<bool, GraphError> {
        if self.contains(id) {
            return Ok(false);
        }
        store.try_node(id)?;

        if let Some(cycle) = store.find_path(id, id) {
            let labels = store.labels(&cycle);
            tracing::error!(cycle = %labels.join(" -> "), "Node is part of an existing cycle");
            return Err(GraphError::cycle(
                format!("Node '{}' is part of an existing cycle", store.label(id)),
                cycle,
                &labels,
            ));
        }

        self.check_node_consistency(store, id)?;
        self.members.insert(id);
        tracing::debug!(node = %store.label(id), "Added node");
        self.invalidate();
        Ok(true)
    }

    /// Add the edge `dependency -> dependent`, adding both endpoints as
    /// members.
    ///
    /// Fails on self-loops and on edges that would close a cycle. Re-adding
    /// an existing edge replaces its attributes.
    pub fn add_edge(
        &mut self,
        store: &mut NodeStore<T>,
        dependency: NodeId,
        dependent: NodeId,
        attributes: Attributes,
    ) -> Result<(), GraphError> {
        store.try_node(dependency)?;
        store.try_node(dependent)?;

        if dependency == dependent {
            let cycle = vec![dependency, dependency];
            let labels = store.labels(&cycle);
            return Err(GraphError::cycle(
                format!(
                    "Self-loop detected: node '{}' cannot depend on itself",
                    store.label(dependency)
                ),
                cycle,
                &labels,
            ));
        }

        if let Some(mut cycle) = store.find_path(dependent, dependency) {
            cycle.push(dependent);
            let labels = store.labels(&cycle);
            tracing::error!(cycle = %labels.join(" -> "), "Cycle detected");
            return Err(GraphError::cycle(
                format!(
                    "Adding edge '{}' -> '{}' would create a cycle",
                    store.label(dependency),
                    store.label(dependent)
                ),
                cycle,
                &labels,
            ));
        }

        self.add_node(store, dependency)?;
        self.add_node(store, dependent)?;

        tracing::debug!(
            dependency = %store.label(dependency),
            dependent = %store.label(dependent),
            attributes = %attributes,
            "Added edge"
        );
        store.link(dependency, dependent, attributes)?;
        self.invalidate();
        Ok(())
    }

    /// Pull every ancestor and descendant of the current members into the
    /// graph. Returns how many nodes were added.
    pub fn discover(&mut self, store: &NodeStore<T>) -> Result<usize, GraphError> {
        tracing::debug!(base = self.members.len(), "Discovering reachable nodes");
        let mut found: BTreeSet<NodeId> = BTreeSet::new();
        for id in self.members.iter().copied() {
            found.extend(store.ancestors(id));
            found.extend(store.descendants(id));
        }

        let mut added = 0;
        for id in found {
            if self.add_node(store, id)? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Verify that every member's edge maps agree with its neighbours.
    pub fn check_consistency(&self, store: &NodeStore<T>) -> Result<(), GraphError> {
        for id in self.members.iter().copied() {
            self.check_node_consistency(store, id)?;
        }
        Ok(())
    }

    fn check_node_consistency(&self, store: &NodeStore<T>, id: NodeId) -> Result<(), GraphError> {
        let node = store.try_node(id)?;
        let name = node.reference().to_string();

        for (dependency, attributes) in node.iter_depends_on() {
            let Some(other) = store.node(dependency) else {
                return Err(GraphError::Consistency(format!(
                    "Node '{}' depends on {}, which no longer exists",
                    name, dependency
                )));
            };
            match other.dependents.get(&id) {
                None => {
                    return Err(GraphError::Consistency(format!(
                        "Node '{}' depends on '{}', but '{}' does not list '{}' as a dependent",
                        name,
                        other.reference(),
                        other.reference(),
                        name
                    )))
                }
                Some(mirrored) if mirrored != attributes => {
                    return Err(GraphError::Consistency(format!(
                        "Edge '{}' -> '{}' carries different attributes on each endpoint",
                        other.reference(),
                        name
                    )))
                }
                Some(_) => {}
            }
        }

        for (dependent, attributes) in node.iter_dependents() {
            let Some(other) = store.node(dependent) else {
                return Err(GraphError::Consistency(format!(
                    "Node '{}' has dependent {}, which no longer exists",
                    name, dependent
                )));
            };
            match other.depends_on.get(&id) {
                None => {
                    return Err(GraphError::Consistency(format!(
                        "Node '{}' has dependent '{}', but '{}' does not depend on '{}'",
                        name,
                        other.reference(),
                        other.reference(),
                        name
                    )))
                }
                Some(mirrored) if mirrored != attributes => {
                    return Err(GraphError::Consistency(format!(
                        "Edge '{}' -> '{}' carries different attributes on each endpoint",
                        name,
                        other.reference()
                    )))
                }
                Some(_) => {}
            }
        }

        Ok(())
    }
}

/// A graph paired with its store.
///
/// Two bound graphs compare equal when their checksums match, regardless of
/// which store they live in.
#[derive(Debug)]
pub struct GraphRef<'a, T> {
    graph: &'a Graph<T>,
    store: &'a NodeStore<T>,
}

impl<T> Clone for GraphRef<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for GraphRef<'_, T> {}

impl<'a, T> GraphRef<'a, T> {
    /// The graph view.
    pub fn graph(&self) -> &'a Graph<T> {
        self.graph
    }

    /// The store behind it.
    pub fn store(&self) -> &'a NodeStore<T> {
        self.store
    }
}

impl<T: fmt::Display> PartialEq for GraphRef<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        self.graph.is_equal_to(self.store, *other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store_with(names: &[&'static str]) -> (NodeStore<&'static str>, Vec<NodeId>) {
        let mut store = NodeStore::new();
        let ids = names.iter().map(|name| store.insert(*name)).collect();
        (store, ids)
    }

    #[test]
    fn test_add_edge_adds_members() {
        let (mut store, ids) = store_with(&["A", "B"]);
        let mut graph = Graph::new();
        graph
            .add_edge(&mut store, ids[0], ids[1], Attributes::new().with("label", "x"))
            .unwrap();

        assert_eq!(graph.len(), 2);
        assert!(store.has_edge(ids[0], ids[1]));
        assert_eq!(
            store.edge_attributes(ids[1], ids[0]).unwrap().get("label"),
            Some(&json!("x"))
        );
    }

    #[test]
    fn test_add_edge_rejects_self_loop() {
        let (mut store, ids) = store_with(&["A"]);
        let mut graph = Graph::new();
        let err = graph
            .add_edge(&mut store, ids[0], ids[0], Attributes::new())
            .unwrap_err();
        assert_eq!(err.cycle_nodes(), Some(&[ids[0], ids[0]][..]));
        assert!(graph.is_empty());
    }

    #[test]
    fn test_add_edge_rejects_cycle() {
        let (mut store, ids) = store_with(&["A", "B", "C"]);
        let (a, b, c) = (ids[0], ids[1], ids[2]);
        let mut graph = Graph::new();
        graph.add_edge(&mut store, a, b, Attributes::new()).unwrap();
        graph.add_edge(&mut store, b, c, Attributes::new()).unwrap();

        let err = graph.add_edge(&mut store, c, a, Attributes::new()).unwrap_err();
        let cycle = err.cycle_nodes().unwrap();
        assert_eq!(cycle, &[a, b, c, a]);
        assert_eq!(cycle.first(), cycle.last());
        assert!(!store.has_edge(c, a));
    }

    #[test]
    fn test_add_node_is_idempotent() {
        let (store, ids) = store_with(&["A"]);
        let mut graph = Graph::new();
        assert!(graph.add_node(&store, ids[0]).unwrap());
        assert!(!graph.add_node(&store, ids[0]).unwrap());
    }

    #[test]
    fn test_add_node_rejects_node_on_cycle() {
        let (mut store, ids) = store_with(&["A", "B"]);
        store.requires(ids[1], ids[0], false).unwrap();
        store.requires(ids[0], ids[1], false).unwrap();

        let mut graph = Graph::new();
        let err = graph.add_node(&store, ids[0]).unwrap_err();
        assert_eq!(err.cycle_nodes(), Some(&[ids[0], ids[1], ids[0]][..]));
    }

    #[test]
    fn test_add_node_rejects_unchecked_self_loop() {
        let (mut store, ids) = store_with(&["A"]);
        store.requires(ids[0], ids[0], false).unwrap();
        let mut graph = Graph::new();
        assert!(graph.add_node(&store, ids[0]).unwrap_err().is_cycle());
    }

    #[test]
    fn test_inconsistent_node_rejected() {
        let (mut store, ids) = store_with(&["A", "B"]);
        store.requires(ids[1], ids[0], false).unwrap();
        // Break one side of the mirror directly.
        store.node_mut(ids[0]).unwrap().dependents.clear();

        let mut graph = Graph::new();
        let err = graph.add_node(&store, ids[1]).unwrap_err();
        assert!(err.is_consistency());
    }

    #[test]
    fn test_mismatched_attributes_rejected() {
        let (mut store, ids) = store_with(&["A", "B"]);
        store.requires(ids[1], ids[0], false).unwrap();
        store
            .node_mut(ids[0])
            .unwrap()
            .dependents
            .insert(ids[1], Attributes::new().with("weight", 9));

        assert!(Graph::from_nodes(&store, [ids[0]], false).unwrap_err().is_consistency());
    }

    #[test]
    fn test_from_nodes_with_discover() {
        let (mut store, ids) = store_with(&["A", "B", "C", "D"]);
        store.requires(ids[1], ids[0], false).unwrap();
        store.requires(ids[2], ids[1], false).unwrap();

        let graph = Graph::from_nodes(&store, [ids[1]], true).unwrap();
        assert_eq!(graph.len(), 3);
        assert!(!graph.contains(ids[3]));

        let plain = Graph::from_nodes(&store, [ids[1]], false).unwrap();
        assert_eq!(plain.len(), 1);
    }

    #[test]
    fn test_external_edges_ignored_for_sources_and_sinks() {
        let (mut store, ids) = store_with(&["X", "A", "B"]);
        let (x, a, b) = (ids[0], ids[1], ids[2]);
        store.provides_to(x, a, false).unwrap();
        store.provides_to(a, b, false).unwrap();

        let graph = Graph::from_nodes(&store, [a, b], false).unwrap();
        assert_eq!(graph.sources(&store), vec![a]);
        assert_eq!(graph.sinks(&store), vec![b]);
        assert_eq!(graph.edge_count(&store), 1);

        // Unrestricted walks still leave the graph.
        assert_eq!(graph.ancestors(&store, b).collect::<Vec<_>>(), vec![a, x]);
        assert_eq!(graph.bfs(&store, b, Direction::Up, true).collect::<Vec<_>>(), vec![b, a]);
        assert_eq!(
            graph.bfs(&store, b, Direction::Up, false).collect::<Vec<_>>(),
            vec![b, a, x]
        );
        assert_eq!(graph.bfs(&store, x, Direction::Down, true).count(), 0);
    }

    #[test]
    fn test_get_by_reference() {
        let (store, ids) = store_with(&["A", "B"]);
        let graph = Graph::from_nodes(&store, ids.clone(), false).unwrap();
        assert_eq!(graph.get(&store, &"B").unwrap(), ids[1]);
        assert!(graph.contains_reference(&store, &"A"));
        assert!(matches!(graph.get(&store, &"Z"), Err(GraphError::NotFound(_))));
    }

    #[test]
    fn test_remove_node_detaches_but_keeps_store_entry() {
        let (mut store, ids) = store_with(&["A", "B", "C"]);
        let mut graph = Graph::new();
        graph.add_edge(&mut store, ids[0], ids[1], Attributes::new()).unwrap();
        graph.add_edge(&mut store, ids[1], ids[2], Attributes::new()).unwrap();

        assert!(graph.remove_node(&mut store, ids[1]).unwrap());
        assert!(!graph.contains(ids[1]));
        assert!(store.contains(ids[1]));
        assert!(store.dependents(ids[0]).unwrap().is_empty());
        assert!(store.depends_on(ids[2]).unwrap().is_empty());
        assert!(graph.check_consistency(&store).is_ok());
        assert!(!graph.remove_node(&mut store, ids[1]).unwrap());
    }

    #[test]
    fn test_remove_edge_requires_membership() {
        let (mut store, ids) = store_with(&["A", "B"]);
        store.provides_to(ids[0], ids[1], false).unwrap();

        let mut graph = Graph::from_nodes(&store, [ids[0]], false).unwrap();
        assert!(!graph.remove_edge(&mut store, ids[0], ids[1]).unwrap());
        assert!(store.has_edge(ids[0], ids[1]));

        graph.add_node(&store, ids[1]).unwrap();
        assert!(graph.remove_edge(&mut store, ids[0], ids[1]).unwrap());
        assert!(!store.has_edge(ids[0], ids[1]));
    }

    #[test]
    fn test_prune_drops_removed_nodes() {
        let (mut store, ids) = store_with(&["A", "B"]);
        let mut graph = Graph::from_nodes(&store, ids.clone(), false).unwrap();
        store.remove(ids[0]).unwrap();

        assert_eq!(graph.prune(&store), 1);
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_clone_is_view_over_same_nodes() {
        let (mut store, ids) = store_with(&["A", "B"]);
        let mut graph = Graph::new();
        graph.add_edge(&mut store, ids[0], ids[1], Attributes::new()).unwrap();
        graph.topological_order(&store).unwrap();

        let view = graph.clone();
        assert_eq!(view.members(), graph.members());
        assert!(!view.has_fresh_cache(&store));
    }
}
