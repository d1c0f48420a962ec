//! Structural transforms and subgraph extraction.
//!
//! Clones, reductions and closures copy member nodes into the same store and
//! return a graph over the copies; the source graph and its nodes are never
//! touched. Subgraphs are plain views over the existing nodes.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::Graph;
use crate::error::GraphError;
use crate::store::NodeStore;
use crate::types::{Attributes, Node, NodeId};

/// A graph over copied nodes, plus the handle mapping from source members to
/// their copies.
#[derive(Debug, Clone)]
pub struct Copied<T> {
    /// The new graph.
    pub graph: Graph<T>,
    /// Source member handle to copy handle.
    pub mapping: BTreeMap<NodeId, NodeId>,
}

impl<T: Clone + fmt::Display> Graph<T> {
    /// Copy every member into `store` with its tags, duration and status.
    ///
    /// With `include_edges`, internal edges are copied too, attributes
    /// included. The copies share no state with the originals.
    pub fn clone_nodes(&self, store: &mut NodeStore<T>, include_edges: bool) -> Result<Copied<T>, GraphError> {
        tracing::debug!(include_edges, "Cloning graph");
        let edges = if include_edges {
            self.edges(store)
                .into_iter()
                .map(|edge| (edge.source, edge.target, edge.attributes))
                .collect()
        } else {
            Vec::new()
        };
        self.rebuild(store, edges)
    }

    /// Same members and reachability with the fewest edges.
    ///
    /// An internal edge `u -> v` is dropped when another internal dependent
    /// of `u` already reaches `v` inside the graph. Kept edges keep their
    /// attributes.
    pub fn transitive_reduction(&self, store: &mut NodeStore<T>) -> Result<Copied<T>, GraphError> {
        let order = self.topological_order(store)?;

        // Member-restricted reachability, built sinks first.
        let mut reach: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();
        for id in order.iter().rev() {
            let mut reachable = BTreeSet::new();
            for (dependent, _) in self.internal_dependents(store, *id) {
                reachable.insert(dependent);
                if let Some(further) = reach.get(&dependent) {
                    reachable.extend(further.iter().copied());
                }
            }
            reach.insert(*id, reachable);
        }

        let mut kept = Vec::new();
        let mut removed = 0usize;
        for id in &order {
            let dependents: Vec<(NodeId, &Attributes)> = self.internal_dependents(store, *id).collect();
            for (target, attributes) in &dependents {
                let redundant = dependents.iter().any(|(other, _)| {
                    other != target && reach.get(other).map_or(false, |r| r.contains(target))
                });
                if redundant {
                    removed += 1;
                } else {
                    kept.push((*id, *target, (*attributes).clone()));
                }
            }
        }

        let copied = self.rebuild(store, kept)?;
        tracing::info!(removed, "Transitive reduction complete");
        Ok(copied)
    }

    /// Same members with a direct edge from every node to each member it
    /// reaches. Closure edges carry no attributes.
    pub fn transitive_closure(&self, store: &mut NodeStore<T>) -> Result<Copied<T>, GraphError> {
        tracing::debug!("Calculating transitive closure");
        self.check_cycles(store)?;

        let mut edges = Vec::new();
        for (id, _) in self.live_members(store) {
            for descendant in store.descendants(id) {
                if self.contains(descendant) {
                    edges.push((id, descendant, Attributes::new()));
                }
            }
        }
        self.rebuild(store, edges)
    }

    fn rebuild(
        &self,
        store: &mut NodeStore<T>,
        edges: Vec<(NodeId, NodeId, Attributes)>,
    ) -> Result<Copied<T>, GraphError> {
        let sources: Vec<NodeId> = self.live_members(store).map(|(id, _)| id).collect();

        let mut mapping = BTreeMap::new();
        let mut graph = Graph::new();
        for id in sources {
            let copy = store.insert_detached(id)?;
            graph.add_node(store, copy)?;
            mapping.insert(id, copy);
        }

        for (source, target, attributes) in edges {
            if let (Some(&u), Some(&v)) = (mapping.get(&source), mapping.get(&target)) {
                graph.add_edge(store, u, v, attributes)?;
            }
        }

        Ok(Copied { graph, mapping })
    }
}

impl<T: fmt::Display> Graph<T> {
    /// Members matching `predicate`, plus everything connected to them.
    ///
    /// Connectivity is rediscovered from the survivors in both directions
    /// and is not limited to this graph.
    pub fn subgraph_filtered(
        &self,
        store: &NodeStore<T>,
        predicate: impl Fn(&Node<T>) -> bool,
    ) -> Result<Graph<T>, GraphError> {
        tracing::debug!("Creating filtered subgraph");
        let survivors: Vec<NodeId> = self
            .live_members(store)
            .filter(|(_, node)| predicate(node))
            .map(|(id, _)| id)
            .collect();
        Graph::from_nodes(store, survivors, true)
    }

    /// Members carrying `tag`, plus everything connected to them.
    pub fn subgraph_tagged(&self, store: &NodeStore<T>, tag: &str) -> Result<Graph<T>, GraphError> {
        tracing::debug!(tag, "Creating tagged subgraph");
        self.subgraph_filtered(store, |node| node.is_tagged(tag))
    }

    /// `id` and all of its ancestors.
    pub fn upstream_of(&self, store: &NodeStore<T>, id: NodeId) -> Result<Graph<T>, GraphError> {
        self.require_member(id)?;
        let nodes: BTreeSet<NodeId> = std::iter::once(id).chain(store.ancestors(id)).collect();
        Graph::from_nodes(store, nodes, false)
    }

    /// `id` and all of its descendants.
    pub fn downstream_of(&self, store: &NodeStore<T>, id: NodeId) -> Result<Graph<T>, GraphError> {
        self.require_member(id)?;
        let nodes: BTreeSet<NodeId> = std::iter::once(id).chain(store.descendants(id)).collect();
        Graph::from_nodes(store, nodes, false)
    }

    /// Nodes lying on some path from `source` to `target`, both included.
    ///
    /// Empty when `target` is not reachable from `source`.
    pub fn subgraph_between(
        &self,
        store: &NodeStore<T>,
        source: NodeId,
        target: NodeId,
    ) -> Result<Graph<T>, GraphError> {
        self.require_member(source)?;
        self.require_member(target)?;

        let downstream: BTreeSet<NodeId> = std::iter::once(source).chain(store.descendants(source)).collect();
        let upstream: BTreeSet<NodeId> = std::iter::once(target).chain(store.ancestors(target)).collect();
        let between: Vec<NodeId> = downstream.intersection(&upstream).copied().collect();
        Graph::from_nodes(store, between, false)
    }

    fn require_member(&self, id: NodeId) -> Result<(), GraphError> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(GraphError::NotMember(id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build(edges: &[(&'static str, &'static str)]) -> (NodeStore<&'static str>, Graph<&'static str>) {
        let mut store = NodeStore::new();
        let mut graph: Graph<&'static str> = Graph::new();
        let mut ids: BTreeMap<&'static str, NodeId> = BTreeMap::new();
        for &(u, v) in edges {
            let u = *ids.entry(u).or_insert_with(|| store.insert(u));
            let v = *ids.entry(v).or_insert_with(|| store.insert(v));
            graph.add_edge(&mut store, u, v, Attributes::new()).unwrap();
        }
        (store, graph)
    }

    fn edge_names(store: &NodeStore<&'static str>, graph: &Graph<&'static str>) -> Vec<(String, String)> {
        let mut names: Vec<_> = graph
            .edges(store)
            .into_iter()
            .map(|edge| (store.label(edge.source), store.label(edge.target)))
            .collect();
        names.sort();
        names
    }

    fn pair(a: &str, b: &str) -> (String, String) {
        (a.to_string(), b.to_string())
    }

    #[test]
    fn test_reduction_drops_shortcut() {
        let (mut store, graph) = build(&[("A", "B"), ("B", "C"), ("A", "C")]);
        let a = graph.get(&store, &"A").unwrap();
        let c = graph.get(&store, &"C").unwrap();
        store.set_edge_attribute(a, c, "weight", 5).unwrap();

        let reduced = graph.transitive_reduction(&mut store).unwrap();
        assert_eq!(edge_names(&store, &reduced.graph), vec![pair("A", "B"), pair("B", "C")]);

        // Source graph untouched.
        assert_eq!(graph.edge_count(&store), 3);
        assert!(reduced.graph.members().is_disjoint(graph.members()));
    }

    #[test]
    fn test_reduction_keeps_attributes() {
        let (mut store, graph) = build(&[("A", "B")]);
        let a = graph.get(&store, &"A").unwrap();
        let b = graph.get(&store, &"B").unwrap();
        store.set_edge_attribute(a, b, "label", "needs").unwrap();

        let reduced = graph.transitive_reduction(&mut store).unwrap();
        let (ra, rb) = (reduced.mapping[&a], reduced.mapping[&b]);
        assert_eq!(store.edge_attributes(ra, rb).unwrap().get("label"), Some(&json!("needs")));
    }

    #[test]
    fn test_reduction_preserves_reachability() {
        let (mut store, graph) = build(&[
            ("A", "B"),
            ("A", "C"),
            ("A", "D"),
            ("B", "D"),
            ("C", "D"),
            ("D", "E"),
            ("A", "E"),
        ]);
        let reduced = graph.transitive_reduction(&mut store).unwrap();
        assert_eq!(reduced.graph.edge_count(&store), 5);

        for (&from, &from_copy) in &reduced.mapping {
            for (&to, &to_copy) in &reduced.mapping {
                assert_eq!(
                    store.find_path(from, to).is_some(),
                    store.find_path(from_copy, to_copy).is_some()
                );
            }
        }
    }

    #[test]
    fn test_closure_adds_transitive_edges() {
        let (mut store, graph) = build(&[("A", "B"), ("B", "C")]);
        let closed = graph.transitive_closure(&mut store).unwrap();
        assert_eq!(
            edge_names(&store, &closed.graph),
            vec![pair("A", "B"), pair("A", "C"), pair("B", "C")]
        );
        for edge in closed.graph.edges(&store) {
            assert!(edge.attributes.is_empty());
        }
    }

    #[test]
    fn test_clone_without_edges() {
        let (mut store, graph) = build(&[("A", "B")]);
        let a = graph.get(&store, &"A").unwrap();
        store.add_tag(a, "core").unwrap();
        store.set_duration(a, 3.0).unwrap();

        let copied = graph.clone_nodes(&mut store, false).unwrap();
        let copy = copied.mapping[&a];
        assert_eq!(copied.graph.edge_count(&store), 0);
        assert!(store.is_tagged(copy, "core"));
        assert_eq!(store.node(copy).unwrap().duration(), 3.0);

        // Independent tag storage.
        store.add_tag(copy, "extra").unwrap();
        assert!(!store.is_tagged(a, "extra"));

        let with_edges = graph.clone_nodes(&mut store, true).unwrap();
        assert_eq!(with_edges.graph.edge_count(&store), 1);
    }

    #[test]
    fn test_upstream_and_downstream() {
        let (store, graph) = build(&[("A", "B"), ("B", "C"), ("X", "C")]);
        let b = graph.get(&store, &"B").unwrap();

        let up = graph.upstream_of(&store, b).unwrap();
        assert_eq!(up.len(), 2);
        assert!(up.contains_reference(&store, &"A"));

        let down = graph.downstream_of(&store, b).unwrap();
        assert_eq!(down.len(), 2);
        assert!(down.contains_reference(&store, &"C"));
    }

    #[test]
    fn test_between_is_inclusive() {
        let (store, graph) = build(&[("A", "B"), ("B", "C"), ("C", "D"), ("X", "C")]);
        let a = graph.get(&store, &"A").unwrap();
        let c = graph.get(&store, &"C").unwrap();

        let between = graph.subgraph_between(&store, a, c).unwrap();
        let mut names: Vec<_> = between.iter().map(|id| store.label(id)).collect();
        names.sort();
        assert_eq!(names, vec!["A", "B", "C"]);

        let unreachable = graph.subgraph_between(&store, c, a).unwrap();
        assert!(unreachable.is_empty());
    }

    #[test]
    fn test_tagged_subgraph_rediscovers_neighbors() {
        let (mut store, graph) = build(&[("A", "B"), ("B", "C")]);
        let (mut other_store, other) = build(&[("P", "Q")]);
        let b = graph.get(&store, &"B").unwrap();
        store.add_tag(b, "focus").unwrap();

        let sub = graph.subgraph_tagged(&store, "focus").unwrap();
        assert_eq!(sub.len(), 3);

        let none = other.subgraph_tagged(&other_store, "focus").unwrap();
        assert!(none.is_empty());
        let p = other.get(&other_store, &"P").unwrap();
        other_store.add_tag(p, "focus").unwrap();
        assert_eq!(other.subgraph_tagged(&other_store, "focus").unwrap().len(), 2);
    }

    #[test]
    fn test_subgraph_requires_member() {
        let (mut store, graph) = build(&[("A", "B")]);
        let outside = store.insert("Z");
        assert_eq!(
            graph.upstream_of(&store, outside).unwrap_err(),
            GraphError::NotMember(outside)
        );
    }
}
