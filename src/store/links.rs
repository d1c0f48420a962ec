//! Edge maintenance, path search and reachability on the store.
//!
//! Edges are stored twice: `a.dependents[b]` and `b.depends_on[a]` hold the
//! same attributes. Every function here keeps the two copies in step.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fmt;

use serde_json::Value;

use super::NodeStore;
use crate::error::GraphError;
use crate::traverse::{Dfs, Scope};
use crate::types::{Attributes, Direction, NodeId};

impl<T> NodeStore<T> {
    /// Link `dependency -> dependent` with `attributes`, replacing any
    /// existing attributes. Each endpoint that actually changes is stamped.
    ///
    /// Returns whether anything changed.
    pub(crate) fn link(
        &mut self,
        dependency: NodeId,
        dependent: NodeId,
        attributes: Attributes,
    ) -> Result<bool, GraphError> {
        self.try_node(dependency)?;
        self.try_node(dependent)?;

        let mut changed = false;

        let upstream = self.node_mut(dependency)?;
        if upstream.dependents.get(&dependent) != Some(&attributes) {
            upstream.dependents.insert(dependent, attributes.clone());
            self.touch(dependency);
            changed = true;
        }

        let downstream = self.node_mut(dependent)?;
        if downstream.depends_on.get(&dependency) != Some(&attributes) {
            downstream.depends_on.insert(dependency, attributes);
            self.touch(dependent);
            changed = true;
        }

        Ok(changed)
    }

    /// Remove the edge `dependency -> dependent`. Returns whether it existed.
    pub(crate) fn unlink(&mut self, dependency: NodeId, dependent: NodeId) -> Result<bool, GraphError> {
        self.try_node(dependency)?;
        self.try_node(dependent)?;

        let mut changed = false;
        if self.node_mut(dependency)?.dependents.remove(&dependent).is_some() {
            self.touch(dependency);
            changed = true;
        }
        if self.node_mut(dependent)?.depends_on.remove(&dependency).is_some() {
            self.touch(dependent);
            changed = true;
        }
        Ok(changed)
    }

    /// Whether the edge `dependency -> dependent` exists.
    pub fn has_edge(&self, dependency: NodeId, dependent: NodeId) -> bool {
        self.node(dependency)
            .map_or(false, |node| node.has_dependent(dependent))
    }

    /// Shortest directed path from `from` to `to` along dependents.
    ///
    /// The returned path starts with `from` and ends with `to`. Searching
    /// from a node to itself finds the shortest cycle through it, if any.
    pub fn find_path(&self, from: NodeId, to: NodeId) -> Option<Vec<NodeId>> {
        let start = self.node(from)?;

        let mut parent: BTreeMap<NodeId, NodeId> = BTreeMap::new();
        let mut queue: VecDeque<NodeId> = VecDeque::new();
        for (neighbor, _) in start.iter_dependents() {
            parent.entry(neighbor).or_insert(from);
            queue.push_back(neighbor);
        }

        let mut visited: HashSet<NodeId> = HashSet::new();
        while let Some(current) = queue.pop_front() {
            if current == to {
                let mut path = vec![current];
                let mut cursor = current;
                loop {
                    let previous = parent.get(&cursor).copied()?;
                    path.push(previous);
                    if previous == from {
                        break;
                    }
                    cursor = previous;
                }
                path.reverse();
                return Some(path);
            }

            if !visited.insert(current) {
                continue;
            }

            if let Some(node) = self.node(current) {
                for (neighbor, _) in node.iter_dependents() {
                    if !visited.contains(&neighbor) {
                        parent.entry(neighbor).or_insert(current);
                        queue.push_back(neighbor);
                    }
                }
            }
        }

        None
    }

    /// Transitive dependencies of `id`, excluding `id`, in depth-first
    /// pre-order. Not limited to any graph.
    pub fn ancestors(&self, id: NodeId) -> Dfs<'_, T> {
        Dfs::new(self, id, Direction::Up, Scope::Unrestricted, false)
    }

    /// Transitive dependents of `id`, excluding `id`, in depth-first
    /// pre-order. Not limited to any graph.
    pub fn descendants(&self, id: NodeId) -> Dfs<'_, T> {
        Dfs::new(self, id, Direction::Down, Scope::Unrestricted, false)
    }

    /// Partial order by reachability.
    ///
    /// `Less` when `a` is a proper ancestor of `b`, `Greater` when it is a
    /// proper descendant, `Equal` for the same node, `None` when neither
    /// reaches the other.
    pub fn compare(&self, a: NodeId, b: NodeId) -> Option<Ordering> {
        if a == b {
            Some(Ordering::Equal)
        } else if self.find_path(a, b).is_some() {
            Some(Ordering::Less)
        } else if self.find_path(b, a).is_some() {
            Some(Ordering::Greater)
        } else {
            None
        }
    }

    /// `a` is a proper ancestor of `b`.
    pub fn precedes(&self, a: NodeId, b: NodeId) -> bool {
        self.find_path(a, b).is_some()
    }

    /// `a` is `b` or one of its ancestors.
    pub fn precedes_or_equal(&self, a: NodeId, b: NodeId) -> bool {
        a == b || self.precedes(a, b)
    }

    /// `a` is a proper descendant of `b`.
    pub fn follows(&self, a: NodeId, b: NodeId) -> bool {
        self.find_path(b, a).is_some()
    }

    /// `a` is `b` or one of its descendants.
    pub fn follows_or_equal(&self, a: NodeId, b: NodeId) -> bool {
        a == b || self.follows(a, b)
    }
}

impl<T: fmt::Display> NodeStore<T> {
    /// Make `node` depend on `dependency`.
    ///
    /// With `check_cycles`, fails without linking if `dependency` is already
    /// reachable from `node`; the error carries the cycle the edge would
    /// close. Re-adding an existing edge replaces its attributes.
    pub fn add_dependency(
        &mut self,
        node: NodeId,
        dependency: NodeId,
        attributes: Attributes,
        check_cycles: bool,
    ) -> Result<(), GraphError> {
        if check_cycles {
            self.ensure_acyclic_link(dependency, node, "dependency")?;
        }
        tracing::debug!(
            node = %self.label(node),
            dependency = %self.label(dependency),
            attributes = %attributes,
            "Adding dependency"
        );
        self.link(dependency, node, attributes)?;
        Ok(())
    }

    /// Make `dependent` depend on `node`.
    ///
    /// Mirror image of [`add_dependency`](Self::add_dependency).
    pub fn add_dependent(
        &mut self,
        node: NodeId,
        dependent: NodeId,
        attributes: Attributes,
        check_cycles: bool,
    ) -> Result<(), GraphError> {
        if check_cycles {
            self.ensure_acyclic_link(node, dependent, "dependent")?;
        }
        tracing::debug!(
            node = %self.label(node),
            dependent = %self.label(dependent),
            attributes = %attributes,
            "Adding dependent"
        );
        self.link(node, dependent, attributes)?;
        Ok(())
    }

    /// Add several dependencies sharing the same attributes.
    pub fn add_dependencies(
        &mut self,
        node: NodeId,
        dependencies: impl IntoIterator<Item = NodeId>,
        attributes: &Attributes,
        check_cycles: bool,
    ) -> Result<(), GraphError> {
        for dependency in dependencies {
            self.add_dependency(node, dependency, attributes.clone(), check_cycles)?;
        }
        Ok(())
    }

    /// Add several dependents sharing the same attributes.
    pub fn add_dependents(
        &mut self,
        node: NodeId,
        dependents: impl IntoIterator<Item = NodeId>,
        attributes: &Attributes,
        check_cycles: bool,
    ) -> Result<(), GraphError> {
        for dependent in dependents {
            self.add_dependent(node, dependent, attributes.clone(), check_cycles)?;
        }
        Ok(())
    }

    /// `node` requires `dependency`. Shorthand for an attribute-less
    /// [`add_dependency`](Self::add_dependency).
    pub fn requires(&mut self, node: NodeId, dependency: NodeId, check_cycles: bool) -> Result<(), GraphError> {
        self.add_dependency(node, dependency, Attributes::new(), check_cycles)
    }

    /// `node` provides to `dependent`. Shorthand for an attribute-less
    /// [`add_dependent`](Self::add_dependent).
    pub fn provides_to(&mut self, node: NodeId, dependent: NodeId, check_cycles: bool) -> Result<(), GraphError> {
        self.add_dependent(node, dependent, Attributes::new(), check_cycles)
    }

    /// Remove `dependency` from `node`'s dependencies. Returns whether the
    /// edge existed.
    pub fn remove_dependency(&mut self, node: NodeId, dependency: NodeId) -> Result<bool, GraphError> {
        self.unlink(dependency, node)
    }

    /// Remove `dependent` from `node`'s dependents. Returns whether the edge
    /// existed.
    pub fn remove_dependent(&mut self, node: NodeId, dependent: NodeId) -> Result<bool, GraphError> {
        self.unlink(node, dependent)
    }

    /// Attributes of the edge between `a` and `b`, in whichever direction it
    /// runs.
    pub fn edge_attributes(&self, a: NodeId, b: NodeId) -> Result<&Attributes, GraphError> {
        let node = self.try_node(a)?;
        node.dependents
            .get(&b)
            .or_else(|| node.depends_on.get(&b))
            .ok_or_else(|| self.no_edge(a, b))
    }

    /// Set one attribute on the edge between `a` and `b`, updating both
    /// endpoint copies.
    pub fn set_edge_attribute(
        &mut self,
        a: NodeId,
        b: NodeId,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<(), GraphError> {
        let (dependency, dependent) = if self.has_edge(a, b) {
            (a, b)
        } else if self.has_edge(b, a) {
            (b, a)
        } else {
            self.try_node(a)?;
            self.try_node(b)?;
            return Err(self.no_edge(a, b));
        };

        let mut attributes = self.edge_attributes(dependency, dependent)?.clone();
        attributes.insert(key, value);
        self.link(dependency, dependent, attributes)?;
        Ok(())
    }

    /// Fail if linking `dependency -> dependent` would close a cycle.
    fn ensure_acyclic_link(&self, dependency: NodeId, dependent: NodeId, kind: &str) -> Result<(), GraphError> {
        let cycle = if dependency == dependent {
            Some(vec![dependency, dependency])
        } else {
            self.find_path(dependent, dependency).map(|mut path| {
                path.push(dependent);
                path
            })
        };

        match cycle {
            Some(cycle) => {
                let labels = self.labels(&cycle);
                tracing::error!(cycle = %labels.join(" -> "), "Cycle detected");
                let (owner, other) = match kind {
                    "dependency" => (dependent, dependency),
                    _ => (dependency, dependent),
                };
                Err(GraphError::cycle(
                    format!(
                        "Adding {} '{}' to '{}' would create a cycle",
                        kind,
                        self.label(other),
                        self.label(owner)
                    ),
                    cycle,
                    &labels,
                ))
            }
            None => Ok(()),
        }
    }

    fn no_edge(&self, a: NodeId, b: NodeId) -> GraphError {
        GraphError::NoEdge {
            a: self.label(a),
            b: self.label(b),
        }
    }
}
