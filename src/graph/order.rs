//! Topological ordering and cycle checks.
//!
//! Both orders are computed with Kahn's algorithm over internal edges only.
//! Ties are broken by handle order, so repeated calls on an unchanged graph
//! return identical results.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

use super::Graph;
use crate::error::GraphError;
use crate::store::NodeStore;
use crate::types::{Node, NodeId};

impl<T: fmt::Display> Graph<T> {
    /// Members ordered so that every dependency precedes its dependents.
    ///
    /// Cached until a member changes.
    pub fn topological_order(&self, store: &NodeStore<T>) -> Result<Vec<NodeId>, GraphError> {
        self.cached(
            store,
            |cache| cache.topological_order.clone(),
            || self.kahn_order(store),
            |cache, order| cache.topological_order = Some(order),
        )
    }

    /// Topological order restricted to members matching `predicate`.
    pub fn topological_order_filtered(
        &self,
        store: &NodeStore<T>,
        predicate: impl Fn(&Node<T>) -> bool,
    ) -> Result<Vec<NodeId>, GraphError> {
        Ok(self
            .topological_order(store)?
            .into_iter()
            .filter(|id| store.node(*id).map_or(false, &predicate))
            .collect())
    }

    /// Topological order restricted to members carrying `tag`.
    pub fn topological_order_tagged(&self, store: &NodeStore<T>, tag: &str) -> Result<Vec<NodeId>, GraphError> {
        self.topological_order_filtered(store, |node| node.is_tagged(tag))
    }

    /// Members grouped into layers: every node's dependencies sit in earlier
    /// layers, so the nodes of one layer could run concurrently.
    ///
    /// Cached until a member changes.
    pub fn parallel_topological_order(&self, store: &NodeStore<T>) -> Result<Vec<BTreeSet<NodeId>>, GraphError> {
        self.cached(
            store,
            |cache| cache.layers.clone(),
            || self.kahn_layers(store),
            |cache, layers| cache.layers = Some(layers),
        )
    }

    /// Layers restricted to members matching `predicate`. Layers left empty
    /// are dropped.
    pub fn parallel_topological_order_filtered(
        &self,
        store: &NodeStore<T>,
        predicate: impl Fn(&Node<T>) -> bool,
    ) -> Result<Vec<BTreeSet<NodeId>>, GraphError> {
        Ok(self
            .parallel_topological_order(store)?
            .into_iter()
            .map(|layer| {
                layer
                    .into_iter()
                    .filter(|id| store.node(*id).map_or(false, &predicate))
                    .collect::<BTreeSet<_>>()
            })
            .filter(|layer| !layer.is_empty())
            .collect())
    }

    /// Layers restricted to members carrying `tag`.
    pub fn parallel_topological_order_tagged(
        &self,
        store: &NodeStore<T>,
        tag: &str,
    ) -> Result<Vec<BTreeSet<NodeId>>, GraphError> {
        self.parallel_topological_order_filtered(store, |node| node.is_tagged(tag))
    }

    /// Fail with the offending cycle if the members contain one.
    pub fn check_cycles(&self, store: &NodeStore<T>) -> Result<(), GraphError> {
        self.kahn_order(store).map(|_| ())
    }

    fn in_degrees(&self, store: &NodeStore<T>) -> BTreeMap<NodeId, usize> {
        self.live_members(store)
            .map(|(id, _)| (id, self.internal_depends_on(store, id).count()))
            .collect()
    }

    fn kahn_order(&self, store: &NodeStore<T>) -> Result<Vec<NodeId>, GraphError> {
        let mut in_degree = self.in_degrees(store);
        let mut queue: VecDeque<NodeId> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| *id)
            .collect();

        let mut order = Vec::with_capacity(in_degree.len());
        while let Some(id) = queue.pop_front() {
            order.push(id);
            for (dependent, _) in self.internal_dependents(store, id) {
                if let Some(degree) = in_degree.get_mut(&dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(dependent);
                    }
                }
            }
        }

        if order.len() < in_degree.len() {
            let emitted: BTreeSet<NodeId> = order.into_iter().collect();
            let remaining: BTreeSet<NodeId> = in_degree
                .keys()
                .copied()
                .filter(|id| !emitted.contains(id))
                .collect();
            return Err(self.cycle_error(store, &remaining));
        }

        tracing::debug!(nodes = order.len(), "Computed topological order");
        Ok(order)
    }

    fn kahn_layers(&self, store: &NodeStore<T>) -> Result<Vec<BTreeSet<NodeId>>, GraphError> {
        let mut in_degree = self.in_degrees(store);
        let total = in_degree.len();

        let mut ready: BTreeSet<NodeId> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| *id)
            .collect();

        let mut layers = Vec::new();
        let mut emitted = 0;
        while !ready.is_empty() {
            let mut next = BTreeSet::new();
            for id in &ready {
                for (dependent, _) in self.internal_dependents(store, *id) {
                    if let Some(degree) = in_degree.get_mut(&dependent) {
                        *degree -= 1;
                        if *degree == 0 {
                            next.insert(dependent);
                        }
                    }
                }
            }
            emitted += ready.len();
            layers.push(std::mem::replace(&mut ready, next));
        }

        if emitted < total {
            let remaining: BTreeSet<NodeId> = in_degree
                .into_iter()
                .filter(|(_, degree)| *degree > 0)
                .map(|(id, _)| id)
                .collect();
            return Err(self.cycle_error(store, &remaining));
        }

        tracing::debug!(layers = layers.len(), "Computed parallel topological order");
        Ok(layers)
    }

    /// Recover one concrete cycle from the nodes Kahn's algorithm could not
    /// emit. Each of them still has an unemitted dependency, so walking
    /// dependencies from any of them must revisit a node.
    fn cycle_error(&self, store: &NodeStore<T>, remaining: &BTreeSet<NodeId>) -> GraphError {
        let mut walk: Vec<NodeId> = Vec::new();
        let mut position: BTreeMap<NodeId, usize> = BTreeMap::new();
        let mut cursor = remaining.iter().next().copied();

        while let Some(id) = cursor {
            if let Some(&start) = position.get(&id) {
                let mut cycle: Vec<NodeId> = walk[start..].iter().rev().copied().collect();
                if let Some(&first) = cycle.first() {
                    cycle.push(first);
                }
                let labels = store.labels(&cycle);
                tracing::error!(cycle = %labels.join(" -> "), "Cycle detected in graph");
                return GraphError::cycle("Cycle detected in graph", cycle, &labels);
            }
            position.insert(id, walk.len());
            walk.push(id);
            cursor = self
                .internal_depends_on(store, id)
                .map(|(dependency, _)| dependency)
                .find(|dependency| remaining.contains(dependency));
        }

        // Unreachable for a real cycle; report what is left.
        let cycle: Vec<NodeId> = remaining.iter().copied().collect();
        let labels = store.labels(&cycle);
        GraphError::cycle("Cycle detected in graph", cycle, &labels)
    }
}
