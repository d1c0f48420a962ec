//! Path enumeration and cycle-break suggestions.

use std::collections::BTreeSet;

use super::Graph;
use crate::error::GraphError;
use crate::store::NodeStore;
use crate::types::NodeId;

impl<T> Graph<T> {
    /// Every simple directed path from `source` to `target` through members.
    ///
    /// Each path starts with `source` and ends with `target`. The number of
    /// paths can grow exponentially with the graph size.
    pub fn all_paths(
        &self,
        store: &NodeStore<T>,
        source: NodeId,
        target: NodeId,
    ) -> Result<Vec<Vec<NodeId>>, GraphError> {
        for id in [source, target] {
            if !self.contains(id) {
                return Err(GraphError::NotMember(id));
            }
        }

        let mut paths = Vec::new();
        let mut path = vec![source];
        let mut on_path = BTreeSet::from([source]);
        self.extend_paths(store, target, &mut path, &mut on_path, &mut paths);
        Ok(paths)
    }

    fn extend_paths(
        &self,
        store: &NodeStore<T>,
        target: NodeId,
        path: &mut Vec<NodeId>,
        on_path: &mut BTreeSet<NodeId>,
        paths: &mut Vec<Vec<NodeId>>,
    ) {
        let Some(&current) = path.last() else {
            return;
        };
        if current == target {
            paths.push(path.clone());
            return;
        }

        let next: Vec<NodeId> = self
            .internal_dependents(store, current)
            .map(|(dependent, _)| dependent)
            .collect();
        for dependent in next {
            if !on_path.insert(dependent) {
                continue;
            }
            path.push(dependent);
            self.extend_paths(store, target, path, on_path, paths);
            path.pop();
            on_path.remove(&dependent);
        }
    }

    /// Edges whose removal would make the members acyclic.
    ///
    /// Greedy: a depth-first search over internal edges collects every back
    /// edge it meets. The result is a valid break set, not a minimal one.
    /// An acyclic graph yields nothing.
    pub fn suggest_cycle_breaks(&self, store: &NodeStore<T>) -> Vec<(NodeId, NodeId)> {
        tracing::debug!("Suggesting cycle breaks");
        let mut breaks = Vec::new();
        let mut visited: BTreeSet<NodeId> = BTreeSet::new();
        let mut on_stack: BTreeSet<NodeId> = BTreeSet::new();

        for (root, _) in self.live_members(store) {
            if visited.contains(&root) {
                continue;
            }

            // Explicit stack of (node, remaining dependents).
            let mut stack: Vec<(NodeId, std::vec::IntoIter<NodeId>)> = Vec::new();
            visited.insert(root);
            on_stack.insert(root);
            stack.push((root, self.internal_successors(store, root).into_iter()));

            while let Some((node, successors)) = stack.last_mut() {
                let node = *node;
                match successors.next() {
                    Some(next) if on_stack.contains(&next) => breaks.push((node, next)),
                    Some(next) if !visited.contains(&next) => {
                        visited.insert(next);
                        on_stack.insert(next);
                        stack.push((next, self.internal_successors(store, next).into_iter()));
                    }
                    Some(_) => {}
                    None => {
                        on_stack.remove(&node);
                        stack.pop();
                    }
                }
            }
        }

        breaks
    }

    fn internal_successors(&self, store: &NodeStore<T>, id: NodeId) -> Vec<NodeId> {
        self.internal_dependents(store, id)
            .map(|(dependent, _)| dependent)
            .collect()
    }
}
