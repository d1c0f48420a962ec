//! Lazy breadth-first and depth-first walks over the store.
//!
//! Both walks borrow the store immutably, so the graph cannot change while a
//! walk is in progress. Neighbours are visited in handle order, which makes
//! every walk deterministic for a given store.

use std::collections::{BTreeSet, HashSet, VecDeque};

use crate::store::NodeStore;
use crate::types::{Direction, NodeId};

/// Which nodes a walk may step onto.
#[derive(Debug, Clone, Copy)]
pub enum Scope<'a> {
    /// Follow every edge.
    Unrestricted,
    /// Only step onto members of this set.
    Members(&'a BTreeSet<NodeId>),
}

impl Scope<'_> {
    fn admits(&self, id: NodeId) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::Members(members) => members.contains(&id),
        }
    }
}

/// Depth-first pre-order walk.
///
/// The start node itself is only yielded when requested and in scope; its
/// neighbours are explored either way.
#[derive(Debug)]
pub struct Dfs<'a, T> {
    store: &'a NodeStore<T>,
    direction: Direction,
    scope: Scope<'a>,
    visited: HashSet<NodeId>,
    stack: Vec<std::vec::IntoIter<NodeId>>,
    pending: Option<NodeId>,
}

impl<'a, T> Dfs<'a, T> {
    pub(crate) fn new(
        store: &'a NodeStore<T>,
        start: NodeId,
        direction: Direction,
        scope: Scope<'a>,
        include_start: bool,
    ) -> Self {
        let mut visited = HashSet::new();
        let mut stack = Vec::new();
        let mut pending = None;

        if let Some(node) = store.node(start) {
            visited.insert(start);
            stack.push(node.neighbors(direction).into_iter());
            if include_start && scope.admits(start) {
                pending = Some(start);
            }
        }

        Self {
            store,
            direction,
            scope,
            visited,
            stack,
            pending,
        }
    }
}

impl<T> Iterator for Dfs<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if let Some(start) = self.pending.take() {
            return Some(start);
        }

        loop {
            let frame = self.stack.last_mut()?;
            match frame.next() {
                Some(next) => {
                    if self.visited.contains(&next) || !self.scope.admits(next) {
                        continue;
                    }
                    let Some(node) = self.store.node(next) else {
                        continue;
                    };
                    self.visited.insert(next);
                    self.stack.push(node.neighbors(self.direction).into_iter());
                    return Some(next);
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

/// Breadth-first walk, start node first.
#[derive(Debug)]
pub struct Bfs<'a, T> {
    store: &'a NodeStore<T>,
    direction: Direction,
    scope: Scope<'a>,
    visited: HashSet<NodeId>,
    queue: VecDeque<NodeId>,
}

impl<'a, T> Bfs<'a, T> {
    pub(crate) fn new(store: &'a NodeStore<T>, start: NodeId, direction: Direction, scope: Scope<'a>) -> Self {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();

        if store.contains(start) && scope.admits(start) {
            visited.insert(start);
            queue.push_back(start);
        }

        Self {
            store,
            direction,
            scope,
            visited,
            queue,
        }
    }
}

impl<T> Iterator for Bfs<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.queue.pop_front()?;
        if let Some(node) = self.store.node(current) {
            for neighbor in node.neighbors(self.direction) {
                if self.scope.admits(neighbor) && self.visited.insert(neighbor) {
                    self.queue.push_back(neighbor);
                }
            }
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    //   A
    //  / \
    // B   C
    //  \ /
    //   D
    fn diamond() -> (NodeStore<&'static str>, [NodeId; 4]) {
        let mut store = NodeStore::new();
        let a = store.insert("A");
        let b = store.insert("B");
        let c = store.insert("C");
        let d = store.insert("D");
        store.provides_to(a, b, false).unwrap();
        store.provides_to(a, c, false).unwrap();
        store.provides_to(b, d, false).unwrap();
        store.provides_to(c, d, false).unwrap();
        (store, [a, b, c, d])
    }

    #[test]
    fn test_dfs_preorder() {
        let (store, [a, b, c, d]) = diamond();
        let order: Vec<_> = Dfs::new(&store, a, Direction::Down, Scope::Unrestricted, true).collect();
        assert_eq!(order, vec![a, b, d, c]);
    }

    #[test]
    fn test_bfs_levels() {
        let (store, [a, b, c, d]) = diamond();
        let order: Vec<_> = Bfs::new(&store, a, Direction::Down, Scope::Unrestricted).collect();
        assert_eq!(order, vec![a, b, c, d]);

        let up: Vec<_> = Bfs::new(&store, d, Direction::Up, Scope::Unrestricted).collect();
        assert_eq!(up, vec![d, b, c, a]);
    }

    #[test]
    fn test_scope_limits_walk() {
        let (store, [a, b, _, d]) = diamond();
        let members: BTreeSet<_> = [a, b].into_iter().collect();

        let bfs: Vec<_> = Bfs::new(&store, a, Direction::Down, Scope::Members(&members)).collect();
        assert_eq!(bfs, vec![a, b]);

        // Start outside the scope: nothing for BFS, neighbours still explored by DFS.
        let outside: Vec<_> = Bfs::new(&store, d, Direction::Up, Scope::Members(&members)).collect();
        assert!(outside.is_empty());
        let dfs: Vec<_> = Dfs::new(&store, d, Direction::Up, Scope::Members(&members), true).collect();
        assert_eq!(dfs, vec![b, a]);
    }
}
