//! Derived-result cache for graph views.

use std::collections::BTreeSet;

use crate::store::NodeStore;
use crate::types::NodeId;

/// Cached analytics of one graph view.
///
/// The cache remembers the store clock at the time its entries were
/// computed. It is fresh while every member is alive and no member has a
/// revision newer than that stamp. Membership changes clear it directly.
#[derive(Debug, Clone, Default)]
pub(crate) struct GraphCache {
    stamp: u64,
    pub(crate) topological_order: Option<Vec<NodeId>>,
    pub(crate) layers: Option<Vec<BTreeSet<NodeId>>>,
    pub(crate) checksum: Option<String>,
}

impl GraphCache {
    pub(crate) fn is_empty(&self) -> bool {
        self.topological_order.is_none() && self.layers.is_none() && self.checksum.is_none()
    }

    pub(crate) fn clear(&mut self) {
        if !self.is_empty() {
            tracing::debug!("Invalidating graph cache");
        }
        self.topological_order = None;
        self.layers = None;
        self.checksum = None;
    }

    pub(crate) fn is_fresh<T>(&self, members: &BTreeSet<NodeId>, store: &NodeStore<T>) -> bool {
        members.iter().all(|id| {
            store
                .revision(*id)
                .map_or(false, |revision| revision <= self.stamp)
        })
    }

    /// Drop stale entries and restamp an empty cache with the current clock.
    pub(crate) fn refresh<T>(&mut self, members: &BTreeSet<NodeId>, store: &NodeStore<T>) {
        if !self.is_fresh(members, store) {
            self.clear();
        }
        if self.is_empty() {
            self.stamp = store.clock();
        }
    }
}
