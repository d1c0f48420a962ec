//! Critical Path Method scheduling.
//!
//! Durations come from the nodes; dependencies from internal edges. The
//! forward pass runs in topological order:
//!
//! ```text
//! ES(n) = max(EF(d) for each internal dependency d), or 0
//! EF(n) = ES(n) + duration(n)
//! ```
//!
//! The backward pass runs in reverse topological order, with the project
//! duration `max(EF)` as the finish bound for nodes without dependents:
//!
//! ```text
//! LF(n) = min(LS(s) for each internal dependent s), or project duration
//! LS(n) = LF(n) - duration(n)
//! slack(n) = LF(n) - EF(n)
//! ```
//!
//! A node is critical when its slack is zero within the configured tolerance.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::graph::Graph;
use crate::store::NodeStore;
use crate::types::NodeId;

/// Default tolerance for treating slack as zero.
pub const DEFAULT_SLACK_TOLERANCE: f64 = 1e-9;

/// CPM configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CpmOptions {
    /// Slack below this magnitude counts as zero.
    pub tolerance: f64,
}

impl Default for CpmOptions {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_SLACK_TOLERANCE,
        }
    }
}

impl CpmOptions {
    /// Set the slack tolerance. Negative values are treated as their
    /// magnitude.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance.abs();
        self
    }
}

/// Scheduling values of one node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CpmEntry {
    /// Earliest start.
    pub earliest_start: f64,
    /// Earliest finish.
    pub earliest_finish: f64,
    /// Latest start.
    pub latest_start: f64,
    /// Latest finish.
    pub latest_finish: f64,
    /// Total slack: latest finish minus earliest finish.
    pub slack: f64,
}

impl CpmEntry {
    /// Whether the slack is zero within `tolerance`.
    pub fn is_critical(&self, tolerance: f64) -> bool {
        self.slack.abs() < tolerance
    }
}

/// Result of a CPM run over a graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpmAnalysis {
    order: Vec<NodeId>,
    entries: BTreeMap<NodeId, CpmEntry>,
    project_duration: f64,
    tolerance: f64,
}

impl CpmAnalysis {
    /// Values for `id`.
    pub fn get(&self, id: NodeId) -> Option<&CpmEntry> {
        self.entries.get(&id)
    }

    /// Entries in topological order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &CpmEntry)> + '_ {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id).map(|entry| (*id, entry)))
    }

    /// Number of analysed nodes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the analysed graph was empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Largest earliest finish; zero for an empty graph.
    pub fn project_duration(&self) -> f64 {
        self.project_duration
    }

    /// Whether `id` has zero slack.
    pub fn is_critical(&self, id: NodeId) -> bool {
        self.entries
            .get(&id)
            .map_or(false, |entry| entry.is_critical(self.tolerance))
    }

    /// Every zero-slack node, in topological order.
    pub fn critical_path(&self) -> Vec<NodeId> {
        self.order
            .iter()
            .copied()
            .filter(|id| self.is_critical(*id))
            .collect()
    }
}

impl<T: fmt::Display> Graph<T> {
    /// CPM analysis with the default tolerance.
    pub fn cpm_analysis(&self, store: &NodeStore<T>) -> Result<CpmAnalysis, GraphError> {
        self.cpm_analysis_with(store, CpmOptions::default())
    }

    /// CPM analysis with explicit options.
    pub fn cpm_analysis_with(&self, store: &NodeStore<T>, options: CpmOptions) -> Result<CpmAnalysis, GraphError> {
        tracing::debug!(tolerance = options.tolerance, "Starting CPM analysis");
        let order = self.topological_order(store)?;
        if order.is_empty() {
            return Ok(CpmAnalysis {
                tolerance: options.tolerance,
                ..CpmAnalysis::default()
            });
        }

        let duration = |id: NodeId| store.node(id).map_or(0.0, |node| node.duration());
        let mut entries: BTreeMap<NodeId, CpmEntry> = BTreeMap::new();

        for id in &order {
            let earliest_start = self
                .internal_depends_on(store, *id)
                .filter_map(|(dependency, _)| entries.get(&dependency))
                .map(|entry| entry.earliest_finish)
                .fold(0.0, f64::max);
            entries.insert(
                *id,
                CpmEntry {
                    earliest_start,
                    earliest_finish: earliest_start + duration(*id),
                    ..CpmEntry::default()
                },
            );
        }

        let project_duration = entries
            .values()
            .map(|entry| entry.earliest_finish)
            .fold(0.0, f64::max);

        for id in order.iter().rev() {
            let latest_finish = self
                .internal_dependents(store, *id)
                .filter_map(|(dependent, _)| entries.get(&dependent))
                .map(|entry| entry.latest_start)
                .fold(None, |min: Option<f64>, ls| Some(min.map_or(ls, |m| m.min(ls))))
                .unwrap_or(project_duration);

            if let Some(entry) = entries.get_mut(id) {
                entry.latest_finish = latest_finish;
                entry.latest_start = latest_finish - duration(*id);
                entry.slack = latest_finish - entry.earliest_finish;
            }
        }

        tracing::debug!(nodes = entries.len(), project_duration, "CPM analysis complete");
        Ok(CpmAnalysis {
            order,
            entries,
            project_duration,
            tolerance: options.tolerance,
        })
    }

    /// Zero-slack nodes in topological order.
    pub fn critical_path(&self, store: &NodeStore<T>) -> Result<Vec<NodeId>, GraphError> {
        Ok(self.cpm_analysis(store)?.critical_path())
    }

    /// Total project duration.
    pub fn project_duration(&self, store: &NodeStore<T>) -> Result<f64, GraphError> {
        Ok(self.cpm_analysis(store)?.project_duration())
    }

    /// One concrete chain of critical nodes.
    ///
    /// Starts at the first critical source (or the first critical node in
    /// topological order) and keeps stepping to the first critical dependent
    /// whose earliest start equals the current earliest finish.
    pub fn longest_path(&self, store: &NodeStore<T>) -> Result<Vec<NodeId>, GraphError> {
        let analysis = self.cpm_analysis(store)?;
        let critical: BTreeSet<NodeId> = analysis.critical_path().into_iter().collect();
        if critical.is_empty() {
            return Ok(Vec::new());
        }

        let start = self
            .sources(store)
            .into_iter()
            .find(|id| critical.contains(id))
            .or_else(|| analysis.critical_path().first().copied());
        let Some(mut current) = start else {
            return Ok(Vec::new());
        };

        let tolerance = analysis.tolerance;
        let mut path = vec![current];
        loop {
            let Some(finish) = analysis.get(current).map(|entry| entry.earliest_finish) else {
                break;
            };
            let next = self
                .internal_dependents(store, current)
                .map(|(dependent, _)| dependent)
                .find(|dependent| {
                    critical.contains(dependent)
                        && analysis
                            .get(*dependent)
                            .map_or(false, |entry| (entry.earliest_start - finish).abs() < tolerance)
                });
            match next {
                Some(next) => {
                    path.push(next);
                    current = next;
                }
                None => break,
            }
        }

        Ok(path)
    }
}
