// src/dag/critical_path.rs

//! Simplified critical-path method.
//!
//! Durations are each node's planned hours. Every edge is treated as
//! "predecessor before dependent" regardless of its type, and lag is ignored.
//! A forward pass gives earliest finish, a backward pass latest finish;
//! nodes with zero slack are critical.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::dag::graph::DependencyGraph;
use crate::errors::{EngineError, Result};

const EPSILON: f64 = 1e-9;

/// Derived critical-path data; recomputed on demand, never stored as truth.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CriticalPath {
    /// Longest chain of planned hours through the graph.
    pub length_hours: f64,
    /// Slack in hours per node.
    pub slack: BTreeMap<String, f64>,
    /// Nodes with zero slack. Empty when no node has a planned duration.
    pub nodes: BTreeSet<String>,
}

impl CriticalPath {
    pub fn is_critical(&self, id: &str) -> bool {
        self.nodes.contains(id)
    }
}

impl DependencyGraph {
    pub fn critical_path(&self) -> Result<CriticalPath> {
        // Edge direction: predecessor -> dependent.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for node in self.nodes() {
            graph.add_node(node.id.as_str());
        }
        for edge in self.edges() {
            graph.add_edge(edge.depends_on_id.as_str(), edge.source_id.as_str(), ());
        }

        let order = toposort(&graph, None).map_err(|cycle| {
            EngineError::Validation(format!(
                "cycle detected in dependency graph involving '{}'",
                cycle.node_id()
            ))
        })?;

        let duration = |id: &str| self.node(id).map(|n| n.planned_hours).unwrap_or(0.0);

        let mut earliest_finish: HashMap<&str, f64> = HashMap::new();
        for &id in &order {
            let start = graph
                .neighbors_directed(id, petgraph::Direction::Incoming)
                .map(|pred| earliest_finish.get(pred).copied().unwrap_or(0.0))
                .fold(0.0, f64::max);
            earliest_finish.insert(id, start + duration(id));
        }

        let length_hours = earliest_finish.values().copied().fold(0.0, f64::max);

        let mut latest_finish: HashMap<&str, f64> = HashMap::new();
        for &id in order.iter().rev() {
            let finish = graph
                .neighbors_directed(id, petgraph::Direction::Outgoing)
                .map(|succ| {
                    let succ_finish = latest_finish.get(succ).copied().unwrap_or(length_hours);
                    succ_finish - duration(succ)
                })
                .fold(length_hours, f64::min);
            latest_finish.insert(id, finish);
        }

        let mut result = CriticalPath {
            length_hours,
            ..CriticalPath::default()
        };
        for &id in &order {
            let slack = (latest_finish[id] - earliest_finish[id]).max(0.0);
            result.slack.insert(id.to_string(), slack);
            if length_hours > EPSILON && slack < EPSILON {
                result.nodes.insert(id.to_string());
            }
        }

        Ok(result)
    }
}
