// src/dag/state_manager.rs

//! Whole-graph readiness queries.
//!
//! Dependents are never notified when a predecessor changes; they re-check
//! their own gates on their next transition attempt. These helpers let a
//! caller see that picture for every node at once.

use chrono::{DateTime, Utc};

use crate::dag::graph::DependencyGraph;
use crate::dag::satisfaction::Gate;
use crate::errors::DenialReason;
use crate::types::Status;

/// A node whose next transition is held back by unmet constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockedNode {
    pub id: String,
    pub gate: Gate,
    pub reasons: Vec<DenialReason>,
}

/// Read-only view answering readiness questions at a fixed instant.
pub struct ReadinessView<'a> {
    graph: &'a DependencyGraph,
    now: DateTime<Utc>,
}

impl<'a> ReadinessView<'a> {
    pub fn new(graph: &'a DependencyGraph, now: DateTime<Utc>) -> Self {
        Self { graph, now }
    }

    /// The gate a node in `status` would pass next, if any.
    fn next_gate(status: Status) -> Option<Gate> {
        match status {
            Status::Pending | Status::OnHold => Some(Gate::Start),
            Status::InProgress => Some(Gate::Finish),
            Status::Completed | Status::Cancelled => None,
        }
    }

    /// Nodes that have not started and whose start constraints all hold.
    pub fn ready_to_start(&self) -> Vec<String> {
        let mut ready: Vec<String> = self
            .graph
            .nodes()
            .filter(|n| matches!(n.status, Status::Pending | Status::OnHold))
            .filter(|n| self.graph.can_start(&n.id, self.now).is_ok())
            .map(|n| n.id.clone())
            .collect();
        ready.sort();
        ready
    }

    /// Every node whose next gate is closed, with all reasons, sorted by id.
    pub fn blocked(&self) -> Vec<BlockedNode> {
        let mut blocked: Vec<BlockedNode> = self
            .graph
            .nodes()
            .filter_map(|n| {
                let gate = Self::next_gate(n.status)?;
                let reasons = self.graph.unmet_constraints(&n.id, gate, self.now);
                if reasons.is_empty() {
                    None
                } else {
                    Some(BlockedNode {
                        id: n.id.clone(),
                        gate,
                        reasons,
                    })
                }
            })
            .collect();
        blocked.sort_by(|a, b| a.id.cmp(&b.id));
        blocked
    }

    /// Direct dependents of `id` that could pass their next gate right now.
    ///
    /// Used after a predecessor completes to report which dependents became
    /// eligible; nothing is transitioned.
    pub fn eligible_dependents(&self, id: &str) -> Vec<String> {
        self.graph
            .dependents_of(id)
            .into_iter()
            .filter(|dep| {
                self.graph
                    .node(dep)
                    .and_then(|n| Self::next_gate(n.status))
                    .is_some_and(|gate| self.graph.check_gate(dep, gate, self.now).is_ok())
            })
            .map(str::to_string)
            .collect()
    }
}
