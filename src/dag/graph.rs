// src/dag/graph.rs

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::errors::{EngineError, EntityKind, Result};
use crate::model::{Booking, Dependency, Milestone, Task};
use crate::types::Status;

/// Which entity family a graph covers. Milestone and task edges never mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphScope {
    Milestones,
    Tasks,
}

impl GraphScope {
    pub fn entity_kind(self) -> EntityKind {
        match self {
            GraphScope::Milestones => EntityKind::Milestone,
            GraphScope::Tasks => EntityKind::Task,
        }
    }

    fn noun(self) -> &'static str {
        match self {
            GraphScope::Milestones => "milestone",
            GraphScope::Tasks => "task",
        }
    }
}

/// The per-node state the graph needs for satisfaction and scheduling.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub id: String,
    pub status: Status,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub planned_hours: f64,
}

impl GraphNode {
    fn from_milestone(m: &Milestone) -> Self {
        Self {
            id: m.id.clone(),
            status: m.status,
            started_at: m.started_at,
            completed_at: m.completed_at,
            planned_hours: m.planned_hours(),
        }
    }

    fn from_task(t: &Task) -> Self {
        Self {
            id: t.id.clone(),
            status: t.status,
            started_at: t.started_at,
            completed_at: t.completed_at,
            planned_hours: t.estimated_hours.filter(|h| h.is_finite() && *h > 0.0).unwrap_or(0.0),
        }
    }
}

/// Edge set for one scope of a booking.
///
/// Edges point from the dependent (`source_id`) to its predecessor
/// (`depends_on_id`). Dependents are always derived by scanning edges.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    scope: GraphScope,
    nodes: HashMap<String, GraphNode>,
    edges: Vec<Dependency>,
}

impl DependencyGraph {
    /// An empty graph over the given nodes.
    pub fn new(scope: GraphScope, nodes: impl IntoIterator<Item = GraphNode>) -> Self {
        Self {
            scope,
            nodes: nodes.into_iter().map(|n| (n.id.clone(), n)).collect(),
            edges: Vec::new(),
        }
    }

    /// Graph of a booking's milestones and their stored edges.
    ///
    /// Stored edges are trusted (they were validated on insertion); use
    /// [`DependencyGraph::insert_edge`] for new ones.
    pub fn for_milestones(booking: &Booking) -> Self {
        let mut graph = Self::new(
            GraphScope::Milestones,
            booking.milestones.iter().map(GraphNode::from_milestone),
        );
        graph.edges = booking
            .milestones
            .iter()
            .flat_map(|m| m.dependencies.iter().cloned())
            .collect();
        graph
    }

    /// Graph of all tasks of a booking and their stored edges.
    pub fn for_tasks(booking: &Booking) -> Self {
        let mut graph = Self::new(GraphScope::Tasks, booking.tasks().map(GraphNode::from_task));
        graph.edges = booking
            .tasks()
            .flat_map(|t| t.dependencies.iter().cloned())
            .collect();
        graph
    }

    pub fn scope(&self) -> GraphScope {
        self.scope
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    pub fn edges(&self) -> &[Dependency] {
        &self.edges
    }

    /// Outgoing edges of `id`: the constraints it must respect.
    pub fn dependencies_of<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Dependency> + 'a {
        self.edges.iter().filter(move |e| e.source_id == id)
    }

    /// Ids of nodes that depend on `id`, in edge order without duplicates.
    pub fn dependents_of(&self, id: &str) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.edges
            .iter()
            .filter(|e| e.depends_on_id == id)
            .map(|e| e.source_id.as_str())
            .filter(|s| seen.insert(*s))
            .collect()
    }

    /// Depth-first reachability from `from` following outgoing edges.
    pub fn reaches(&self, from: &str, to: &str) -> bool {
        let mut stack: Vec<&str> = vec![from];
        let mut visited: HashSet<&str> = HashSet::new();

        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            stack.extend(
                self.edges
                    .iter()
                    .filter(|e| e.source_id == current)
                    .map(|e| e.depends_on_id.as_str()),
            );
        }

        false
    }

    /// Whether adding `source -> depends_on` would close a cycle.
    ///
    /// A self edge is the degenerate case: `depends_on` trivially reaches
    /// `source`.
    pub fn would_create_cycle(&self, source: &str, depends_on: &str) -> bool {
        self.reaches(depends_on, source)
    }

    /// Check a candidate edge against the current graph without storing it.
    pub fn validate_edge(&self, edge: &Dependency) -> Result<()> {
        let kind = self.scope.entity_kind();
        let noun = self.scope.noun();

        for id in [&edge.source_id, &edge.depends_on_id] {
            if !self.contains(id) {
                return Err(EngineError::not_found(kind, id.as_str()));
            }
        }

        edge.check_lag()?;

        if self.edges.iter().any(|e| e.id == edge.id) {
            return Err(EngineError::Validation(format!(
                "dependency id '{}' already exists",
                edge.id
            )));
        }

        if self.edges.iter().any(|e| e.same_link(edge)) {
            return Err(EngineError::Validation(format!(
                "{noun} '{}' already has a {} dependency on '{}'",
                edge.source_id, edge.dependency_type, edge.depends_on_id
            )));
        }

        if self.would_create_cycle(&edge.source_id, &edge.depends_on_id) {
            return Err(EngineError::Validation(format!(
                "dependency {noun} '{}' -> '{}' would create a cycle",
                edge.source_id, edge.depends_on_id
            )));
        }

        Ok(())
    }

    /// Validate and store an edge. On error the graph is unchanged.
    pub fn insert_edge(&mut self, edge: Dependency) -> Result<()> {
        self.validate_edge(&edge)?;
        debug!(
            source = %edge.source_id,
            depends_on = %edge.depends_on_id,
            dependency_type = %edge.dependency_type,
            lag_days = edge.lag_days,
            "dependency edge accepted"
        );
        self.edges.push(edge);
        Ok(())
    }

    /// Remove an edge by id.
    pub fn remove_edge(&mut self, edge_id: &str) -> Result<Dependency> {
        let pos = self
            .edges
            .iter()
            .position(|e| e.id == edge_id)
            .ok_or_else(|| EngineError::not_found(EntityKind::Dependency, edge_id))?;
        Ok(self.edges.remove(pos))
    }
}
