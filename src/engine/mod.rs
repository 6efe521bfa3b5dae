// src/engine/mod.rs

//! Lifecycle rules for milestones and tasks.
//!
//! - [`transitions`]: the status state machines and the cascade from a task
//!   change into its owning milestone.
//! - [`approval`]: the client sign-off gate in front of milestone completion.
//! - [`sequence`]: dense `order_index` maintenance.
//! - [`lifecycle`]: creation, deletion and dependency edits on a snapshot.
//! - [`report`]: read-only derived view of a booking.
//! - [`handlers`]: the notification interface injected into the engine.
//! - [`core`]: [`MilestoneEngine`], which runs the above against a
//!   [`crate::store::BookingStore`] one atomic, versioned batch at a time.
//!
//! Everything except `core` is a pure function of the snapshot passed in.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::dag::{DependencyGraph, GraphScope};
use crate::errors::Result;
use crate::model::Booking;
use crate::progress::milestone_progress;
use crate::types::Role;

pub mod approval;
pub mod core;
pub mod handlers;
pub mod lifecycle;
pub mod report;
pub mod sequence;
pub mod transitions;

pub use approval::{ApprovalGate, GateState};
pub use self::core::{Caller, Committed, MilestoneEngine};
pub use handlers::{EngineEvent, EngineHandler, NoopHandler};
pub use report::{BookingReport, MilestoneReport};
pub use sequence::IndexAssignment;
pub use transitions::{Cascade, Evaluation, MilestoneTransition};

/// Behaviour switches for the engine.
///
/// ```toml
/// [settings]
/// require_approval = true
/// allow_progress_drift = false
/// enforce_task_dependencies = false
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct EngineSettings {
    /// Milestones need a client `approved` record before completing.
    #[serde(default = "default_require_approval")]
    pub require_approval: bool,

    /// Let a `completed` milestone fall back to `pending` when its progress
    /// recomputes to 0. Off by default: completion is durable.
    #[serde(default)]
    pub allow_progress_drift: bool,

    /// Guard task transitions with the task-scope dependency graph.
    #[serde(default)]
    pub enforce_task_dependencies: bool,
}

fn default_require_approval() -> bool {
    true
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            require_approval: default_require_approval(),
            allow_progress_drift: false,
            enforce_task_dependencies: false,
        }
    }
}

/// Who is acting, when, and under which settings.
#[derive(Debug, Clone, Copy)]
pub struct TransitionContext {
    pub actor: Role,
    pub now: DateTime<Utc>,
    pub settings: EngineSettings,
}

impl TransitionContext {
    pub fn new(actor: Role, now: DateTime<Utc>, settings: EngineSettings) -> Self {
        Self {
            actor,
            now,
            settings,
        }
    }

    pub fn approval_gate(&self) -> ApprovalGate {
        ApprovalGate::new(self.settings.require_approval)
    }
}

/// Recompute every derived field of a booking: milestone progress and the
/// critical-path flag.
pub fn refresh_derived(booking: &mut Booking) -> Result<()> {
    let critical = DependencyGraph::for_milestones(booking).critical_path()?;

    for milestone in booking.milestones.iter_mut() {
        let progress = milestone_progress(milestone);
        if progress != milestone.progress_percentage {
            debug!(
                milestone = %milestone.id,
                old = milestone.progress_percentage,
                new = progress,
                "progress recomputed"
            );
        }
        milestone.progress_percentage = progress;
        milestone.critical_path = critical.is_critical(&milestone.id);
    }

    Ok(())
}

/// Build the graph for a scope from a snapshot.
pub fn graph_for(booking: &Booking, scope: GraphScope) -> DependencyGraph {
    match scope {
        GraphScope::Milestones => DependencyGraph::for_milestones(booking),
        GraphScope::Tasks => DependencyGraph::for_tasks(booking),
    }
}
