// src/dag/satisfaction.rs

//! Predecessor constraint checks.
//!
//! | type | predecessor event | gates dependent's |
//! |------|-------------------|-------------------|
//! | FS   | completion        | start             |
//! | SS   | start             | start             |
//! | FF   | completion        | completion        |
//! | SF   | start             | completion        |
//!
//! Lag is measured from the predecessor event's timestamp. With a positive
//! lag and no recorded timestamp the constraint does not hold.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::dag::graph::DependencyGraph;
use crate::errors::DenialReason;
use crate::model::Dependency;
use crate::types::Status;

/// The dependent event being gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Entering `in_progress`.
    Start,
    /// Entering `completed`.
    Finish,
}

impl Gate {
    fn covers(self, edge: &Dependency) -> bool {
        match self {
            Gate::Start => edge.dependency_type.gates_start(),
            Gate::Finish => !edge.dependency_type.gates_start(),
        }
    }
}

impl DependencyGraph {
    /// Whether one edge's constraint currently holds.
    pub fn check_edge(&self, edge: &Dependency, now: DateTime<Utc>) -> Result<(), DenialReason> {
        let predecessor = edge.depends_on_id.clone();
        let Some(pred) = self.node(&edge.depends_on_id) else {
            // Dangling edges are never satisfied.
            return Err(DenialReason::PredecessorNotFinished { predecessor });
        };

        let reference = if edge.dependency_type.waits_for_finish() {
            if pred.status != Status::Completed {
                return Err(DenialReason::PredecessorNotFinished { predecessor });
            }
            pred.completed_at
        } else {
            if !pred.status.has_started() {
                return Err(DenialReason::PredecessorNotStarted { predecessor });
            }
            pred.started_at
        };

        if edge.lag_days == 0 {
            return Ok(());
        }

        let Some(at) = reference else {
            return Err(DenialReason::MissingTimestamp {
                predecessor,
                lag_days: edge.lag_days,
            });
        };

        // An unrepresentable lag never elapses.
        match edge.lag().and_then(|lag| at.checked_add_signed(lag)) {
            None => Err(DenialReason::LagOutOfRange {
                predecessor,
                lag_days: edge.lag_days,
            }),
            Some(available_at) => {
                if now < available_at {
                    Err(DenialReason::LagNotElapsed {
                        predecessor,
                        available_at,
                    })
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Every unmet constraint of `id` for the given gate, in edge order.
    pub fn unmet_constraints(&self, id: &str, gate: Gate, now: DateTime<Utc>) -> Vec<DenialReason> {
        self.dependencies_of(id)
            .filter(|edge| gate.covers(edge))
            .filter_map(|edge| self.check_edge(edge, now).err())
            .collect()
    }

    /// First unmet constraint for `id` at `gate`, if any.
    pub fn check_gate(&self, id: &str, gate: Gate, now: DateTime<Utc>) -> Result<(), DenialReason> {
        match self.unmet_constraints(id, gate, now).into_iter().next() {
            Some(reason) => {
                debug!(node = %id, ?gate, %reason, "dependency gate closed");
                Err(reason)
            }
            None => Ok(()),
        }
    }

    pub fn can_start(&self, id: &str, now: DateTime<Utc>) -> Result<(), DenialReason> {
        self.check_gate(id, Gate::Start, now)
    }

    pub fn can_finish(&self, id: &str, now: DateTime<Utc>) -> Result<(), DenialReason> {
        self.check_gate(id, Gate::Finish, now)
    }
}
