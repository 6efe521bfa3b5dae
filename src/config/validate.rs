// src/config/validate.rs

use std::collections::HashSet;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::config::model::{BookingFile, RawBookingFile, RawMilestone};
use crate::engine::{refresh_derived, ApprovalGate, EngineSettings, GateState};
use crate::errors::{EngineError, Result};
use crate::model::{Booking, CommentTarget, Dependency};
use crate::types::Status;

impl TryFrom<RawBookingFile> for BookingFile {
    type Error = EngineError;

    fn try_from(raw: RawBookingFile) -> std::result::Result<Self, Self::Error> {
        let settings = raw.settings;
        let (positions, milestones): (Vec<_>, Vec<_>) = raw
            .milestone
            .into_iter()
            .map(|RawMilestone { order_index, milestone }| (order_index, milestone))
            .unzip();
        let mut booking = Booking {
            id: raw.booking.id,
            version: raw.booking.version,
            milestones,
            comments: raw.comment,
        };

        place_milestones(&mut booking, &positions)?;
        validate_booking(&mut booking, &settings)?;
        refresh_derived(&mut booking)?;
        debug!(booking = %booking.id, milestones = booking.milestones.len(), "booking file validated");

        Ok(BookingFile::new_unchecked(settings, booking))
    }
}

/// Fill ownership fields left out of the file and check every invariant the
/// engine relies on.
pub fn validate_booking(booking: &mut Booking, settings: &EngineSettings) -> Result<()> {
    if booking.id.trim().is_empty() {
        return Err(invalid("[booking].id must not be empty"));
    }
    adopt_children(booking)?;
    ensure_unique_ids(booking)?;
    check_order(booking)?;
    validate_edges(booking)?;
    validate_dag(booking)?;
    validate_comments(booking)?;
    validate_completed_milestones(booking, settings)?;
    Ok(())
}

fn invalid(msg: impl Into<String>) -> EngineError {
    EngineError::Validation(msg.into())
}

/// Fill or check the back-references from children to their owners.
fn adopt_children(booking: &mut Booking) -> Result<()> {
    fn adopt(slot: &mut String, owner: &str, what: &str, id: &str) -> Result<()> {
        if slot.is_empty() {
            *slot = owner.to_string();
        } else if slot != owner {
            return Err(invalid(format!(
                "{what} '{id}' names '{slot}' as its owner but is nested under '{owner}'"
            )));
        }
        Ok(())
    }

    let booking_id = booking.id.clone();
    for milestone in booking.milestones.iter_mut() {
        adopt(&mut milestone.booking_id, &booking_id, "milestone", &milestone.id)?;
        let mid = milestone.id.clone();

        for edge in milestone.dependencies.iter_mut() {
            adopt(&mut edge.source_id, &mid, "dependency", &edge.id)?;
        }
        for approval in milestone.approvals.iter_mut() {
            adopt(&mut approval.milestone_id, &mid, "approval", &approval.id)?;
        }
        for task in milestone.tasks.iter_mut() {
            adopt(&mut task.milestone_id, &mid, "task", &task.id)?;
            let tid = task.id.clone();
            for edge in task.dependencies.iter_mut() {
                adopt(&mut edge.source_id, &tid, "dependency", &edge.id)?;
            }
        }
    }
    Ok(())
}

/// Milestone and task ids share one namespace per booking.
fn ensure_unique_ids(booking: &Booking) -> Result<()> {
    let mut seen = HashSet::new();
    let entity_ids = booking
        .milestones
        .iter()
        .map(|m| m.id.as_str())
        .chain(booking.tasks().map(|t| t.id.as_str()));
    for id in entity_ids {
        if id.trim().is_empty() {
            return Err(invalid("milestone and task ids must not be empty"));
        }
        if !seen.insert(id) {
            return Err(invalid(format!("id '{id}' is used more than once")));
        }
    }

    let mut seen = HashSet::new();
    for milestone in &booking.milestones {
        for approval in &milestone.approvals {
            if !seen.insert(approval.id.as_str()) {
                return Err(invalid(format!("approval id '{}' is used more than once", approval.id)));
            }
        }
    }
    Ok(())
}

/// Apply the positions read from a file. Either every milestone names one or
/// none does, and then file order is used.
fn place_milestones(booking: &mut Booking, positions: &[Option<usize>]) -> Result<()> {
    if positions.iter().all(Option::is_none) {
        for (index, milestone) in booking.milestones.iter_mut().enumerate() {
            milestone.order_index = index;
        }
        return Ok(());
    }

    for (milestone, position) in booking.milestones.iter_mut().zip(positions) {
        match position {
            Some(index) => milestone.order_index = *index,
            None => {
                return Err(invalid(format!(
                    "milestone '{}' has no order_index while others do",
                    milestone.id
                )));
            }
        }
    }
    Ok(())
}

/// `order_index` must be a permutation of `0..N`.
fn check_order(booking: &Booking) -> Result<()> {
    let n = booking.milestones.len();
    let mut taken = vec![false; n];
    for milestone in &booking.milestones {
        let index = milestone.order_index;
        if index >= n {
            return Err(invalid(format!(
                "milestone '{}' has order_index {index}, expected a value below {n}",
                milestone.id
            )));
        }
        if std::mem::replace(&mut taken[index], true) {
            return Err(invalid(format!(
                "order_index {index} is used by more than one milestone"
            )));
        }
    }
    Ok(())
}

fn check_edges<'a>(
    scope: &str,
    known: &HashSet<&str>,
    edges: impl Iterator<Item = &'a Dependency>,
) -> Result<()> {
    let mut ids = HashSet::new();
    for edge in edges {
        if !ids.insert(edge.id.as_str()) {
            return Err(invalid(format!("{scope} dependency id '{}' is used more than once", edge.id)));
        }
        if !known.contains(edge.depends_on_id.as_str()) {
            return Err(invalid(format!(
                "{scope} '{}' has unknown dependency '{}'",
                edge.source_id, edge.depends_on_id
            )));
        }
        if edge.source_id == edge.depends_on_id {
            return Err(invalid(format!("{scope} '{}' cannot depend on itself", edge.source_id)));
        }
        edge.check_lag()?;
    }
    Ok(())
}

fn validate_edges(booking: &Booking) -> Result<()> {
    let milestone_ids: HashSet<&str> = booking.milestones.iter().map(|m| m.id.as_str()).collect();
    check_edges(
        "milestone",
        &milestone_ids,
        booking.milestones.iter().flat_map(|m| m.dependencies.iter()),
    )?;

    let task_ids: HashSet<&str> = booking.tasks().map(|t| t.id.as_str()).collect();
    check_edges("task", &task_ids, booking.tasks().flat_map(|t| t.dependencies.iter()))
}

fn ensure_acyclic<'a>(
    scope: &str,
    nodes: impl Iterator<Item = &'a str>,
    edges: impl Iterator<Item = &'a Dependency>,
) -> Result<()> {
    // Edge direction: predecessor -> dependent.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for node in nodes {
        graph.add_node(node);
    }
    for edge in edges {
        graph.add_edge(edge.depends_on_id.as_str(), edge.source_id.as_str(), ());
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(invalid(format!(
            "cycle detected in {scope} dependencies involving '{}'",
            cycle.node_id()
        ))),
    }
}

fn validate_dag(booking: &Booking) -> Result<()> {
    ensure_acyclic(
        "milestone",
        booking.milestones.iter().map(|m| m.id.as_str()),
        booking.milestones.iter().flat_map(|m| m.dependencies.iter()),
    )?;
    ensure_acyclic(
        "task",
        booking.tasks().map(|t| t.id.as_str()),
        booking.tasks().flat_map(|t| t.dependencies.iter()),
    )
}

fn validate_comments(booking: &Booking) -> Result<()> {
    let mut ids = HashSet::new();
    for comment in &booking.comments {
        if !ids.insert(comment.id.as_str()) {
            return Err(invalid(format!("comment id '{}' is used more than once", comment.id)));
        }
        let resolves = match &comment.target {
            CommentTarget::Milestone(id) => booking.milestone(id).is_some(),
            CommentTarget::Task(id) => booking.task(id).is_some(),
        };
        if !resolves {
            return Err(invalid(format!("comment '{}' points at an unknown entity", comment.id)));
        }
    }
    Ok(())
}

/// A snapshot must not contain a completed milestone the gate would refuse.
fn validate_completed_milestones(booking: &Booking, settings: &EngineSettings) -> Result<()> {
    let gate = ApprovalGate::new(settings.require_approval);
    for milestone in booking.milestones.iter().filter(|m| m.status == Status::Completed) {
        if gate.evaluate(milestone) != GateState::Cleared {
            return Err(invalid(format!(
                "milestone '{}' is completed but has no approval on record",
                milestone.id
            )));
        }
    }
    Ok(())
}
