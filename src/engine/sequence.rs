// src/engine/sequence.rs

//! Milestone ordering.
//!
//! `order_index` over a booking's milestones is always a dense permutation of
//! `0..N`. Every operation validates its whole input first and then rewrites
//! all indices in one pass, so a failed call leaves the snapshot untouched.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::errors::{EngineError, EntityKind, Result};
use crate::model::{Booking, MilestoneId};

/// One entry of a full index assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexAssignment {
    pub milestone_id: MilestoneId,
    pub order_index: usize,
}

/// Index a newly created milestone should take.
pub fn next_order_index(booking: &Booking) -> usize {
    booking.milestones.len()
}

/// Whether indices form exactly `0..N`.
pub fn is_dense(booking: &Booking) -> bool {
    let mut indices: Vec<usize> = booking.milestones.iter().map(|m| m.order_index).collect();
    indices.sort_unstable();
    indices.iter().enumerate().all(|(i, idx)| i == *idx)
}

/// Current order of milestone ids, ties broken by id.
fn current_order(booking: &Booking) -> Vec<MilestoneId> {
    let mut ordered: Vec<(usize, &str)> = booking
        .milestones
        .iter()
        .map(|m| (m.order_index, m.id.as_str()))
        .collect();
    ordered.sort();
    ordered.into_iter().map(|(_, id)| id.to_string()).collect()
}

/// Rewrite every index to match `order` (which must list every milestone).
fn assign(booking: &mut Booking, order: &[MilestoneId]) -> Vec<IndexAssignment> {
    for (index, id) in order.iter().enumerate() {
        if let Some(m) = booking.milestone_mut(id) {
            if m.order_index != index {
                debug!(milestone = %id, from = m.order_index, to = index, "order_index reassigned");
            }
            m.order_index = index;
        }
    }
    order
        .iter()
        .enumerate()
        .map(|(order_index, id)| IndexAssignment {
            milestone_id: id.clone(),
            order_index,
        })
        .collect()
}

/// Reassign indices to follow `ordered_ids`.
///
/// Listed milestones take positions `0..k` in the given order; any milestone
/// not listed keeps its current relative order after them.
pub fn reorder(booking: &mut Booking, ordered_ids: &[MilestoneId]) -> Result<Vec<IndexAssignment>> {
    let mut seen = HashSet::new();
    for id in ordered_ids {
        if booking.milestone(id).is_none() {
            return Err(EngineError::not_found(EntityKind::Milestone, id.as_str()));
        }
        if !seen.insert(id.as_str()) {
            return Err(EngineError::Validation(format!(
                "milestone '{id}' listed more than once in reorder request"
            )));
        }
    }

    let mut order: Vec<MilestoneId> = ordered_ids.to_vec();
    order.extend(
        current_order(booking)
            .into_iter()
            .filter(|id| !seen.contains(id.as_str())),
    );

    let assignment = assign(booking, &order);
    info!(booking = %booking.id, milestones = assignment.len(), "milestones reordered");
    Ok(assignment)
}

/// Swap a milestone with the neighbour above or below it. Moving past either
/// end is a no-op.
fn shift(booking: &mut Booking, milestone_id: &str, up: bool) -> Result<Vec<IndexAssignment>> {
    let mut order = current_order(booking);
    let pos = order
        .iter()
        .position(|id| id == milestone_id)
        .ok_or_else(|| EngineError::not_found(EntityKind::Milestone, milestone_id))?;

    let neighbour = if up { pos.checked_sub(1) } else { Some(pos + 1).filter(|n| *n < order.len()) };
    if let Some(other) = neighbour {
        order.swap(pos, other);
    } else {
        debug!(milestone = %milestone_id, up, "milestone already at the edge; nothing to move");
    }

    Ok(assign(booking, &order))
}

pub fn move_up(booking: &mut Booking, milestone_id: &str) -> Result<Vec<IndexAssignment>> {
    shift(booking, milestone_id, true)
}

pub fn move_down(booking: &mut Booking, milestone_id: &str) -> Result<Vec<IndexAssignment>> {
    shift(booking, milestone_id, false)
}

/// Close gaps and duplicates left by deletions, keeping the current order.
pub fn normalize(booking: &mut Booking) -> Vec<IndexAssignment> {
    let order = current_order(booking);
    assign(booking, &order)
}
