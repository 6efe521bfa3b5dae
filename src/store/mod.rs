// src/store/mod.rs

//! Persistence seam.
//!
//! The engine never owns storage. It loads a [`Booking`] snapshot from a
//! [`BookingStore`], works on a copy, and hands back one [`WriteBatch`]
//! together with the version it read. The store must apply the whole batch
//! atomically or reject it; a stale version is a
//! [`EngineError::ConcurrencyConflict`].

use std::fmt::Debug;

use crate::errors::{EngineError, EntityKind, Result};
use crate::model::{Booking, Comment, Milestone, MilestoneId};

pub mod memory;

pub use memory::MemoryStore;

/// Abstract booking storage.
pub trait BookingStore: Send + Sync + Debug {
    /// Current snapshot of a booking, including its version.
    fn load(&self, booking_id: &str) -> Result<Booking>;

    /// Apply `batch` if the stored version still equals `expected_version`.
    ///
    /// Returns the new version.
    fn commit(&self, booking_id: &str, expected_version: u64, batch: WriteBatch) -> Result<u64>;
}

/// A single logical write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Insert or replace a milestone with everything it owns.
    UpsertMilestone(Milestone),
    DeleteMilestone(MilestoneId),
    SetOrderIndex {
        milestone_id: MilestoneId,
        order_index: usize,
    },
    PutComment(Comment),
    DeleteComment(String),
}

/// Writes that must land together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: WriteOp) {
        self.ops.push(op);
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// The minimal batch turning `before` into `after`.
    ///
    /// A milestone that differs only in `order_index` becomes a
    /// [`WriteOp::SetOrderIndex`]; any other change rewrites it whole.
    pub fn diff(before: &Booking, after: &Booking) -> Self {
        let mut batch = WriteBatch::new();

        for milestone in &after.milestones {
            match before.milestone(&milestone.id) {
                None => batch.push(WriteOp::UpsertMilestone(milestone.clone())),
                Some(old) if old == milestone => {}
                Some(old) => {
                    let mut moved = old.clone();
                    moved.order_index = milestone.order_index;
                    if &moved == milestone {
                        batch.push(WriteOp::SetOrderIndex {
                            milestone_id: milestone.id.clone(),
                            order_index: milestone.order_index,
                        });
                    } else {
                        batch.push(WriteOp::UpsertMilestone(milestone.clone()));
                    }
                }
            }
        }

        for old in &before.milestones {
            if after.milestone(&old.id).is_none() {
                batch.push(WriteOp::DeleteMilestone(old.id.clone()));
            }
        }

        for comment in &after.comments {
            if !before.comments.contains(comment) {
                batch.push(WriteOp::PutComment(comment.clone()));
            }
        }
        for old in &before.comments {
            if !after.comments.iter().any(|c| c.id == old.id) {
                batch.push(WriteOp::DeleteComment(old.id.clone()));
            }
        }

        batch
    }

    /// Apply every op to `booking`, failing on the first op that does not fit.
    ///
    /// Callers apply to a scratch copy so that a failure leaves the original
    /// untouched.
    pub fn apply_to(&self, booking: &mut Booking) -> Result<()> {
        for op in &self.ops {
            match op {
                WriteOp::UpsertMilestone(milestone) => match booking.milestone_mut(&milestone.id) {
                    Some(existing) => *existing = milestone.clone(),
                    None => booking.milestones.push(milestone.clone()),
                },
                WriteOp::DeleteMilestone(id) => {
                    let before = booking.milestones.len();
                    booking.milestones.retain(|m| &m.id != id);
                    if booking.milestones.len() == before {
                        return Err(EngineError::not_found(EntityKind::Milestone, id.as_str()));
                    }
                }
                WriteOp::SetOrderIndex {
                    milestone_id,
                    order_index,
                } => {
                    booking.require_milestone_mut(milestone_id)?.order_index = *order_index;
                }
                WriteOp::PutComment(comment) => {
                    match booking.comments.iter_mut().find(|c| c.id == comment.id) {
                        Some(existing) => *existing = comment.clone(),
                        None => booking.comments.push(comment.clone()),
                    }
                }
                WriteOp::DeleteComment(id) => booking.comments.retain(|c| &c.id != id),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booking(ids: &[&str]) -> Booking {
        let mut b = Booking::new("b1");
        for (i, id) in ids.iter().enumerate() {
            b.milestones.push(Milestone::new(*id, "b1", *id, i));
        }
        b
    }

    #[test]
    fn index_only_changes_become_set_order_index() {
        let before = booking(&["A", "B"]);
        let mut after = before.clone();
        after.milestones[0].order_index = 1;
        after.milestones[1].order_index = 0;

        let batch = WriteBatch::diff(&before, &after);
        assert_eq!(batch.len(), 2);
        assert!(batch
            .ops()
            .iter()
            .all(|op| matches!(op, WriteOp::SetOrderIndex { .. })));
    }

    #[test]
    fn diff_then_apply_reproduces_after() {
        let before = booking(&["A", "B", "C"]);
        let mut after = before.clone();
        after.milestones.remove(1);
        after.milestones[1].order_index = 1;
        after.milestones[0].title = "Renamed".into();
        after.milestones.push(Milestone::new("D", "b1", "D", 2));

        let batch = WriteBatch::diff(&before, &after);
        let mut replay = before.clone();
        batch.apply_to(&mut replay).unwrap();

        let mut got: Vec<_> = replay.milestones.iter().map(|m| (m.id.clone(), m.order_index, m.title.clone())).collect();
        let mut want: Vec<_> = after.milestones.iter().map(|m| (m.id.clone(), m.order_index, m.title.clone())).collect();
        got.sort();
        want.sort();
        assert_eq!(got, want);
    }

    #[test]
    fn unchanged_snapshot_is_an_empty_batch() {
        let b = booking(&["A"]);
        assert!(WriteBatch::diff(&b, &b).is_empty());
    }
}
