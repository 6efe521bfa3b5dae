// src/model/booking.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, EntityKind, Result};
use crate::model::{BookingId, Milestone, MilestoneId, Task, TaskId};

/// What a comment is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum CommentTarget {
    Milestone(MilestoneId),
    Task(TaskId),
}

/// A discussion entry. Carried so that deletes can cascade; the engine does
/// not interpret comment bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub target: CommentTarget,
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Snapshot of everything the engine reasons about for one booking.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    /// Optimistic concurrency token, bumped once per committed batch.
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Booking {
    pub fn new(id: impl Into<BookingId>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn milestone(&self, id: &str) -> Option<&Milestone> {
        self.milestones.iter().find(|m| m.id == id)
    }

    pub fn milestone_mut(&mut self, id: &str) -> Option<&mut Milestone> {
        self.milestones.iter_mut().find(|m| m.id == id)
    }

    pub fn require_milestone(&self, id: &str) -> Result<&Milestone> {
        self.milestone(id)
            .ok_or_else(|| EngineError::not_found(EntityKind::Milestone, id))
    }

    pub fn require_milestone_mut(&mut self, id: &str) -> Result<&mut Milestone> {
        self.milestone_mut(id)
            .ok_or_else(|| EngineError::not_found(EntityKind::Milestone, id))
    }

    /// All tasks of the booking, across milestones.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.milestones.iter().flat_map(|m| m.tasks.iter())
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks().find(|t| t.id == id)
    }

    /// The milestone owning the given task.
    pub fn owner_of_task(&self, task_id: &str) -> Option<&Milestone> {
        self.milestones
            .iter()
            .find(|m| m.tasks.iter().any(|t| t.id == task_id))
    }

    /// Milestones sorted by `order_index`.
    pub fn ordered_milestones(&self) -> Vec<&Milestone> {
        let mut ordered: Vec<&Milestone> = self.milestones.iter().collect();
        ordered.sort_by_key(|m| m.order_index);
        ordered
    }
}
