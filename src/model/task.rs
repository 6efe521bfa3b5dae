// src/model/task.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{default_weight, Dependency, MilestoneId, TaskId};
use crate::types::{Priority, Status};

/// Unit of work owned by exactly one milestone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(default)]
    pub milestone_id: MilestoneId,
    pub title: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub estimated_hours: Option<f64>,
    #[serde(default)]
    pub actual_hours: Option<f64>,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Outgoing edges to other tasks of the same booking.
    #[serde(default, rename = "dependency")]
    pub dependencies: Vec<Dependency>,
}

impl Task {
    /// A fresh `pending` task with default weight.
    pub fn new(
        id: impl Into<TaskId>,
        milestone_id: impl Into<MilestoneId>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            milestone_id: milestone_id.into(),
            title: title.into(),
            status: Status::Pending,
            priority: Priority::default(),
            estimated_hours: None,
            actual_hours: None,
            weight: default_weight(),
            started_at: None,
            completed_at: None,
            dependencies: Vec::new(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == Status::Completed
    }
}
