// src/model/milestone.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{default_weight, Approval, BookingId, Dependency, MilestoneId, Task};
use crate::types::{Priority, RiskLevel, Status};

/// A phase of a booking, owning its tasks and outgoing dependency edges.
///
/// `progress_percentage` and `critical_path` are derived values. They are
/// refreshed by the engine from current task and graph state and are never
/// trusted as input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: MilestoneId,
    #[serde(default)]
    pub booking_id: BookingId,
    pub title: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub estimated_hours: Option<f64>,
    #[serde(default)]
    pub actual_hours: Option<f64>,
    #[serde(default)]
    pub progress_percentage: u8,
    #[serde(default)]
    pub critical_path: bool,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub order_index: usize,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "task")]
    pub tasks: Vec<Task>,
    /// Outgoing edges: milestones this one depends on.
    #[serde(default, rename = "dependency")]
    pub dependencies: Vec<Dependency>,
    /// Approval history, in insertion order.
    #[serde(default, rename = "approval")]
    pub approvals: Vec<Approval>,
}

impl Milestone {
    /// A fresh `pending` milestone at the given position.
    pub fn new(
        id: impl Into<MilestoneId>,
        booking_id: impl Into<BookingId>,
        title: impl Into<String>,
        order_index: usize,
    ) -> Self {
        Self {
            id: id.into(),
            booking_id: booking_id.into(),
            title: title.into(),
            status: Status::Pending,
            priority: Priority::default(),
            risk_level: RiskLevel::default(),
            start_date: None,
            due_date: None,
            estimated_hours: None,
            actual_hours: None,
            progress_percentage: 0,
            critical_path: false,
            weight: default_weight(),
            order_index,
            started_at: None,
            completed_at: None,
            tasks: Vec::new(),
            dependencies: Vec::new(),
            approvals: Vec::new(),
        }
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    pub fn task_mut(&mut self, task_id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == task_id)
    }

    /// Estimated duration in hours used for critical-path math.
    ///
    /// Falls back to the sum of task estimates, then to the planned date span
    /// (8 hours per day), then to zero.
    pub fn planned_hours(&self) -> f64 {
        if let Some(hours) = self.estimated_hours.filter(|h| h.is_finite() && *h > 0.0) {
            return hours;
        }
        let from_tasks: f64 = self
            .tasks
            .iter()
            .filter_map(|t| t.estimated_hours)
            .filter(|h| h.is_finite() && *h > 0.0)
            .sum();
        if from_tasks > 0.0 {
            return from_tasks;
        }
        match (self.start_date, self.due_date) {
            (Some(start), Some(due)) if due >= start => {
                ((due - start).num_days() + 1) as f64 * 8.0
            }
            _ => 0.0,
        }
    }
}
