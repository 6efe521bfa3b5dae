#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use milestone_engine::engine::refresh_derived;
use milestone_engine::model::{Approval, Booking, Comment, CommentTarget, Dependency, Milestone, Task};
use milestone_engine::store::MemoryStore;
use milestone_engine::types::{ApprovalStatus, DependencyType, Status};

/// Midnight UTC on the given day.
pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .expect("valid test date")
}

/// Builder for a [`Booking`] snapshot. Milestones get `order_index` in the
/// order they are added and derived fields are refreshed on `build`.
pub struct BookingBuilder {
    booking: Booking,
}

impl BookingBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            booking: Booking::new(id),
        }
    }

    pub fn milestone(mut self, builder: MilestoneBuilder) -> Self {
        let index = self.booking.milestones.len();
        let mut milestone = builder.build(&self.booking.id);
        milestone.order_index = index;
        self.booking.milestones.push(milestone);
        self
    }

    pub fn comment_on_milestone(mut self, id: &str, milestone_id: &str, body: &str) -> Self {
        self.push_comment(id, CommentTarget::Milestone(milestone_id.to_string()), body);
        self
    }

    pub fn comment_on_task(mut self, id: &str, task_id: &str, body: &str) -> Self {
        self.push_comment(id, CommentTarget::Task(task_id.to_string()), body);
        self
    }

    fn push_comment(&mut self, id: &str, target: CommentTarget, body: &str) {
        self.booking.comments.push(Comment {
            id: id.to_string(),
            target,
            author: "client".to_string(),
            body: body.to_string(),
            created_at: at(2024, 1, 1),
        });
    }

    pub fn build(self) -> Booking {
        let mut booking = self.booking;
        refresh_derived(&mut booking).expect("builder produced an invalid booking");
        booking
    }

    /// A [`MemoryStore`] seeded with the built booking.
    pub fn into_store(self) -> MemoryStore {
        let store = MemoryStore::new();
        store.insert(self.build()).expect("seed store");
        store
    }
}

/// Builder for a [`Milestone`].
pub struct MilestoneBuilder {
    milestone: Milestone,
}

impl MilestoneBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            milestone: Milestone::new(id, "", id, 0),
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.milestone.title = title.to_string();
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.milestone.status = status;
        self
    }

    pub fn weight(mut self, weight: f64) -> Self {
        self.milestone.weight = weight;
        self
    }

    pub fn estimated_hours(mut self, hours: f64) -> Self {
        self.milestone.estimated_hours = Some(hours);
        self
    }

    pub fn started_at(mut self, when: DateTime<Utc>) -> Self {
        self.milestone.started_at = Some(when);
        self
    }

    pub fn completed_at(mut self, when: DateTime<Utc>) -> Self {
        self.milestone.completed_at = Some(when);
        self
    }

    pub fn task(mut self, builder: TaskBuilder) -> Self {
        let task = builder.build(&self.milestone.id);
        self.milestone.tasks.push(task);
        self
    }

    /// Edge `this -> predecessor` with no lag.
    pub fn depends_on(self, predecessor: &str, dependency_type: DependencyType) -> Self {
        self.depends_on_with_lag(predecessor, dependency_type, 0)
    }

    pub fn depends_on_with_lag(mut self, predecessor: &str, dependency_type: DependencyType, lag_days: i64) -> Self {
        let id = format!("{}-on-{}", self.milestone.id, predecessor);
        self.milestone.dependencies.push(
            Dependency::new(id, self.milestone.id.clone(), predecessor, dependency_type).with_lag(lag_days),
        );
        self
    }

    pub fn approval(mut self, status: ApprovalStatus, feedback: Option<&str>, when: DateTime<Utc>) -> Self {
        let n = self.milestone.approvals.len() + 1;
        self.milestone.approvals.push(Approval {
            id: format!("{}-approval-{n}", self.milestone.id),
            milestone_id: self.milestone.id.clone(),
            status,
            feedback: feedback.map(str::to_string),
            created_at: when,
            updated_at: when,
        });
        self
    }

    pub fn build(self, booking_id: &str) -> Milestone {
        let mut milestone = self.milestone;
        milestone.booking_id = booking_id.to_string();
        milestone
    }
}

/// Builder for a [`Task`].
pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            task: Task::new(id, "", id),
        }
    }

    pub fn weight(mut self, weight: f64) -> Self {
        self.task.weight = weight;
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.task.status = status;
        self
    }

    pub fn completed(self) -> Self {
        self.status(Status::Completed)
    }

    pub fn hours(mut self, estimated: f64, actual: f64) -> Self {
        self.task.estimated_hours = Some(estimated);
        self.task.actual_hours = Some(actual);
        self
    }

    pub fn started_at(mut self, when: DateTime<Utc>) -> Self {
        self.task.started_at = Some(when);
        self
    }

    pub fn completed_at(mut self, when: DateTime<Utc>) -> Self {
        self.task.completed_at = Some(when);
        self
    }

    pub fn depends_on(mut self, predecessor: &str, dependency_type: DependencyType) -> Self {
        let id = format!("{}-on-{}", self.task.id, predecessor);
        self.task
            .dependencies
            .push(Dependency::new(id, self.task.id.clone(), predecessor, dependency_type));
        self
    }

    pub fn build(self, milestone_id: &str) -> Task {
        let mut task = self.task;
        task.milestone_id = milestone_id.to_string();
        task
    }
}
