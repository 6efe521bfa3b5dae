// src/model/mod.rs

//! Entity model: plain data for milestones, tasks, dependency edges,
//! approvals and comments, plus the [`Booking`] aggregate that owns them.
//!
//! No lifecycle rules live here; those are in [`crate::progress`],
//! [`crate::dag`] and [`crate::engine`].

pub mod approval;
pub mod booking;
pub mod dependency;
pub mod milestone;
pub mod task;

pub use approval::{latest_approval, Approval};
pub use booking::{Booking, Comment, CommentTarget};
pub use dependency::{Dependency, MAX_LAG_DAYS};
pub use milestone::Milestone;
pub use task::Task;

/// Canonical id types used throughout the engine.
pub type BookingId = String;
pub type MilestoneId = String;
pub type TaskId = String;

/// Weight used for progress math: missing, zero, negative or non-finite
/// weights count as 1.
pub fn effective_weight(weight: f64) -> f64 {
    if weight.is_finite() && weight > 0.0 {
        weight
    } else {
        1.0
    }
}

pub(crate) fn default_weight() -> f64 {
    1.0
}
