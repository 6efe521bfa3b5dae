// src/progress.rs

//! Progress calculation.
//!
//! A milestone's percentage is derived from its tasks on every call; it is
//! never an authored value. All functions here are pure.

use tracing::warn;

use crate::model::{effective_weight, Booking, Milestone, Task};
use crate::types::Status;

/// Weighted completion percentage of a task list, in `0..=100`.
///
/// - no tasks: 0
/// - otherwise `round(100 * completed_weight / total_weight)`, with
///   non-positive weights counted as 1
/// - if the weights still sum to zero, a plain completed/total count is used
pub fn compute_progress(tasks: &[Task]) -> u8 {
    if tasks.is_empty() {
        return 0;
    }

    let mut total_weight = 0.0;
    let mut completed_weight = 0.0;
    for task in tasks {
        if !(task.weight.is_finite() && task.weight > 0.0) {
            warn!(task = %task.id, weight = task.weight, "non-positive task weight; counting as 1");
        }
        let weight = effective_weight(task.weight);
        total_weight += weight;
        if task.is_completed() {
            completed_weight += weight;
        }
    }

    if total_weight > 0.0 {
        return to_percentage(completed_weight / total_weight);
    }

    let completed = tasks.iter().filter(|t| t.is_completed()).count();
    to_percentage(completed as f64 / tasks.len() as f64)
}

/// Progress of a milestone from its current tasks.
pub fn milestone_progress(milestone: &Milestone) -> u8 {
    compute_progress(&milestone.tasks)
}

/// Booking-level rollup: weighted mean of milestone progress over all
/// non-cancelled milestones, using milestone `weight`.
pub fn booking_progress(booking: &Booking) -> u8 {
    let mut total_weight = 0.0;
    let mut weighted = 0.0;

    for milestone in booking
        .milestones
        .iter()
        .filter(|m| m.status != Status::Cancelled)
    {
        let weight = effective_weight(milestone.weight);
        total_weight += weight;
        weighted += weight * f64::from(milestone_progress(milestone));
    }

    if total_weight > 0.0 {
        to_percentage(weighted / total_weight / 100.0)
    } else {
        0
    }
}

/// Estimated and actual hours summed over a milestone's tasks.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HoursSummary {
    pub estimated: f64,
    pub actual: f64,
}

impl HoursSummary {
    /// Actual minus estimated; positive means over budget.
    pub fn variance(&self) -> f64 {
        self.actual - self.estimated
    }
}

pub fn hours_summary(milestone: &Milestone) -> HoursSummary {
    milestone
        .tasks
        .iter()
        .fold(HoursSummary::default(), |acc, task| HoursSummary {
            estimated: acc.estimated + task.estimated_hours.unwrap_or(0.0),
            actual: acc.actual + task.actual_hours.unwrap_or(0.0),
        })
}

fn to_percentage(fraction: f64) -> u8 {
    (fraction * 100.0).round().clamp(0.0, 100.0) as u8
}
