// src/engine/report.rs

//! Read-only view of a booking at an instant, used by the CLI and by callers
//! that want every derived value in one place.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::dag::{DependencyGraph, ReadinessView};
use crate::engine::approval::{ApprovalGate, GateState};
use crate::engine::EngineSettings;
use crate::errors::{DenialReason, Result};
use crate::model::{Booking, BookingId, MilestoneId};
use crate::progress::{booking_progress, hours_summary, milestone_progress, HoursSummary};
use crate::types::Status;

#[derive(Debug, Clone, PartialEq)]
pub struct MilestoneReport {
    pub id: MilestoneId,
    pub title: String,
    pub order_index: usize,
    pub status: Status,
    pub progress: u8,
    /// In progress at 100% and held by the approval gate.
    pub awaiting_approval: bool,
    /// Feedback of the latest approval when it is a rejection.
    pub approval_feedback: Option<String>,
    pub critical: bool,
    /// Milestones whose edges point at this one.
    pub dependents: Vec<MilestoneId>,
    /// Unmet constraints of the next dependency gate.
    pub blocked: Vec<DenialReason>,
    pub hours: HoursSummary,
    pub progress_drift: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookingReport {
    pub booking_id: BookingId,
    pub version: u64,
    pub progress: u8,
    pub critical_path_hours: f64,
    /// In `order_index` order.
    pub milestones: Vec<MilestoneReport>,
}

impl BookingReport {
    pub fn build(booking: &Booking, settings: &EngineSettings, now: DateTime<Utc>) -> Result<Self> {
        let graph = DependencyGraph::for_milestones(booking);
        let critical = graph.critical_path()?;
        let gate = ApprovalGate::new(settings.require_approval);

        let mut blocked: HashMap<String, Vec<DenialReason>> = ReadinessView::new(&graph, now)
            .blocked()
            .into_iter()
            .map(|b| (b.id, b.reasons))
            .collect();

        let milestones = booking
            .ordered_milestones()
            .into_iter()
            .map(|m| {
                let progress = milestone_progress(m);
                let approval_feedback = match gate.evaluate(m) {
                    GateState::Rejected { feedback } => feedback,
                    _ => None,
                };
                MilestoneReport {
                    id: m.id.clone(),
                    title: m.title.clone(),
                    order_index: m.order_index,
                    status: m.status,
                    progress,
                    awaiting_approval: gate.is_pending_approval(m),
                    approval_feedback,
                    critical: critical.is_critical(&m.id),
                    dependents: graph.dependents_of(&m.id).into_iter().map(str::to_string).collect(),
                    blocked: blocked.remove(&m.id).unwrap_or_default(),
                    hours: hours_summary(m),
                    progress_drift: m.status == Status::Completed && progress < 100,
                }
            })
            .collect();

        Ok(Self {
            booking_id: booking.id.clone(),
            version: booking.version,
            progress: booking_progress(booking),
            critical_path_hours: critical.length_hours,
            milestones,
        })
    }

    pub fn milestone(&self, id: &str) -> Option<&MilestoneReport> {
        self.milestones.iter().find(|m| m.id == id)
    }
}

impl fmt::Display for MilestoneReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}) {} {}%",
            self.order_index, self.title, self.id, self.status, self.progress
        )?;
        if self.awaiting_approval {
            write!(f, " (pending approval)")?;
        }
        if self.critical {
            write!(f, " [critical]")?;
        }
        if self.progress_drift {
            write!(f, " [progress drift]")?;
        }
        if let Some(feedback) = &self.approval_feedback {
            write!(f, "\n      rejected: {feedback}")?;
        }
        if !self.dependents.is_empty() {
            write!(f, "\n      dependents: {}", self.dependents.join(", "))?;
        }
        for reason in &self.blocked {
            write!(f, "\n      blocked: {reason}")?;
        }
        if self.hours.estimated > 0.0 || self.hours.actual > 0.0 {
            write!(
                f,
                "\n      hours: {:.1} estimated, {:.1} actual",
                self.hours.estimated, self.hours.actual
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for BookingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "booking {} (version {}): {}% complete",
            self.booking_id, self.version, self.progress
        )?;
        if self.critical_path_hours > 0.0 {
            writeln!(f, "  critical path: {:.1}h", self.critical_path_hours)?;
        }
        for milestone in &self.milestones {
            writeln!(f, "  {milestone}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Dependency, Milestone, Task};
    use crate::types::DependencyType;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    fn booking() -> Booking {
        let mut b = Booking::new("b1");
        let mut a = Milestone::new("A", "b1", "Design", 0);
        a.status = Status::InProgress;
        let mut t = Task::new("a1", "A", "Wireframes");
        t.status = Status::Completed;
        t.estimated_hours = Some(4.0);
        a.tasks.push(t);

        let mut c = Milestone::new("C", "b1", "Launch", 1);
        c.tasks.push(Task::new("c1", "C", "Deploy"));
        c.dependencies
            .push(Dependency::new("d1", "C", "A", DependencyType::FinishToStart));

        b.milestones.push(c);
        b.milestones.push(a);
        b
    }

    #[test]
    fn report_lists_milestones_in_order_with_derived_fields() {
        let report = BookingReport::build(&booking(), &EngineSettings::default(), now()).unwrap();
        let ids: Vec<&str> = report.milestones.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "C"]);
        assert_eq!(report.progress, 50);

        let a = report.milestone("A").unwrap();
        assert!(a.awaiting_approval);
        assert_eq!(a.dependents, vec!["C".to_string()]);
        assert_eq!(a.hours.estimated, 4.0);

        let c = report.milestone("C").unwrap();
        assert_eq!(
            c.blocked,
            vec![DenialReason::PredecessorNotFinished {
                predecessor: "A".into()
            }]
        );

        let text = report.to_string();
        assert!(text.contains("(pending approval)"));
        assert!(text.contains("blocked: predecessor not finished: A"));
    }

    #[test]
    fn approval_off_means_nothing_is_awaiting() {
        let settings = EngineSettings {
            require_approval: false,
            ..EngineSettings::default()
        };
        let report = BookingReport::build(&booking(), &settings, now()).unwrap();
        assert!(!report.milestone("A").unwrap().awaiting_approval);
    }
}
