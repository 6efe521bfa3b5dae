// src/engine/approval.rs

//! Client sign-off gate.
//!
//! Only providers request completion (and may open a `pending` approval
//! request); only clients record `approved` / `rejected`. The most recent
//! record by creation time is authoritative. When approval is not required
//! the gate is always cleared and records are informational.
//!
//! A completed milestone takes no new records: its latest approval must stay
//! `approved`, so it has to be reopened first.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::errors::{DenialReason, EngineError, Result};
use crate::model::{latest_approval, Approval, Milestone};
use crate::progress::milestone_progress;
use crate::types::{ApprovalStatus, Role, Status};

/// What the gate says about a milestone right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    Cleared,
    AwaitingApproval,
    Rejected { feedback: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalGate {
    require_approval: bool,
}

impl ApprovalGate {
    pub fn new(require_approval: bool) -> Self {
        Self { require_approval }
    }

    pub fn requires_approval(&self) -> bool {
        self.require_approval
    }

    pub fn evaluate(&self, milestone: &Milestone) -> GateState {
        if !self.require_approval {
            return GateState::Cleared;
        }

        match latest_approval(&milestone.approvals) {
            Some(a) if a.status == ApprovalStatus::Approved => GateState::Cleared,
            Some(a) if a.status == ApprovalStatus::Rejected => GateState::Rejected {
                feedback: a.feedback.clone(),
            },
            _ => GateState::AwaitingApproval,
        }
    }

    /// Gate as a guard result.
    pub fn check(&self, milestone: &Milestone) -> std::result::Result<(), DenialReason> {
        match self.evaluate(milestone) {
            GateState::Cleared => Ok(()),
            GateState::AwaitingApproval => Err(DenialReason::AwaitingApproval),
            GateState::Rejected { feedback } => Err(DenialReason::ApprovalRejected { feedback }),
        }
    }

    /// The externally visible "pending approval" qualifier: all work is done
    /// but the milestone is held at `in_progress` by the gate.
    pub fn is_pending_approval(&self, milestone: &Milestone) -> bool {
        milestone.status == Status::InProgress
            && milestone_progress(milestone) == 100
            && self.evaluate(milestone) != GateState::Cleared
    }

    /// Append a client decision to the milestone's history.
    ///
    /// Accepted at any progress; it only matters once progress is 100.
    pub fn submit(
        &self,
        milestone: &mut Milestone,
        status: ApprovalStatus,
        feedback: Option<String>,
        actor: Role,
        now: DateTime<Utc>,
    ) -> Result<Approval> {
        if actor != Role::Client {
            return Err(DenialReason::RoleNotPermitted {
                role: actor,
                action: "submit an approval",
            }
            .into());
        }
        ensure_open(milestone)?;
        if status == ApprovalStatus::Pending {
            return Err(EngineError::Validation(
                "an approval decision must be approved or rejected".to_string(),
            ));
        }

        Ok(self.append(milestone, status, feedback, now))
    }

    /// Open a `pending` approval request on behalf of the provider.
    pub fn request(&self, milestone: &mut Milestone, actor: Role, now: DateTime<Utc>) -> Result<Approval> {
        if actor != Role::Provider {
            return Err(DenialReason::RoleNotPermitted {
                role: actor,
                action: "request an approval",
            }
            .into());
        }
        ensure_open(milestone)?;
        if latest_approval(&milestone.approvals).is_some_and(|a| a.status == ApprovalStatus::Pending) {
            return Err(EngineError::Validation(format!(
                "milestone '{}' already has an open approval request",
                milestone.id
            )));
        }

        Ok(self.append(milestone, ApprovalStatus::Pending, None, now))
    }

    fn append(
        &self,
        milestone: &mut Milestone,
        status: ApprovalStatus,
        feedback: Option<String>,
        now: DateTime<Utc>,
    ) -> Approval {
        let approval = Approval {
            id: format!("{}-approval-{}", milestone.id, milestone.approvals.len() + 1),
            milestone_id: milestone.id.clone(),
            status,
            feedback,
            created_at: now,
            updated_at: now,
        };
        info!(
            milestone = %milestone.id,
            approval = %approval.id,
            status = %approval.status,
            "approval recorded"
        );
        milestone.approvals.push(approval.clone());
        approval
    }
}

fn ensure_open(milestone: &Milestone) -> Result<()> {
    if milestone.status == Status::Completed {
        return Err(DenialReason::MilestoneCompleted.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Task;
    use chrono::{Duration, TimeZone};

    fn finished_milestone() -> Milestone {
        let mut m = Milestone::new("m1", "b1", "Delivery", 0);
        m.status = Status::InProgress;
        let mut t = Task::new("t1", "m1", "Ship");
        t.status = Status::Completed;
        m.tasks.push(t);
        m
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn not_required_is_always_cleared() {
        let gate = ApprovalGate::new(false);
        assert_eq!(gate.evaluate(&finished_milestone()), GateState::Cleared);
    }

    #[test]
    fn later_approval_supersedes_rejection() {
        let gate = ApprovalGate::new(true);
        let mut m = finished_milestone();
        assert!(gate.is_pending_approval(&m));

        gate.submit(&mut m, ApprovalStatus::Rejected, Some("needs revision".into()), Role::Client, now())
            .unwrap();
        assert_eq!(
            gate.evaluate(&m),
            GateState::Rejected {
                feedback: Some("needs revision".into())
            }
        );

        gate.submit(&mut m, ApprovalStatus::Approved, None, Role::Client, now() + Duration::hours(1))
            .unwrap();
        assert_eq!(gate.evaluate(&m), GateState::Cleared);
        assert_eq!(m.approvals.len(), 2);
        assert_eq!(m.approvals[1].id, "m1-approval-2");
    }

    #[test]
    fn roles_are_enforced() {
        let gate = ApprovalGate::new(true);
        let mut m = finished_milestone();

        let err = gate
            .submit(&mut m, ApprovalStatus::Approved, None, Role::Provider, now())
            .unwrap_err();
        assert!(matches!(
            err.denial(),
            Some(DenialReason::RoleNotPermitted { role: Role::Provider, .. })
        ));
        assert!(gate.request(&mut m, Role::Client, now()).is_err());
        assert!(m.approvals.is_empty());

        gate.request(&mut m, Role::Provider, now()).unwrap();
        assert!(matches!(
            gate.request(&mut m, Role::Provider, now()),
            Err(EngineError::Validation(_))
        ));
        assert_eq!(gate.evaluate(&m), GateState::AwaitingApproval);
    }

    #[test]
    fn pending_is_not_a_decision() {
        let gate = ApprovalGate::new(true);
        let mut m = finished_milestone();
        assert!(matches!(
            gate.submit(&mut m, ApprovalStatus::Pending, None, Role::Client, now()),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn completed_milestone_takes_no_new_records() {
        let gate = ApprovalGate::new(true);
        let mut m = finished_milestone();
        gate.submit(&mut m, ApprovalStatus::Approved, None, Role::Client, now())
            .unwrap();
        m.status = Status::Completed;

        let later = now() + Duration::hours(1);
        let err = gate
            .submit(&mut m, ApprovalStatus::Rejected, Some("changed my mind".into()), Role::Client, later)
            .unwrap_err();
        assert_eq!(err.denial(), Some(&DenialReason::MilestoneCompleted));
        assert!(gate.request(&mut m, Role::Provider, later).is_err());
        assert_eq!(m.approvals.len(), 1);
        assert_eq!(gate.evaluate(&m), GateState::Cleared);
    }
}
