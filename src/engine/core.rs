// src/engine/core.rs

//! The engine's operation boundary.
//!
//! [`MilestoneEngine`] is the only place that talks to a [`BookingStore`].
//! Every mutation follows the same shape:
//!
//! 1. load the booking and check the caller's `expected_version`;
//! 2. run the pure rules from the sibling modules on a scratch copy;
//! 3. recompute derived fields and diff the copy against the snapshot;
//! 4. commit the diff as one batch (the store re-checks the version);
//! 5. only then notify the injected [`EngineHandler`].
//!
//! Any error before step 4 leaves the store untouched.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::dag::GraphScope;
use crate::engine::handlers::{EngineEvent, EngineHandler};
use crate::engine::report::BookingReport;
use crate::engine::sequence::{self, IndexAssignment};
use crate::engine::transitions::{self, Cascade, Evaluation, MilestoneTransition};
use crate::engine::{lifecycle, refresh_derived, EngineSettings, TransitionContext};
use crate::errors::{EngineError, Result};
use crate::model::{Approval, Booking, Dependency, Milestone, MilestoneId, Task};
use crate::progress::milestone_progress;
use crate::store::{BookingStore, WriteBatch};
use crate::types::{ApprovalStatus, Role, Status};

/// Who is calling and at which instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub role: Role,
    pub now: DateTime<Utc>,
}

impl Caller {
    pub fn new(role: Role, now: DateTime<Utc>) -> Self {
        Self { role, now }
    }

    pub fn client(now: DateTime<Utc>) -> Self {
        Self::new(Role::Client, now)
    }

    pub fn provider(now: DateTime<Utc>) -> Self {
        Self::new(Role::Provider, now)
    }
}

/// Value produced by a committed mutation, with the booking version it
/// produced. Pass `version` as `expected_version` to the next call.
#[derive(Debug, Clone, PartialEq)]
pub struct Committed<T> {
    pub value: T,
    pub version: u64,
}

#[derive(Debug)]
pub struct MilestoneEngine<S, H> {
    store: S,
    handler: H,
    settings: EngineSettings,
}

fn evaluation_event(booking_id: &str, eval: &Evaluation) -> Option<EngineEvent> {
    eval.changed().then(|| EngineEvent::MilestoneTransitioned {
        booking_id: booking_id.to_string(),
        milestone_id: eval.milestone_id.clone(),
        from: eval.from,
        to: eval.to,
    })
}

impl<S: BookingStore, H: EngineHandler> MilestoneEngine<S, H> {
    pub fn new(store: S, handler: H, settings: EngineSettings) -> Self {
        Self {
            store,
            handler,
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    fn context(&self, caller: Caller) -> TransitionContext {
        TransitionContext::new(caller.role, caller.now, self.settings)
    }

    /// Load, apply, commit, notify.
    fn mutate<T>(
        &self,
        booking_id: &str,
        expected_version: u64,
        operation: &'static str,
        apply: impl FnOnce(&mut Booking) -> Result<(T, Vec<EngineEvent>)>,
    ) -> Result<Committed<T>> {
        let snapshot = self.store.load(booking_id)?;
        if snapshot.version != expected_version {
            return Err(EngineError::ConcurrencyConflict {
                expected: expected_version,
                actual: snapshot.version,
            });
        }

        let mut working = snapshot.clone();
        let (value, events) = apply(&mut working)?;
        refresh_derived(&mut working)?;

        let batch = WriteBatch::diff(&snapshot, &working);
        if batch.is_empty() {
            debug!(booking = %booking_id, operation, "nothing to write");
            return Ok(Committed {
                value,
                version: snapshot.version,
            });
        }

        let ops = batch.len();
        let version = self.store.commit(booking_id, expected_version, batch)?;
        info!(booking = %booking_id, operation, ops, version, "booking updated");

        for event in &events {
            self.handler.handle(event);
        }

        Ok(Committed { value, version })
    }

    /// Current snapshot of a booking.
    pub fn booking(&self, booking_id: &str) -> Result<Booking> {
        self.store.load(booking_id)
    }

    /// Progress of one milestone from its current tasks.
    pub fn compute_progress(&self, booking_id: &str, milestone_id: &str) -> Result<u8> {
        let booking = self.store.load(booking_id)?;
        Ok(milestone_progress(booking.require_milestone(milestone_id)?))
    }

    /// Check a candidate edge without storing it.
    pub fn validate_dependency(&self, booking_id: &str, scope: GraphScope, edge: &Dependency) -> Result<()> {
        let booking = self.store.load(booking_id)?;
        lifecycle::validate_dependency(&booking, scope, edge)
    }

    /// Whether a milestone may move to `target` right now.
    pub fn can_transition(&self, booking_id: &str, milestone_id: &str, target: Status, caller: Caller) -> Result<()> {
        let booking = self.store.load(booking_id)?;
        transitions::check_milestone_transition(&booking, milestone_id, target, &self.context(caller))
    }

    pub fn report(&self, booking_id: &str, now: DateTime<Utc>) -> Result<BookingReport> {
        let booking = self.store.load(booking_id)?;
        BookingReport::build(&booking, &self.settings, now)
    }

    pub fn add_dependency(
        &self,
        booking_id: &str,
        expected_version: u64,
        scope: GraphScope,
        edge: Dependency,
    ) -> Result<Committed<()>> {
        self.mutate(booking_id, expected_version, "add_dependency", |booking| {
            lifecycle::add_dependency(booking, scope, edge.clone())?;
            let event = EngineEvent::DependencyAdded {
                booking_id: booking.id.clone(),
                scope,
                dependency: edge,
            };
            Ok(((), vec![event]))
        })
    }

    pub fn remove_dependency(
        &self,
        booking_id: &str,
        expected_version: u64,
        scope: GraphScope,
        edge_id: &str,
    ) -> Result<Committed<Dependency>> {
        self.mutate(booking_id, expected_version, "remove_dependency", |booking| {
            let removed = lifecycle::remove_dependency(booking, scope, edge_id)?;
            let event = EngineEvent::DependencyRemoved {
                booking_id: booking.id.clone(),
                scope,
                dependency: removed.clone(),
            };
            Ok((removed, vec![event]))
        })
    }

    /// Explicit milestone status change.
    pub fn transition_milestone(
        &self,
        booking_id: &str,
        expected_version: u64,
        milestone_id: &str,
        target: Status,
        caller: Caller,
    ) -> Result<Committed<MilestoneTransition>> {
        let ctx = self.context(caller);
        self.mutate(booking_id, expected_version, "transition_milestone", |booking| {
            let outcome = transitions::transition_milestone(booking, milestone_id, target, &ctx)?;
            let mut events = Vec::new();
            if outcome.from != outcome.to {
                events.push(EngineEvent::MilestoneTransitioned {
                    booking_id: booking.id.clone(),
                    milestone_id: outcome.milestone_id.clone(),
                    from: outcome.from,
                    to: outcome.to,
                });
            }
            Ok((outcome, events))
        })
    }

    /// Task status change plus the cascade into its milestone.
    pub fn set_task_status(
        &self,
        booking_id: &str,
        expected_version: u64,
        task_id: &str,
        target: Status,
        caller: Caller,
    ) -> Result<Committed<Cascade>> {
        let ctx = self.context(caller);
        self.mutate(booking_id, expected_version, "set_task_status", |booking| {
            let cascade = transitions::set_task_status(booking, task_id, target, &ctx)?;
            let mut events = Vec::new();
            if cascade.task_from != cascade.task_to {
                events.push(EngineEvent::TaskTransitioned {
                    booking_id: booking.id.clone(),
                    task_id: cascade.task_id.clone(),
                    from: cascade.task_from,
                    to: cascade.task_to,
                });
            }
            events.extend(evaluation_event(&booking.id, &cascade.milestone));
            Ok((cascade, events))
        })
    }

    /// Provider opens a `pending` approval request on a milestone.
    pub fn request_approval(
        &self,
        booking_id: &str,
        expected_version: u64,
        milestone_id: &str,
        caller: Caller,
    ) -> Result<Committed<Approval>> {
        let gate = self.context(caller).approval_gate();
        self.mutate(booking_id, expected_version, "request_approval", |booking| {
            let milestone = booking.require_milestone_mut(milestone_id)?;
            let approval = gate.request(milestone, caller.role, caller.now)?;
            let event = EngineEvent::ApprovalRecorded {
                booking_id: booking.id.clone(),
                approval: approval.clone(),
            };
            Ok((approval, vec![event]))
        })
    }

    /// Client records `approved` or `rejected`; the milestone is then
    /// re-evaluated, so an approval at 100% completes it.
    pub fn submit_approval(
        &self,
        booking_id: &str,
        expected_version: u64,
        milestone_id: &str,
        decision: ApprovalStatus,
        feedback: Option<String>,
        caller: Caller,
    ) -> Result<Committed<(Approval, Evaluation)>> {
        let ctx = self.context(caller);
        self.mutate(booking_id, expected_version, "submit_approval", |booking| {
            let milestone = booking.require_milestone_mut(milestone_id)?;
            let approval = ctx
                .approval_gate()
                .submit(milestone, decision, feedback, caller.role, caller.now)?;
            let eval = transitions::reevaluate(booking, milestone_id, &ctx)?;

            let mut events = vec![EngineEvent::ApprovalRecorded {
                booking_id: booking.id.clone(),
                approval: approval.clone(),
            }];
            events.extend(evaluation_event(&booking.id, &eval));
            Ok(((approval, eval), events))
        })
    }

    fn resequence(
        &self,
        booking_id: &str,
        expected_version: u64,
        operation: &'static str,
        apply: impl FnOnce(&mut Booking) -> Result<Vec<IndexAssignment>>,
    ) -> Result<Committed<Vec<IndexAssignment>>> {
        self.mutate(booking_id, expected_version, operation, |booking| {
            let assignment = apply(booking)?;
            let event = EngineEvent::Reordered {
                booking_id: booking.id.clone(),
                assignment: assignment.clone(),
            };
            Ok((assignment, vec![event]))
        })
    }

    /// Reassign every `order_index` in one batch.
    pub fn reorder(
        &self,
        booking_id: &str,
        expected_version: u64,
        ordered_ids: &[MilestoneId],
    ) -> Result<Committed<Vec<IndexAssignment>>> {
        self.resequence(booking_id, expected_version, "reorder", |booking| {
            sequence::reorder(booking, ordered_ids)
        })
    }

    pub fn move_up(
        &self,
        booking_id: &str,
        expected_version: u64,
        milestone_id: &str,
    ) -> Result<Committed<Vec<IndexAssignment>>> {
        self.resequence(booking_id, expected_version, "move_up", |booking| {
            sequence::move_up(booking, milestone_id)
        })
    }

    pub fn move_down(
        &self,
        booking_id: &str,
        expected_version: u64,
        milestone_id: &str,
    ) -> Result<Committed<Vec<IndexAssignment>>> {
        self.resequence(booking_id, expected_version, "move_down", |booking| {
            sequence::move_down(booking, milestone_id)
        })
    }

    pub fn create_milestone(
        &self,
        booking_id: &str,
        expected_version: u64,
        milestone_id: &str,
        title: &str,
    ) -> Result<Committed<Milestone>> {
        self.mutate(booking_id, expected_version, "create_milestone", |booking| {
            let milestone = lifecycle::create_milestone(booking, milestone_id, title)?;
            let event = EngineEvent::MilestoneCreated {
                booking_id: booking.id.clone(),
                milestone_id: milestone.id.clone(),
            };
            Ok((milestone, vec![event]))
        })
    }

    pub fn delete_milestone(
        &self,
        booking_id: &str,
        expected_version: u64,
        milestone_id: &str,
    ) -> Result<Committed<Milestone>> {
        self.mutate(booking_id, expected_version, "delete_milestone", |booking| {
            let removed = lifecycle::delete_milestone(booking, milestone_id)?;
            let event = EngineEvent::MilestoneDeleted {
                booking_id: booking.id.clone(),
                milestone_id: removed.id.clone(),
            };
            Ok((removed, vec![event]))
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn create_task(
        &self,
        booking_id: &str,
        expected_version: u64,
        milestone_id: &str,
        task_id: &str,
        title: &str,
        weight: f64,
        caller: Caller,
    ) -> Result<Committed<(Task, Evaluation)>> {
        let ctx = self.context(caller);
        self.mutate(booking_id, expected_version, "create_task", |booking| {
            let (task, eval) = lifecycle::create_task(booking, milestone_id, task_id, title, weight, &ctx)?;
            let mut events = vec![EngineEvent::TaskCreated {
                booking_id: booking.id.clone(),
                milestone_id: milestone_id.to_string(),
                task_id: task.id.clone(),
            }];
            events.extend(evaluation_event(&booking.id, &eval));
            Ok(((task, eval), events))
        })
    }

    pub fn delete_task(
        &self,
        booking_id: &str,
        expected_version: u64,
        task_id: &str,
        caller: Caller,
    ) -> Result<Committed<(Task, Evaluation)>> {
        let ctx = self.context(caller);
        self.mutate(booking_id, expected_version, "delete_task", |booking| {
            let (task, eval) = lifecycle::delete_task(booking, task_id, &ctx)?;
            let mut events = vec![EngineEvent::TaskDeleted {
                booking_id: booking.id.clone(),
                milestone_id: task.milestone_id.clone(),
                task_id: task.id.clone(),
            }];
            events.extend(evaluation_event(&booking.id, &eval));
            Ok(((task, eval), events))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::TimeZone;

    use super::*;
    use crate::errors::DenialReason;
    use crate::store::MemoryStore;
    use crate::types::DependencyType;

    #[derive(Debug, Default)]
    struct Recorder(Mutex<Vec<EngineEvent>>);

    impl EngineHandler for Recorder {
        fn handle(&self, event: &EngineEvent) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    impl Recorder {
        fn events(&self) -> Vec<EngineEvent> {
            self.0.lock().unwrap().clone()
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    fn engine() -> MilestoneEngine<MemoryStore, Recorder> {
        let store = MemoryStore::new();
        store.insert(Booking::new("b1")).unwrap();
        MilestoneEngine::new(store, Recorder::default(), EngineSettings::default())
    }

    /// Two milestones A and B, each with one task.
    fn seeded() -> (MilestoneEngine<MemoryStore, Recorder>, u64) {
        let e = engine();
        let v = e.create_milestone("b1", 0, "A", "Design").unwrap().version;
        let v = e.create_milestone("b1", v, "B", "Build").unwrap().version;
        let v = e
            .create_task("b1", v, "A", "a1", "Wireframes", 1.0, Caller::provider(now()))
            .unwrap()
            .version;
        let v = e
            .create_task("b1", v, "B", "b1-task", "Frontend", 1.0, Caller::provider(now()))
            .unwrap()
            .version;
        (e, v)
    }

    #[test]
    fn stale_version_is_rejected_without_writing() {
        let (e, v) = seeded();
        let ids = vec!["B".to_string(), "A".to_string()];
        let v2 = e.reorder("b1", v, &ids).unwrap().version;
        assert_eq!(v2, v + 1);

        let err = e.reorder("b1", v, &ids).unwrap_err();
        assert!(matches!(err, EngineError::ConcurrencyConflict { .. }));
        assert_eq!(e.booking("b1").unwrap().version, v2);
    }

    #[test]
    fn cyclic_edge_leaves_the_graph_unchanged() {
        let (e, v) = seeded();
        let v = e
            .add_dependency(
                "b1",
                v,
                GraphScope::Milestones,
                Dependency::new("d1", "A", "B", DependencyType::FinishToStart),
            )
            .unwrap()
            .version;

        let err = e
            .add_dependency(
                "b1",
                v,
                GraphScope::Milestones,
                Dependency::new("d2", "B", "A", DependencyType::FinishToStart),
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        let booking = e.booking("b1").unwrap();
        assert_eq!(booking.version, v);
        let edges: Vec<_> = booking.milestones.iter().flat_map(|m| m.dependencies.iter()).collect();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].id, "d1");
    }

    #[test]
    fn rejected_approval_keeps_milestone_in_progress() {
        let (e, v) = seeded();
        let v = e
            .set_task_status("b1", v, "a1", Status::Completed, Caller::provider(now()))
            .unwrap()
            .version;

        let milestone = e.booking("b1").unwrap().milestone("A").unwrap().clone();
        assert_eq!(milestone.status, Status::InProgress);
        assert_eq!(milestone.progress_percentage, 100);

        let committed = e
            .submit_approval(
                "b1",
                v,
                "A",
                ApprovalStatus::Rejected,
                Some("needs revision".into()),
                Caller::client(now()),
            )
            .unwrap();
        let (approval, eval) = committed.value;
        assert_eq!(approval.status, ApprovalStatus::Rejected);
        assert_eq!(approval.feedback.as_deref(), Some("needs revision"));
        assert_eq!(eval.to, Status::InProgress);

        let milestone = e.booking("b1").unwrap().milestone("A").unwrap().clone();
        assert_eq!(milestone.status, Status::InProgress);
        assert_eq!(milestone.approvals.len(), 1);
    }

    #[test]
    fn approval_completes_and_notifies_after_commit() {
        let (e, v) = seeded();
        let v = e
            .set_task_status("b1", v, "a1", Status::Completed, Caller::provider(now()))
            .unwrap()
            .version;
        let committed = e
            .submit_approval("b1", v, "A", ApprovalStatus::Approved, None, Caller::client(now()))
            .unwrap();
        assert_eq!(committed.value.1.to, Status::Completed);

        let events = e.handler().events();
        assert!(events.iter().any(|ev| matches!(
            ev,
            EngineEvent::MilestoneTransitioned {
                to: Status::Completed,
                ..
            }
        )));
        assert!(events.iter().all(|ev| ev.booking_id() == "b1"));
    }

    #[test]
    fn denied_transition_writes_nothing_and_notifies_nobody() {
        let (e, v) = seeded();
        let v = e
            .add_dependency(
                "b1",
                v,
                GraphScope::Milestones,
                Dependency::new("d1", "B", "A", DependencyType::FinishToStart),
            )
            .unwrap()
            .version;
        let before = e.handler().events().len();

        let err = e
            .transition_milestone("b1", v, "B", Status::InProgress, Caller::provider(now()))
            .unwrap_err();
        assert_eq!(
            err.denial(),
            Some(&DenialReason::PredecessorNotFinished {
                predecessor: "A".into()
            })
        );
        assert!(e
            .can_transition("b1", "B", Status::InProgress, Caller::provider(now()))
            .is_err());
        assert_eq!(e.booking("b1").unwrap().version, v);
        assert_eq!(e.handler().events().len(), before);
    }

    #[test]
    fn no_op_change_keeps_the_version() {
        let (e, v) = seeded();
        let committed = e
            .set_task_status("b1", v, "a1", Status::Pending, Caller::provider(now()))
            .unwrap();
        assert_eq!(committed.version, v);
    }

    #[test]
    fn progress_and_report_read_the_store() {
        let (e, v) = seeded();
        e.set_task_status("b1", v, "a1", Status::Completed, Caller::provider(now()))
            .unwrap();
        assert_eq!(e.compute_progress("b1", "A").unwrap(), 100);
        assert_eq!(e.compute_progress("b1", "B").unwrap(), 0);

        let report = e.report("b1", now()).unwrap();
        assert_eq!(report.progress, 50);
        assert!(report.milestone("A").unwrap().awaiting_approval);
    }
}
