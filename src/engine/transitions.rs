// src/engine/transitions.rs

//! Milestone and task state machines.
//!
//! Explicit requests go through [`check_milestone_transition`] /
//! [`check_task_transition`]. A task change is then cascaded into its owning
//! milestone by [`evaluate_milestone`], which decides automatic moves:
//!
//! - `pending -> in_progress` once any task has started, if the start gate
//!   (FS/SS predecessors) is open;
//! - `in_progress -> completed` once progress is 100, the finish gate (FF/SF
//!   predecessors) is open and the approval gate is cleared;
//! - a `completed` milestone whose progress drops is left alone and reported
//!   as drift, unless `allow_progress_drift` is set, in which case it falls
//!   back to `pending` at 0%.
//!
//! Completing a milestone never pushes anything to its dependents; they
//! re-check their own gates when they next try to move.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::dag::{DependencyGraph, ReadinessView};
use crate::engine::TransitionContext;
use crate::errors::{DenialReason, EngineError, EntityKind, Result};
use crate::model::{Booking, Milestone, MilestoneId, TaskId};
use crate::progress::milestone_progress;
use crate::types::{Role, Status};

/// Result of evaluating a milestone against its current tasks.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub milestone_id: MilestoneId,
    pub progress: u8,
    pub from: Status,
    pub to: Status,
    /// Work is done but the approval gate holds the milestone open.
    pub awaiting_approval: bool,
    /// Why an automatic move did not happen.
    pub blocked: Option<DenialReason>,
    /// A `completed` milestone whose progress fell below 100.
    pub progress_drift: bool,
    /// Dependents that can now pass their next gate (filled when this
    /// evaluation completed the milestone).
    pub eligible_dependents: Vec<MilestoneId>,
}

impl Evaluation {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Outcome of an explicit milestone transition.
#[derive(Debug, Clone, PartialEq)]
pub struct MilestoneTransition {
    pub milestone_id: MilestoneId,
    pub from: Status,
    pub to: Status,
    pub eligible_dependents: Vec<MilestoneId>,
}

/// Outcome of a task status change and its effect on the owning milestone.
#[derive(Debug, Clone, PartialEq)]
pub struct Cascade {
    pub task_id: TaskId,
    pub task_from: Status,
    pub task_to: Status,
    pub milestone: Evaluation,
}

/// Set `status` to `target`, maintaining start/completion timestamps.
fn stamp(
    status: &mut Status,
    started_at: &mut Option<DateTime<Utc>>,
    completed_at: &mut Option<DateTime<Utc>>,
    target: Status,
    now: DateTime<Utc>,
) {
    if *status == target {
        return;
    }
    if target.has_started() && started_at.is_none() {
        *started_at = Some(now);
    }
    if target == Status::Pending {
        *started_at = None;
    }
    *completed_at = (target == Status::Completed).then_some(now);
    *status = target;
}

/// Why `milestone` cannot complete right now, ignoring role.
fn completion_blocker(
    milestone: &Milestone,
    graph: &DependencyGraph,
    ctx: &TransitionContext,
) -> Option<DenialReason> {
    let progress = milestone_progress(milestone);
    if progress != 100 {
        return Some(DenialReason::ProgressIncomplete { progress });
    }
    if let Err(reason) = graph.can_finish(&milestone.id, ctx.now) {
        return Some(reason);
    }
    ctx.approval_gate().check(milestone).err()
}

fn eligible_after_completion(booking: &Booking, milestone_id: &str, now: DateTime<Utc>) -> Vec<MilestoneId> {
    let graph = DependencyGraph::for_milestones(booking);
    let eligible = ReadinessView::new(&graph, now).eligible_dependents(milestone_id);
    if !eligible.is_empty() {
        debug!(milestone = %milestone_id, ?eligible, "dependents now eligible to proceed");
    }
    eligible
}

/// Whether an explicit request to move a milestone to `target` is allowed.
pub fn check_milestone_transition(
    booking: &Booking,
    milestone_id: &str,
    target: Status,
    ctx: &TransitionContext,
) -> Result<()> {
    let milestone = booking.require_milestone(milestone_id)?;
    let from = milestone.status;
    if from == target {
        return Ok(());
    }

    let graph = DependencyGraph::for_milestones(booking);

    match (from, target) {
        (_, Status::Cancelled | Status::OnHold) => Ok(()),
        (Status::Pending | Status::OnHold | Status::Cancelled, Status::InProgress) => {
            graph.can_start(milestone_id, ctx.now)?;
            Ok(())
        }
        (Status::Completed, Status::InProgress) => Ok(()),
        (Status::InProgress, Status::Completed) => {
            if ctx.actor != Role::Provider {
                return Err(DenialReason::RoleNotPermitted {
                    role: ctx.actor,
                    action: "complete a milestone",
                }
                .into());
            }
            match completion_blocker(milestone, &graph, ctx) {
                Some(reason) => Err(reason.into()),
                None => Ok(()),
            }
        }
        (Status::InProgress | Status::OnHold | Status::Cancelled, Status::Pending) => Ok(()),
        (from, to) => Err(DenialReason::IllegalTransition { from, to }.into()),
    }
}

/// Apply an explicit milestone transition after checking it.
pub fn transition_milestone(
    booking: &mut Booking,
    milestone_id: &str,
    target: Status,
    ctx: &TransitionContext,
) -> Result<MilestoneTransition> {
    check_milestone_transition(booking, milestone_id, target, ctx)?;

    let milestone = booking.require_milestone_mut(milestone_id)?;
    let from = milestone.status;
    stamp(
        &mut milestone.status,
        &mut milestone.started_at,
        &mut milestone.completed_at,
        target,
        ctx.now,
    );
    milestone.progress_percentage = milestone_progress(milestone);

    if from != target {
        info!(milestone = %milestone_id, %from, to = %target, actor = %ctx.actor, "milestone transitioned");
    }

    let eligible_dependents = if from != target && target == Status::Completed {
        eligible_after_completion(booking, milestone_id, ctx.now)
    } else {
        Vec::new()
    };

    Ok(MilestoneTransition {
        milestone_id: milestone_id.to_string(),
        from,
        to: target,
        eligible_dependents,
    })
}

/// Decide what a milestone's status should be given its current tasks.
///
/// Pure: nothing is changed. See [`reevaluate`] to apply the decision.
pub fn evaluate_milestone(booking: &Booking, milestone_id: &str, ctx: &TransitionContext) -> Result<Evaluation> {
    let milestone = booking.require_milestone(milestone_id)?;
    let progress = milestone_progress(milestone);
    let graph = DependencyGraph::for_milestones(booking);

    let mut eval = Evaluation {
        milestone_id: milestone.id.clone(),
        progress,
        from: milestone.status,
        to: milestone.status,
        awaiting_approval: false,
        blocked: None,
        progress_drift: false,
        eligible_dependents: Vec::new(),
    };

    if milestone.status == Status::Pending && milestone.tasks.iter().any(|t| t.status.has_started()) {
        match graph.can_start(&milestone.id, ctx.now) {
            Ok(()) => eval.to = Status::InProgress,
            Err(reason) => {
                debug!(milestone = %milestone.id, %reason, "work started but milestone is locked");
                eval.blocked = Some(reason);
                return Ok(eval);
            }
        }
    }

    if eval.to == Status::InProgress && progress == 100 {
        match completion_blocker(milestone, &graph, ctx) {
            None => eval.to = Status::Completed,
            Some(reason) => {
                eval.awaiting_approval = reason == DenialReason::AwaitingApproval;
                eval.blocked = Some(reason);
            }
        }
    }

    if milestone.status == Status::Completed && progress < 100 {
        if ctx.settings.allow_progress_drift && progress == 0 {
            eval.to = Status::Pending;
        } else {
            eval.progress_drift = true;
        }
    }

    Ok(eval)
}

/// Evaluate a milestone and apply the result to the snapshot.
pub fn reevaluate(booking: &mut Booking, milestone_id: &str, ctx: &TransitionContext) -> Result<Evaluation> {
    let mut eval = evaluate_milestone(booking, milestone_id, ctx)?;

    let milestone = booking.require_milestone_mut(milestone_id)?;
    milestone.progress_percentage = eval.progress;

    if eval.progress_drift {
        warn!(
            milestone = %milestone_id,
            progress = eval.progress,
            "completed milestone lost progress; keeping it completed"
        );
    }

    if eval.changed() {
        stamp(
            &mut milestone.status,
            &mut milestone.started_at,
            &mut milestone.completed_at,
            eval.to,
            ctx.now,
        );
        info!(
            milestone = %milestone_id,
            from = %eval.from,
            to = %eval.to,
            progress = eval.progress,
            "milestone status follows its tasks"
        );
        if eval.to == Status::Completed {
            eval.eligible_dependents = eligible_after_completion(booking, milestone_id, ctx.now);
        }
    }

    Ok(eval)
}

/// Whether a task may move to `target`.
pub fn check_task_transition(
    booking: &Booking,
    task_id: &str,
    target: Status,
    ctx: &TransitionContext,
) -> Result<()> {
    let task = booking
        .task(task_id)
        .ok_or_else(|| EngineError::not_found(EntityKind::Task, task_id))?;
    let from = task.status;
    if from == target {
        return Ok(());
    }

    let legal = match (from, target) {
        (_, Status::Cancelled | Status::OnHold) => true,
        (Status::Pending, Status::InProgress) | (Status::InProgress, Status::Pending) => true,
        (Status::Pending | Status::InProgress, Status::Completed) => true,
        (Status::Completed, Status::Pending | Status::InProgress) => true,
        (Status::OnHold | Status::Cancelled, Status::Pending | Status::InProgress) => true,
        _ => false,
    };
    if !legal {
        return Err(DenialReason::IllegalTransition { from, to: target }.into());
    }

    if ctx.settings.enforce_task_dependencies {
        let graph = DependencyGraph::for_tasks(booking);
        if !from.has_started() && target.has_started() {
            graph.can_start(task_id, ctx.now)?;
        }
        if target == Status::Completed {
            graph.can_finish(task_id, ctx.now)?;
        }
    }

    Ok(())
}

/// Change a task's status and cascade into its milestone.
pub fn set_task_status(
    booking: &mut Booking,
    task_id: &str,
    target: Status,
    ctx: &TransitionContext,
) -> Result<Cascade> {
    check_task_transition(booking, task_id, target, ctx)?;

    let owner_id = booking
        .owner_of_task(task_id)
        .map(|m| m.id.clone())
        .ok_or_else(|| EngineError::not_found(EntityKind::Task, task_id))?;

    let task_from = {
        let owner = booking.require_milestone_mut(&owner_id)?;
        let task = owner
            .task_mut(task_id)
            .ok_or_else(|| EngineError::not_found(EntityKind::Task, task_id))?;
        let from = task.status;
        stamp(
            &mut task.status,
            &mut task.started_at,
            &mut task.completed_at,
            target,
            ctx.now,
        );
        from
    };

    if task_from != target {
        info!(task = %task_id, milestone = %owner_id, from = %task_from, to = %target, "task transitioned");
    }

    let milestone = reevaluate(booking, &owner_id, ctx)?;

    Ok(Cascade {
        task_id: task_id.to_string(),
        task_from,
        task_to: target,
        milestone,
    })
}
