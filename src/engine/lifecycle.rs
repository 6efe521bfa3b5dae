// src/engine/lifecycle.rs

//! Creating and destroying entities, and editing dependency edges, on a
//! booking snapshot.
//!
//! Deleting a milestone takes its tasks, comments and every edge that
//! touches it or its tasks along with it, then compacts the ordering. No
//! dangling edge survives a delete.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::dag::GraphScope;
use crate::engine::sequence::{next_order_index, normalize};
use crate::engine::transitions::{reevaluate, Evaluation};
use crate::engine::{graph_for, TransitionContext};
use crate::errors::{EngineError, EntityKind, Result};
use crate::model::{Booking, CommentTarget, Dependency, Milestone, Task};

fn ensure_unique_id(booking: &Booking, id: &str) -> Result<()> {
    let taken = booking.milestones.iter().any(|m| m.id == id) || booking.task(id).is_some();
    if taken {
        return Err(EngineError::Validation(format!("id '{id}' is already in use")));
    }
    Ok(())
}

/// Add a `pending` milestone at the end of the sequence.
pub fn create_milestone(booking: &mut Booking, id: &str, title: &str) -> Result<Milestone> {
    ensure_unique_id(booking, id)?;
    let milestone = Milestone::new(id, booking.id.clone(), title, next_order_index(booking));
    info!(booking = %booking.id, milestone = %id, order_index = milestone.order_index, "milestone created");
    booking.milestones.push(milestone.clone());
    Ok(milestone)
}

/// Add a `pending` task to a milestone and re-evaluate the milestone.
pub fn create_task(
    booking: &mut Booking,
    milestone_id: &str,
    id: &str,
    title: &str,
    weight: f64,
    ctx: &TransitionContext,
) -> Result<(Task, Evaluation)> {
    ensure_unique_id(booking, id)?;
    let mut task = Task::new(id, milestone_id, title);
    task.weight = weight;

    booking.require_milestone_mut(milestone_id)?.tasks.push(task.clone());
    info!(milestone = %milestone_id, task = %id, weight, "task created");

    let eval = reevaluate(booking, milestone_id, ctx)?;
    Ok((task, eval))
}

/// Delete a milestone with everything it owns or that points at it.
pub fn delete_milestone(booking: &mut Booking, milestone_id: &str) -> Result<Milestone> {
    let pos = booking
        .milestones
        .iter()
        .position(|m| m.id == milestone_id)
        .ok_or_else(|| EngineError::not_found(EntityKind::Milestone, milestone_id))?;
    let removed = booking.milestones.remove(pos);
    let task_ids: HashSet<&str> = removed.tasks.iter().map(|t| t.id.as_str()).collect();

    for milestone in booking.milestones.iter_mut() {
        milestone.dependencies.retain(|d| d.depends_on_id != milestone_id);
        for task in milestone.tasks.iter_mut() {
            task.dependencies
                .retain(|d| !task_ids.contains(d.depends_on_id.as_str()));
        }
    }

    booking.comments.retain(|c| match &c.target {
        CommentTarget::Milestone(id) => id != milestone_id,
        CommentTarget::Task(id) => !task_ids.contains(id.as_str()),
    });

    normalize(booking);
    info!(
        booking = %booking.id,
        milestone = %milestone_id,
        tasks = removed.tasks.len(),
        "milestone deleted"
    );
    Ok(removed)
}

/// Delete a task, its comments and edges touching it, and re-evaluate the owner.
pub fn delete_task(booking: &mut Booking, task_id: &str, ctx: &TransitionContext) -> Result<(Task, Evaluation)> {
    let owner_id = booking
        .owner_of_task(task_id)
        .map(|m| m.id.clone())
        .ok_or_else(|| EngineError::not_found(EntityKind::Task, task_id))?;

    let owner = booking.require_milestone_mut(&owner_id)?;
    let pos = owner
        .tasks
        .iter()
        .position(|t| t.id == task_id)
        .ok_or_else(|| EngineError::not_found(EntityKind::Task, task_id))?;
    let removed = owner.tasks.remove(pos);

    for milestone in booking.milestones.iter_mut() {
        for task in milestone.tasks.iter_mut() {
            task.dependencies.retain(|d| d.depends_on_id != task_id);
        }
    }
    booking
        .comments
        .retain(|c| c.target != CommentTarget::Task(task_id.to_string()));

    info!(milestone = %owner_id, task = %task_id, "task deleted");
    let eval = reevaluate(booking, &owner_id, ctx)?;
    Ok((removed, eval))
}

/// Validate a candidate edge against the current graph of its scope.
pub fn validate_dependency(booking: &Booking, scope: GraphScope, edge: &Dependency) -> Result<()> {
    graph_for(booking, scope).validate_edge(edge)
}

/// Validate and store an edge on its source entity. The cycle check runs
/// before anything is written.
pub fn add_dependency(booking: &mut Booking, scope: GraphScope, edge: Dependency) -> Result<()> {
    validate_dependency(booking, scope, &edge)?;

    match scope {
        GraphScope::Milestones => {
            booking
                .require_milestone_mut(&edge.source_id)?
                .dependencies
                .push(edge.clone());
        }
        GraphScope::Tasks => {
            let task = booking
                .milestones
                .iter_mut()
                .flat_map(|m| m.tasks.iter_mut())
                .find(|t| t.id == edge.source_id)
                .ok_or_else(|| EngineError::not_found(EntityKind::Task, edge.source_id.as_str()))?;
            task.dependencies.push(edge.clone());
        }
    }

    info!(
        ?scope,
        source = %edge.source_id,
        depends_on = %edge.depends_on_id,
        dependency_type = %edge.dependency_type,
        lag_days = edge.lag_days,
        "dependency added"
    );
    Ok(())
}

/// Remove an edge by id from whichever entity holds it.
pub fn remove_dependency(booking: &mut Booking, scope: GraphScope, edge_id: &str) -> Result<Dependency> {
    let lists: Vec<&mut Vec<Dependency>> = match scope {
        GraphScope::Milestones => booking.milestones.iter_mut().map(|m| &mut m.dependencies).collect(),
        GraphScope::Tasks => booking
            .milestones
            .iter_mut()
            .flat_map(|m| m.tasks.iter_mut())
            .map(|t| &mut t.dependencies)
            .collect(),
    };

    for list in lists {
        if let Some(pos) = list.iter().position(|d| d.id == edge_id) {
            let removed = list.remove(pos);
            debug!(?scope, edge = %edge_id, "dependency removed");
            return Ok(removed);
        }
    }

    Err(EngineError::not_found(EntityKind::Dependency, edge_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::sequence::is_dense;
    use crate::engine::EngineSettings;
    use crate::model::Comment;
    use crate::types::{DependencyType, Role, Status};
    use chrono::{TimeZone, Utc};

    fn ctx() -> TransitionContext {
        TransitionContext::new(
            Role::Provider,
            Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap(),
            EngineSettings::default(),
        )
    }

    fn seeded() -> Booking {
        let mut b = Booking::new("b1");
        for id in ["A", "B", "C"] {
            create_milestone(&mut b, id, id).unwrap();
        }
        create_task(&mut b, "A", "a1", "a1", 1.0, &ctx()).unwrap();
        create_task(&mut b, "B", "b1-task", "b1", 1.0, &ctx()).unwrap();
        b
    }

    #[test]
    fn created_milestones_are_appended_pending() {
        let b = seeded();
        let c = b.milestone("C").unwrap();
        assert_eq!(c.order_index, 2);
        assert_eq!(c.status, Status::Pending);
        assert_eq!(c.progress_percentage, 0);
        assert!(matches!(create_milestone(&mut b.clone(), "A", "dup"), Err(EngineError::Validation(_))));
    }

    #[test]
    fn deleting_a_milestone_removes_dangling_edges_and_compacts() {
        let mut b = seeded();
        add_dependency(&mut b, GraphScope::Milestones, Dependency::new("d1", "B", "A", DependencyType::FinishToStart))
            .unwrap();
        add_dependency(&mut b, GraphScope::Tasks, Dependency::new("td1", "b1-task", "a1", DependencyType::FinishToStart))
            .unwrap();
        b.comments.push(Comment {
            id: "c1".into(),
            target: CommentTarget::Task("a1".into()),
            author: "client".into(),
            body: "looks good".into(),
            created_at: Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap(),
        });

        let removed = delete_milestone(&mut b, "A").unwrap();
        assert_eq!(removed.tasks.len(), 1);
        assert!(b.milestone("B").unwrap().dependencies.is_empty());
        assert!(b.task("b1-task").unwrap().dependencies.is_empty());
        assert!(b.comments.is_empty());
        assert!(is_dense(&b));
        assert_eq!(b.milestone("B").unwrap().order_index, 0);
    }

    #[test]
    fn cyclic_edge_is_not_stored() {
        let mut b = seeded();
        add_dependency(&mut b, GraphScope::Milestones, Dependency::new("d1", "B", "A", DependencyType::FinishToStart))
            .unwrap();
        let before = b.clone();
        let err = add_dependency(&mut b, GraphScope::Milestones, Dependency::new("d2", "A", "B", DependencyType::FinishToStart))
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert_eq!(b, before);
    }

    #[test]
    fn removing_a_task_dependency_by_id() {
        let mut b = seeded();
        add_dependency(&mut b, GraphScope::Tasks, Dependency::new("td1", "b1-task", "a1", DependencyType::StartToStart))
            .unwrap();
        assert!(remove_dependency(&mut b, GraphScope::Milestones, "td1").is_err());
        let removed = remove_dependency(&mut b, GraphScope::Tasks, "td1").unwrap();
        assert_eq!(removed.dependency_type, DependencyType::StartToStart);
    }

    #[test]
    fn deleting_last_open_task_reevaluates_owner() {
        let mut b = seeded();
        create_task(&mut b, "A", "a2", "a2", 1.0, &ctx()).unwrap();
        b.milestone_mut("A").unwrap().tasks[0].status = Status::Completed;
        b.milestone_mut("A").unwrap().status = Status::InProgress;

        let (_, eval) = delete_task(&mut b, "a2", &ctx()).unwrap();
        assert_eq!(eval.progress, 100);
        // Approval is required by default, so the milestone waits.
        assert!(eval.awaiting_approval);
        assert_eq!(b.milestone("A").unwrap().status, Status::InProgress);
    }
}
