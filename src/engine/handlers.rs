// src/engine/handlers.rs

//! Notification interface injected into [`crate::engine::MilestoneEngine`].
//!
//! The engine calls its handler only after a batch has been committed, so a
//! handler never observes a change that was rolled back.

use std::fmt::Debug;

use crate::dag::GraphScope;
use crate::engine::sequence::IndexAssignment;
use crate::model::{Approval, BookingId, Dependency, MilestoneId, TaskId};
use crate::types::Status;

/// Something the engine committed.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    MilestoneTransitioned {
        booking_id: BookingId,
        milestone_id: MilestoneId,
        from: Status,
        to: Status,
    },
    TaskTransitioned {
        booking_id: BookingId,
        task_id: TaskId,
        from: Status,
        to: Status,
    },
    ApprovalRecorded {
        booking_id: BookingId,
        approval: Approval,
    },
    DependencyAdded {
        booking_id: BookingId,
        scope: GraphScope,
        dependency: Dependency,
    },
    DependencyRemoved {
        booking_id: BookingId,
        scope: GraphScope,
        dependency: Dependency,
    },
    Reordered {
        booking_id: BookingId,
        assignment: Vec<IndexAssignment>,
    },
    MilestoneCreated {
        booking_id: BookingId,
        milestone_id: MilestoneId,
    },
    MilestoneDeleted {
        booking_id: BookingId,
        milestone_id: MilestoneId,
    },
    TaskCreated {
        booking_id: BookingId,
        milestone_id: MilestoneId,
        task_id: TaskId,
    },
    TaskDeleted {
        booking_id: BookingId,
        milestone_id: MilestoneId,
        task_id: TaskId,
    },
}

impl EngineEvent {
    pub fn booking_id(&self) -> &str {
        match self {
            EngineEvent::MilestoneTransitioned { booking_id, .. }
            | EngineEvent::TaskTransitioned { booking_id, .. }
            | EngineEvent::ApprovalRecorded { booking_id, .. }
            | EngineEvent::DependencyAdded { booking_id, .. }
            | EngineEvent::DependencyRemoved { booking_id, .. }
            | EngineEvent::Reordered { booking_id, .. }
            | EngineEvent::MilestoneCreated { booking_id, .. }
            | EngineEvent::MilestoneDeleted { booking_id, .. }
            | EngineEvent::TaskCreated { booking_id, .. }
            | EngineEvent::TaskDeleted { booking_id, .. } => booking_id,
        }
    }
}

/// Receives committed engine events.
///
/// Production callers wire this to notifications or UI refresh; tests can
/// record the events.
pub trait EngineHandler: Send + Sync + Debug {
    fn handle(&self, event: &EngineEvent);
}

/// Handler that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandler;

impl EngineHandler for NoopHandler {
    fn handle(&self, _event: &EngineEvent) {}
}
