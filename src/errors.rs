// src/errors.rs

//! Crate-wide error aliases and helpers.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::{Role, Status};

#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed input: self-reference, cycle, unknown node in a file, negative lag.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Illegal status transition or gated operation.
    #[error("State error: {0}")]
    State(DenialReason),

    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// Stale version token detected at write time.
    #[error("Concurrency conflict: expected version {expected}, found {actual}")]
    ConcurrencyConflict { expected: u64, actual: u64 },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EngineError {
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// The denial reason, if this is a state error.
    pub fn denial(&self) -> Option<&DenialReason> {
        match self {
            EngineError::State(reason) => Some(reason),
            _ => None,
        }
    }
}

impl From<DenialReason> for EngineError {
    fn from(reason: DenialReason) -> Self {
        EngineError::State(reason)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Booking,
    Milestone,
    Task,
    Dependency,
    Approval,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EntityKind::Booking => "Booking",
            EntityKind::Milestone => "Milestone",
            EntityKind::Task => "Task",
            EntityKind::Dependency => "Dependency",
            EntityKind::Approval => "Approval",
        };
        f.write_str(s)
    }
}

/// Human-readable reason a transition or gated operation was denied.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DenialReason {
    #[error("predecessor not finished: {predecessor}")]
    PredecessorNotFinished { predecessor: String },

    #[error("predecessor not started: {predecessor}")]
    PredecessorNotStarted { predecessor: String },

    #[error("lag not elapsed for predecessor {predecessor}: allowed from {available_at}")]
    LagNotElapsed {
        predecessor: String,
        available_at: DateTime<Utc>,
    },

    #[error("lag of {lag_days} day(s) on predecessor {predecessor} needs a recorded timestamp")]
    MissingTimestamp { predecessor: String, lag_days: i64 },

    #[error("lag of {lag_days} day(s) on predecessor {predecessor} is out of range")]
    LagOutOfRange { predecessor: String, lag_days: i64 },

    #[error("progress is {progress}%, completion requires 100%")]
    ProgressIncomplete { progress: u8 },

    #[error("pending approval")]
    AwaitingApproval,

    #[error("approval rejected{}", feedback_suffix(.feedback))]
    ApprovalRejected { feedback: Option<String> },

    #[error("milestone is completed, reopen it before changing its approval")]
    MilestoneCompleted,

    #[error("role {role} may not {action}")]
    RoleNotPermitted { role: Role, action: &'static str },

    #[error("illegal transition from {from} to {to}")]
    IllegalTransition { from: Status, to: Status },
}

fn feedback_suffix(feedback: &Option<String>) -> String {
    match feedback {
        Some(text) if !text.is_empty() => format!(": {text}"),
        _ => String::new(),
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, EngineError>;
