// src/model/dependency.rs

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, Result};
use crate::types::DependencyType;

/// Largest accepted `lag_days`, roughly a century.
pub const MAX_LAG_DAYS: i64 = 36_500;

/// Directed edge: `source_id` depends on `depends_on_id`.
///
/// Milestone-scoped and task-scoped edges share this shape. The reverse
/// direction ("dependents") is never stored; it is derived by scanning edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    pub id: String,
    /// May be omitted in a booking file, where the owning entity supplies it.
    #[serde(default)]
    pub source_id: String,
    #[serde(alias = "depends_on")]
    pub depends_on_id: String,
    #[serde(default, rename = "type")]
    pub dependency_type: DependencyType,
    #[serde(default)]
    pub lag_days: i64,
}

impl Dependency {
    pub fn new(
        id: impl Into<String>,
        source_id: impl Into<String>,
        depends_on_id: impl Into<String>,
        dependency_type: DependencyType,
    ) -> Self {
        Self {
            id: id.into(),
            source_id: source_id.into(),
            depends_on_id: depends_on_id.into(),
            dependency_type,
            lag_days: 0,
        }
    }

    pub fn with_lag(mut self, lag_days: i64) -> Self {
        self.lag_days = lag_days;
        self
    }

    /// Lag as a duration, or `None` when it is outside `0..=MAX_LAG_DAYS`.
    pub fn lag(&self) -> Option<Duration> {
        if (0..=MAX_LAG_DAYS).contains(&self.lag_days) {
            Duration::try_days(self.lag_days)
        } else {
            None
        }
    }

    pub fn check_lag(&self) -> Result<()> {
        if self.lag_days < 0 {
            return Err(EngineError::Validation(format!(
                "dependency '{}' has negative lag_days ({})",
                self.id, self.lag_days
            )));
        }
        if self.lag_days > MAX_LAG_DAYS {
            return Err(EngineError::Validation(format!(
                "dependency '{}' has lag_days {} above the maximum of {MAX_LAG_DAYS}",
                self.id, self.lag_days
            )));
        }
        Ok(())
    }

    /// Same endpoints and relationship, ignoring id and lag.
    pub fn same_link(&self, other: &Dependency) -> bool {
        self.source_id == other.source_id
            && self.depends_on_id == other.depends_on_id
            && self.dependency_type == other.dependency_type
    }
}
