// src/model/approval.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::MilestoneId;
use crate::types::ApprovalStatus;

/// A client sign-off record. A milestone accumulates a history of these;
/// only the most recent one is authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Approval {
    pub id: String,
    #[serde(default)]
    pub milestone_id: MilestoneId,
    pub status: ApprovalStatus,
    #[serde(default)]
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Most recent approval by creation time.
///
/// Ties on `created_at` resolve to the later entry in the slice, which is the
/// later insertion.
pub fn latest_approval(history: &[Approval]) -> Option<&Approval> {
    history
        .iter()
        .enumerate()
        .max_by(|(ia, a), (ib, b)| a.created_at.cmp(&b.created_at).then(ia.cmp(ib)))
        .map(|(_, approval)| approval)
}
