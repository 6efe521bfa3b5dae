// src/config/model.rs

use serde::Deserialize;

use crate::engine::EngineSettings;
use crate::model::{Booking, BookingId, Comment, Milestone};

/// A booking snapshot as read from TOML, before any semantic checks.
///
/// ```toml
/// [settings]
/// require_approval = true
///
/// [booking]
/// id = "b-1001"
///
/// [[milestone]]
/// id = "design"
/// title = "Design"
/// order_index = 0
///
/// [[milestone.task]]
/// id = "wireframes"
/// title = "Wireframes"
/// weight = 2.0
/// status = "completed"
///
/// [[milestone]]
/// id = "build"
/// title = "Build"
/// order_index = 1
///
/// [[milestone.dependency]]
/// id = "build-after-design"
/// depends_on = "design"
/// type = "finish_to_start"
/// lag_days = 2
/// ```
///
/// `order_index` is either set on every milestone or left out everywhere, in
/// which case file order is used. Timestamps are RFC 3339 strings and dates
/// are `YYYY-MM-DD` strings.
/// Derived fields (`progress_percentage`, `critical_path`) are recomputed on
/// load, whatever the file says.
#[derive(Debug, Clone, Deserialize)]
pub struct RawBookingFile {
    #[serde(default)]
    pub settings: EngineSettings,

    pub booking: BookingSection,

    #[serde(default)]
    pub milestone: Vec<RawMilestone>,

    #[serde(default)]
    pub comment: Vec<Comment>,
}

/// One `[[milestone]]` table. The position is kept apart so that an omitted
/// `order_index` can be told from an explicit `0`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawMilestone {
    #[serde(default)]
    pub order_index: Option<usize>,
    #[serde(flatten)]
    pub milestone: Milestone,
}

/// `[booking]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingSection {
    pub id: BookingId,
    #[serde(default)]
    pub version: u64,
}

/// A validated snapshot, ready to seed a store.
#[derive(Debug, Clone)]
pub struct BookingFile {
    pub settings: EngineSettings,
    pub booking: Booking,
}

impl BookingFile {
    /// Construct without running validation. Used after `TryFrom` succeeds.
    pub(crate) fn new_unchecked(settings: EngineSettings, booking: Booking) -> Self {
        Self { settings, booking }
    }
}
