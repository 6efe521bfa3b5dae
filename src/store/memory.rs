// src/store/memory.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::anyhow;
use tracing::{debug, warn};

use super::{BookingStore, WriteBatch};
use crate::engine::sequence::is_dense;
use crate::errors::{EngineError, EntityKind, Result};
use crate::model::{Booking, BookingId};

/// In-process store. Each commit runs under one lock against a scratch copy,
/// so a batch lands completely or not at all.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    bookings: Arc<Mutex<HashMap<BookingId, Booking>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<BookingId, Booking>>> {
        self.bookings
            .lock()
            .map_err(|_| EngineError::Other(anyhow!("booking store lock poisoned")))
    }

    /// Seed or replace a booking as-is, version included.
    pub fn insert(&self, booking: Booking) -> Result<()> {
        let mut bookings = self.lock()?;
        bookings.insert(booking.id.clone(), booking);
        Ok(())
    }
}

impl BookingStore for MemoryStore {
    fn load(&self, booking_id: &str) -> Result<Booking> {
        let bookings = self.lock()?;
        bookings
            .get(booking_id)
            .cloned()
            .ok_or_else(|| EngineError::not_found(EntityKind::Booking, booking_id))
    }

    fn commit(&self, booking_id: &str, expected_version: u64, batch: WriteBatch) -> Result<u64> {
        let mut bookings = self.lock()?;
        let current = bookings
            .get(booking_id)
            .ok_or_else(|| EngineError::not_found(EntityKind::Booking, booking_id))?;

        if current.version != expected_version {
            warn!(
                booking = %booking_id,
                expected = expected_version,
                actual = current.version,
                "rejecting stale write batch"
            );
            return Err(EngineError::ConcurrencyConflict {
                expected: expected_version,
                actual: current.version,
            });
        }

        let mut next = current.clone();
        batch.apply_to(&mut next)?;
        if !is_dense(&next) {
            return Err(EngineError::Validation(format!(
                "write batch would leave booking '{booking_id}' with non-contiguous order_index values"
            )));
        }
        next.version = expected_version + 1;

        debug!(booking = %booking_id, ops = batch.len(), version = next.version, "write batch committed");
        let version = next.version;
        bookings.insert(booking_id.to_string(), next);
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Milestone;
    use crate::store::WriteOp;

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        let mut b = Booking::new("b1");
        b.milestones.push(Milestone::new("A", "b1", "A", 0));
        b.milestones.push(Milestone::new("B", "b1", "B", 1));
        store.insert(b).unwrap();
        store
    }

    #[test]
    fn stale_version_is_rejected() {
        let store = seeded();
        let mut batch = WriteBatch::new();
        batch.push(WriteOp::SetOrderIndex {
            milestone_id: "A".into(),
            order_index: 1,
        });
        batch.push(WriteOp::SetOrderIndex {
            milestone_id: "B".into(),
            order_index: 0,
        });

        assert_eq!(store.commit("b1", 0, batch.clone()).unwrap(), 1);
        let err = store.commit("b1", 0, batch).unwrap_err();
        assert!(matches!(
            err,
            EngineError::ConcurrencyConflict {
                expected: 0,
                actual: 1
            }
        ));
    }

    #[test]
    fn half_applied_reorder_is_refused_whole() {
        let store = seeded();
        let mut batch = WriteBatch::new();
        batch.push(WriteOp::SetOrderIndex {
            milestone_id: "A".into(),
            order_index: 1,
        });

        assert!(matches!(
            store.commit("b1", 0, batch),
            Err(EngineError::Validation(_))
        ));
        let b = store.load("b1").unwrap();
        assert_eq!(b.version, 0);
        assert_eq!(b.milestone("A").unwrap().order_index, 0);
    }

    #[test]
    fn unknown_booking_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.load("nope"),
            Err(EngineError::NotFound {
                kind: EntityKind::Booking,
                ..
            })
        ));
    }
}
