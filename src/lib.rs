// src/lib.rs

//! Milestone and task dependency and progress engine.
//!
//! Given a snapshot of a booking's milestones, tasks, dependency edges and
//! approvals, the engine computes progress, decides which status transitions
//! are allowed, keeps milestone ordering dense and gates completion on
//! client approval. [`engine::MilestoneEngine`] applies decisions to a
//! [`store::BookingStore`] as atomic, versioned batches.

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod model;
pub mod progress;
pub mod store;
pub mod types;

use anyhow::Result;
use chrono::Utc;
use tracing::info;

use crate::cli::CliArgs;
use crate::config::load_and_validate;
use crate::engine::{MilestoneEngine, NoopHandler};
use crate::store::MemoryStore;

/// High-level entry point used by `main.rs`: load and validate a booking
/// file, then print either a one-line summary (`--check`) or a report.
pub fn run(args: CliArgs) -> Result<()> {
    let file = load_and_validate(&args.booking)?;
    let booking_id = file.booking.id.clone();

    if args.check {
        let tasks = file.booking.tasks().count();
        println!(
            "{}: ok ({} milestones, {} tasks, version {})",
            args.booking.display(),
            file.booking.milestones.len(),
            tasks,
            file.booking.version
        );
        return Ok(());
    }

    let store = MemoryStore::new();
    store.insert(file.booking)?;
    let engine = MilestoneEngine::new(store, NoopHandler, file.settings);

    let now = args.now.unwrap_or_else(Utc::now);
    info!(booking = %booking_id, %now, "building report");
    let report = engine.report(&booking_id, now)?;
    print!("{report}");
    Ok(())
}
