// src/config/mod.rs

//! Booking snapshot files.
//!
//! - `model.rs`: the TOML-backed data model.
//! - `loader.rs`: reading a file from disk.
//! - `validate.rs`: semantic checks turning a raw file into a [`BookingFile`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_booking_path, load_and_validate, load_from_path};
pub use model::{BookingFile, BookingSection, RawBookingFile, RawMilestone};
