// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{BookingFile, RawBookingFile};
use crate::errors::Result;

/// Read and deserialize a booking file without semantic validation.
/// Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawBookingFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let raw: RawBookingFile = toml::from_str(&contents)?;
    debug!(path = %path.display(), milestones = raw.milestone.len(), "booking file parsed");

    Ok(raw)
}

/// Read, deserialize and validate a booking file.
///
/// On success every id reference resolves, both dependency graphs are
/// acyclic, `order_index` is dense and derived fields are fresh.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<BookingFile> {
    let raw = load_from_path(&path)?;
    BookingFile::try_from(raw)
}

/// `Booking.toml` in the current working directory.
pub fn default_booking_path() -> PathBuf {
    PathBuf::from("Booking.toml")
}
