// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};

/// Command-line arguments for `milestones`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "milestones",
    version,
    about = "Report progress, blockers and approvals for a booking's milestones.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the booking snapshot (TOML).
    #[arg(long, value_name = "PATH", default_value = "Booking.toml")]
    pub booking: PathBuf,

    /// Evaluate lag constraints at this instant (RFC 3339) instead of now.
    #[arg(long, value_name = "RFC3339")]
    pub now: Option<DateTime<Utc>>,

    /// Only parse and validate the file, then print a one-line summary.
    #[arg(long)]
    pub check: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `MILESTONES_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_explicit_instant() {
        let args = CliArgs::try_parse_from(["milestones"]).unwrap();
        assert_eq!(args.booking, PathBuf::from("Booking.toml"));
        assert!(args.now.is_none());
        assert!(!args.check);

        let args = CliArgs::try_parse_from([
            "milestones",
            "--booking",
            "b.toml",
            "--now",
            "2024-05-01T09:00:00Z",
            "--check",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(args.now.unwrap().to_rfc3339(), "2024-05-01T09:00:00+00:00");
        assert!(args.check);
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    }
}
