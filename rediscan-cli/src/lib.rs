//! Command-line front end for `rediscan-core`.
//!
//! The `rediscan` binary parses flags (and `REDISCAN_*` variables), layers
//! them over an optional options file, installs tracing, and runs a scan with
//! the print or delete action. The pieces live here so they can be tested
//! without spawning the binary.

pub mod actions;
pub mod cli;
pub mod logging;
pub mod options_file;

use rediscan_core::ScanError;

pub use actions::{DeleteAction, PrintAction};
pub use cli::{Cli, Command, LogFormat, LogLevel, ScanArgs};

/// Scan gave up after repeated batch failures.
pub const EXIT_FATAL: u8 = 1;
/// Rejected before scanning started: bad options or unreachable server.
pub const EXIT_CONFIG: u8 = 2;

/// Exit status for a failed run.
pub fn exit_status_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<ScanError>() {
        Some(scan) if scan.is_fatal() => EXIT_FATAL,
        _ => EXIT_CONFIG,
    }
}
