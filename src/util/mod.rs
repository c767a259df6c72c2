//! Shared utilities for `benchdiff`.
//!
//! - Content hashing (SHA256) of compiled binaries
//! - Cancellable process execution and tool lookup
//! - Human-readable number formatting
//! - Progress indicators

mod hash;
pub mod humanize;
pub mod process;
pub mod progress;

pub use hash::ContentHash;
pub use process::{CancelToken, CommandOutput, require_tool, run_checked, run_command};
