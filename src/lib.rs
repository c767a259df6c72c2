//! `benchdiff`: compare Go micro benchmarks between two git revisions.
//!
//! The engine discovers packages in a base and a head revision, compiles
//! their test binaries, runs every benchmark whose code changed under CPU
//! and memory profiling, and publishes a side-by-side report to the
//! configured reporters while measurements come in.

pub mod bench;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod profile;
pub mod report;
pub mod toolchain;
pub mod util;
pub mod vcs;
pub mod workspace;

pub use error::{BenchError, Result};
