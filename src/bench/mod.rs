//! Benchmark comparison pipeline.
//!
//! Phase one discovers, compiles and lists packages of both revisions;
//! the matcher turns the result into an execution plan; phase two measures
//! the plan one benchmark at a time.

pub mod compile;
pub mod discover;
pub mod engine;
pub mod list;
mod package;
pub mod plan;
pub mod scheduler;

pub use engine::{CompareOptions, Engine};
pub use package::{PackageRecord, count_with_tests};
pub use plan::{BenchmarkKey, ChangeReason, ComparisonEntry, KeyArena, build_plan};
