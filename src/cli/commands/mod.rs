//! Subcommand implementations.

pub mod compare;
pub mod render;
pub mod version;
