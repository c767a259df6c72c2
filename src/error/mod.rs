//! Error types and handling for `benchdiff`.
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types
//! - Supports `anyhow` integration for ad-hoc context
//! - Separates run-fatal errors from errors scoped to one measurement
//! - Provides recovery hints and exit codes for the CLI

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for `benchdiff` operations.
#[derive(Error, Debug)]
pub enum BenchError {
    // === Environment ===
    /// A required external tool is not on `PATH`.
    #[error("Required tool not found on PATH: {tool}")]
    MissingTool { tool: String },

    // === Revisions ===
    /// A revision reference could not be resolved to a commit.
    #[error("Cannot resolve revision '{reference}': {reason}")]
    RevisionResolve { reference: String, reason: String },

    /// The isolated base checkout could not be created.
    #[error("Cannot check out commit {commit}: {reason}")]
    Checkout { commit: String, reason: String },

    // === Phase 1 ===
    /// Package enumeration failed.
    #[error("Package discovery failed in '{root}': {reason}")]
    Discovery { root: PathBuf, reason: String },

    /// Test executable compilation failed.
    #[error("Failed to compile tests for {package}: {reason}")]
    Compile { package: String, reason: String },

    /// Compilation produced a zero-byte executable.
    #[error("Test binary for {package} is empty: {}", path.display())]
    EmptyBinary { package: String, path: PathBuf },

    /// Listing was attempted before the package was compiled.
    #[error("Test binary not compiled for {package}")]
    BinaryNotCompiled { package: String },

    /// Benchmark enumeration failed.
    #[error("Failed to list benchmarks for {package}: {reason}")]
    List { package: String, reason: String },

    // === Phase 2 (recoverable) ===
    /// A single benchmark execution failed.
    #[error("Benchmark {package}.{benchmark} failed: {reason}")]
    Benchmark {
        package: String,
        benchmark: String,
        reason: String,
    },

    /// A profiling artifact could not be decoded.
    #[error("Cannot parse profile '{}': {reason}", path.display())]
    ProfileParse { path: PathBuf, reason: String },

    /// The profile-sharing service failed.
    #[error("Profile sharing failed: {0}")]
    Share(String),

    /// A reporter failed to deliver a report.
    #[error("Reporter '{reporter}' failed: {reason}")]
    Reporter { reporter: String, reason: String },

    // === Processes ===
    /// An external command exited unsuccessfully.
    #[error("Command `{command}` failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    /// The run was cancelled (e.g. Ctrl-C or a sibling task failure).
    #[error("Run cancelled")]
    Cancelled,

    /// The overall run deadline passed.
    #[error("Run deadline exceeded")]
    DeadlineExceeded,

    /// One or more teardown actions failed.
    #[error("Teardown failed: {}", errors.join("; "))]
    Teardown { errors: Vec<String> },

    // === Configuration ===
    /// Configuration file error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Field validation failed.
    #[error("Validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    // === I/O ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Wrapped anyhow error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BenchError {
    /// Does this error abort the whole comparison run?
    ///
    /// Measurement, profile, sharing and reporter failures only degrade the
    /// affected value.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::Benchmark { .. }
                | Self::ProfileParse { .. }
                | Self::Share(_)
                | Self::Reporter { .. }
        )
    }

    /// Was this error caused by cancellation or the deadline?
    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }

    /// Human-friendly suggestion for fixing this error.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::MissingTool { .. } => Some("Install go and git and make sure they are on PATH"),
            Self::RevisionResolve { .. } => {
                Some("Check --git-base; shallow clones may need `git fetch --unshallow`")
            }
            Self::Checkout { .. } => Some("Run `git worktree prune` and retry"),
            Self::Compile { .. } | Self::EmptyBinary { .. } => {
                Some("Make sure `go test -c` succeeds for the package on both revisions")
            }
            Self::Validation { .. } | Self::Config(_) => {
                Some("Check the flags, BENCHDIFF_* variables and .benchdiff.yaml")
            }
            Self::DeadlineExceeded => Some("Increase --timeout or reduce --bench-time"),
            _ => None,
        }
    }

    /// Short machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingTool { .. } => "MISSING_TOOL",
            Self::RevisionResolve { .. } => "REVISION_RESOLVE",
            Self::Checkout { .. } => "CHECKOUT",
            Self::Discovery { .. } => "DISCOVERY",
            Self::Compile { .. } => "COMPILE",
            Self::EmptyBinary { .. } => "EMPTY_BINARY",
            Self::BinaryNotCompiled { .. } => "BINARY_NOT_COMPILED",
            Self::List { .. } => "LIST",
            Self::Benchmark { .. } => "BENCHMARK",
            Self::ProfileParse { .. } => "PROFILE_PARSE",
            Self::Share(_) => "SHARE",
            Self::Reporter { .. } => "REPORTER",
            Self::CommandFailed { .. } => "COMMAND_FAILED",
            Self::Cancelled => "CANCELLED",
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Self::Teardown { .. } => "TEARDOWN",
            Self::Config(_) => "CONFIG",
            Self::Validation { .. } => "VALIDATION",
            Self::Io(_) => "IO",
            Self::Json(_) => "JSON",
            Self::Yaml(_) => "YAML",
            Self::Http(_) => "HTTP",
            Self::Other(_) => "INTERNAL",
        }
    }

    /// Get the process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::MissingTool { .. } | Self::Config(_) | Self::Validation { .. } => 2,
            Self::Cancelled => 130,
            Self::DeadlineExceeded => 124,
            _ => 1,
        }
    }

    /// Create a validation error for a specific field.
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Structured JSON form used by `--json` error output.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
                "hint": self.suggestion(),
            }
        })
    }
}

/// Result type using `BenchError`.
pub type Result<T> = std::result::Result<T, BenchError>;
