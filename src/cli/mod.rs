//! CLI definitions and entry point.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::CliOverrides;

pub mod commands;

/// Compare Go benchmarks between two git revisions
#[derive(Parser, Debug)]
#[command(name = "benchdiff", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (merged above user and project config)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Also write JSON logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Benchmark the working tree against a base revision
    Compare(CompareArgs),

    /// Render a JSON-lines export as Markdown
    Render(RenderArgs),

    /// Show version information
    Version,
}

#[derive(Args, Debug, Default, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct CompareArgs {
    /// Base revision to compare against
    #[arg(long)]
    pub git_base: Option<String>,

    /// Duration per benchmark in Go syntax (e.g. 10s, 500ms, 100x)
    #[arg(long)]
    pub bench_time: Option<String>,

    /// How often each benchmark runs inside one execution
    #[arg(long)]
    pub bench_count: Option<u32>,

    /// Parallel compile and list tasks
    #[arg(long, short = 'j')]
    pub workers: Option<usize>,

    /// Abort the whole run after this many seconds (0 disables)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Do not upload profiles to the sharing service
    #[arg(long)]
    pub no_share: bool,

    /// Base URL of the flamegraph sharing service
    #[arg(long)]
    pub share_url: Option<String>,

    /// Keep a pull request comment up to date (GitHub Actions)
    #[arg(long)]
    pub github_commenter: bool,

    /// Log diffs above this percentage as regressions
    #[arg(long)]
    pub percentage_threshold: Option<f64>,

    /// Write JSON-lines snapshots to this file (`-` for stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Do not print the final Markdown report
    #[arg(long)]
    pub no_console: bool,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl CompareArgs {
    /// Flags set on the command line, as the top configuration layer.
    #[must_use]
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            git_base: self.git_base.clone(),
            bench_time: self.bench_time.clone(),
            bench_count: self.bench_count,
            workers: self.workers,
            timeout: self.timeout,
            share: self.no_share.then_some(false),
            share_url: self.share_url.clone(),
            github_commenter: self.github_commenter.then_some(true),
            percentage_threshold: self.percentage_threshold,
            output: self.output.clone(),
            console: self.no_console.then_some(false),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    /// JSON-lines file written by `compare --output` (`-` for stdin)
    #[arg(long, short = 'i')]
    pub input: PathBuf,

    /// Base URL of the flamegraph sharing service
    #[arg(long)]
    pub share_url: Option<String>,

    /// Link commits to a GitHub compare view (`owner/repo`)
    #[arg(long)]
    pub repository: Option<String>,

    /// Render as in progress even if the snapshot is final
    #[arg(long)]
    pub in_progress: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_compare_flags_become_overrides() {
        let cli = Cli::parse_from([
            "benchdiff",
            "compare",
            "--git-base",
            "origin/main",
            "--bench-time",
            "2s",
            "--no-share",
            "--no-console",
            "-j",
            "8",
        ]);
        let Commands::Compare(args) = cli.command else {
            panic!("expected compare");
        };
        let overrides = args.overrides();
        assert_eq!(overrides.git_base.as_deref(), Some("origin/main"));
        assert_eq!(overrides.bench_time.as_deref(), Some("2s"));
        assert_eq!(overrides.workers, Some(8));
        assert_eq!(overrides.share, Some(false));
        assert_eq!(overrides.console, Some(false));
        assert_eq!(overrides.github_commenter, None);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["benchdiff", "version", "--json", "-vv"]);
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Version));
    }
}
