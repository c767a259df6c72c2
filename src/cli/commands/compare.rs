//! Compare command implementation.

use std::env;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use tracing::{debug, info, warn};

use crate::bench::{CompareOptions, Engine};
use crate::cli::CompareArgs;
use crate::config::{self, CompareConfig};
use crate::error::{BenchError, Result};
use crate::profile::{FlamegraphClient, OfflineSharer, ProfileSharer};
use crate::report::github::parse_repository;
use crate::report::{
    ConsoleReporter, GitHubCommentReporter, JsonLinesReporter, MarkdownRenderer, ReportPublisher,
    Reporter,
};
use crate::toolchain::GoToolchain;
use crate::util::CancelToken;
use crate::util::progress::should_show_progress;
use crate::vcs::GitVcs;

/// Execute the compare command.
///
/// # Errors
///
/// Returns configuration errors, any fatal engine error, or a serialization
/// error for `--json` output.
pub fn execute(
    args: &CompareArgs,
    json: bool,
    quiet: bool,
    config_path: Option<&Path>,
) -> Result<()> {
    let cwd = env::current_dir()?;
    let layer = config::load_config(&cwd, config_path, &args.overrides())?;
    let settings = CompareConfig::from_layer(&layer)?;
    debug!(?settings, "compare settings");

    let reporters = build_reporters(&settings, json)?;
    let publisher = ReportPublisher::new(reporters);
    info!(reporters = ?publisher.reporter_names(), "reporters attached");

    let cancel = settings
        .timeout
        .map_or_else(CancelToken::new, CancelToken::with_timeout);
    install_interrupt_handler(&cancel);

    let sharer: Arc<dyn ProfileSharer> = if settings.share {
        Arc::new(FlamegraphClient::new(settings.share_url.as_str())?)
    } else {
        Arc::new(OfflineSharer)
    };
    let engine = Engine::new(
        Arc::new(GitVcs::new(&cwd)),
        Arc::new(GoToolchain::new()),
        sharer,
    );

    let options = CompareOptions {
        base_ref: settings.git_base.clone(),
        head_ref: settings.head.clone(),
        working_tree: cwd,
        run: settings.run_options(),
        workers: settings.workers,
        regression_threshold: settings.percentage_threshold,
        show_progress: !args.no_progress && should_show_progress(quiet),
    };

    let outcome = engine.compare(&options, &publisher, &cancel);
    if let Err(e) = &outcome {
        publisher.publish_error(e);
    }
    publisher.shutdown();
    let report = outcome?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

fn install_interrupt_handler(cancel: &CancelToken) {
    let flag = cancel.flag();
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        warn!(error = %e, "cannot install Ctrl-C handler");
    }
}

/// Markdown renderer linking commits to the GitHub compare view when the
/// repository is known from the Actions environment.
fn renderer(share_url: &str) -> MarkdownRenderer {
    let renderer = MarkdownRenderer::new(share_url);
    match env::var("GITHUB_REPOSITORY")
        .ok()
        .as_deref()
        .and_then(parse_repository)
    {
        Some((owner, repo)) => renderer.with_compare_link(owner, repo),
        None => renderer,
    }
}

fn build_reporters(settings: &CompareConfig, json: bool) -> Result<Vec<Box<dyn Reporter>>> {
    let mut reporters: Vec<Box<dyn Reporter>> = Vec::new();

    // `--json` owns stdout for the final report.
    if settings.console && !json {
        reporters.push(Box::new(ConsoleReporter::stdout(renderer(&settings.share_url))));
    }

    if let Some(path) = &settings.output {
        let out: Box<dyn io::Write + Send> = if path.as_os_str() == "-" {
            Box::new(io::stdout())
        } else {
            let file = File::create(path).map_err(|e| {
                BenchError::Config(format!("cannot create output {}: {e}", path.display()))
            })?;
            Box::new(BufWriter::new(file))
        };
        reporters.push(Box::new(JsonLinesReporter::new(out)));
    }

    if settings.github_commenter {
        match GitHubCommentReporter::from_env(&settings.share_url)? {
            Some(reporter) => reporters.push(Box::new(reporter)),
            None => warn!("github commenter enabled outside a pull request, skipping"),
        }
    }

    Ok(reporters)
}
