//! Render command implementation.
//!
//! Turns the last snapshot of a JSON-lines export back into the Markdown
//! report, e.g. to post it from a later CI step.

use std::fs;
use std::io::{self, Read};

use crate::cli::RenderArgs;
use crate::error::{BenchError, Result};
use crate::profile::DEFAULT_SHARE_URL;
use crate::report::github::parse_repository;
use crate::report::{MarkdownRenderer, ReportSnapshot};

/// Parse the last non-empty line of a JSON-lines export.
///
/// # Errors
///
/// Returns `Validation` if there is no snapshot, or `Json` if the line is
/// malformed.
pub fn last_snapshot(contents: &str) -> Result<ReportSnapshot> {
    let line = contents
        .lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
        .ok_or_else(|| BenchError::validation("input", "contains no report snapshot"))?;
    Ok(serde_json::from_str(line)?)
}

/// Execute the render command.
///
/// # Errors
///
/// Returns an error if the input cannot be read or parsed.
pub fn execute(args: &RenderArgs, json: bool) -> Result<()> {
    let contents = if args.input.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        fs::read_to_string(&args.input)?
    };
    let snapshot = last_snapshot(&contents)?;
    let finished = snapshot.finished && !args.in_progress;

    if json {
        let payload = serde_json::json!({
            "finished": finished,
            "report": snapshot.report,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    let mut renderer =
        MarkdownRenderer::new(args.share_url.as_deref().unwrap_or(DEFAULT_SHARE_URL));
    if let Some(repository) = &args.repository {
        let (owner, repo) = parse_repository(repository).ok_or_else(|| {
            BenchError::validation("repository", "must be in the format owner/repo")
        })?;
        renderer = renderer.with_compare_link(owner, repo);
    }
    print!("{}", renderer.render(&snapshot.report, finished));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_snapshot_wins() {
        let contents = concat!(
            r#"{"finished":false,"report":{"base_ref":"a","head_ref":"b","runs":[]}}"#,
            "\n",
            r#"{"finished":true,"report":{"base_ref":"c","head_ref":"d","runs":[]}}"#,
            "\n\n",
        );
        let snapshot = last_snapshot(contents).unwrap();
        assert!(snapshot.finished);
        assert_eq!(snapshot.report.base_ref, "c");
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let err = last_snapshot("\n  \n").unwrap_err();
        assert!(matches!(err, BenchError::Validation { .. }));
    }

    #[test]
    fn test_malformed_line_is_json_error() {
        let err = last_snapshot("{not json}").unwrap_err();
        assert!(matches!(err, BenchError::Json(_)));
    }
}
