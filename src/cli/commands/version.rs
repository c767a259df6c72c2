//! Version command implementation.

use crate::error::Result;
use serde::Serialize;

#[derive(Serialize)]
struct VersionOutput<'a> {
    version: &'a str,
    build: &'a str,
}

const fn build_kind() -> &'static str {
    if cfg!(debug_assertions) {
        "dev"
    } else {
        "release"
    }
}

/// Human-readable version line.
#[must_use]
pub fn version_line() -> String {
    format!(
        "benchdiff version {} ({})",
        env!("CARGO_PKG_VERSION"),
        build_kind()
    )
}

/// Execute the version command.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(json: bool) -> Result<()> {
    if json {
        let output = VersionOutput {
            version: env!("CARGO_PKG_VERSION"),
            build: build_kind(),
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("{}", version_line());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_line_names_the_tool() {
        let line = version_line();
        assert!(line.starts_with("benchdiff version "));
        assert!(line.contains(env!("CARGO_PKG_VERSION")));
    }
}
