use benchdiff::BenchError;
use benchdiff::cli::commands;
use benchdiff::cli::{Cli, Commands};
use benchdiff::logging::init_logging;
use clap::Parser;
use std::io::{self, IsTerminal};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.quiet, cli.log_file.as_deref()) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let result = match &cli.command {
        Commands::Compare(args) => {
            commands::compare::execute(args, cli.json, cli.quiet, cli.config.as_deref())
        }
        Commands::Render(args) => commands::render::execute(args, cli.json),
        Commands::Version => commands::version::execute(cli.json),
    };

    if let Err(e) = result {
        handle_error(&e, cli.json);
    }
}

/// Handle errors with structured output support.
///
/// When --json is set or stdout is not a TTY, outputs structured JSON to stderr.
/// Otherwise, outputs a human-readable message with an optional hint.
fn handle_error(err: &BenchError, json_mode: bool) -> ! {
    tracing::error!(code = err.code(), error = %err, "command failed");
    let use_json = json_mode || !io::stdout().is_terminal();

    if use_json {
        let json = err.to_json();
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
        );
    } else {
        eprintln!("Error: {err}");
        if let Some(hint) = err.suggestion() {
            eprintln!("Hint: {hint}");
        }
    }

    std::process::exit(err.exit_code());
}
