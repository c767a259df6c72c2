mod common;

use assert_cmd::Command;
use common::cli::{CliWorkspace, run_benchdiff};
use predicates::prelude::*;
use serde_json::Value;

const SNAPSHOTS: &str = concat!(
    r#"{"finished":false,"report":{"base_ref":"abcd","head_ref":"ef00","runs":[{"name":"m/a.BenchmarkA","results":[]}]}}"#,
    "\n",
    r#"{"finished":true,"generated_at":"2026-01-05T10:00:00Z","report":{"base_ref":"abcd","head_ref":"ef00","runs":[{"name":"m/a.BenchmarkA","results":[{"name":"cpu","unit":"ns","base":{"value":10000000,"key":"k1"},"head":{"value":20000000,"key":"k2"}}]}]}}"#,
    "\n",
);

#[test]
fn e2e_version() {
    let _log = common::test_log("e2e_version");
    let workspace = CliWorkspace::new();

    let human = run_benchdiff(&workspace, ["version"]);
    assert!(human.status.success(), "version failed: {}", human.stderr);
    assert!(human.stdout.starts_with("benchdiff version "));

    let json = run_benchdiff(&workspace, ["version", "--json"]);
    assert!(json.status.success(), "version --json failed: {}", json.stderr);
    let payload: Value = serde_json::from_str(json.stdout.trim()).expect("version json");
    assert_eq!(payload["version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn e2e_render_last_snapshot() {
    let _log = common::test_log("e2e_render_last_snapshot");
    let workspace = CliWorkspace::new();
    let input = workspace.write("report.jsonl", SNAPSHOTS);

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("benchdiff"));
    cmd.current_dir(&workspace.root)
        .env("HOME", &workspace.root)
        .args(["render", "--repository", "my-org/my-repo", "--input"])
        .arg(&input);
    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("### Benchmark Report\n\n__Finished__\n"))
        .stdout(predicate::str::contains(
            "abcd -> ef00 ([compare](https://github.com/my-org/my-repo/compare/abcd...ef00))",
        ))
        .stdout(predicate::str::contains(
            "| cpu | [10ms](https://flamegraph.com/share/k1) | [20ms](https://flamegraph.com/share/k2) | [100 %](https://flamegraph.com/share/k1/k2) |",
        ));
}

#[test]
fn e2e_render_in_progress_override() {
    let _log = common::test_log("e2e_render_in_progress_override");
    let workspace = CliWorkspace::new();
    let input = workspace.write("report.jsonl", SNAPSHOTS);

    let run = run_benchdiff(
        &workspace,
        [
            "render",
            "--in-progress",
            "--share-url",
            "http://localhost:4040",
            "--input",
            input.to_str().expect("utf-8 path"),
        ],
    );
    assert!(run.status.success(), "render failed: {}", run.stderr);
    assert!(run.stdout.contains("__In progress__"));
    assert!(run.stdout.contains("http://localhost:4040/share/k1"));
}

#[test]
fn e2e_render_empty_input_is_validation_error() {
    let _log = common::test_log("e2e_render_empty_input_is_validation_error");
    let workspace = CliWorkspace::new();
    let input = workspace.write("empty.jsonl", "\n");

    let run = run_benchdiff(
        &workspace,
        ["render", "--json", "--input", input.to_str().expect("utf-8 path")],
    );
    assert_eq!(run.status.code(), Some(2));
    let start = run.stderr.find('{').expect("json error on stderr");
    let payload: Value = serde_json::from_str(&run.stderr[start..]).expect("error json");
    assert_eq!(payload["error"]["code"], "VALIDATION");
}

#[test]
fn e2e_compare_rejects_invalid_bench_time() {
    let _log = common::test_log("e2e_compare_rejects_invalid_bench_time");
    let workspace = CliWorkspace::new();

    let run = run_benchdiff(&workspace, ["compare", "--bench-time", "forever", "--no-share"]);
    assert_eq!(run.status.code(), Some(2), "stderr: {}", run.stderr);
    assert!(run.stderr.contains("bench-time"));
}

#[test]
fn e2e_compare_reads_project_config() {
    let _log = common::test_log("e2e_compare_reads_project_config");
    let workspace = CliWorkspace::new();
    workspace.write(".benchdiff.yaml", "workers: 0\n");

    let run = run_benchdiff(&workspace, ["compare"]);
    assert_eq!(run.status.code(), Some(2), "stderr: {}", run.stderr);
    assert!(run.stderr.contains("workers"));
}

#[test]
fn e2e_compare_outside_repository_fails() {
    let _log = common::test_log("e2e_compare_outside_repository_fails");
    let workspace = CliWorkspace::new();

    let run = run_benchdiff(&workspace, ["compare", "--no-share", "--timeout", "60"]);
    assert!(!run.status.success());
    assert!(run.stdout.is_empty(), "no report expected: {}", run.stdout);
}
