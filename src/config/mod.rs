//! Configuration management for `benchdiff`.
//!
//! Configuration sources and precedence (highest wins):
//! 1. CLI overrides
//! 2. Environment variables (`BENCHDIFF_*`)
//! 3. Explicit `--config` file
//! 4. Project config (`.benchdiff.yaml` in the working tree)
//! 5. User config (`~/.config/benchdiff/config.yaml`)
//! 6. Defaults

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::error::{BenchError, Result};
use crate::profile::share::DEFAULT_SHARE_URL;
use crate::toolchain::RunOptions;

/// Project config file name, looked up in the working tree root.
pub const PROJECT_CONFIG_FILE: &str = ".benchdiff.yaml";
const ENV_PREFIX: &str = "BENCHDIFF_";

/// Go duration (`10s`, `1m30s`, `500ms`) or iteration count (`100x`).
const BENCH_TIME_PATTERN: &str = r"^(?:(?:[0-9]+(?:\.[0-9]*)?(?:ns|us|µs|ms|s|m|h))+|[0-9]+x)$";

static BENCH_TIME_RE: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(BENCH_TIME_PATTERN));

/// Flat key/value configuration layer. Keys are kebab-case, nested YAML
/// keys are joined with `.`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    pub values: HashMap<String, String>,
}

impl ConfigLayer {
    /// Set a key, normalizing its spelling.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(normalize_key(key), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&normalize_key(key)).map(String::as_str)
    }

    /// Merge another layer on top of this one (higher precedence wins).
    pub fn merge_from(&mut self, other: &Self) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Merge multiple layers in precedence order (lowest to highest).
    #[must_use]
    pub fn merge_layers(layers: &[Self]) -> Self {
        let mut merged = Self::default();
        for layer in layers {
            merged.merge_from(layer);
        }
        merged
    }

    /// Build a layer from a YAML file path. Missing files return empty config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// # Errors
    ///
    /// Returns a YAML error for malformed input.
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(contents)?;
        let mut flat = HashMap::new();
        flatten_yaml(&value, "", &mut flat);

        let mut layer = Self::default();
        for (key, value) in flat {
            layer.set(&key, value);
        }
        Ok(layer)
    }

    /// Build a layer from `BENCHDIFF_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(env::vars())
    }

    /// Build a layer from `(name, value)` pairs, keeping `BENCHDIFF_*` ones.
    #[must_use]
    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut layer = Self::default();
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layer.set(stripped, value);
            }
        }
        layer
    }
}

/// CLI overrides for config loading (all optional).
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub git_base: Option<String>,
    pub bench_time: Option<String>,
    pub bench_count: Option<u32>,
    pub workers: Option<usize>,
    pub timeout: Option<u64>,
    pub share: Option<bool>,
    pub share_url: Option<String>,
    pub github_commenter: Option<bool>,
    pub percentage_threshold: Option<f64>,
    pub output: Option<PathBuf>,
    pub console: Option<bool>,
}

impl CliOverrides {
    #[must_use]
    pub fn as_layer(&self) -> ConfigLayer {
        let mut layer = ConfigLayer::default();

        if let Some(git_base) = &self.git_base {
            layer.set("git-base", git_base.clone());
        }
        if let Some(bench_time) = &self.bench_time {
            layer.set("bench-time", bench_time.clone());
        }
        if let Some(count) = self.bench_count {
            layer.set("bench-count", count.to_string());
        }
        if let Some(workers) = self.workers {
            layer.set("workers", workers.to_string());
        }
        if let Some(timeout) = self.timeout {
            layer.set("timeout", timeout.to_string());
        }
        if let Some(share) = self.share {
            layer.set("share", share.to_string());
        }
        if let Some(url) = &self.share_url {
            layer.set("share-url", url.clone());
        }
        if let Some(enabled) = self.github_commenter {
            layer.set("github-commenter", enabled.to_string());
        }
        if let Some(threshold) = self.percentage_threshold {
            layer.set("percentage-threshold", threshold.to_string());
        }
        if let Some(path) = &self.output {
            layer.set("output", path.to_string_lossy().to_string());
        }
        if let Some(console) = self.console {
            layer.set("console", console.to_string());
        }

        layer
    }
}

/// Default config layer (lowest precedence).
#[must_use]
pub fn default_config_layer() -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    layer.set("git-base", "HEAD~1");
    layer.set("head", "HEAD");
    layer.set("bench-time", "10s");
    layer.set("bench-count", "1");
    layer.set("workers", "4");
    layer.set("share", "true");
    layer.set("share-url", DEFAULT_SHARE_URL);
    layer.set("github-commenter", "false");
    layer.set("percentage-threshold", "5");
    layer.set("console", "true");
    layer
}

/// Load user config (`~/.config/benchdiff/config.yaml`).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<ConfigLayer> {
    let Ok(home) = env::var("HOME") else {
        return Ok(ConfigLayer::default());
    };
    let path = Path::new(&home)
        .join(".config")
        .join("benchdiff")
        .join("config.yaml");
    ConfigLayer::from_yaml(&path)
}

/// Load project config from the working tree root.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(working_tree: &Path) -> Result<ConfigLayer> {
    ConfigLayer::from_yaml(&working_tree.join(PROJECT_CONFIG_FILE))
}

/// Load configuration with the full precedence chain.
///
/// # Errors
///
/// Returns an error if a config file cannot be read or parsed, or if an
/// explicit `--config` file does not exist.
pub fn load_config(
    working_tree: &Path,
    explicit: Option<&Path>,
    cli: &CliOverrides,
) -> Result<ConfigLayer> {
    let explicit_layer = match explicit {
        Some(path) if !path.exists() => {
            return Err(BenchError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        Some(path) => ConfigLayer::from_yaml(path)?,
        None => ConfigLayer::default(),
    };

    Ok(ConfigLayer::merge_layers(&[
        default_config_layer(),
        load_user_config()?,
        load_project_config(working_tree)?,
        explicit_layer,
        ConfigLayer::from_env(),
        cli.as_layer(),
    ]))
}

/// Validated settings of the `compare` command.
#[derive(Debug, Clone, PartialEq)]
pub struct CompareConfig {
    pub git_base: String,
    pub head: String,
    pub bench_time: String,
    pub bench_count: u32,
    pub workers: usize,
    pub timeout: Option<Duration>,
    pub share: bool,
    pub share_url: String,
    pub github_commenter: bool,
    pub percentage_threshold: f64,
    /// JSON-lines export target; `-` means stdout.
    pub output: Option<PathBuf>,
    pub console: bool,
}

impl CompareConfig {
    /// Extract and validate settings from a merged layer.
    ///
    /// # Errors
    ///
    /// Returns `Validation` naming the first invalid key.
    pub fn from_layer(layer: &ConfigLayer) -> Result<Self> {
        let git_base = required_string(layer, "git-base")?;
        let head = required_string(layer, "head")?;

        let bench_time = required_string(layer, "bench-time")?;
        validate_bench_time(&bench_time)?;

        let bench_count: u32 = parse_number(layer, "bench-count")?.unwrap_or(1);
        if bench_count == 0 {
            return Err(BenchError::validation("bench-count", "must be at least 1"));
        }
        let workers: usize = parse_number(layer, "workers")?.unwrap_or(4);
        if workers == 0 {
            return Err(BenchError::validation("workers", "must be at least 1"));
        }
        let timeout = match parse_number::<u64>(layer, "timeout")? {
            Some(0) | None => None,
            Some(secs) => Some(Duration::from_secs(secs)),
        };

        let share_url = required_string(layer, "share-url")?;
        if !(share_url.starts_with("http://") || share_url.starts_with("https://")) {
            return Err(BenchError::validation("share-url", "must be an http(s) URL"));
        }

        let percentage_threshold: f64 = parse_number(layer, "percentage-threshold")?.unwrap_or(5.0);
        if !percentage_threshold.is_finite() || percentage_threshold < 0.0 {
            return Err(BenchError::validation(
                "percentage-threshold",
                "must be a non-negative number",
            ));
        }

        let output = layer
            .get("output")
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            git_base,
            head,
            bench_time,
            bench_count,
            workers,
            timeout,
            share: parse_flag(layer, "share")?.unwrap_or(true),
            share_url,
            github_commenter: parse_flag(layer, "github-commenter")?.unwrap_or(false),
            percentage_threshold,
            output,
            console: parse_flag(layer, "console")?.unwrap_or(true),
        })
    }

    #[must_use]
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            bench_time: self.bench_time.clone(),
            count: self.bench_count,
        }
    }
}

/// Check a benchmark duration in Go syntax.
///
/// # Errors
///
/// Returns `Validation` for anything `go test -benchtime` would reject.
pub fn validate_bench_time(value: &str) -> Result<()> {
    let pattern = BENCH_TIME_RE
        .as_ref()
        .map_err(|e| BenchError::Other(anyhow::anyhow!("invalid bench-time pattern: {e}")))?;
    if pattern.is_match(value.trim()) {
        Ok(())
    } else {
        Err(BenchError::validation(
            "bench-time",
            format!("'{value}' is not a duration (e.g. 10s, 500ms) or iteration count (e.g. 100x)"),
        ))
    }
}

fn required_string(layer: &ConfigLayer, key: &str) -> Result<String> {
    layer
        .get(key)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| BenchError::validation(key, "must not be empty"))
}

fn parse_number<T: std::str::FromStr>(layer: &ConfigLayer, key: &str) -> Result<Option<T>> {
    layer
        .get(key)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            v.parse::<T>()
                .map_err(|_| BenchError::validation(key, format!("'{v}' is not a valid number")))
        })
        .transpose()
}

fn parse_flag(layer: &ConfigLayer, key: &str) -> Result<Option<bool>> {
    layer
        .get(key)
        .map(|v| {
            parse_bool(v).ok_or_else(|| BenchError::validation(key, format!("'{v}' is not a boolean")))
        })
        .transpose()
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace('_', "-")
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn flatten_yaml(value: &serde_yaml::Value, prefix: &str, out: &mut HashMap<String, String>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (key, value) in map {
                let Some(key_str) = key.as_str() else {
                    continue;
                };
                let next_prefix = if prefix.is_empty() {
                    key_str.to_string()
                } else {
                    format!("{prefix}.{key_str}")
                };
                flatten_yaml(value, &next_prefix, out);
            }
        }
        _ => {
            if let Some(value) = yaml_scalar_to_string(value) {
                out.insert(prefix.to_string(), value);
            }
        }
    }
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Bool(v) => Some(v.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Null
        | serde_yaml::Value::Sequence(_)
        | serde_yaml::Value::Mapping(_) => None,
        serde_yaml::Value::Tagged(tagged) => yaml_scalar_to_string(&tagged.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn layer(pairs: &[(&str, &str)]) -> ConfigLayer {
        let mut layer = ConfigLayer::default();
        for (key, value) in pairs {
            layer.set(key, *value);
        }
        layer
    }

    fn with_defaults(pairs: &[(&str, &str)]) -> ConfigLayer {
        ConfigLayer::merge_layers(&[default_config_layer(), layer(pairs)])
    }

    #[test]
    fn defaults_are_valid() {
        let config = CompareConfig::from_layer(&default_config_layer()).expect("defaults");
        assert_eq!(config.git_base, "HEAD~1");
        assert_eq!(config.head, "HEAD");
        assert_eq!(config.bench_time, "10s");
        assert_eq!(config.bench_count, 1);
        assert_eq!(config.workers, 4);
        assert_eq!(config.timeout, None);
        assert!(config.share);
        assert_eq!(config.share_url, "https://flamegraph.com");
        assert!(!config.github_commenter);
        assert!((config.percentage_threshold - 5.0).abs() < f64::EPSILON);
        assert!(config.console);
        assert!(config.output.is_none());
    }

    #[test]
    fn precedence_cli_overrides_all() {
        let yaml = layer(&[("git-base", "main"), ("workers", "2")]);
        let env_layer = ConfigLayer::from_vars(vec![
            ("BENCHDIFF_GIT_BASE".to_string(), "develop".to_string()),
            ("UNRELATED".to_string(), "x".to_string()),
        ]);
        let cli = CliOverrides {
            git_base: Some("v1.0.0".to_string()),
            ..CliOverrides::default()
        };

        let merged = ConfigLayer::merge_layers(&[
            default_config_layer(),
            yaml,
            env_layer,
            cli.as_layer(),
        ]);
        assert_eq!(merged.get("git-base"), Some("v1.0.0"));
        assert_eq!(merged.get("workers"), Some("2"));
        assert!(merged.get("unrelated").is_none());
    }

    #[test]
    fn env_keys_are_normalized() {
        let env_layer = ConfigLayer::from_vars(vec![(
            "BENCHDIFF_PERCENTAGE_THRESHOLD".to_string(),
            "12.5".to_string(),
        )]);
        assert_eq!(env_layer.get("percentage-threshold"), Some("12.5"));
        assert_eq!(env_layer.get("percentage_threshold"), Some("12.5"));
    }

    #[test]
    fn yaml_nested_keys_flatten_with_dots() {
        let layer = ConfigLayer::from_yaml_str(
            r"
git-base: origin/main
bench-count: 3
share: false
github:
  commenter: true
",
        )
        .expect("yaml");
        assert_eq!(layer.get("git-base"), Some("origin/main"));
        assert_eq!(layer.get("bench-count"), Some("3"));
        assert_eq!(layer.get("share"), Some("false"));
        assert_eq!(layer.get("github.commenter"), Some("true"));
    }

    #[test]
    fn project_config_is_read_from_working_tree() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join(PROJECT_CONFIG_FILE), "bench-time: 2s\n").expect("write");
        let layer = load_project_config(dir.path()).expect("load");
        assert_eq!(layer.get("bench-time"), Some("2s"));

        let missing = TempDir::new().expect("tempdir");
        assert!(load_project_config(missing.path()).expect("load").values.is_empty());
    }

    #[test]
    fn explicit_config_must_exist() {
        let dir = TempDir::new().expect("tempdir");
        let err = load_config(
            dir.path(),
            Some(&dir.path().join("nope.yaml")),
            &CliOverrides::default(),
        )
        .unwrap_err();
        assert!(matches!(err, BenchError::Config(_)));
    }

    #[test]
    fn bench_time_validation() {
        assert!(BENCH_TIME_RE.is_ok());
        for ok in ["10s", "500ms", "1m30s", "1.5s", "100x", "2h"] {
            validate_bench_time(ok).unwrap_or_else(|e| panic!("{ok}: {e}"));
        }
        for bad in ["", "10", "ten seconds", "10x5", "-1s", "s"] {
            assert!(validate_bench_time(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn invalid_values_are_rejected() {
        let cases = [
            ("bench-count", "0"),
            ("bench-count", "many"),
            ("workers", "0"),
            ("share", "maybe"),
            ("share-url", "ftp://example.com"),
            ("percentage-threshold", "-1"),
            ("bench-time", "forever"),
            ("git-base", "  "),
        ];
        for (key, value) in cases {
            let err = CompareConfig::from_layer(&with_defaults(&[(key, value)])).unwrap_err();
            match err {
                BenchError::Validation { field, .. } => assert_eq!(field, key),
                other => panic!("{key}={value}: unexpected {other}"),
            }
        }
    }

    #[test]
    fn timeout_and_output() {
        let config = CompareConfig::from_layer(&with_defaults(&[
            ("timeout", "90"),
            ("output", "report.jsonl"),
            ("console", "off"),
        ]))
        .expect("config");
        assert_eq!(config.timeout, Some(Duration::from_secs(90)));
        assert_eq!(config.output, Some(PathBuf::from("report.jsonl")));
        assert!(!config.console);

        let run = config.run_options();
        assert_eq!(run.bench_time, "10s");
        assert_eq!(run.count, 1);
    }
}
