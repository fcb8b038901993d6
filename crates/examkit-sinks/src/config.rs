//! Exam settings, sink configuration, and the sink factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use examkit_core::model::SessionConfig;
use examkit_core::traits::ReportSink;

use crate::file::JsonFileSink;
use crate::http::HttpSink;

/// Environment variable that adds (or overrides) an HTTP sink named `remote`.
pub const SINK_URL_ENV: &str = "EXAMKIT_SINK_URL";

/// Configuration for a single report sink.
///
/// Note: Custom Debug impl masks URLs, which often embed access tokens.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SinkConfig {
    Http {
        url: String,
        #[serde(default = "default_timeout")]
        timeout_secs: u64,
        #[serde(default)]
        max_retries: u32,
        #[serde(default = "default_retry_delay")]
        retry_delay_ms: u64,
    },
    File {
        #[serde(default = "default_results_dir")]
        dir: PathBuf,
    },
}

impl std::fmt::Debug for SinkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkConfig::Http {
                url: _,
                timeout_secs,
                max_retries,
                retry_delay_ms,
            } => f
                .debug_struct("Http")
                .field("url", &"***")
                .field("timeout_secs", timeout_secs)
                .field("max_retries", max_retries)
                .field("retry_delay_ms", retry_delay_ms)
                .finish(),
            SinkConfig::File { dir } => f.debug_struct("File").field("dir", dir).finish(),
        }
    }
}

fn default_timeout() -> u64 {
    10
}
fn default_retry_delay() -> u64 {
    1000
}
fn default_results_dir() -> PathBuf {
    PathBuf::from("./examkit-results")
}

/// The `[exam]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamSettings {
    /// Questions per exam.
    #[serde(default = "default_size")]
    pub size: usize,
    /// Time limit in seconds. Omitted means untimed.
    #[serde(default)]
    pub duration_secs: Option<u64>,
    /// Show explanations in the answer review.
    #[serde(default)]
    pub include_explanations: bool,
    /// Countdown tick period in milliseconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

fn default_size() -> usize {
    25
}
fn default_tick_interval() -> u64 {
    1000
}

impl Default for ExamSettings {
    fn default() -> Self {
        Self {
            size: default_size(),
            duration_secs: None,
            include_explanations: false,
            tick_interval_ms: default_tick_interval(),
        }
    }
}

impl ExamSettings {
    pub fn duration(&self) -> Option<Duration> {
        self.duration_secs.map(Duration::from_secs)
    }

    /// Controller settings. A zero tick interval is clamped to one millisecond.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            include_explanations: self.include_explanations,
            tick_interval: Duration::from_millis(self.tick_interval_ms.max(1)),
        }
    }
}

/// Top-level examkit configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExamkitConfig {
    #[serde(default)]
    pub exam: ExamSettings,
    /// Sink configurations keyed by name.
    #[serde(default)]
    pub sinks: HashMap<String, SinkConfig>,
}

impl ExamkitConfig {
    /// Build every configured sink, sorted by name.
    pub fn build_sinks(&self) -> Result<Vec<Arc<dyn ReportSink>>> {
        let mut names: Vec<&String> = self.sinks.keys().collect();
        names.sort();
        names
            .into_iter()
            .map(|name| create_sink(name, &self.sinks[name]).map(Arc::from))
            .collect()
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        let Some(end) = result[start..].find('}') else {
            break;
        };
        let var_name = &result[start + 2..start + end];
        let value = std::env::var(var_name).unwrap_or_default();
        result = format!(
            "{}{}{}",
            &result[..start],
            value,
            &result[start + end + 1..]
        );
    }
    result
}

fn resolve_sink_config(config: &SinkConfig) -> SinkConfig {
    match config {
        SinkConfig::Http {
            url,
            timeout_secs,
            max_retries,
            retry_delay_ms,
        } => SinkConfig::Http {
            url: resolve_env_vars(url),
            timeout_secs: *timeout_secs,
            max_retries: *max_retries,
            retry_delay_ms: *retry_delay_ms,
        },
        SinkConfig::File { dir } => SinkConfig::File {
            dir: PathBuf::from(resolve_env_vars(&dir.to_string_lossy())),
        },
    }
}

/// Point the `remote` HTTP sink at `url`, creating it if needed.
fn apply_sink_url_override(config: &mut ExamkitConfig, url: String) {
    match config.sinks.get_mut("remote") {
        Some(SinkConfig::Http { url: existing, .. }) => *existing = url,
        _ => {
            config.sinks.insert(
                "remote".into(),
                SinkConfig::Http {
                    url,
                    timeout_secs: default_timeout(),
                    max_retries: 0,
                    retry_delay_ms: default_retry_delay(),
                },
            );
        }
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `examkit.toml` in the current directory
/// 2. `~/.config/examkit/config.toml`
///
/// Environment variable override: `EXAMKIT_SINK_URL`.
pub fn load_config() -> Result<ExamkitConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<ExamkitConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("examkit.toml");
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|home| home.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = parse_config_str(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), sinks = config.sinks.len(), "config loaded");
            config
        }
        None => ExamkitConfig::default(),
    };

    if let Ok(url) = std::env::var(SINK_URL_ENV) {
        apply_sink_url_override(&mut config, url);
    }

    config.sinks = config
        .sinks
        .iter()
        .map(|(k, v)| (k.clone(), resolve_sink_config(v)))
        .collect();

    Ok(config)
}

/// Parse a TOML config document.
pub fn parse_config_str(content: &str) -> Result<ExamkitConfig> {
    let config: ExamkitConfig = toml::from_str(content)?;
    if config.exam.size == 0 {
        anyhow::bail!("[exam] size must be at least 1");
    }
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("examkit"))
}

/// Create a sink instance from its configuration.
pub fn create_sink(name: &str, config: &SinkConfig) -> Result<Box<dyn ReportSink>> {
    match config {
        SinkConfig::Http {
            url,
            timeout_secs,
            max_retries,
            retry_delay_ms,
        } => {
            if url.trim().is_empty() {
                anyhow::bail!("sink '{name}' has an empty url");
            }
            let sink = HttpSink::new(name, url, *timeout_secs)?
                .with_retries(*max_retries, Duration::from_millis(*retry_delay_ms));
            Ok(Box::new(sink))
        }
        SinkConfig::File { dir } => Ok(Box::new(JsonFileSink::new(name, dir))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_EXAMKIT_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_EXAMKIT_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("https://x/${_EXAMKIT_TEST_VAR}/exec"),
            "https://x/hello/exec"
        );
        assert_eq!(resolve_env_vars("${_EXAMKIT_UNSET_VAR}"), "");
        assert_eq!(resolve_env_vars("${unterminated"), "${unterminated");
        std::env::remove_var("_EXAMKIT_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = ExamkitConfig::default();
        assert_eq!(config.exam.size, 25);
        assert_eq!(config.exam.duration(), None);
        assert!(!config.exam.include_explanations);
        assert!(config.sinks.is_empty());
    }

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
[exam]
size = 10
duration_secs = 1200
include_explanations = true

[sinks.sheet]
type = "http"
url = "https://script.example.com/exec"
max_retries = 2

[sinks.archive]
type = "file"
dir = "./results"
"#;
        let config = parse_config_str(toml_str).unwrap();
        assert_eq!(config.exam.size, 10);
        assert_eq!(config.exam.duration(), Some(Duration::from_secs(1200)));
        assert_eq!(config.exam.tick_interval_ms, 1000);
        let session = config.exam.session_config();
        assert!(session.include_explanations);
        assert_eq!(session.tick_interval, Duration::from_secs(1));

        assert_eq!(
            config.sinks.get("sheet"),
            Some(&SinkConfig::Http {
                url: "https://script.example.com/exec".into(),
                timeout_secs: 10,
                max_retries: 2,
                retry_delay_ms: 1000,
            })
        );
        assert!(matches!(
            config.sinks.get("archive"),
            Some(SinkConfig::File { .. })
        ));
    }

    #[test]
    fn zero_size_is_rejected() {
        assert!(parse_config_str("[exam]\nsize = 0\n").is_err());
    }

    #[test]
    fn unknown_sink_type_is_rejected() {
        assert!(parse_config_str("[sinks.x]\ntype = \"carrier-pigeon\"\n").is_err());
    }

    #[test]
    fn debug_masks_urls() {
        let config = SinkConfig::Http {
            url: "https://example.com/exec?token=secret".into(),
            timeout_secs: 10,
            max_retries: 0,
            retry_delay_ms: 1000,
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn sink_url_override_creates_or_replaces_remote() {
        let mut config = ExamkitConfig::default();
        apply_sink_url_override(&mut config, "https://a.example/exec".into());
        assert!(matches!(
            config.sinks.get("remote"),
            Some(SinkConfig::Http { url, .. }) if url == "https://a.example/exec"
        ));

        apply_sink_url_override(&mut config, "https://b.example/exec".into());
        assert_eq!(config.sinks.len(), 1);
        assert!(matches!(
            config.sinks.get("remote"),
            Some(SinkConfig::Http { url, .. }) if url == "https://b.example/exec"
        ));
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let err = load_config_from(Some(Path::new("/nonexistent/examkit.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn builds_sinks_by_name() {
        let config = parse_config_str(
            r#"
[sinks.b]
type = "file"
dir = "out"

[sinks.a]
type = "http"
url = "http://localhost:1/exec"
"#,
        )
        .unwrap();
        let sinks = config.build_sinks().unwrap();
        let names: Vec<&str> = sinks.iter().map(|s| s.name()).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn empty_url_is_rejected() {
        let config = SinkConfig::Http {
            url: "  ".into(),
            timeout_secs: 10,
            max_retries: 0,
            retry_delay_ms: 1000,
        };
        assert!(create_sink("sheet", &config).is_err());
    }
}
