use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::models::QueryOptions;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub query: QueryOptions,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_health_timeout_secs")]
    pub health_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            health_timeout_secs: default_health_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}
fn default_health_timeout_secs() -> u64 {
    5
}
fn default_request_timeout_secs() -> u64 {
    120
}

impl ServerConfig {
    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Cosmetic upload progress: while a file is in flight its percentage is
/// bumped by `progress_step` every `progress_interval_ms`, never past
/// `progress_ceiling`.
#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,
    #[serde(default = "default_progress_step")]
    pub progress_step: u8,
    #[serde(default = "default_progress_ceiling")]
    pub progress_ceiling: u8,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            progress_interval_ms: default_progress_interval_ms(),
            progress_step: default_progress_step(),
            progress_ceiling: default_progress_ceiling(),
        }
    }
}

fn default_progress_interval_ms() -> u64 {
    200
}
fn default_progress_step() -> u8 {
    10
}
fn default_progress_ceiling() -> u8 {
    90
}

impl IngestConfig {
    /// Tick period for the progress ticker. Never zero, which tokio rejects.
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms.max(1))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// How long a success status stays on screen before switching to chat.
    #[serde(default = "default_delay_ms")]
    pub transition_delay_ms: u64,
    /// Artificial processing time for pasted content.
    #[serde(default = "default_delay_ms")]
    pub paste_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            transition_delay_ms: default_delay_ms(),
            paste_delay_ms: default_delay_ms(),
        }
    }
}

fn default_delay_ms() -> u64 {
    2000
}

impl SessionConfig {
    pub fn transition_delay(&self) -> Duration {
        Duration::from_millis(self.transition_delay_ms)
    }

    pub fn paste_delay(&self) -> Duration {
        Duration::from_millis(self.paste_delay_ms)
    }
}

impl Config {
    /// All-defaults configuration, used when no config file is present.
    pub fn minimal() -> Self {
        Self::default()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to [`Config::minimal`].
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::minimal())
    }
}

pub fn validate(config: &Config) -> Result<()> {
    let base = config.server.base_url.trim();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        anyhow::bail!(
            "server.base_url must start with http:// or https:// (got '{}')",
            config.server.base_url
        );
    }
    if config.server.health_timeout_secs == 0 {
        anyhow::bail!("server.health_timeout_secs must be > 0");
    }
    if config.server.request_timeout_secs == 0 {
        anyhow::bail!("server.request_timeout_secs must be > 0");
    }

    let query = &config.query;
    if query.retrieval_limit < 1 {
        anyhow::bail!("query.retrieval_limit must be >= 1");
    }
    if !(0.0..=1.0).contains(&query.score_threshold) {
        anyhow::bail!("query.score_threshold must be in [0.0, 1.0]");
    }
    if query.max_tokens < 1 {
        anyhow::bail!("query.max_tokens must be >= 1");
    }
    if !(0.0..=2.0).contains(&query.temperature) {
        anyhow::bail!("query.temperature must be in [0.0, 2.0]");
    }
    if query.model.trim().is_empty() {
        anyhow::bail!("query.model must not be empty");
    }

    if config.ingest.progress_interval_ms == 0 {
        anyhow::bail!("ingest.progress_interval_ms must be > 0");
    }
    if config.ingest.progress_step == 0 {
        anyhow::bail!("ingest.progress_step must be > 0");
    }
    if config.ingest.progress_ceiling >= 100 {
        anyhow::bail!("ingest.progress_ceiling must be < 100");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn empty_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("rag.toml");
        fs::write(&path, "").unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.server.base_url, "http://localhost:3000");
        assert_eq!(cfg.query.retrieval_limit, 5);
        assert_eq!(cfg.query.model, "gpt-4");
        assert_eq!(cfg.ingest.progress_step, 10);
        assert_eq!(cfg.ingest.progress_ceiling, 90);
        assert_eq!(cfg.session.transition_delay_ms, 2000);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("rag.toml");
        fs::write(
            &path,
            r#"
[server]
base_url = "https://rag.example.com"

[query]
model = "gpt-4o"
"#,
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.server.base_url, "https://rag.example.com");
        assert_eq!(cfg.server.health_timeout_secs, 5);
        assert_eq!(cfg.query.model, "gpt-4o");
        assert!((cfg.query.score_threshold - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("rag.toml");
        fs::write(&path, "[query]\nscore_threshold = 1.5\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("score_threshold"));
    }

    #[test]
    fn rejects_ceiling_of_one_hundred() {
        let mut cfg = Config::minimal();
        cfg.ingest.progress_ceiling = 100;
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn rejects_zero_progress_interval() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("rag.toml");
        fs::write(&path, "[ingest]\nprogress_interval_ms = 0\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("progress_interval_ms"));
    }

    #[test]
    fn rejects_zero_request_timeout() {
        let mut cfg = Config::minimal();
        cfg.server.request_timeout_secs = 0;
        let err = validate(&cfg).unwrap_err();
        assert!(err.to_string().contains("request_timeout_secs"));
    }

    #[test]
    fn progress_interval_is_never_zero() {
        let ingest = IngestConfig {
            progress_interval_ms: 0,
            ..IngestConfig::default()
        };
        assert_eq!(ingest.progress_interval(), Duration::from_millis(1));
    }

    #[test]
    fn missing_file_falls_back_to_minimal() {
        let tmp = TempDir::new().unwrap();
        let cfg = load_or_default(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.server.base_url, Config::minimal().server.base_url);
    }
}
