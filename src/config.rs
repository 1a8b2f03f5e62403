use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub polling: PollingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bounded per-request timeout. A slow backend surfaces as a network
    /// error instead of hanging a poll tick forever.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Where the bearer token persists between invocations.
    pub token_path: PathBuf,
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollingConfig {
    #[serde(default = "default_task_interval_ms")]
    pub task_interval_ms: u64,
    #[serde(default = "default_project_interval_ms")]
    pub project_interval_ms: u64,
    #[serde(default = "default_health_interval_ms")]
    pub health_interval_ms: u64,
    /// When true, health polling never stops on "healthy" so a later
    /// degradation is observed. When false, polling stops the first time
    /// the backend reports healthy.
    #[serde(default)]
    pub health_resume_on_degraded: bool,
}

fn default_task_interval_ms() -> u64 {
    2000
}
fn default_project_interval_ms() -> u64 {
    3000
}
fn default_health_interval_ms() -> u64 {
    2000
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            task_interval_ms: default_task_interval_ms(),
            project_interval_ms: default_project_interval_ms(),
            health_interval_ms: default_health_interval_ms(),
            health_resume_on_degraded: false,
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate api
    if config.api.base_url.is_empty() {
        anyhow::bail!("api.base_url must not be empty");
    }
    if config.api.base_url.ends_with('/') {
        anyhow::bail!("api.base_url must not end with '/'");
    }
    if config.api.timeout_secs == 0 {
        anyhow::bail!("api.timeout_secs must be > 0");
    }

    // Validate polling
    if config.polling.task_interval_ms == 0
        || config.polling.project_interval_ms == 0
        || config.polling.health_interval_ms == 0
    {
        anyhow::bail!("polling intervals must be > 0");
    }

    Ok(config)
}
