use anyhow::{bail, Context, Result};
use globset::Glob;
use serde::Deserialize;
use std::path::Path;

/// Environment variable overriding `backend.base_url`.
pub const API_BASE_ENV: &str = "DQA_API_BASE";

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub ask: AskConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// No timeout unless set; requests otherwise wait on the transport.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: None,
            user_agent: None,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.json".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct AskConfig {
    #[serde(default = "default_question")]
    pub default_question: String,
}

impl Default for AskConfig {
    fn default() -> Self {
        Self {
            default_question: default_question(),
        }
    }
}

fn default_question() -> String {
    "How do I create an invoice?".to_string()
}

impl Config {
    /// Built-in defaults, used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }
}

/// Load configuration from `path`, falling back to [`Config::minimal`] when
/// the file does not exist, then apply the `DQA_API_BASE` override.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        parse_config(&content)?
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Config::minimal()
    };

    apply_env_override(&mut config, std::env::var(API_BASE_ENV).ok());
    validate(&config)?;
    Ok(config)
}

pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).with_context(|| "Failed to parse config file")
}

/// Empty values are ignored so `DQA_API_BASE=` does not blank the URL.
pub fn apply_env_override(config: &mut Config, api_base: Option<String>) {
    if let Some(base) = api_base.filter(|b| !b.trim().is_empty()) {
        config.backend.base_url = base.trim().to_string();
    }
}

pub fn validate(config: &Config) -> Result<()> {
    let url = reqwest::Url::parse(&config.backend.base_url)
        .with_context(|| format!("backend.base_url is not a URL: {}", config.backend.base_url))?;
    match url.scheme() {
        "http" | "https" => {}
        other => bail!("backend.base_url must use http or https, got '{}'", other),
    }

    if config.backend.timeout_secs == Some(0) {
        bail!("backend.timeout_secs must be > 0 when set");
    }

    if config.ingest.include_globs.is_empty() {
        bail!("ingest.include_globs must not be empty");
    }
    for pattern in config
        .ingest
        .include_globs
        .iter()
        .chain(config.ingest.exclude_globs.iter())
    {
        Glob::new(pattern).with_context(|| format!("Invalid ingest glob: {}", pattern))?;
    }

    if config.ask.default_question.trim().is_empty() {
        bail!("ask.default_question must not be empty");
    }

    Ok(())
}
