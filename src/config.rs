//! Provider and scraper configuration.
//!
//! Both files live in one config directory and are re-read on every request,
//! so edits take effect without a restart. A missing file is not an error:
//! the documented defaults are used instead.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{ConfigError, Result};

pub const TEXT_PROVIDERS_FILE: &str = "text_providers.yaml";
pub const FIRECRAWL_CONFIG_FILE: &str = "firecrawl_config.yaml";

pub const DEFAULT_PROVIDER: &str = "google_gemini";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";
pub const DEFAULT_TEMPERATURE: f32 = 1.0;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 8000;

/// One configured LLM backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Transport kind, e.g. `google_gemini` or `openai_compatible`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Overrides the transport's default endpoint.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Per-call timeout for LLM requests, in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ProviderConfig {
    /// A provider is usable only when it carries a non-empty API key.
    pub fn is_usable(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn temperature(&self) -> f32 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    pub fn max_output_tokens(&self) -> u32 {
        self.max_output_tokens.unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS)
    }
}

/// Text-generation settings: which provider is active and the known providers,
/// kept in file order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextConfig {
    #[serde(default = "default_active_provider")]
    pub active_provider: String,
    #[serde(default)]
    pub providers: IndexMap<String, ProviderConfig>,
}

fn default_active_provider() -> String {
    DEFAULT_PROVIDER.to_string()
}

impl Default for TextConfig {
    fn default() -> Self {
        let mut providers = IndexMap::new();
        providers.insert(
            DEFAULT_PROVIDER.to_string(),
            ProviderConfig {
                kind: Some(DEFAULT_PROVIDER.to_string()),
                model: Some(DEFAULT_MODEL.to_string()),
                temperature: Some(DEFAULT_TEMPERATURE),
                max_output_tokens: Some(DEFAULT_MAX_OUTPUT_TOKENS),
                ..ProviderConfig::default()
            },
        );
        Self { active_provider: default_active_provider(), providers }
    }
}

impl TextConfig {
    /// The active provider's entry, if the name resolves.
    pub fn active(&self) -> Option<&ProviderConfig> {
        self.providers.get(&self.active_provider)
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(TEXT_PROVIDERS_FILE);
        match read_yaml::<TextConfig>(&path)? {
            Some(config) => {
                debug!("文本配置加载成功: active={}", config.active_provider);
                Ok(config)
            }
            None => {
                warn!("{} 不存在，使用默认配置", TEXT_PROVIDERS_FILE);
                Ok(Self::default())
            }
        }
    }
}

/// Settings for the Firecrawl-style scrape service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FirecrawlConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: String,
}

impl FirecrawlConfig {
    /// Configured means there is somewhere to send requests: a self-hosted
    /// base URL or a key for the hosted service.
    pub fn configured(&self) -> bool {
        !self.base_url.is_empty() || !self.api_key.is_empty()
    }

    pub fn load(dir: &Path) -> Result<Self> {
        Ok(read_yaml::<FirecrawlConfig>(&dir.join(FIRECRAWL_CONFIG_FILE))?.unwrap_or_default())
    }
}

/// Process-level settings read from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub config_dir: PathBuf,
    pub addr: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            config_dir: std::env::var("OUTLINE_CONFIG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            addr: std::env::var("OUTLINE_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
        }
    }
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    // An empty file deserializes to `null`; treat it like an empty mapping.
    let raw = if raw.trim().is_empty() { "{}" } else { raw.as_str() };
    let file = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    serde_yaml::from_str(raw)
        .map(Some)
        .map_err(|source| ConfigError::InvalidYaml { file, source })
}
