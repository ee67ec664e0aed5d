//! Configuration loading and management for paper-summa.
//!
//! Loads settings from `zotero_config_dev.toml` or `zotero_config.toml` with
//! environment variable overrides for the API keys.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Candidate settings files, in preference order.
pub const CANDIDATE_FILES: [&str; 2] = ["zotero_config_dev.toml", "zotero_config.toml"];

/// System prompt used when `[openai].prompt` is not set.
pub const DEFAULT_PROMPT: &str = "You are a senior academic who summarises research papers \
in precise, professional and concise language.";

const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_DELAY_SECS: u64 = 1;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no config file found (tried: {})", display_paths(.0))]
    NotFound(Vec<PathBuf>),
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("home directory could not be determined")]
    NoHomeDir,
}

/// Whether the Zotero library belongs to a user or a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LibraryType {
    #[default]
    User,
    Group,
}

/// Zotero Web API connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoteroConfig {
    /// Numeric user (or group) id; accepted as a number or a string
    #[serde(deserialize_with = "id_from_number_or_string")]
    pub user_id: String,
    pub api_key: String,
    /// Tag marking a note as an AI summary
    pub summary_tag: String,
    #[serde(default)]
    pub library_type: LibraryType,
    /// Overrides `~/Zotero/storage`
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,
}

/// Chat-completion model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: String,
    /// Alternate OpenAI-compatible endpoint, e.g. a local proxy
    #[serde(default)]
    pub base_url: Option<String>,
    pub model: String,
    /// Custom system prompt
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Pause after each written note
    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,
}

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub zotero: ZoteroConfig,
    pub openai: OpenAiConfig,
}

impl Config {
    /// Load configuration from the first existing candidate in the working directory
    pub fn load() -> Result<Self, ConfigError> {
        let candidates: Vec<PathBuf> = CANDIDATE_FILES.iter().map(PathBuf::from).collect();
        Self::load_first(&candidates)
    }

    /// Load the first path in `candidates` that exists on disk
    pub fn load_first(candidates: &[PathBuf]) -> Result<Self, ConfigError> {
        let path = candidates
            .iter()
            .find(|p| p.exists())
            .ok_or_else(|| ConfigError::NotFound(candidates.to_vec()))?;
        tracing::debug!(path = %path.display(), "loading config");
        Self::load_from(path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;

        // Override API keys from environment variables
        if let Ok(key) = std::env::var("ZOTERO_API_KEY") {
            config.zotero.api_key = key;
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.openai.api_key = key;
        }

        Ok(config)
    }

    /// Directory holding synced attachments, `<home>/Zotero/storage` unless overridden
    pub fn storage_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = &self.zotero.storage_dir {
            return Ok(dir.clone());
        }
        dirs::home_dir()
            .map(|home| home.join("Zotero").join("storage"))
            .ok_or(ConfigError::NoHomeDir)
    }

    /// The system prompt sent with every summarisation request
    pub fn system_prompt(&self) -> &str {
        self.openai.prompt.as_deref().unwrap_or(DEFAULT_PROMPT)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.openai.delay_secs)
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_delay_secs() -> u64 {
    DEFAULT_DELAY_SECS
}

fn id_from_number_or_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Number(u64),
        Text(String),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Number(n) => n.to_string(),
        Id::Text(s) => s,
    })
}
