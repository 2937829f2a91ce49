//! HelpClaw configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HelpClawConfig {
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
}

impl HelpClawConfig {
    /// Load config from the default path (~/.helpclaw/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            tracing::info!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            tracing::warn!("⚠️ Failed to read config {}: {e}", path.display());
            crate::error::HelpClawError::Config(format!("Failed to read config: {e}"))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            tracing::warn!("⚠️ Failed to parse config {}: {e}", path.display());
            crate::error::HelpClawError::Config(format!("Failed to parse config: {e}"))
        })?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::HelpClawError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the HelpClaw home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".helpclaw")
    }
}

/// Curated knowledge base configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Directory containing the curated JSON dataset files.
    #[serde(default = "default_kb_dir")]
    pub data_dir: String,
    /// Dataset file names to load, in order. Missing files are skipped.
    #[serde(default = "default_kb_files")]
    pub files: Vec<String>,
}

fn default_kb_dir() -> String { "kb/data".into() }
fn default_kb_files() -> Vec<String> {
    vec!["faqs.json", "products.json", "policies.json"]
        .into_iter().map(String::from).collect()
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_kb_dir(),
            files: default_kb_files(),
        }
    }
}

/// One externally sourced content category and where to fetch it from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySource {
    pub name: String,
    pub url: String,
}

/// Content cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory for the durable snapshot file. Empty = ~/.helpclaw/cache.
    #[serde(default)]
    pub dir: String,
    /// Hours before a cached category is considered stale.
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u64,
    /// Categories to fetch on each refresh cycle.
    #[serde(default)]
    pub categories: Vec<CategorySource>,
}

fn default_ttl_hours() -> u64 { 24 }

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: String::new(),
            ttl_hours: default_ttl_hours(),
            categories: vec![],
        }
    }
}

impl CacheConfig {
    /// Resolved snapshot directory.
    pub fn resolved_dir(&self) -> PathBuf {
        if self.dir.is_empty() {
            HelpClawConfig::home_dir().join("cache")
        } else {
            PathBuf::from(&self.dir)
        }
    }
}

/// Background refresh scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// How often to refresh externally sourced content.
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u64,
    /// Pause after a failed refresh before the loop re-checks.
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
}

fn default_interval_hours() -> u64 { 6 }
fn default_backoff_secs() -> u64 { 5 }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_hours: default_interval_hours(),
            backoff_secs: default_backoff_secs(),
        }
    }
}

/// Per-query retrieval configuration. Confidence thresholds are named
/// constants in the cascade, not config knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// How many candidates each tier considers per query.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Hard timeout on the generative fallback call.
    #[serde(default = "default_fallback_timeout")]
    pub fallback_timeout_secs: u64,
}

fn default_top_k() -> usize { 3 }
fn default_fallback_timeout() -> u64 { 30 }

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            fallback_timeout_secs: default_fallback_timeout(),
        }
    }
}

/// Embedding / generative provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key. Empty = read from OPENAI_API_KEY.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Per-call HTTP timeout, seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// System prompt for the generative fallback tier. Empty = built-in
    /// support-assistant prompt.
    #[serde(default)]
    pub system_prompt: String,
}

fn default_base_url() -> String { "https://api.openai.com/v1".into() }
fn default_embedding_model() -> String { "text-embedding-3-small".into() }
fn default_chat_model() -> String { "gpt-4o-mini".into() }
fn default_temperature() -> f32 { 0.4 }
fn default_max_tokens() -> u32 { 600 }
fn default_timeout_secs() -> u64 { 10 }

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            embedding_model: default_embedding_model(),
            chat_model: default_chat_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            system_prompt: String::new(),
        }
    }
}
