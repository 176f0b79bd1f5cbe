//! Application configuration.
//!
//! Loaded from `~/.careline/config.toml`, created with defaults on first
//! run. The LLM API key is never stored in the file; it is read from the
//! environment variable named by `llm.api_key_env`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub data: DataConfig,
}

/// Hosted LLM completion service settings (OpenAI-compatible API)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_base: String,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.groq.com/openai/v1".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
        }
    }
}

/// Local embedding model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimension: usize,
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "Alibaba-NLP/gte-multilingual-base".to_string(),
            dimension: 768,
            batch_size: 32,
        }
    }
}

/// Vector search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub qdrant_url: String,
    pub collection: String,
    pub top_k: usize,
    /// Minimum similarity score; 0.0 disables the cutoff
    pub threshold: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            qdrant_url: "http://localhost:6334".to_string(),
            collection: "reference".to_string(),
            top_k: 3,
            threshold: 0.0,
        }
    }
}

/// Transcript log settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    pub dir: PathBuf,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        let dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".careline")
            .join("history");
        Self { dir }
    }
}

/// Reference dataset settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub file: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("data/military_psychology.csv"),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path()?)
    }

    /// Load configuration from an explicit path
    pub fn load_from(config_path: PathBuf) -> Result<Self> {
        if !config_path.exists() {
            let config = Config::default();
            config.save_to(&config_path)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(&config_path)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    fn save_to(&self, config_path: &PathBuf) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        fs::write(config_path, toml_string)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .context("Could not determine home directory")?;

        Ok(home.join(".careline").join("config.toml"))
    }

    /// Read the LLM API key from the configured environment variable
    pub fn api_key(&self) -> Result<String> {
        std::env::var(&self.llm.api_key_env).with_context(|| {
            format!(
                "LLM API key not found; set the {} environment variable",
                self.llm.api_key_env
            )
        })
    }
}
