//! Configuration for vectorboard.
//!
//! Supports both environment variables and YAML config file.
//! Environment variables take precedence over config file values.

use crate::error::{Result, VectorboardError};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// LLM configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL for the LLM API (e.g., "https://api.openai.com")
    pub api_base: String,

    /// API key for authentication
    pub api_key: String,

    /// Model name (e.g., "gpt-4o-mini")
    pub model: String,

    /// Maximum tokens for response (optional)
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Temperature for generation (optional)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_api_base() -> String {
    "https://api.openai.com".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.0
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Credentials for OpenAI-compatible embedding endpoints.
///
/// Empty fields fall back to the LLM settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EmbeddingApiConfig {
    pub api_base: String,
    pub api_key: String,
}

/// Dashboard server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Port to listen on.
    pub port: u16,
    /// Expose the dashboard beyond localhost.
    #[serde(default)]
    pub share: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            port: 7860,
            share: false,
        }
    }
}

impl DashboardConfig {
    /// Address the server binds to.
    pub fn bind_host(&self) -> &'static str {
        if self.share { "0.0.0.0" } else { "127.0.0.1" }
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM settings
    pub llm: LlmConfig,
    /// Embedding API settings
    #[serde(default)]
    pub embeddings: EmbeddingApiConfig,
    /// Dashboard settings
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

/// Configuration file structure (YAML format).
#[derive(Debug, Deserialize)]
struct ConfigFile {
    llm: Option<LlmFileSection>,
    embeddings: Option<EmbeddingsFileSection>,
    dashboard: Option<DashboardFileSection>,
}

#[derive(Debug, Deserialize)]
struct LlmFileSection {
    api_base: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsFileSection {
    api_base: Option<String>,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DashboardFileSection {
    port: Option<u16>,
    share: Option<bool>,
}

impl Config {
    /// Load configuration from environment variables and optional config file.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (LLM_API_BASE, LLM_API_KEY, LLM_MODEL, ...)
    /// 2. Config file (~/.config/vectorboard/config.yaml)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                config = Self::load_from_file(&config_path)?;
            }
        }

        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(api_base) = env::var("LLM_API_BASE") {
            self.llm.api_base = api_base;
        }

        if let Ok(api_key) = env::var("LLM_API_KEY").or_else(|_| env::var("OPENAI_API_KEY")) {
            self.llm.api_key = api_key;
        }

        if let Ok(model) = env::var("LLM_MODEL") {
            self.llm.model = model;
        }

        if let Ok(max_tokens) = env::var("LLM_MAX_TOKENS") {
            if let Ok(tokens) = max_tokens.parse() {
                self.llm.max_tokens = tokens;
            }
        }

        if let Ok(temperature) = env::var("LLM_TEMPERATURE") {
            if let Ok(temp) = temperature.parse() {
                self.llm.temperature = temp;
            }
        }

        if let Ok(api_base) = env::var("EMBEDDINGS_API_BASE") {
            self.embeddings.api_base = api_base;
        }

        if let Ok(api_key) = env::var("EMBEDDINGS_API_KEY") {
            self.embeddings.api_key = api_key;
        }

        if let Ok(port) = env::var("VECTORBOARD_PORT") {
            if let Ok(port) = port.parse() {
                self.dashboard.port = port;
            }
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| VectorboardError::io(path, e))?;
        Self::from_yaml_str(&content)
    }

    /// Parse configuration from YAML text, filling gaps with defaults.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file_config: ConfigFile = serde_yaml::from_str(content)
            .map_err(|e| VectorboardError::Config(format!("Failed to parse config file: {}", e)))?;

        let mut config = Config::default();

        if let Some(llm) = file_config.llm {
            if let Some(api_base) = llm.api_base {
                config.llm.api_base = api_base;
            }
            if let Some(api_key) = llm.api_key {
                config.llm.api_key = api_key;
            }
            if let Some(model) = llm.model {
                config.llm.model = model;
            }
            if let Some(max_tokens) = llm.max_tokens {
                config.llm.max_tokens = max_tokens;
            }
            if let Some(temperature) = llm.temperature {
                config.llm.temperature = temperature;
            }
        }

        if let Some(embeddings) = file_config.embeddings {
            if let Some(api_base) = embeddings.api_base {
                config.embeddings.api_base = api_base;
            }
            if let Some(api_key) = embeddings.api_key {
                config.embeddings.api_key = api_key;
            }
        }

        if let Some(dashboard) = file_config.dashboard {
            if let Some(port) = dashboard.port {
                config.dashboard.port = port;
            }
            if let Some(share) = dashboard.share {
                config.dashboard.share = share;
            }
        }

        Ok(config)
    }

    /// Get the default config file path.
    pub fn config_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "vectorboard")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Validate that the LLM settings needed for answering queries are present.
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_base.is_empty() {
            return Err(VectorboardError::Config(
                "LLM API base URL is required. Set LLM_API_BASE environment variable or add to config file.".to_string()
            ));
        }

        if self.llm.api_key.is_empty() {
            return Err(VectorboardError::Config(
                "LLM API key is required. Set LLM_API_KEY (or OPENAI_API_KEY) environment variable or add to config file.".to_string()
            ));
        }

        if self.llm.model.is_empty() {
            return Err(VectorboardError::Config(
                "LLM model is required. Set LLM_MODEL environment variable or add to config file."
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Embedding endpoint base URL, falling back to the LLM endpoint.
    pub fn embeddings_api_base(&self) -> &str {
        if self.embeddings.api_base.is_empty() {
            &self.llm.api_base
        } else {
            &self.embeddings.api_base
        }
    }

    /// Embedding endpoint key, falling back to the LLM key.
    pub fn embeddings_api_key(&self) -> &str {
        if self.embeddings.api_key.is_empty() {
            &self.llm.api_key
        } else {
            &self.embeddings.api_key
        }
    }

    /// Create a config from explicit values (useful for testing).
    pub fn with_llm(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            llm: LlmConfig {
                api_base: api_base.into(),
                api_key: api_key.into(),
                model: model.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.llm.api_base, "https://api.openai.com");
        assert!(config.llm.api_key.is_empty());
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.max_tokens, 1024);
        assert_eq!(config.llm.temperature, 0.0);
        assert_eq!(config.dashboard.port, 7860);
        assert!(!config.dashboard.share);
    }

    #[test]
    fn test_validate_fails_without_key() {
        let config = Config::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_with_llm() {
        let config = Config::with_llm("https://api.example.com", "test-key", "gpt-4");
        assert_eq!(config.llm.api_base, "https://api.example.com");
        assert_eq!(config.llm.api_key, "test-key");
        assert_eq!(config.llm.model, "gpt-4");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_embeddings_fall_back_to_llm() {
        let mut config = Config::with_llm("https://llm.example.com", "llm-key", "m");
        assert_eq!(config.embeddings_api_base(), "https://llm.example.com");
        assert_eq!(config.embeddings_api_key(), "llm-key");

        config.embeddings.api_base = "https://emb.example.com".to_string();
        assert_eq!(config.embeddings_api_base(), "https://emb.example.com");
        assert_eq!(config.embeddings_api_key(), "llm-key");
    }

    #[test]
    fn test_from_yaml_partial_sections() {
        let yaml = r#"
llm:
  model: gpt-4o
dashboard:
  port: 9000
  share: true
"#;
        let config = Config::from_yaml_str(yaml).unwrap();
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.api_base, "https://api.openai.com");
        assert_eq!(config.dashboard.port, 9000);
        assert_eq!(config.dashboard.bind_host(), "0.0.0.0");
    }

    #[test]
    fn test_from_yaml_rejects_garbage() {
        let result = Config::from_yaml_str("llm: [unclosed");
        assert!(matches!(result, Err(VectorboardError::Config(_))));
    }
}
