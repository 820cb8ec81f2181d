//! Configuration for the clinical RAG pipeline.
//!
//! Supports both environment variables and YAML config file.
//! Environment variables take precedence over config file values.

use crate::error::{RagError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// LLM configuration for the generation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL for the LLM API (e.g., "https://api.openai.com")
    pub api_base: String,

    /// API key for authentication
    pub api_key: String,

    /// Model name (e.g., "biomistral-7b", "gpt-4")
    pub model: String,

    /// Maximum new tokens for a normal answer
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Temperature for generation
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_max_tokens() -> u32 {
    250
}

fn default_temperature() -> f32 {
    0.01
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            api_key: String::new(),
            model: "biomistral-7b".to_string(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Retrieval and indexing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Maximum characters per passage.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive passages from the same page.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Top matches requested from the lexical index.
    #[serde(default = "default_source_k")]
    pub k_lexical: usize,

    /// Top matches requested from the dense index.
    #[serde(default = "default_source_k")]
    pub k_dense: usize,

    /// Fusion weight for lexical matches.
    #[serde(default = "default_lexical_weight")]
    pub lexical_weight: f64,

    /// Fusion weight for dense matches.
    #[serde(default = "default_dense_weight")]
    pub dense_weight: f64,

    /// Pages are labelled `physical_index + 1 - page_offset`, so the default
    /// offset of 1 makes page labels equal the 0-based physical index,
    /// absorbing one page of front matter.
    #[serde(default = "default_page_offset")]
    pub page_offset: i64,

    /// Embedding model id on the Hugging Face Hub.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

fn default_chunk_size() -> usize {
    512
}

fn default_chunk_overlap() -> usize {
    100
}

fn default_source_k() -> usize {
    3
}

fn default_lexical_weight() -> f64 {
    0.4
}

fn default_dense_weight() -> f64 {
    0.6
}

fn default_page_offset() -> i64 {
    1
}

fn default_embedding_model() -> String {
    "NeuML/pubmedbert-base-embeddings".to_string()
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            k_lexical: default_source_k(),
            k_dense: default_source_k(),
            lexical_weight: default_lexical_weight(),
            dense_weight: default_dense_weight(),
            page_offset: default_page_offset(),
            embedding_model: default_embedding_model(),
        }
    }
}

impl RetrievalConfig {
    /// Combined fusion budget: the most passages a single query can return.
    pub fn fusion_k(&self) -> usize {
        self.k_lexical + self.k_dense
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Generation service settings.
    pub llm: LlmConfig,

    /// Judge service settings. Falls back to `llm` when absent, matching the
    /// single shared model the system was tuned with.
    #[serde(default)]
    pub judge: Option<LlmConfig>,

    /// Retrieval settings.
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

/// Configuration file structure (YAML format).
#[derive(Debug, Deserialize)]
struct ConfigFile {
    llm: Option<LlmFileSection>,
    judge: Option<LlmFileSection>,
    retrieval: Option<RetrievalConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmFileSection {
    api_base: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl LlmFileSection {
    fn apply(self, config: &mut LlmConfig) {
        if let Some(api_base) = self.api_base {
            config.api_base = api_base;
        }
        if let Some(api_key) = self.api_key {
            config.api_key = api_key;
        }
        if let Some(model) = self.model {
            config.model = model;
        }
        if let Some(max_tokens) = self.max_tokens {
            config.max_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature {
            config.temperature = temperature;
        }
    }
}

impl Config {
    /// Load configuration from environment variables and optional config file.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (LLM_API_BASE, LLM_API_KEY, LLM_MODEL, ...)
    /// 2. Config file (~/.config/clinical-rag/config.yaml)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        // Try to load from config file first
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                config = Self::load_from_file(&config_path)?;
            }
        }

        // Override with environment variables
        if let Ok(api_base) = env::var("LLM_API_BASE") {
            config.llm.api_base = api_base;
        }

        if let Ok(api_key) = env::var("LLM_API_KEY") {
            config.llm.api_key = api_key;
        }

        if let Ok(model) = env::var("LLM_MODEL") {
            config.llm.model = model;
        }

        if let Ok(max_tokens) = env::var("LLM_MAX_TOKENS") {
            if let Ok(tokens) = max_tokens.parse() {
                config.llm.max_tokens = tokens;
            }
        }

        if let Ok(temperature) = env::var("LLM_TEMPERATURE") {
            if let Ok(temp) = temperature.parse() {
                config.llm.temperature = temp;
            }
        }

        if let Ok(model) = env::var("EMBEDDING_MODEL") {
            config.retrieval.embedding_model = model;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RagError::io(path, e))?;

        let file_config: ConfigFile = serde_yaml::from_str(&content)
            .map_err(|e| RagError::Config(format!("Failed to parse config file: {}", e)))?;

        let mut config = Config::default();

        if let Some(llm) = file_config.llm {
            llm.apply(&mut config.llm);
        }

        if let Some(judge) = file_config.judge {
            let mut judge_config = config.llm.clone();
            judge.apply(&mut judge_config);
            config.judge = Some(judge_config);
        }

        if let Some(retrieval) = file_config.retrieval {
            config.retrieval = retrieval;
        }

        Ok(config)
    }

    /// Get the default config file path.
    pub fn config_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "clinical-rag")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// The judge configuration, defaulting to the generation service.
    pub fn judge_config(&self) -> &LlmConfig {
        self.judge.as_ref().unwrap_or(&self.llm)
    }

    /// Validate that required configuration is present.
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_base.is_empty() {
            return Err(RagError::Config(
                "LLM API base URL is required. Set LLM_API_BASE environment variable or add to config file.".to_string()
            ));
        }

        if self.llm.api_key.is_empty() {
            return Err(RagError::Config(
                "LLM API key is required. Set LLM_API_KEY environment variable or add to config file.".to_string()
            ));
        }

        if self.llm.model.is_empty() {
            return Err(RagError::Config(
                "LLM model is required. Set LLM_MODEL environment variable or add to config file."
                    .to_string(),
            ));
        }

        if self.retrieval.chunk_overlap >= self.retrieval.chunk_size {
            return Err(RagError::Config(
                "chunk_overlap must be smaller than chunk_size".to_string(),
            ));
        }

        Ok(())
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
            judge: None,
            retrieval: RetrievalConfig::default(),
        }
    }
}
