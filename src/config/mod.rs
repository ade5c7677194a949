//! Configuration management for lectern
//!
//! Handles loading, saving, and validating configuration from TOML files.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Embedding model configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Chunking configuration
    #[serde(default)]
    pub chunk: ChunkConfig,

    /// Search configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Session history configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Chat generation configuration
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Backend to use: "local" (fastembed) or "http"
    #[serde(default = "default_embedding_backend")]
    pub backend: String,

    /// Model name/identifier
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension (must match model)
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Batch size for embedding
    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: usize,

    /// Base URL for the "http" backend (OpenAI-compatible /embeddings)
    #[serde(default)]
    pub http_url: Option<String>,
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Maximum characters per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap characters between consecutive chunks
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

/// Search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Default number of content results per search
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Optional maximum catalog distance for course-name resolution.
    /// Unset means the closest title always resolves, however distant.
    #[serde(default)]
    pub resolve_distance_cutoff: Option<f32>,
}

/// Session history configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Number of question/answer exchanges retained per session
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

/// Chat generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Base URL of an OpenAI-compatible chat completions API
    #[serde(default = "default_generation_base_url")]
    pub base_url: String,

    /// Model identifier
    #[serde(default = "default_generation_model")]
    pub model: String,

    /// Environment variable name holding the API key
    #[serde(default = "default_generation_api_key_env")]
    pub api_key_env: String,

    /// Sampling temperature
    #[serde(default = "default_generation_temperature")]
    pub temperature: f32,

    /// Maximum tokens in the generated answer
    #[serde(default = "default_generation_max_tokens")]
    pub max_tokens: u32,
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Base directory for lectern data
    pub base_dir: PathBuf,

    /// Path to config file
    pub config_file: PathBuf,

    /// Path to the SQLite index database
    pub db_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            embedding: EmbeddingConfig::default(),
            chunk: ChunkConfig::default(),
            search: SearchConfig::default(),
            session: SessionConfig::default(),
            generation: GenerationConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: default_embedding_backend(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            batch_size: default_embedding_batch_size(),
            http_url: None,
        }
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            resolve_distance_cutoff: None,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: default_generation_base_url(),
            model: default_generation_model(),
            api_key_env: default_generation_api_key_env(),
            temperature: default_generation_temperature(),
            max_tokens: default_generation_max_tokens(),
        }
    }
}

impl Config {
    /// Get the default base directory for lectern (~/.lectern)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".lectern")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Initialize paths configuration
    fn init_paths(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        self.paths = PathsConfig {
            config_file: base.join("config.toml"),
            db_file: base.join("index.db"),
            base_dir: base,
        };
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        let base = config_path
            .parent()
            .unwrap_or(Path::new("."))
            .to_path_buf();
        config.paths = PathsConfig {
            config_file: config_path.to_path_buf(),
            db_file: base.join("index.db"),
            base_dir: base,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific base directory, falling back to defaults
    pub fn load_from(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::default();
        config.init_paths(base_dir);

        if config.paths.config_file.exists() {
            debug!("Loading config from {:?}", config.paths.config_file);
            let content = std::fs::read_to_string(&config.paths.config_file)?;
            let mut loaded: Config = toml::from_str(&content)?;
            loaded.paths = config.paths;
            config = loaded;
        } else {
            debug!("No config file found, using defaults");
        }

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Get the chat API key from environment
    pub fn generation_api_key(&self) -> Option<String> {
        std::env::var(&self.generation.api_key_env).ok()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.chunk.chunk_size == 0 {
            return Err(Error::Config(
                "chunk.chunk_size must be positive".to_string(),
            ));
        }

        if self.chunk.chunk_overlap >= self.chunk.chunk_size {
            return Err(Error::Config(
                "chunk.chunk_overlap must be < chunk.chunk_size".to_string(),
            ));
        }

        if self.search.max_results == 0 {
            return Err(Error::Config(
                "search.max_results must be positive".to_string(),
            ));
        }

        if let Some(cutoff) = self.search.resolve_distance_cutoff {
            if !(0.0..=2.0).contains(&cutoff) {
                return Err(Error::Config(
                    "search.resolve_distance_cutoff must be between 0.0 and 2.0".to_string(),
                ));
            }
        }

        if self.embedding.backend != "local" && self.embedding.backend != "http" {
            return Err(Error::Config(format!(
                "embedding.backend must be 'local' or 'http', got '{}'",
                self.embedding.backend
            )));
        }

        if self.embedding.backend == "http" && self.embedding.http_url.is_none() {
            return Err(Error::Config(
                "embedding.http_url is required when embedding.backend = 'http'".to_string(),
            ));
        }

        Ok(())
    }
}
