use std::fs;
use std::path::{Path, PathBuf};

use bq_ai::ollama::DEFAULT_BASE_URL;
use bq_ai::quotes::QuoteScoringConfig;
use bq_core::chunking::ChunkingParams;
use bq_core::error::AppError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "bookqa.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub ollama: OllamaConfig,
    pub chunking: ChunkingParams,
    pub retrieval: RetrievalConfig,
    pub quotes: QuotesConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            ollama: OllamaConfig::default(),
            chunking: ChunkingParams::default(),
            retrieval: RetrievalConfig::default(),
            quotes: QuotesConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: "nomic-embed-text".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QuotesConfig {
    pub max_quotes: usize,
    pub scoring: QuoteScoringConfig,
}

impl Default for QuotesConfig {
    fn default() -> Self {
        Self {
            max_quotes: 3,
            scoring: QuoteScoringConfig::default(),
        }
    }
}

impl Config {
    /// Read `path`; a missing file means every default.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).map_err(|e| {
            AppError::new("CONFIG_INVALID", "Failed to read config file")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            AppError::new("CONFIG_INVALID", "Config file is not valid")
                .with_details(format!("path={}; err={}", path.display(), e))
        })
    }

    pub fn book_dir(&self, book: &str) -> PathBuf {
        self.data_dir.join(book)
    }

    pub fn index_dir(&self, book: &str) -> PathBuf {
        self.book_dir(book).join("index")
    }
}
