use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use bq_core::chunking::ChunkingParams;
use bq_core::domain::Chunk;
use bq_core::error::AppError;
use serde::{Deserialize, Serialize};

use crate::index::store::write_atomic;

/// Contents of `chunks.json`: the chunks plus the parameters that produced them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredChunks {
    pub params: ChunkingParams,
    pub chunks: Vec<Chunk>,
}

/// Full chunk text for one book, persisted as `chunks.json`.
#[derive(Debug, Clone)]
pub struct ChunkTextStore {
    root: PathBuf,
}

impl ChunkTextStore {
    pub fn open(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    fn chunks_path(&self) -> PathBuf {
        self.root.join("chunks.json")
    }

    pub fn exists(&self) -> bool {
        self.chunks_path().exists()
    }

    /// Replace every stored chunk. Re-chunking is the only way chunks change.
    pub fn save(&self, chunks: &[Chunk], params: ChunkingParams) -> Result<(), AppError> {
        fs::create_dir_all(&self.root).map_err(|e| {
            AppError::new("CHUNK_STORE_FAILED", "Failed to create chunk store directory")
                .with_details(format!("path={}; err={}", self.root.display(), e))
        })?;
        let stored = StoredChunks {
            params,
            chunks: chunks.to_vec(),
        };
        let json = serde_json::to_string_pretty(&stored).map_err(|e| {
            AppError::new("CHUNK_STORE_FAILED", "Failed to encode chunks")
                .with_details(e.to_string())
        })?;
        write_atomic(&self.chunks_path(), json.as_bytes())
    }

    pub fn load(&self) -> Result<StoredChunks, AppError> {
        let path = self.chunks_path();
        if !path.exists() {
            return Err(AppError::new("CHUNK_STORE_MISSING", "Chunk store not found")
                .with_details(format!("path={}", path.display())));
        }
        let raw = fs::read_to_string(&path).map_err(|e| {
            AppError::new("CHUNK_STORE_FAILED", "Failed to read chunk store")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            AppError::new("CHUNK_STORE_FAILED", "Failed to decode chunk store")
                .with_details(format!("path={}; err={}", path.display(), e))
        })
    }

    pub fn load_chunks(&self) -> Result<Vec<Chunk>, AppError> {
        Ok(self.load()?.chunks)
    }

    /// `chunk_id → text`, read once per process.
    pub fn load_text_lookup(&self) -> Result<HashMap<String, String>, AppError> {
        Ok(self
            .load_chunks()?
            .into_iter()
            .map(|c| (c.id, c.text))
            .collect())
    }
}
