use std::fs;
use std::path::{Path, PathBuf};

use bq_core::chunking::ChunkingParams;
use bq_core::domain::Chunk;
use bq_core::error::AppError;
use serde::{Deserialize, Serialize};

use super::flat::FlatIpIndex;
use super::metadata::{decode_metadata_csv, encode_metadata_csv, MetadataRow};
use super::VectorIndex;
use crate::embeddings::{normalize_l2, Embedder};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexStatus {
    pub ready: bool,
    pub book: Option<String>,
    pub model: Option<String>,
    pub dims: Option<u32>,
    pub chunk_count: u32,
    #[serde(default)]
    pub target_size: Option<usize>,
    #[serde(default)]
    pub overlap: Option<usize>,
    pub updated_at: Option<String>,
}

impl IndexStatus {
    fn not_ready() -> Self {
        Self {
            ready: false,
            book: None,
            model: None,
            dims: None,
            chunk_count: 0,
            target_size: None,
            overlap: None,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexBuildInput {
    pub book: String,
    pub model: String,
    pub params: ChunkingParams,
    pub updated_at: String,
    /// Copy chunk text into the metadata table as a retrieval fallback.
    #[serde(default = "default_embed_text")]
    pub embed_text: bool,
}

fn default_embed_text() -> bool {
    true
}

/// Everything read back from disk, already checked for row-count agreement.
#[derive(Debug, Clone)]
pub struct LoadedIndex {
    pub status: IndexStatus,
    pub index: FlatIpIndex,
    pub metadata: Vec<MetadataRow>,
}

/// On-disk home of one book's vector index: `index.bqfi`, `metadata.csv` and
/// `index_status.json`, all written tmp → rename.
#[derive(Debug, Clone)]
pub struct IndexStore {
    root: PathBuf,
}

impl IndexStore {
    pub fn open(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    fn index_path(&self) -> PathBuf {
        self.root.join("index.bqfi")
    }

    fn metadata_path(&self) -> PathBuf {
        self.root.join("metadata.csv")
    }

    fn status_path(&self) -> PathBuf {
        self.root.join("index_status.json")
    }

    fn ensure_dirs(&self) -> Result<(), AppError> {
        fs::create_dir_all(&self.root).map_err(|e| {
            AppError::new("INDEX_BUILD_FAILED", "Failed to create index directory")
                .with_details(format!("path={}; err={}", self.root.display(), e))
        })
    }

    pub fn status(&self) -> Result<IndexStatus, AppError> {
        let path = self.status_path();
        if !path.exists() {
            return Ok(IndexStatus::not_ready());
        }
        let bytes = fs::read(&path).map_err(|e| {
            AppError::new("INDEX_STATUS_FAILED", "Failed to read index status")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        serde_json::from_slice(&bytes).map_err(|e| {
            AppError::new("INDEX_STATUS_FAILED", "Failed to decode index status")
                .with_details(format!("path={}; err={}", path.display(), e))
        })
    }

    pub fn build_with_embedder(
        &self,
        chunks: &[Chunk],
        embedder: &dyn Embedder,
        input: IndexBuildInput,
    ) -> Result<IndexStatus, AppError> {
        if chunks.is_empty() {
            return Err(AppError::new(
                "INDEX_EMPTY",
                "No chunks available; chunk the book before building the index",
            )
            .with_details(format!("book={}", input.book)));
        }
        self.ensure_dirs()?;

        let mut dims: Option<usize> = None;
        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let raw = embedder.embed(&input.model, &chunk.text).map_err(|e| {
                AppError::new("AI_EMBEDDINGS_FAILED", "Failed to compute embeddings")
                    .with_details(format!("chunk_id={}; err={}", chunk.id, e))
                    .with_retryable(e.retryable)
            })?;
            match dims {
                Some(d) if d != raw.len() => {
                    return Err(AppError::new(
                        "INDEX_BUILD_FAILED",
                        "Embedding dimension mismatch across chunks",
                    )
                    .with_details(format!(
                        "expected={}; got={}; chunk_id={}",
                        d,
                        raw.len(),
                        chunk.id
                    )));
                }
                Some(_) => {}
                None => dims = Some(raw.len()),
            }
            let unit = normalize_l2(&raw).map_err(|e| e.with_context(format!("chunk_id={}", chunk.id)))?;
            vectors.push(unit);
            log::debug!("embedded {} ({}/{})", chunk.id, vectors.len(), chunks.len());
        }

        let dims = dims.unwrap_or(0);
        let mut index = FlatIpIndex::new(dims);
        index.add(&vectors)?;
        let rows: Vec<MetadataRow> = chunks
            .iter()
            .map(|c| MetadataRow::from_chunk(c, input.embed_text))
            .collect();

        // Status goes last so a crash mid-build never advertises a ready index.
        write_atomic(&self.index_path(), &index.to_bytes())?;
        write_atomic(&self.metadata_path(), &encode_metadata_csv(&rows)?)?;

        let status = IndexStatus {
            ready: true,
            book: Some(input.book),
            model: Some(input.model),
            dims: Some(dims as u32),
            chunk_count: rows.len() as u32,
            target_size: Some(input.params.target_size),
            overlap: Some(input.params.overlap),
            updated_at: Some(input.updated_at),
        };
        let json = serde_json::to_string_pretty(&status).map_err(|e| {
            AppError::new("INDEX_BUILD_FAILED", "Failed to encode index status")
                .with_details(e.to_string())
        })?;
        write_atomic(&self.status_path(), json.as_bytes())?;

        log::info!(
            "index built: {} vectors, dims={}, path={}",
            status.chunk_count,
            dims,
            self.root.display()
        );
        Ok(status)
    }

    /// Read the index and metadata artifacts back and verify they describe the same rows.
    ///
    /// Missing artifacts and row-count disagreement are fatal.
    pub fn load(&self) -> Result<LoadedIndex, AppError> {
        let index_path = self.index_path();
        let metadata_path = self.metadata_path();

        let index_bytes = read_required(&index_path, "Index artifact not found")?;
        let metadata_bytes = read_required(&metadata_path, "Metadata artifact not found")?;

        let index = FlatIpIndex::from_bytes(&index_bytes)
            .map_err(|e| e.with_context(format!("path={}", index_path.display())))?;
        let metadata = decode_metadata_csv(&metadata_bytes)?;

        if index.len() != metadata.len() {
            return Err(AppError::new(
                "INDEX_INTEGRITY_MISMATCH",
                "Index row count does not match metadata row count",
            )
            .with_details(format!(
                "index_rows={}; metadata_rows={}; root={}",
                index.len(),
                metadata.len(),
                self.root.display()
            )));
        }

        let mut status = self.status()?;
        if let Some(d) = status.dims {
            if d as usize != index.dims() {
                return Err(AppError::new(
                    "INDEX_INTEGRITY_MISMATCH",
                    "Index dimension does not match recorded status",
                )
                .with_details(format!("status_dims={d}; index_dims={}", index.dims())));
            }
        }
        if !status.ready {
            // Artifacts exist without a status file (e.g. copied in by hand).
            status.dims = Some(index.dims() as u32);
            status.chunk_count = index.len() as u32;
        }

        log::info!(
            "loaded index: {} vectors, dims={}, metadata rows={}",
            index.len(),
            index.dims(),
            metadata.len()
        );
        Ok(LoadedIndex {
            status,
            index,
            metadata,
        })
    }
}

fn read_required(path: &Path, missing_message: &str) -> Result<Vec<u8>, AppError> {
    if !path.exists() {
        return Err(AppError::new("INDEX_MISSING", missing_message)
            .with_details(format!("path={}", path.display())));
    }
    fs::read(path).map_err(|e| {
        AppError::new("INDEX_MISSING", missing_message)
            .with_details(format!("path={}; err={}", path.display(), e))
    })
}

pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), AppError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).map_err(|e| {
        AppError::new("STORE_WRITE_FAILED", "Failed to write artifact")
            .with_details(format!("path={}; err={}", tmp.display(), e))
    })?;
    fs::rename(&tmp, path).map_err(|e| {
        AppError::new("STORE_WRITE_FAILED", "Failed to finalize artifact write")
            .with_details(format!("tmp={}; dest={}; err={}", tmp.display(), path.display(), e))
    })
}
