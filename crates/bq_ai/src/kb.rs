use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use bq_core::domain::RetrievedItem;
use bq_core::error::AppError;

use crate::chunk_store::ChunkTextStore;
use crate::embeddings::Embedder;
use crate::index::metadata::sha256_hex;
use crate::index::{IndexStatus, IndexStore, MetadataRow, VectorIndex};
use crate::retrieve::retrieve;

/// Loaded index, metadata and chunk text for one book. Immutable after load.
pub struct KnowledgeBase {
    status: IndexStatus,
    index: Box<dyn VectorIndex>,
    metadata: Vec<MetadataRow>,
    texts: Option<HashMap<String, String>>,
}

impl std::fmt::Debug for KnowledgeBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeBase")
            .field("status", &self.status)
            .field("rows", &self.metadata.len())
            .field("texts", &self.texts.as_ref().map(|t| t.len()))
            .finish()
    }
}

impl KnowledgeBase {
    pub fn from_parts(
        status: IndexStatus,
        index: Box<dyn VectorIndex>,
        metadata: Vec<MetadataRow>,
        texts: Option<HashMap<String, String>>,
    ) -> Result<Self, AppError> {
        if index.len() != metadata.len() {
            return Err(AppError::new(
                "INDEX_INTEGRITY_MISMATCH",
                "Index row count does not match metadata row count",
            )
            .with_details(format!(
                "index_rows={}; metadata_rows={}",
                index.len(),
                metadata.len()
            )));
        }
        if let Some(texts) = texts.as_ref() {
            for row in &metadata {
                if let Some(text) = texts.get(&row.chunk_id) {
                    if sha256_hex(text.as_bytes()) != row.text_sha256 {
                        return Err(AppError::new(
                            "INDEX_TEXT_MISMATCH",
                            "Chunk text changed since the index was built; rebuild the index",
                        )
                        .with_details(format!("chunk_id={}", row.chunk_id)));
                    }
                }
            }
        }
        Ok(Self {
            status,
            index,
            metadata,
            texts,
        })
    }

    /// Load and cross-check everything needed to serve queries for one book.
    ///
    /// A missing chunk text store is tolerated (metadata text is the fallback); every
    /// other inconsistency refuses to load.
    pub fn load(index_store: &IndexStore, chunk_store: &ChunkTextStore) -> Result<Self, AppError> {
        let loaded = index_store.load()?;
        let texts = match chunk_store.load_text_lookup() {
            Ok(t) => Some(t),
            Err(e) if e.code == "CHUNK_STORE_MISSING" => {
                log::warn!("{e}; falling back to metadata text");
                None
            }
            Err(e) => return Err(e),
        };
        Self::from_parts(loaded.status, Box::new(loaded.index), loaded.metadata, texts)
    }

    pub fn status(&self) -> &IndexStatus {
        &self.status
    }

    pub fn model(&self) -> Option<&str> {
        self.status.model.as_deref()
    }

    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    pub fn retrieve(
        &self,
        query: &str,
        k: usize,
        embedder: &dyn Embedder,
        model: &str,
    ) -> Result<Vec<RetrievedItem>, AppError> {
        retrieve(
            query,
            k,
            self.index.as_ref(),
            embedder,
            model,
            &self.metadata,
            self.texts.as_ref(),
        )
    }
}

/// Process-wide handle. Queries take a snapshot; reloads swap the whole knowledge base
/// so an in-flight query keeps the version it started with.
#[derive(Debug)]
pub struct SharedKnowledgeBase {
    inner: RwLock<Arc<KnowledgeBase>>,
}

impl SharedKnowledgeBase {
    pub fn new(kb: KnowledgeBase) -> Self {
        Self {
            inner: RwLock::new(Arc::new(kb)),
        }
    }

    pub fn snapshot(&self) -> Result<Arc<KnowledgeBase>, AppError> {
        self.inner
            .read()
            .map(|guard| Arc::clone(&guard))
            .map_err(|e| AppError::new("KB_LOCK_POISONED", "Knowledge base lock poisoned").with_details(e.to_string()))
    }

    /// Install a freshly loaded knowledge base, returning the previous one.
    pub fn swap(&self, kb: KnowledgeBase) -> Result<Arc<KnowledgeBase>, AppError> {
        let mut guard = self
            .inner
            .write()
            .map_err(|e| AppError::new("KB_LOCK_POISONED", "Knowledge base lock poisoned").with_details(e.to_string()))?;
        Ok(std::mem::replace(&mut *guard, Arc::new(kb)))
    }
}
