use bq_core::domain::{Chunk, ChunkMetadata};
use bq_core::error::AppError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One row of the tabular metadata artifact. Row `i` describes index vector `i`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetadataRow {
    pub chunk_id: String,
    pub book: String,
    pub paragraph_start: usize,
    pub paragraph_end: usize,
    pub char_count: usize,
    pub text_sha256: String,
    // Fallback text when the chunk text store has no entry for this chunk.
    pub text: Option<String>,
}

impl MetadataRow {
    pub fn from_chunk(chunk: &Chunk, embed_text: bool) -> Self {
        Self {
            chunk_id: chunk.id.clone(),
            book: chunk.book.clone(),
            paragraph_start: chunk.paragraph_start,
            paragraph_end: chunk.paragraph_end,
            char_count: chunk.char_count,
            text_sha256: sha256_hex(chunk.text.as_bytes()),
            text: embed_text.then(|| chunk.text.clone()),
        }
    }

    pub fn meta(&self) -> ChunkMetadata {
        ChunkMetadata {
            book: self.book.clone(),
            paragraph_start: self.paragraph_start,
            paragraph_end: self.paragraph_end,
            char_count: self.char_count,
        }
    }
}

pub fn encode_metadata_csv(rows: &[MetadataRow]) -> Result<Vec<u8>, AppError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(Vec::new());
    for row in rows {
        wtr.serialize(row).map_err(|e| {
            AppError::new("INDEX_BUILD_FAILED", "Failed to encode metadata row")
                .with_details(format!("chunk_id={}; err={}", row.chunk_id, e))
        })?;
    }
    wtr.into_inner().map_err(|e| {
        AppError::new("INDEX_BUILD_FAILED", "Failed to finalize metadata table")
            .with_details(e.to_string())
    })
}

pub fn decode_metadata_csv(bytes: &[u8]) -> Result<Vec<MetadataRow>, AppError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for (i, result) in rdr.deserialize::<MetadataRow>().enumerate() {
        let row = result.map_err(|e| {
            AppError::new("INDEX_CORRUPT", "Failed to decode metadata row")
                .with_details(format!("row={i}; err={e}"))
        })?;
        rows.push(row);
    }
    Ok(rows)
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
