use std::collections::HashMap;

use bq_core::domain::RetrievedItem;
use bq_core::error::AppError;

use crate::embeddings::{normalize_l2, Embedder};
use crate::index::{MetadataRow, VectorIndex};

pub mod similarity;

/// Text shown for a hit whose chunk text cannot be found anywhere.
pub fn placeholder_text(chunk_id: &str) -> String {
    format!("[text unavailable for {chunk_id}]")
}

/// Top-`k` chunks for a query, best first.
///
/// Hits the index cannot map to a metadata row are skipped, so fewer than `k` items may
/// come back. Text comes from `text_lookup` first, then the metadata table, then a
/// placeholder.
pub fn retrieve(
    query: &str,
    k: usize,
    index: &dyn VectorIndex,
    embedder: &dyn Embedder,
    model: &str,
    metadata: &[MetadataRow],
    text_lookup: Option<&HashMap<String, String>>,
) -> Result<Vec<RetrievedItem>, AppError> {
    let q = query.trim();
    if q.is_empty() {
        return Err(AppError::new(
            "AI_RETRIEVAL_FAILED",
            "Query must not be empty",
        ));
    }
    if k == 0 {
        return Err(AppError::new(
            "AI_RETRIEVAL_FAILED",
            "k must be greater than zero",
        ));
    }

    let qv = normalize_l2(&embedder.embed(model, q)?)?;
    if qv.len() != index.dims() {
        return Err(AppError::new(
            "AI_RETRIEVAL_FAILED",
            "Query embedding dims do not match index dims",
        )
        .with_details(format!("index_dims={}; query_dims={}", index.dims(), qv.len())));
    }

    // Ranks past the stored rows can only be padding.
    let hits = index.search(&qv, k.min(index.len()))?;
    let mut out: Vec<RetrievedItem> = Vec::with_capacity(hits.len());
    for hit in hits {
        let row = match hit.row_index().and_then(|i| metadata.get(i)) {
            Some(r) => r,
            None => {
                log::debug!("skipping neighbour without metadata: row={}", hit.row);
                continue;
            }
        };

        let text = text_lookup
            .and_then(|m| m.get(&row.chunk_id))
            .cloned()
            .or_else(|| row.text.clone())
            .unwrap_or_else(|| placeholder_text(&row.chunk_id));

        out.push(RetrievedItem {
            chunk_id: row.chunk_id.clone(),
            score: hit.score,
            text,
            meta: row.meta(),
        });
    }

    log::debug!("retrieved {} of k={} for query {:?}", out.len(), k, q);
    Ok(out)
}
