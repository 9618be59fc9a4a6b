use std::fs;
use std::path::Path;

use bq_ai::chunk_store::ChunkTextStore;
use bq_ai::embeddings::Embedder;
use bq_ai::index::{IndexBuildInput, IndexStatus, IndexStore};
use bq_ai::kb::KnowledgeBase;
use bq_ai::ollama::OllamaClient;
use bq_ai::pipeline::{answer_question, AskOptions, QueryOutcome};
use bq_core::books::BookId;
use bq_core::chunking::{chunk_paragraphs, ChunkingParams, LogObserver};
use bq_core::error::AppError;
use bq_core::paragraphs::split_into_paragraphs;
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::config::Config;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ChunkSummary {
    pub book: String,
    pub paragraphs: usize,
    pub chunks: usize,
    pub path: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct BookStatus {
    pub book: String,
    pub title: String,
    pub chunks_stored: Option<usize>,
    pub index: IndexStatus,
}

#[derive(Debug, Serialize)]
pub struct AiHealthStatus {
    pub ok: bool,
    pub message: String,
}

pub fn now_rfc3339_utc() -> Result<String, AppError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|e| AppError::new("TIME_FORMAT_FAILED", "Failed to format time").with_details(e.to_string()))
}

fn chunk_store(cfg: &Config, book: BookId) -> ChunkTextStore {
    ChunkTextStore::open(cfg.book_dir(book.slug()))
}

fn index_store(cfg: &Config, book: BookId) -> IndexStore {
    IndexStore::open(cfg.index_dir(book.slug()))
}

/// Split a cleaned book text into paragraphs, chunk it and replace the stored chunks.
pub fn chunk_book(
    cfg: &Config,
    book: BookId,
    input: &Path,
    params: ChunkingParams,
) -> Result<ChunkSummary, AppError> {
    params.validate()?;
    let text = fs::read_to_string(input).map_err(|e| {
        AppError::new("CHUNK_INPUT_FAILED", "Failed to read book text")
            .with_details(format!("path={}; err={}", input.display(), e))
    })?;
    let paragraphs = split_into_paragraphs(&text);
    let chunks = chunk_paragraphs(&paragraphs, params, book.slug(), &LogObserver)?;

    let store = chunk_store(cfg, book);
    store.save(&chunks, params)?;
    if index_store(cfg, book).status()?.ready {
        log::warn!("{book} was re-chunked; rebuild its index before asking questions");
    }

    Ok(ChunkSummary {
        book: book.slug().to_string(),
        paragraphs: paragraphs.len(),
        chunks: chunks.len(),
        path: store.root().join("chunks.json").display().to_string(),
    })
}

pub fn build_index(
    cfg: &Config,
    book: BookId,
    embedder: &dyn Embedder,
    model: &str,
    embed_text: bool,
) -> Result<IndexStatus, AppError> {
    let stored = chunk_store(cfg, book).load()?;
    index_store(cfg, book).build_with_embedder(
        &stored.chunks,
        embedder,
        IndexBuildInput {
            book: book.slug().to_string(),
            model: model.to_string(),
            params: stored.params,
            updated_at: now_rfc3339_utc()?,
            embed_text,
        },
    )
}

pub fn load_knowledge_base(cfg: &Config, book: BookId) -> Result<KnowledgeBase, AppError> {
    KnowledgeBase::load(&index_store(cfg, book), &chunk_store(cfg, book))
}

/// Query embeddings must come from the model the index was built with. An explicit
/// `requested` model that disagrees is refused.
pub fn resolve_query_model(
    kb: &KnowledgeBase,
    requested: Option<&str>,
    fallback: &str,
) -> Result<String, AppError> {
    match (requested, kb.model()) {
        (Some(r), Some(built)) if r != built => Err(AppError::new(
            "INDEX_MODEL_MISMATCH",
            "Query model differs from the model the index was built with",
        )
        .with_details(format!("requested={r}; index_model={built}"))),
        (Some(r), _) => Ok(r.to_string()),
        (None, Some(built)) => Ok(built.to_string()),
        (None, None) => Ok(fallback.to_string()),
    }
}

pub fn ask(
    kb: &KnowledgeBase,
    embedder: &dyn Embedder,
    question: &str,
    opts: &AskOptions,
) -> Result<QueryOutcome, AppError> {
    answer_question(kb, embedder, question, opts)
}

pub fn book_status(cfg: &Config, book: BookId) -> Result<BookStatus, AppError> {
    let store = chunk_store(cfg, book);
    let chunks_stored = if store.exists() {
        Some(store.load_chunks()?.len())
    } else {
        None
    };
    Ok(BookStatus {
        book: book.slug().to_string(),
        title: book.title().to_string(),
        chunks_stored,
        index: index_store(cfg, book).status()?,
    })
}

pub fn ai_health_check(base_url: &str) -> Result<AiHealthStatus, AppError> {
    let client = OllamaClient::new(base_url)?;
    client.health_check()?;
    Ok(AiHealthStatus {
        ok: true,
        message: format!("Ollama reachable at {}", client.base_url()),
    })
}

/// Plain-text rendering of one outcome for the terminal.
pub fn render_outcome(outcome: &QueryOutcome) -> String {
    match outcome {
        QueryOutcome::Answered(answer) => {
            let mut out = answer.answer.clone();
            if !answer.references.is_empty() {
                out.push_str("\n\nReferences:\n");
                out.push_str(&answer.references.join("\n"));
            }
            out
        }
        QueryOutcome::NoResults { message } => message.clone(),
        QueryOutcome::Degraded {
            retrieved_count,
            retrieved,
            error,
        } => {
            let mut out = format!(
                "Could not compose an answer ({error}). Showing {retrieved_count} retrieved passages:"
            );
            for (i, item) in retrieved.iter().enumerate() {
                out.push_str(&format!(
                    "\n\n[{}] {} (score {:.3}, paragraphs {}-{})\n{}",
                    i + 1,
                    item.chunk_id,
                    item.score,
                    item.meta.paragraph_start,
                    item.meta.paragraph_end,
                    item.text
                ));
            }
            out
        }
    }
}
