use bq_core::domain::{ComposedAnswer, RetrievedItem};
use bq_core::error::AppError;
use serde::{Deserialize, Serialize};

use crate::compose::compose_answer;
use crate::embeddings::Embedder;
use crate::kb::KnowledgeBase;
use crate::quotes::QuoteScoringConfig;

pub const NO_RESULTS_MESSAGE: &str = "No relevant passages were found for this question.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AskOptions {
    pub top_k: usize,
    pub max_quotes: usize,
    pub model: String,
    pub scoring: QuoteScoringConfig,
}

/// Result of one question. Only retrieval errors escape as `Err`; everything after
/// retrieval degrades into one of these variants.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryOutcome {
    Answered(ComposedAnswer),
    NoResults {
        message: String,
    },
    /// Composition failed; the raw hits are still worth showing.
    Degraded {
        retrieved_count: usize,
        retrieved: Vec<RetrievedItem>,
        error: AppError,
    },
}

pub fn answer_question(
    kb: &KnowledgeBase,
    embedder: &dyn Embedder,
    query: &str,
    opts: &AskOptions,
) -> Result<QueryOutcome, AppError> {
    let retrieved = kb.retrieve(query, opts.top_k, embedder, &opts.model)?;
    if retrieved.is_empty() {
        log::info!("no passages retrieved for query");
        return Ok(QueryOutcome::NoResults {
            message: NO_RESULTS_MESSAGE.to_string(),
        });
    }

    match compose_answer(query, &retrieved, opts.max_quotes, &opts.scoring) {
        Ok(answer) => Ok(QueryOutcome::Answered(answer)),
        Err(error) => {
            log::warn!("answer composition failed, returning raw passages: {error}");
            Ok(QueryOutcome::Degraded {
                retrieved_count: retrieved.len(),
                retrieved,
                error,
            })
        }
    }
}
