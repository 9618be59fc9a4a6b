use bq_core::error::AppError;

pub mod ollama_embed;

/// Text → vector. Implementations need not normalize; callers that search by inner
/// product run the output through [`normalize_l2`].
pub trait Embedder {
    fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>, AppError>;
}

/// Scale a vector to unit length so inner product equals cosine similarity.
pub fn normalize_l2(v: &[f32]) -> Result<Vec<f32>, AppError> {
    if v.is_empty() {
        return Err(AppError::new("AI_EMBEDDINGS_FAILED", "Embedding is empty"));
    }
    let norm = crate::retrieve::similarity::l2_norm(v);
    if norm == 0.0 || !norm.is_finite() {
        return Err(
            AppError::new("AI_EMBEDDINGS_FAILED", "Embedding cannot be normalized")
                .with_details(format!("norm={norm}")),
        );
    }
    Ok(v.iter().map(|x| x / norm).collect())
}
