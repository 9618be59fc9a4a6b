use bq_core::error::AppError;

pub mod flat;
pub mod metadata;
pub mod store;

pub use flat::FlatIpIndex;
pub use metadata::MetadataRow;
pub use store::{IndexBuildInput, IndexStatus, IndexStore, LoadedIndex};

/// Row id reported for padding hits when the index holds fewer than `k` vectors.
pub const NO_MATCH: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexHit {
    pub score: f32,
    pub row: i64,
}

impl IndexHit {
    /// Row index when the hit refers to a stored vector.
    pub fn row_index(&self) -> Option<usize> {
        usize::try_from(self.row).ok()
    }
}

/// Similarity index over unit-normalized vectors. Read-only once a query is being served.
pub trait VectorIndex: Send + Sync {
    fn dims(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<(), AppError>;

    /// Exactly `k` hits in descending score order; missing neighbours are [`NO_MATCH`].
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<IndexHit>, AppError>;
}
