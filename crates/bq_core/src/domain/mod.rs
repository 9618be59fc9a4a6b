use serde::{Deserialize, Serialize};

/// A paragraph-aligned excerpt of a book with its provenance.
///
/// Notes:
/// - `id` is `"{book}_chunk_{n}"` and is stable across rebuilds for the same book and
///   chunking parameters.
/// - `paragraph_start <= paragraph_end`, both inclusive indices into the paragraph list the
///   chunk was built from.
/// - `char_count` counts Unicode scalar values of `text`, not bytes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub book: String,
    pub paragraph_start: usize,
    pub paragraph_end: usize,
    pub char_count: usize,
}

impl Chunk {
    pub fn meta(&self) -> ChunkMetadata {
        ChunkMetadata {
            book: self.book.clone(),
            paragraph_start: self.paragraph_start,
            paragraph_end: self.paragraph_end,
            char_count: self.char_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkMetadata {
    pub book: String,
    pub paragraph_start: usize,
    pub paragraph_end: usize,
    pub char_count: usize,
}

/// One retrieval hit. Produced per query and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedItem {
    pub chunk_id: String,
    pub score: f32,
    pub text: String,
    pub meta: ChunkMetadata,
}

/// A sentence lifted verbatim from a retrieved chunk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quote {
    pub text: String,
    pub score: f32,
    pub chunk_id: String,
    pub cite: ChunkMetadata,
}

/// The only structure handed to a presentation layer.
///
/// `references[i]` is the citation behind the `[i + 1]` marker in `answer`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComposedAnswer {
    pub answer: String,
    pub quotes: Vec<Quote>,
    pub references: Vec<String>,
}
