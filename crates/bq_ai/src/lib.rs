pub mod chunk_store;
pub mod compose;
pub mod embeddings;
pub mod guardrails;
pub mod index;
pub mod kb;
pub mod ollama;
pub mod pipeline;
pub mod quotes;
pub mod retrieve;
