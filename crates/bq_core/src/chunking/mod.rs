//! Paragraph-aligned chunking with overlap.
//!
//! Paragraphs are accumulated greedily (joined by a blank line) until the chunk reaches
//! `target_size` characters; paragraphs are never split, so a chunk may overshoot. To
//! overlap, the next chunk restarts at the paragraph reached by walking backward from the
//! end of the emitted chunk until `overlap` characters are re-covered.
//!
//! The cursor is an explicit state machine:
//!
//! ```text
//! Accumulating ──▶ Emitted ──▶ SeekingOverlapStart ──▶ Accumulating
//!                     │   └──────────────────────────▶ Accumulating (no overlap)
//!                     └──▶ Done
//! ```
//!
//! Every chunk starts and ends strictly after the previous chunk, so at most one chunk per
//! paragraph is emitted and the loop always terminates.

mod observer;

pub use observer::{ChunkEvent, ChunkObserver, LogObserver, NoopObserver};

use serde::{Deserialize, Serialize};

use crate::domain::Chunk;
use crate::error::AppError;

pub const PARAGRAPH_SEPARATOR: &str = "\n\n";
const SEPARATOR_CHARS: usize = 2;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingParams {
    pub target_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingParams {
    fn default() -> Self {
        Self {
            target_size: 1000,
            overlap: 150,
        }
    }
}

impl ChunkingParams {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.target_size == 0 {
            return Err(AppError::new(
                "CHUNK_PARAMS_INVALID",
                "target_size must be greater than zero",
            ));
        }
        if self.overlap >= self.target_size {
            return Err(AppError::new(
                "CHUNK_PARAMS_INVALID",
                "overlap must be smaller than target_size",
            )
            .with_details(format!(
                "target_size={}; overlap={}",
                self.target_size, self.overlap
            )));
        }
        Ok(())
    }
}

/// Cursor states of the chunker. Paragraph indices are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    Accumulating { start: usize },
    Emitted { start: usize, end: usize, chars: usize },
    SeekingOverlapStart { start: usize, end: usize },
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapDecision {
    /// Restart at this paragraph, re-covering the tail of the emitted chunk.
    StartAt(usize),
    /// No restart point strictly after the emitted chunk's start; continue with the first
    /// unconsumed paragraph.
    Forward,
}

/// Walk backward from `end` over paragraph lengths until `overlap` characters are covered.
///
/// `lens` holds paragraph lengths in characters; `start..=end` is the emitted chunk. A restart
/// is only taken when the re-covered tail is shorter than `target_size`, so the next chunk
/// grows past `end`; otherwise it would be a copy of paragraphs already emitted.
pub fn seek_overlap_start(lens: &[usize], start: usize, end: usize, params: ChunkingParams) -> OverlapDecision {
    if start > end || end >= lens.len() {
        return OverlapDecision::Forward;
    }
    let overlap = params.overlap;
    let mut covered = 0usize;
    let mut idx = end;
    loop {
        covered += lens[idx];
        if idx < end {
            covered += SEPARATOR_CHARS;
        }
        if covered >= overlap {
            return if idx > start && covered < params.target_size {
                OverlapDecision::StartAt(idx)
            } else {
                OverlapDecision::Forward
            };
        }
        if idx == start {
            return OverlapDecision::Forward;
        }
        idx -= 1;
    }
}

/// Build overlapping chunks for one book.
///
/// Empty input yields no chunks. Invalid parameters are `CHUNK_PARAMS_INVALID`.
pub fn chunk_paragraphs(
    paragraphs: &[String],
    params: ChunkingParams,
    book_id: &str,
    observer: &dyn ChunkObserver,
) -> Result<Vec<Chunk>, AppError> {
    params.validate()?;

    let total = paragraphs.len();
    observer.on_event(&ChunkEvent::Started {
        book: book_id.to_string(),
        paragraphs: total,
        target_size: params.target_size,
        overlap: params.overlap,
    });

    let lens: Vec<usize> = paragraphs.iter().map(|p| p.chars().count()).collect();
    let mut chunks: Vec<Chunk> = Vec::new();
    let mut state = if total == 0 {
        CursorState::Done
    } else {
        CursorState::Accumulating { start: 0 }
    };

    loop {
        state = match state {
            CursorState::Accumulating { start } => {
                let mut end = start;
                let mut chars = 0usize;
                let mut i = start;
                while i < total && chars < params.target_size {
                    if i > start {
                        chars += SEPARATOR_CHARS;
                    }
                    chars += lens[i];
                    end = i;
                    i += 1;
                }

                let chunk = Chunk {
                    id: format!("{book_id}_chunk_{}", chunks.len()),
                    text: paragraphs[start..=end].join(PARAGRAPH_SEPARATOR),
                    book: book_id.to_string(),
                    paragraph_start: start,
                    paragraph_end: end,
                    char_count: chars,
                };
                observer.on_event(&ChunkEvent::Emitted {
                    chunk_id: chunk.id.clone(),
                    paragraph_start: start,
                    paragraph_end: end,
                    chars,
                    progress_pct: (end + 1) as f32 / total as f32 * 100.0,
                });
                chunks.push(chunk);
                CursorState::Emitted { start, end, chars }
            }
            CursorState::Emitted { start, end, chars } => {
                if end + 1 >= total {
                    CursorState::Done
                } else if params.overlap == 0 || chars <= params.target_size - params.overlap {
                    CursorState::Accumulating { start: end + 1 }
                } else {
                    CursorState::SeekingOverlapStart { start, end }
                }
            }
            CursorState::SeekingOverlapStart { start, end } => {
                let after_chunk = last_chunk_id(&chunks);
                match seek_overlap_start(&lens, start, end, params) {
                    OverlapDecision::StartAt(next_start) => {
                        observer.on_event(&ChunkEvent::OverlapResolved {
                            after_chunk,
                            next_start,
                        });
                        CursorState::Accumulating { start: next_start }
                    }
                    OverlapDecision::Forward => {
                        observer.on_event(&ChunkEvent::ForcedForward {
                            after_chunk,
                            next_start: end + 1,
                        });
                        CursorState::Accumulating { start: end + 1 }
                    }
                }
            }
            CursorState::Done => break,
        };
    }

    observer.on_event(&ChunkEvent::Finished {
        book: book_id.to_string(),
        chunks: chunks.len(),
    });
    Ok(chunks)
}

fn last_chunk_id(chunks: &[Chunk]) -> String {
    chunks.last().map(|c| c.id.clone()).unwrap_or_default()
}
