/// Progress and decision events raised while chunking a book.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkEvent {
    Started {
        book: String,
        paragraphs: usize,
        target_size: usize,
        overlap: usize,
    },
    Emitted {
        chunk_id: String,
        paragraph_start: usize,
        paragraph_end: usize,
        chars: usize,
        progress_pct: f32,
    },
    /// The next chunk re-covers paragraphs of the previous one, starting at `next_start`.
    OverlapResolved { after_chunk: String, next_start: usize },
    /// Overlap could not move the start forward; the next chunk starts at the first
    /// unconsumed paragraph.
    ForcedForward { after_chunk: String, next_start: usize },
    Finished { book: String, chunks: usize },
}

/// Injectable hook for chunking progress. The chunker itself never prints.
pub trait ChunkObserver {
    fn on_event(&self, event: &ChunkEvent);
}

impl<F> ChunkObserver for F
where
    F: Fn(&ChunkEvent),
{
    fn on_event(&self, event: &ChunkEvent) {
        self(event)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ChunkObserver for NoopObserver {
    fn on_event(&self, _event: &ChunkEvent) {}
}

/// Forwards chunking events to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl ChunkObserver for LogObserver {
    fn on_event(&self, event: &ChunkEvent) {
        match event {
            ChunkEvent::Started {
                book,
                paragraphs,
                target_size,
                overlap,
            } => log::info!(
                "chunking {book}: {paragraphs} paragraphs, target_size={target_size}, overlap={overlap}"
            ),
            ChunkEvent::Emitted {
                chunk_id,
                paragraph_start,
                paragraph_end,
                chars,
                progress_pct,
            } => log::debug!(
                "{chunk_id}: paragraphs {paragraph_start}-{paragraph_end}, {chars} chars ({progress_pct:.1}% complete)"
            ),
            ChunkEvent::OverlapResolved {
                after_chunk,
                next_start,
            } => log::trace!("after {after_chunk}: overlap restarts at paragraph {next_start}"),
            ChunkEvent::ForcedForward {
                after_chunk,
                next_start,
            } => log::debug!(
                "after {after_chunk}: overlap would not advance, continuing at paragraph {next_start}"
            ),
            ChunkEvent::Finished { book, chunks } => {
                log::info!("created {chunks} chunks from {book}")
            }
        }
    }
}
