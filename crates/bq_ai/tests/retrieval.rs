use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bq_ai::embeddings::Embedder;
use bq_ai::index::{FlatIpIndex, IndexHit, IndexStatus, MetadataRow, VectorIndex, NO_MATCH};
use bq_ai::kb::{KnowledgeBase, SharedKnowledgeBase};
use bq_ai::retrieve::retrieve;
use bq_core::domain::Chunk;
use bq_core::error::AppError;
use pretty_assertions::assert_eq;

/// Counts of 'a' and 'b', the same toy space the index rows live in.
struct CountABEmbedder;

impl Embedder for CountABEmbedder {
    fn embed(&self, _model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        let a = input.chars().filter(|c| *c == 'a').count();
        let b = input.chars().filter(|c| *c == 'b').count();
        Ok(vec![a as f32, b as f32])
    }
}

fn chunk(n: usize, text: &str) -> Chunk {
    Chunk {
        id: format!("dorian_gray_chunk_{n}"),
        text: text.to_string(),
        book: "dorian_gray".to_string(),
        paragraph_start: n,
        paragraph_end: n,
        char_count: text.chars().count(),
    }
}

fn status(count: usize) -> IndexStatus {
    IndexStatus {
        ready: true,
        book: Some("dorian_gray".to_string()),
        model: Some("mock".to_string()),
        dims: Some(2),
        chunk_count: count as u32,
        target_size: Some(1000),
        overlap: Some(150),
        updated_at: Some("2026-02-10T00:00:00Z".to_string()),
    }
}

fn fixture(texts: &[&str]) -> (FlatIpIndex, Vec<MetadataRow>) {
    let mut index = FlatIpIndex::new(2);
    let mut rows = Vec::new();
    for (n, text) in texts.iter().enumerate() {
        let v = CountABEmbedder.embed("mock", text).expect("embed");
        let unit = bq_ai::embeddings::normalize_l2(&v).expect("normalize");
        index.add(&[unit]).expect("add");
        rows.push(MetadataRow::from_chunk(&chunk(n, text), true));
    }
    (index, rows)
}

#[test]
fn retrieval_is_ranked_and_deterministic() {
    let (index, rows) = fixture(&["aaaa", "bbbb", "aab"]);

    let first = retrieve("aaa", 3, &index, &CountABEmbedder, "mock", &rows, None).expect("retrieve");
    let ids: Vec<&str> = first.iter().map(|h| h.chunk_id.as_str()).collect();
    assert_eq!(ids, vec!["dorian_gray_chunk_0", "dorian_gray_chunk_2", "dorian_gray_chunk_1"]);
    assert!(first[0].score >= first[1].score && first[1].score >= first[2].score);
    assert_eq!(first[1].meta.paragraph_start, 2);

    for _ in 0..5 {
        let again = retrieve("aaa", 3, &index, &CountABEmbedder, "mock", &rows, None).expect("retrieve");
        assert_eq!(again, first);
    }
}

/// Wraps a flat index, remembers every requested `k` and appends a no-match hit.
struct RecordingIndex {
    inner: FlatIpIndex,
    requested: Mutex<Vec<usize>>,
}

impl VectorIndex for RecordingIndex {
    fn dims(&self) -> usize {
        self.inner.dims()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<(), AppError> {
        self.inner.add(vectors)
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<IndexHit>, AppError> {
        self.requested.lock().expect("lock").push(k);
        let mut hits = self.inner.search(query, k)?;
        hits.push(IndexHit {
            score: f32::NEG_INFINITY,
            row: NO_MATCH,
        });
        Ok(hits)
    }
}

#[test]
fn sentinel_hits_are_skipped_when_k_exceeds_rows() {
    let (index, rows) = fixture(&["aaaa", "bbbb"]);
    let hits = retrieve("ab", 10, &index, &CountABEmbedder, "mock", &rows, None).expect("retrieve");
    assert_eq!(hits.len(), 2);

    let recording = RecordingIndex {
        inner: index,
        requested: Mutex::new(Vec::new()),
    };
    let hits = retrieve("ab", 1, &recording, &CountABEmbedder, "mock", &rows, None).expect("retrieve");
    assert_eq!(hits.len(), 1);
}

#[test]
fn huge_k_only_asks_the_index_for_its_stored_rows() {
    let (index, rows) = fixture(&["aaaa", "bbbb", "aab"]);
    let recording = RecordingIndex {
        inner: index,
        requested: Mutex::new(Vec::new()),
    };
    let hits = retrieve("ab", 4_000_000_000, &recording, &CountABEmbedder, "mock", &rows, None)
        .expect("retrieve");
    assert_eq!(hits.len(), 3);
    assert_eq!(*recording.requested.lock().expect("lock"), vec![3]);
}

#[test]
fn text_lookup_wins_over_metadata_text() {
    let (index, rows) = fixture(&["aaaa"]);
    let lookup: HashMap<String, String> = std::iter::once(("dorian_gray_chunk_0".to_string(), "full text".to_string())).collect();
    let hits = retrieve("a", 1, &index, &CountABEmbedder, "mock", &rows, Some(&lookup)).expect("retrieve");
    assert_eq!(hits[0].text, "full text");
}

#[test]
fn rejects_empty_query_and_zero_k() {
    let (index, rows) = fixture(&["aaaa"]);
    let err = retrieve("   ", 1, &index, &CountABEmbedder, "mock", &rows, None).unwrap_err();
    assert_eq!(err.code, "AI_RETRIEVAL_FAILED");
    let err = retrieve("a", 0, &index, &CountABEmbedder, "mock", &rows, None).unwrap_err();
    assert_eq!(err.code, "AI_RETRIEVAL_FAILED");
}

#[test]
fn query_dims_must_match_index() {
    struct WideEmbedder;
    impl Embedder for WideEmbedder {
        fn embed(&self, _model: &str, _input: &str) -> Result<Vec<f32>, AppError> {
            Ok(vec![1.0, 0.0, 0.0])
        }
    }
    let (index, rows) = fixture(&["aaaa"]);
    let err = retrieve("a", 1, &index, &WideEmbedder, "mock", &rows, None).unwrap_err();
    assert_eq!(err.code, "AI_RETRIEVAL_FAILED");
}

#[test]
fn mismatched_parts_refuse_to_assemble() {
    let (index, mut rows) = fixture(&["aaaa", "bbbb"]);
    rows.pop();
    let err = KnowledgeBase::from_parts(status(2), Box::new(index), rows, None).unwrap_err();
    assert_eq!(err.code, "INDEX_INTEGRITY_MISMATCH");
}

#[test]
fn swap_does_not_disturb_snapshots_in_flight() {
    let (index, rows) = fixture(&["aaaa"]);
    let shared = SharedKnowledgeBase::new(
        KnowledgeBase::from_parts(status(1), Box::new(index), rows, None).expect("kb"),
    );
    let before = shared.snapshot().expect("snapshot");

    let (index, rows) = fixture(&["aaaa", "bbbb"]);
    let previous = shared
        .swap(KnowledgeBase::from_parts(status(2), Box::new(index), rows, None).expect("kb"))
        .expect("swap");

    assert!(Arc::ptr_eq(&before, &previous));
    assert_eq!(before.len(), 1);
    assert_eq!(shared.snapshot().expect("snapshot").len(), 2);

    let hits = before.retrieve("b", 5, &CountABEmbedder, "mock").expect("retrieve");
    assert_eq!(hits.len(), 1);
}
