use bq_ai::compose::{compose_answer, NO_INFORMATION_ANSWER};
use bq_ai::embeddings::{normalize_l2, Embedder};
use bq_ai::guardrails::{enforce_quote_fidelity, enforce_reference_alignment, extract_reference_markers};
use bq_ai::index::{FlatIpIndex, IndexStatus, MetadataRow, VectorIndex};
use bq_ai::kb::KnowledgeBase;
use bq_ai::pipeline::{answer_question, AskOptions, QueryOutcome, NO_RESULTS_MESSAGE};
use bq_ai::quotes::QuoteScoringConfig;
use bq_core::domain::{Chunk, ChunkMetadata, RetrievedItem};
use bq_core::error::AppError;
use pretty_assertions::assert_eq;

const KEYWORDS: [&str; 3] = ["achilles", "hector", "dorian"];

struct KeywordEmbedder;

impl Embedder for KeywordEmbedder {
    fn embed(&self, _model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        let lower = input.to_lowercase();
        let mut v: Vec<f32> = KEYWORDS
            .iter()
            .map(|k| lower.matches(k).count() as f32)
            .collect();
        v.push(0.1);
        Ok(v)
    }
}

const PASSAGES: [&str; 3] = [
    "Achilles sulked beside the ships. Achilles would not fight for the Achaeans.",
    "Hector stood before the walls of Troy. Hector tamer of horses waited for the spear.",
    "Dorian looked at the portrait for a long time. The painting of Dorian had changed.",
];

fn status(count: usize) -> IndexStatus {
    IndexStatus {
        ready: true,
        book: Some("iliad".to_string()),
        model: Some("mock".to_string()),
        dims: Some(4),
        chunk_count: count as u32,
        target_size: Some(60),
        overlap: Some(0),
        updated_at: Some("2026-02-10T00:00:00Z".to_string()),
    }
}

fn knowledge_base(passages: &[&str]) -> KnowledgeBase {
    let mut index = FlatIpIndex::new(4);
    let mut rows = Vec::new();
    for (n, text) in passages.iter().enumerate() {
        let v = normalize_l2(&KeywordEmbedder.embed("mock", text).expect("embed")).expect("normalize");
        index.add(&[v]).expect("add");
        let chunk = Chunk {
            id: format!("iliad_chunk_{n}"),
            text: text.to_string(),
            book: "iliad".to_string(),
            paragraph_start: n,
            paragraph_end: n,
            char_count: text.chars().count(),
        };
        rows.push(MetadataRow::from_chunk(&chunk, true));
    }
    KnowledgeBase::from_parts(status(passages.len()), Box::new(index), rows, None).expect("kb")
}

fn options(max_quotes: usize) -> AskOptions {
    AskOptions {
        top_k: 2,
        max_quotes,
        model: "mock".to_string(),
        scoring: QuoteScoringConfig::default(),
    }
}

#[test]
fn answers_with_verbatim_quotes_and_aligned_references() {
    let kb = knowledge_base(&PASSAGES);
    let outcome = answer_question(&kb, &KeywordEmbedder, "Who was Hector?", &options(2)).expect("answer");

    let answer = match outcome {
        QueryOutcome::Answered(a) => a,
        other => panic!("expected an answer, got {other:?}"),
    };
    assert_eq!(answer.quotes.len(), 2);
    assert!(answer.quotes.iter().all(|q| q.chunk_id == "iliad_chunk_1"));
    for q in &answer.quotes {
        assert!(PASSAGES[1].contains(q.text.as_str()));
    }
    assert!(answer.answer.starts_with("The passages below point to the people involved."));
    assert_eq!(extract_reference_markers(&answer.answer), vec![1, 2]);
    assert_eq!(answer.references.len(), 2);
    assert!(answer.references[0].starts_with("[1] Hector stood before the walls of Troy."));
    assert!(answer.references[0].ends_with("— The Iliad, paragraphs 1-1"));
    enforce_reference_alignment(&answer.answer, &answer.references).expect("aligned");
}

#[test]
fn empty_index_reports_no_results() {
    let kb = knowledge_base(&[]);
    let outcome = answer_question(&kb, &KeywordEmbedder, "Who was Hector?", &options(3)).expect("answer");
    assert_eq!(
        outcome,
        QueryOutcome::NoResults {
            message: NO_RESULTS_MESSAGE.to_string()
        }
    );
}

#[test]
fn composer_failure_degrades_to_raw_passages() {
    let kb = knowledge_base(&PASSAGES);
    let outcome = answer_question(&kb, &KeywordEmbedder, "Who was Hector?", &options(0)).expect("answer");
    match outcome {
        QueryOutcome::Degraded {
            retrieved_count,
            retrieved,
            error,
        } => {
            assert_eq!(retrieved_count, 2);
            assert_eq!(retrieved[0].chunk_id, "iliad_chunk_1");
            assert_eq!(error.code, "AI_COMPOSE_FAILED");
        }
        other => panic!("expected a degraded outcome, got {other:?}"),
    }
}

#[test]
fn retrieval_errors_propagate() {
    let kb = knowledge_base(&PASSAGES);
    let err = answer_question(&kb, &KeywordEmbedder, "  ", &options(3)).unwrap_err();
    assert_eq!(err.code, "AI_RETRIEVAL_FAILED");
}

#[test]
fn empty_retrieval_composes_the_fixed_answer() {
    let got = compose_answer("anything", &[], 3, &QuoteScoringConfig::default()).expect("compose");
    assert_eq!(got.answer, NO_INFORMATION_ANSWER);
    assert!(got.quotes.is_empty());
    assert!(got.references.is_empty());
}

#[test]
fn brackets_inside_quotes_keep_references_aligned() {
    let text = "He shouted [to no one] across the plain of Troy. Then the [2] ships burned in the night.";
    let retrieved = vec![RetrievedItem {
        chunk_id: "iliad_chunk_7".to_string(),
        score: 0.8,
        text: text.to_string(),
        meta: ChunkMetadata {
            book: "iliad".to_string(),
            paragraph_start: 7,
            paragraph_end: 8,
            char_count: text.chars().count(),
        },
    }];
    let got = compose_answer("Troy ships", &retrieved, 2, &QuoteScoringConfig::default()).expect("compose");
    assert_eq!(got.references.len(), 2);
    assert_eq!(extract_reference_markers(&got.answer), vec![1, 2]);
    enforce_quote_fidelity(&got.quotes, &retrieved).expect("verbatim");
}

#[test]
fn marker_phrase_inside_a_quoted_sentence_still_composes() {
    let text = "As shown in [3] the black ships burned beside the sea. The Achaeans wept for their ships all night.";
    let retrieved = vec![RetrievedItem {
        chunk_id: "iliad_chunk_4".to_string(),
        score: 0.7,
        text: text.to_string(),
        meta: ChunkMetadata {
            book: "iliad".to_string(),
            paragraph_start: 4,
            paragraph_end: 4,
            char_count: text.chars().count(),
        },
    }];
    let got = compose_answer("ships", &retrieved, 2, &QuoteScoringConfig::default()).expect("compose");
    assert_eq!(got.references.len(), 2);
    assert!(got.answer.contains("\"As shown in [3] the black ships"));
    assert_eq!(extract_reference_markers(&got.answer), vec![1, 2]);
}

#[test]
fn altered_quote_is_caught() {
    let retrieved = vec![RetrievedItem {
        chunk_id: "iliad_chunk_0".to_string(),
        score: 0.8,
        text: "Sing, O goddess, the anger of Achilles.".to_string(),
        meta: ChunkMetadata {
            book: "iliad".to_string(),
            paragraph_start: 0,
            paragraph_end: 0,
            char_count: 39,
        },
    }];
    let mut got = compose_answer("anger", &retrieved, 1, &QuoteScoringConfig::default()).expect("compose");
    got.quotes[0].text.push('!');
    let err = enforce_quote_fidelity(&got.quotes, &retrieved).unwrap_err();
    assert_eq!(err.code, "AI_QUOTE_ALTERED");
}
