use std::collections::BTreeSet;

use bq_core::domain::{Quote, RetrievedItem};
use serde::{Deserialize, Serialize};

/// Weights and thresholds for sentence scoring and near-duplicate rejection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QuoteScoringConfig {
    pub coverage_weight: f32,
    pub brevity_weight: f32,
    /// Sentences at or beyond this length get no brevity bonus.
    pub brevity_reference_chars: usize,
    pub min_sentence_chars: usize,
    pub dedup_prefix_chars: usize,
}

impl Default for QuoteScoringConfig {
    fn default() -> Self {
        Self {
            coverage_weight: 1.0,
            brevity_weight: 0.1,
            brevity_reference_chars: 200,
            min_sentence_chars: 20,
            dedup_prefix_chars: 50,
        }
    }
}

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Split `text` after every run of `.`, `!` or `?`, keeping the punctuation on the
/// sentence it ends. Segments shorter than `min_chars` are dropped; when nothing is
/// left the trimmed text is returned whole.
///
/// Every returned sentence is a slice of `text`.
pub fn segment_sentences(text: &str, min_chars: usize) -> Vec<&str> {
    let mut raw: Vec<&str> = Vec::new();
    let mut start = 0usize;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if !is_terminal(c) {
            continue;
        }
        let mut end = i + c.len_utf8();
        while let Some(&(j, next)) = chars.peek() {
            if !is_terminal(next) {
                break;
            }
            end = j + next.len_utf8();
            chars.next();
        }
        raw.push(&text[start..end]);
        start = end;
    }
    if start < text.len() {
        raw.push(&text[start..]);
    }

    let kept: Vec<&str> = raw
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.chars().count() >= min_chars)
        .collect();
    if !kept.is_empty() {
        return kept;
    }

    let whole = text.trim();
    if whole.is_empty() {
        Vec::new()
    } else {
        vec![whole]
    }
}

/// Lowercase alphanumeric word tokens.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Relevance of `sentence` to `query`, in `[0, 1]`.
pub fn score_sentence(query: &str, sentence: &str, cfg: &QuoteScoringConfig) -> f32 {
    let query_tokens = tokenize(query);
    if query_tokens.is_empty() {
        return 0.0;
    }
    let sentence_tokens = tokenize(sentence);
    let matched = query_tokens
        .iter()
        .filter(|t| sentence_tokens.contains(*t))
        .count();
    let coverage = matched as f32 / query_tokens.len() as f32;

    let brevity = if cfg.brevity_reference_chars == 0 {
        0.0
    } else {
        let len = sentence.chars().count().min(cfg.brevity_reference_chars);
        1.0 - len as f32 / cfg.brevity_reference_chars as f32
    };

    (cfg.coverage_weight * coverage + cfg.brevity_weight * brevity).clamp(0.0, 1.0)
}

fn leading_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

struct Candidate<'a> {
    score: f32,
    sentence: &'a str,
    item: &'a RetrievedItem,
}

/// Pick up to `n` verbatim sentences from `retrieved`, best first.
///
/// Candidates from every item are pooled and ranked by score; equal scores keep
/// retrieval order. A candidate is skipped when an already-selected quote comes from the
/// same chunk and starts with the same `dedup_prefix_chars` characters.
pub fn select_quotes(
    query: &str,
    retrieved: &[RetrievedItem],
    n: usize,
    cfg: &QuoteScoringConfig,
) -> Vec<Quote> {
    if n == 0 {
        return Vec::new();
    }

    let mut candidates: Vec<Candidate<'_>> = Vec::new();
    for item in retrieved {
        for sentence in segment_sentences(&item.text, cfg.min_sentence_chars) {
            candidates.push(Candidate {
                score: score_sentence(query, sentence, cfg),
                sentence,
                item,
            });
        }
    }
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut picked: Vec<Quote> = Vec::with_capacity(n);
    for c in candidates {
        if picked.len() >= n {
            break;
        }
        let prefix = leading_chars(c.sentence, cfg.dedup_prefix_chars);
        let duplicate = picked.iter().any(|q| {
            q.chunk_id == c.item.chunk_id
                && leading_chars(&q.text, cfg.dedup_prefix_chars) == prefix
        });
        if duplicate {
            log::trace!("skipping near-duplicate quote from {}", c.item.chunk_id);
            continue;
        }
        picked.push(Quote {
            text: c.sentence.to_string(),
            score: c.score,
            chunk_id: c.item.chunk_id.clone(),
            cite: c.item.meta.clone(),
        });
    }
    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use bq_core::domain::ChunkMetadata;
    use pretty_assertions::assert_eq;

    fn item(id: &str, text: &str) -> RetrievedItem {
        RetrievedItem {
            chunk_id: id.to_string(),
            score: 0.9,
            text: text.to_string(),
            meta: ChunkMetadata {
                book: "iliad".to_string(),
                paragraph_start: 0,
                paragraph_end: 1,
                char_count: text.chars().count(),
            },
        }
    }

    #[test]
    fn segments_keep_terminal_punctuation() {
        let text = "Achilles sulked in his tent. Did Hector fear him?! Patroclus went out instead.";
        assert_eq!(
            segment_sentences(text, 20),
            vec![
                "Achilles sulked in his tent.",
                "Did Hector fear him?!",
                "Patroclus went out instead."
            ]
        );
    }

    #[test]
    fn short_segments_fall_back_to_whole_text() {
        assert_eq!(segment_sentences("  Yes. No. Maybe.  ", 20), vec!["Yes. No. Maybe."]);
        assert!(segment_sentences("   ", 20).is_empty());
    }

    #[test]
    fn trailing_text_without_punctuation_is_a_sentence() {
        assert_eq!(
            segment_sentences("The ships were drawn up on the shore. And the fires burned all night", 20),
            vec!["The ships were drawn up on the shore.", "And the fires burned all night"]
        );
    }

    #[test]
    fn scores_half_coverage_with_brevity_bonus() {
        let cfg = QuoteScoringConfig::default();
        let two_of_four = "A theme of the old poets.";
        assert_eq!(two_of_four.chars().count(), 25);
        let s = score_sentence("What is the theme?", two_of_four, &cfg);
        assert!(s > 0.0 && s < 1.0);
        assert!((s - 0.5875).abs() < 1e-6);

        let three_of_four = "The theme here is vanity.";
        let s = score_sentence("What is the theme?", three_of_four, &cfg);
        assert!((s - (0.75 + 0.1 * (1.0 - 25.0 / 200.0))).abs() < 1e-6);
    }

    #[test]
    fn score_is_clamped_and_zero_for_tokenless_query() {
        let cfg = QuoteScoringConfig::default();
        assert_eq!(score_sentence("Hector", "Hector.", &cfg), 1.0);
        assert_eq!(score_sentence("?!", "Hector ran around the walls.", &cfg), 0.0);
    }

    #[test]
    fn selection_is_ranked_and_capped() {
        let cfg = QuoteScoringConfig::default();
        let retrieved = vec![
            item("iliad_chunk_0", "The rage of Achilles was terrible to see. The sea was wine-dark that morning."),
            item("iliad_chunk_1", "Achilles and his rage doomed many Achaeans to Hades."),
        ];
        let quotes = select_quotes("rage of Achilles", &retrieved, 2, &cfg);
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].text, "The rage of Achilles was terrible to see.");
        assert_eq!(quotes[0].chunk_id, "iliad_chunk_0");
        assert_eq!(quotes[1].chunk_id, "iliad_chunk_1");
        assert!(quotes[0].score >= quotes[1].score);
    }

    #[test]
    fn rejects_same_chunk_same_prefix_only() {
        let cfg = QuoteScoringConfig::default();
        let repeated = "Sing, O goddess, the anger of Achilles son of Peleus, that brought countless ills.";
        let retrieved = vec![
            item("iliad_chunk_0", &format!("{repeated} {repeated}")),
            item("iliad_chunk_1", repeated),
        ];
        let quotes = select_quotes("anger of Achilles", &retrieved, 3, &cfg);
        let ids: Vec<&str> = quotes.iter().map(|q| q.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["iliad_chunk_0", "iliad_chunk_1"]);
    }

    #[test]
    fn zero_quotes_requested_yields_nothing() {
        let cfg = QuoteScoringConfig::default();
        let retrieved = vec![item("iliad_chunk_0", "Hector tamer of horses fell before the gates.")];
        assert!(select_quotes("Hector", &retrieved, 0, &cfg).is_empty());
    }
}
