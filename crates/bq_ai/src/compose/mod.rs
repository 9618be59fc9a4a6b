use bq_core::books::display_title;
use bq_core::domain::{ComposedAnswer, Quote, RetrievedItem};
use bq_core::error::AppError;

use crate::guardrails::{enforce_quote_fidelity, enforce_reference_alignment, MARKER_LEAD};
use crate::quotes::{select_quotes, QuoteScoringConfig};

pub const NO_INFORMATION_ANSWER: &str =
    "I couldn't find any relevant information to answer this question.";

/// Quote length shown inline in the answer.
pub const ANSWER_SNIPPET_CHARS: usize = 150;
/// Quote length shown in a citation line.
pub const CITATION_SNIPPET_CHARS: usize = 200;

const ELLIPSIS: &str = "…";

/// What kind of question was asked, judged from its first word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Who,
    What,
    How,
    Other,
}

const INTENT_WORDS: &[(&str, Intent)] = &[
    ("who", Intent::Who),
    ("whom", Intent::Who),
    ("whose", Intent::Who),
    ("what", Intent::What),
    ("which", Intent::What),
    ("how", Intent::How),
];

const OPENINGS: &[(Intent, &str)] = &[
    (Intent::Who, "The passages below point to the people involved."),
    (Intent::What, "The passages below speak to this question."),
    (Intent::How, "The passages below show how this unfolds."),
    (Intent::Other, "Here is what the text says."),
];

impl Intent {
    pub fn detect(query: &str) -> Self {
        let first = query
            .split_whitespace()
            .next()
            .unwrap_or("")
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        INTENT_WORDS
            .iter()
            .find(|(word, _)| *word == first)
            .map(|(_, intent)| *intent)
            .unwrap_or(Intent::Other)
    }

    pub fn opening(self) -> &'static str {
        OPENINGS
            .iter()
            .find(|(intent, _)| *intent == self)
            .map(|(_, text)| *text)
            .unwrap_or("")
    }
}

/// Display copy of `text` cut to `max_chars`, with an ellipsis only when something was cut.
pub fn truncate_display(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((i, _)) => format!("{}{ELLIPSIS}", text[..i].trim_end()),
        None => text.to_string(),
    }
}

/// Opening clause plus one `As shown in [i]` sentence per quote, in selection order.
pub fn synthesize_answer(query: &str, quotes: &[Quote]) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(quotes.len() + 1);
    parts.push(Intent::detect(query).opening().to_string());
    for (i, q) in quotes.iter().enumerate() {
        parts.push(format!(
            "{MARKER_LEAD}{}]: \"{}\"",
            i + 1,
            truncate_display(&q.text, ANSWER_SNIPPET_CHARS)
        ));
    }
    parts.join(" ")
}

/// One `[i] text — Title, paragraphs s-e` line per quote.
///
/// The text is cut to the citation snippet length and ends in `…` only when it was cut;
/// a short quote is shown whole with no ellipsis.
pub fn render_citations(quotes: &[Quote]) -> Vec<String> {
    quotes
        .iter()
        .enumerate()
        .map(|(i, q)| {
            format!(
                "[{}] {} — {}, paragraphs {}-{}",
                i + 1,
                truncate_display(&q.text, CITATION_SNIPPET_CHARS),
                display_title(&q.cite.book),
                q.cite.paragraph_start,
                q.cite.paragraph_end
            )
        })
        .collect()
}

pub fn no_information_answer() -> ComposedAnswer {
    ComposedAnswer {
        answer: NO_INFORMATION_ANSWER.to_string(),
        quotes: Vec::new(),
        references: Vec::new(),
    }
}

/// Build a grounded answer from retrieved chunks.
///
/// Nothing retrieved, or nothing quotable in what was retrieved, is a normal outcome and
/// yields [`NO_INFORMATION_ANSWER`]. The result has passed quote fidelity and reference
/// alignment checks.
pub fn compose_answer(
    query: &str,
    retrieved: &[RetrievedItem],
    max_quotes: usize,
    cfg: &QuoteScoringConfig,
) -> Result<ComposedAnswer, AppError> {
    if max_quotes == 0 {
        return Err(AppError::new(
            "AI_COMPOSE_FAILED",
            "max_quotes must be greater than zero",
        ));
    }
    if retrieved.is_empty() {
        return Ok(no_information_answer());
    }

    let quotes = select_quotes(query, retrieved, max_quotes, cfg);
    if quotes.is_empty() {
        log::info!("no quotable sentences in {} retrieved chunks", retrieved.len());
        return Ok(no_information_answer());
    }
    enforce_quote_fidelity(&quotes, retrieved)?;

    let answer = synthesize_answer(query, &quotes);
    let references = render_citations(&quotes);
    enforce_reference_alignment(&answer, &references)?;

    log::debug!("composed answer with {} quotes", quotes.len());
    Ok(ComposedAnswer {
        answer,
        quotes,
        references,
    })
}
