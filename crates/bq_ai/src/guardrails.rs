use bq_core::domain::{Quote, RetrievedItem};
use bq_core::error::AppError;

/// Lead-in written before every reference marker in a synthesized answer.
pub const MARKER_LEAD: &str = "As shown in [";

/// Reference numbers in the order they appear in `answer`.
///
/// A marker is `As shown in [n]`. When it introduces a quote (`: "`), the quoted body is
/// skipped up to the closing `"` that ends the answer or precedes the next marker, so
/// brackets or marker-like text inside a book sentence are never counted. A sentence that
/// itself contains `" As shown in [` still ends the body early.
pub fn extract_reference_markers(answer: &str) -> Vec<usize> {
    let mut out = Vec::new();
    let mut rest = answer;
    while let Some(pos) = rest.find(MARKER_LEAD) {
        rest = &rest[pos + MARKER_LEAD.len()..];
        let digits: &str = match rest.find(|c: char| !c.is_ascii_digit()) {
            Some(end) => &rest[..end],
            None => rest,
        };
        if digits.is_empty() || !rest[digits.len()..].starts_with(']') {
            continue;
        }
        if let Ok(n) = digits.parse::<usize>() {
            out.push(n);
        }
        rest = &rest[digits.len() + 1..];
        if let Some(body) = rest.strip_prefix(QUOTE_OPEN) {
            rest = skip_quoted_body(body);
        }
    }
    out
}

const QUOTE_OPEN: &str = ": \"";

/// Text after the closing quote of a marker's body, or `""` when the body runs to the end.
fn skip_quoted_body(body: &str) -> &str {
    for (i, _) in body.match_indices('"') {
        let after = &body[i + 1..];
        if after.is_empty() {
            return after;
        }
        if let Some(next) = after.strip_prefix(' ') {
            if next.starts_with(MARKER_LEAD) {
                return after;
            }
        }
    }
    ""
}

/// Every `[i]` marker must point at `references[i - 1]`, numbered `1..=len` in order.
pub fn enforce_reference_alignment(answer: &str, references: &[String]) -> Result<(), AppError> {
    let markers = extract_reference_markers(answer);
    if markers.len() != references.len() {
        return Err(AppError::new(
            "AI_CITATION_INVALID",
            "Answer reference markers do not match the reference list",
        )
        .with_details(format!(
            "markers={}; references={}",
            markers.len(),
            references.len()
        )));
    }
    for (pos, (marker, reference)) in markers.iter().zip(references).enumerate() {
        let expected = pos + 1;
        if *marker != expected || !reference.starts_with(&format!("[{expected}] ")) {
            return Err(AppError::new(
                "AI_CITATION_INVALID",
                "Answer reference marker is out of order or unmatched",
            )
            .with_details(format!("position={expected}; marker={marker}")));
        }
    }
    Ok(())
}

/// Every quote must be an exact substring of the retrieved chunk it cites.
pub fn enforce_quote_fidelity(quotes: &[Quote], retrieved: &[RetrievedItem]) -> Result<(), AppError> {
    for q in quotes {
        let verbatim = retrieved
            .iter()
            .filter(|r| r.chunk_id == q.chunk_id)
            .any(|r| r.text.contains(q.text.as_str()));
        if !verbatim {
            return Err(AppError::new(
                "AI_QUOTE_ALTERED",
                "Quote is not verbatim text from its cited chunk",
            )
            .with_details(format!("chunk_id={}", q.chunk_id)));
        }
    }
    Ok(())
}
