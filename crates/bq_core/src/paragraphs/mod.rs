/// Split cleaned book text into paragraphs on blank-line boundaries.
///
/// Line endings are normalized first; blocks are trimmed and empty blocks dropped.
pub fn split_into_paragraphs(cleaned: &str) -> Vec<String> {
    normalize_text(cleaned)
        .split("\n\n")
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(|p| p.to_string())
        .collect()
}

pub fn normalize_text(s: &str) -> String {
    s.replace("\r\n", "\n").replace('\r', "\n")
}
