use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AppError;

/// Books the pipeline knows how to cite.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookId {
    Iliad,
    DorianGray,
}

impl BookId {
    pub fn all() -> &'static [BookId] {
        &[BookId::Iliad, BookId::DorianGray]
    }

    /// Parse a user-supplied book id.
    ///
    /// Rejects unknown ids before anything touches the filesystem or network. Matching is
    /// case-insensitive and `-` is accepted in place of `_`.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let norm = raw.trim().to_ascii_lowercase().replace('-', "_");
        for id in Self::all() {
            if id.slug() == norm {
                return Ok(*id);
            }
        }
        let supported = Self::all()
            .iter()
            .map(|b| b.slug())
            .collect::<Vec<_>>()
            .join(", ");
        Err(AppError::new("BOOK_UNSUPPORTED", "Unsupported book id")
            .with_details(format!("book={raw}; supported={supported}")))
    }

    pub fn slug(&self) -> &'static str {
        match self {
            BookId::Iliad => "iliad",
            BookId::DorianGray => "dorian_gray",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            BookId::Iliad => "The Iliad",
            BookId::DorianGray => "The Picture of Dorian Gray",
        }
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Human-readable title for a stored book id; unknown ids are shown as-is.
pub fn display_title(book: &str) -> String {
    match BookId::parse(book) {
        Ok(id) => id.title().to_string(),
        Err(_) => book.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_ids_loosely() {
        assert_eq!(BookId::parse("iliad").unwrap(), BookId::Iliad);
        assert_eq!(BookId::parse(" Dorian-Gray ").unwrap(), BookId::DorianGray);
        assert_eq!(BookId::parse("DORIAN_GRAY").unwrap(), BookId::DorianGray);
    }

    #[test]
    fn rejects_unknown_ids_with_supported_list() {
        let err = BookId::parse("odyssey").unwrap_err();
        assert_eq!(err.code, "BOOK_UNSUPPORTED");
        let details = err.details.unwrap_or_default();
        assert!(details.contains("iliad"));
        assert!(details.contains("dorian_gray"));
    }

    #[test]
    fn display_title_falls_back_to_raw_id() {
        assert_eq!(display_title("iliad"), "The Iliad");
        assert_eq!(display_title("mystery"), "mystery");
    }
}
