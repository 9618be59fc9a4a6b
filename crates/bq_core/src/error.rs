use serde::{Deserialize, Serialize};
use std::fmt;

/// Single structured error shape shared by the chunking, retrieval and answering layers.
///
/// `code` is a stable SCREAMING_SNAKE identifier callers can match on; `details` carries
/// paths, counts and underlying error text for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub retryable: bool,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            retryable: false,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Prefix `details` with extra context, keeping whatever was already recorded.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        self.details = Some(match self.details.take() {
            Some(d) => format!("{context}; {d}"),
            None => context,
        });
        self
    }

    /// Load-time integrity failures. A knowledge base that produced one of these must not
    /// serve queries.
    pub fn is_integrity(&self) -> bool {
        matches!(
            self.code.as_str(),
            "INDEX_MISSING" | "INDEX_INTEGRITY_MISMATCH" | "INDEX_TEXT_MISMATCH" | "INDEX_CORRUPT"
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.details {
            Some(d) => write!(f, "[{}] {} ({})", self.code, self.message, d),
            None => write!(f, "[{}] {}", self.code, self.message),
        }
    }
}

impl std::error::Error for AppError {}
