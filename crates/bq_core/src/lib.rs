pub mod books;
pub mod chunking;
pub mod domain;
pub mod error;
pub mod paragraphs;
