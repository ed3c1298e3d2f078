//! Error types for the USLM parser and its archive source.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    /// The reader could not tokenize the input.
    #[error("Malformed XML at byte {position}: {message}")]
    MalformedXml { position: u64, message: String },

    /// A DTD declaration was found. DTDs and external entities are never processed.
    #[error("Security violation: {0}")]
    SecurityViolation(String),

    /// The stream ended while elements were still open.
    #[error("Unexpected end of stream: {open_elements} element(s) still open (in section: {in_section})")]
    UnexpectedEndOfStream { open_elements: usize, in_section: bool },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse cancelled after {sections_emitted} section(s)")]
    Cancelled { sections_emitted: usize },

    #[error("ZIP archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// The source bytes do not start with a ZIP header (e.g. an HTML error page).
    #[error("Source is not a ZIP archive")]
    NotAnArchive,

    #[error("No XML entry found in archive")]
    MissingXmlEntry,
}

impl ParseError {
    pub(crate) fn malformed(position: u64, err: impl std::fmt::Display) -> Self {
        ParseError::MalformedXml {
            position,
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;
