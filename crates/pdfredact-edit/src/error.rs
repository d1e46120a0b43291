//! Error types for the content-stream editing layer.
//!
//! Uses [`thiserror`] for ergonomic error derivation. Provides [`EditError`]
//! that wraps lopdf-facing failures and converts to the crate-wide
//! [`RedactError`] for unified handling.

use pdfredact_core::RedactError;
use thiserror::Error;

/// Error type for content-stream editing operations.
#[derive(Debug, Error)]
pub enum EditError {
    /// Error reading document structure (pages, streams, resources).
    #[error("PDF parse error: {0}")]
    Parse(String),

    /// Error tokenizing a content stream.
    #[error("content stream error: {0}")]
    Content(String),

    /// Error resolving font information.
    #[error("font error: {0}")]
    Font(String),

    /// Error writing to a page's output sink.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A core library error.
    #[error(transparent)]
    Core(#[from] RedactError),
}

impl From<EditError> for RedactError {
    fn from(err: EditError) -> Self {
        match err {
            EditError::Parse(msg) => RedactError::Parse(msg),
            EditError::Content(msg) => RedactError::Parse(msg),
            EditError::Font(msg) => RedactError::Parse(msg),
            EditError::Io(e) => RedactError::Io(e.to_string()),
            EditError::Core(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_display() {
        let err = EditError::Parse("missing /Contents".to_string());
        assert_eq!(err.to_string(), "PDF parse error: missing /Contents");
    }

    #[test]
    fn io_error_from_std() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: EditError = io.into();
        assert!(matches!(err, EditError::Io(_)));
    }

    #[test]
    fn core_error_passes_through() {
        let core = RedactError::FontMetricUnavailable {
            page: 0,
            opcode: "Tj".to_string(),
            code: 12,
        };
        let err: EditError = core.clone().into();
        let back: RedactError = err.into();
        assert_eq!(back, core);
    }

    #[test]
    fn content_error_converts_to_parse() {
        let err = EditError::Content("bad token".to_string());
        let core: RedactError = err.into();
        assert_eq!(core, RedactError::Parse("bad token".to_string()));
    }
}
