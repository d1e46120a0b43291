//! Error types for the redaction engine.
//!
//! Provides [`RedactError`] for fatal conditions. There are no warnings and
//! no retries: the transform is deterministic and offline, so every failure
//! surfaces to the caller, carrying page index and opcode context where one
//! exists. `apply` either fully succeeds or fails as a whole.

use std::fmt;

/// Fatal error raised during redaction.
#[derive(Debug, Clone, PartialEq)]
pub enum RedactError {
    /// An instruction was missing an expected operand or carried one of the
    /// wrong type. Fatal for the page.
    MalformedInstruction {
        /// Zero-based page index.
        page: usize,
        /// The instruction's opcode.
        opcode: String,
        reason: String,
    },
    /// Font metrics could not resolve a character's advance width. Fatal for
    /// the run: guessing a width would visibly misplace the kept glyphs.
    FontMetricUnavailable {
        page: usize,
        opcode: String,
        /// The character code whose width was requested.
        code: u32,
    },
    /// Error reading document structure (pages, resources, fonts, streams).
    Parse(String),
    /// I/O failure opening or closing a page's output sink.
    Io(String),
}

impl fmt::Display for RedactError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedactError::MalformedInstruction {
                page,
                opcode,
                reason,
            } => write!(
                f,
                "malformed instruction on page {page}: {opcode}: {reason}"
            ),
            RedactError::FontMetricUnavailable { page, opcode, code } => write!(
                f,
                "no advance width for character code {code} on page {page} ({opcode})"
            ),
            RedactError::Parse(msg) => write!(f, "parse error: {msg}"),
            RedactError::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for RedactError {}

impl From<std::io::Error> for RedactError {
    fn from(err: std::io::Error) -> Self {
        RedactError::Io(err.to_string())
    }
}
