//! pdfredact-edit: the lopdf-facing content-stream layer of pdfredact-rs.
//!
//! Implements tokenization, the graphics/text state machines, the
//! [`StreamEditor`] traversal primitive with its pluggable [`EditHandler`]
//! hooks, the deterministic serializer, font metrics, and the read-only
//! [`TextGatherer`] pass. It depends on pdfredact-core for shared data types
//! and contains no redaction policy of its own.

pub mod editor;
pub mod error;
pub mod font;
pub mod gatherer;
pub mod state;
pub mod tokenizer;
pub mod writer;

pub use editor::{EditContext, EditHandler, StreamEditor, replace_page_content};
pub use error::EditError;
pub use font::{FontInfo, extract_font_info};
pub use gatherer::TextGatherer;
pub use pdfredact_core;
pub use tokenizer::{Operand, Operator, tokenize};
pub use writer::ContentSink;
