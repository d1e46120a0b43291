//! pdfredact: redact or preview redaction of text and images in PDFs.
//!
//! This is the public API facade crate for pdfredact-rs. It ties the
//! backend-independent matching core (pdfredact-core) and the content-stream
//! engine (pdfredact-edit) together into the [`Redactor`] driver.
//!
//! # Architecture
//!
//! - **pdfredact-core**: data types and pure matching/search/rotation
//!   algorithms
//! - **pdfredact-edit**: tokenizer, state machines, the shared traversal
//!   primitive, serializer, fonts, and the gather pass
//! - **pdfredact** (this crate): the redaction decision logic — text-run
//!   splitting, image gating, overlay markers, and the `Redactor` API
//!
//! # Two-pass model
//!
//! `apply` first gathers every page's glyph positions (search matching needs
//! the full page text), then rewrites each page through the same traversal
//! primitive, and finally appends rotation-corrected marker rectangles.

pub mod overlay;
pub mod redactor;
pub mod splitter;

pub use pdfredact_core;
pub use pdfredact_core::{Glyph, Mode, Rect, RedactError, Region, RegionOrigin, RegionSet};
pub use pdfredact_edit;
pub use pdfredact_edit::TextGatherer;
pub use redactor::Redactor;
pub use splitter::TextShowingOp;
