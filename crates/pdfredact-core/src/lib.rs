//! pdfredact-core: backend-independent data types and matching algorithms.
//!
//! This crate provides the foundational types (Rect, Glyph, Region) and pure
//! algorithms (region matching, search-term matching, rotation remapping)
//! used by pdfredact-rs. It knows nothing about any particular PDF library.

pub mod error;
pub mod geometry;
pub mod glyph;
pub mod region;
pub mod rotation;
pub mod search;

pub use error::RedactError;
pub use geometry::{Matrix, Rect};
pub use glyph::Glyph;
pub use region::{Mode, Region, RegionOrigin, RegionSet};
pub use rotation::{PageGeometry, remap_marker_rect};
pub use search::find_term_regions;
