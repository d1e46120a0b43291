//! Page-scoped redaction regions and the matching predicates applied to
//! glyphs and image placements.

use crate::geometry::Rect;
use crate::glyph::Glyph;

/// Destructive removal versus non-destructive marking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mode {
    /// Remove matched text and images; draw opaque black rectangles.
    Redact,
    /// Leave text untouched; draw red outlines where redaction would occur.
    /// Image matching still runs in this mode.
    Preview,
}

/// How a region came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RegionOrigin {
    /// Supplied by the caller via `add_region`.
    User,
    /// Synthesized from a search-term match.
    TextMatch,
}

/// A rectangle to redact on one specific page.
///
/// A match test against a region on a different page is always false.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Region {
    pub page: usize,
    pub rect: Rect,
    pub origin: RegionOrigin,
}

impl Region {
    pub fn new(page: usize, rect: Rect, origin: RegionOrigin) -> Self {
        Self { page, rect, origin }
    }
}

/// The full set of regions for a document, plus the processing mode.
///
/// Matching is a pure function of (geometry, page, region set, mode):
/// identical inputs always yield identical decisions.
#[derive(Debug, Clone)]
pub struct RegionSet {
    mode: Mode,
    regions: Vec<Region>,
}

impl RegionSet {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            regions: Vec::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn push(&mut self, region: Region) {
        self.regions.push(region);
    }

    pub fn extend(&mut self, regions: impl IntoIterator<Item = Region>) {
        self.regions.extend(regions);
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Iterate the regions scoped to one page.
    pub fn for_page(&self, page: usize) -> impl Iterator<Item = &Region> {
        self.regions.iter().filter(move |r| r.page == page)
    }

    /// Does any region redact this glyph?
    ///
    /// True when a same-page region either overlaps the glyph's box or
    /// contains its trailing-edge point `(x + width, y)`. The glyph's
    /// baseline is flipped through the page height to the coordinate space
    /// the regions are tested in.
    ///
    /// In preview mode this is unconditionally false: text is never removed,
    /// only marked.
    pub fn glyph_matches(&self, glyph: &Glyph) -> bool {
        if self.mode == Mode::Preview {
            return false;
        }

        let flipped_y = glyph.page_height - glyph.y;
        let glyph_box = Rect::new(glyph.x, flipped_y, glyph.width, glyph.height);
        self.for_page(glyph.page).any(|region| {
            region.rect.intersects(&glyph_box)
                || region.rect.contains_point(glyph.x + glyph.width, flipped_y)
        })
    }

    /// Does any region suppress an image placed at `placement` on `page`?
    ///
    /// The region must intersect the placement box, and the box must not
    /// contain the region. The containment check is deliberately one-sided:
    /// a region inside an image suppresses it, but an oversized image that
    /// fully encloses a region is only suppressed when containment fails.
    /// Runs in both modes.
    pub fn image_matches(&self, page: usize, placement: &Rect) -> bool {
        self.for_page(page)
            .any(|region| region.rect.intersects(placement) && !placement.contains_rect(&region.rect))
    }
}
