//! Rotation-aware remapping of marker rectangles.
//!
//! Marker rectangles are drawn into page content, which is expressed in the
//! page's unrotated coordinate system. A page viewed with `/Rotate` 90, 180,
//! or 270 therefore needs its marker rectangles remapped before drawing so
//! they land where the viewer shows the region.

use crate::geometry::Rect;

/// The page facts the overlay renderer needs: quarter-turn rotation and the
/// media box extent.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageGeometry {
    /// Page rotation in degrees, normalized to 0, 90, 180, or 270.
    pub rotation: i32,
    pub width: f64,
    pub height: f64,
}

impl PageGeometry {
    pub fn new(rotation: i32, width: f64, height: f64) -> Self {
        Self {
            rotation: rotation.rem_euclid(360),
            width,
            height,
        }
    }
}

/// Remap a marker rectangle for the page rotation.
///
/// With `bottom = height − (y + h)` and `left = x`:
/// - 0°: unchanged
/// - 90°: `(bottom, left, h, w)`
/// - 180°: `(width − left − w, bottom, w, h)`
/// - 270°: `(width − bottom, height − left, −h, −w)`
///
/// The 270° arm swaps the extents like the 90° arm does (both quarter turns
/// exchange the axes), negated so the path is traced from the opposite
/// corner.
pub fn remap_marker_rect(rect: &Rect, page: &PageGeometry) -> Rect {
    let bottom = page.height - (rect.y + rect.h);
    let left = rect.x;

    match page.rotation {
        90 => Rect::new(bottom, left, rect.h, rect.w),
        180 => Rect::new(page.width - left - rect.w, bottom, rect.w, rect.h),
        270 => Rect::new(page.width - bottom, page.height - left, -rect.h, -rect.w),
        _ => *rect,
    }
}
