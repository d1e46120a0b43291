//! Literal search-term matching over a page's gathered glyphs.
//!
//! Concatenates glyph unicode values in stream order, lowercased, and scans
//! for each term. A match is accepted when the character immediately after it
//! is not a letter or digit (a synthetic space stands in at end of text).
//! The boundary check applies to the trailing edge only; there is no
//! leading-edge check, so "rain" matches inside "train". That looseness is
//! long-standing observed behavior and is kept as-is.

use crate::geometry::Rect;
use crate::glyph::Glyph;
use crate::region::{Region, RegionOrigin};

/// Scan one page's glyphs for every occurrence of every term and synthesize
/// a redaction region per accepted match.
///
/// Distinct matches (including overlaps between different terms) each
/// produce an independent region; nothing is merged. The scan for one term
/// resumes past the end of the previous occurrence. Empty terms are skipped.
pub fn find_term_regions(page: usize, glyphs: &[Glyph], terms: &[String]) -> Vec<Region> {
    let mut regions = Vec::new();
    if glyphs.is_empty() {
        return regions;
    }

    // Lowercased page text as chars, with a parallel map from each char back
    // to the glyph that produced it. One glyph usually yields one char, but
    // ligature unicode mappings and case folding can yield more.
    let mut chars: Vec<char> = Vec::new();
    let mut glyph_at: Vec<usize> = Vec::new();
    for (index, glyph) in glyphs.iter().enumerate() {
        for ch in glyph.unicode.chars() {
            for lower in ch.to_lowercase() {
                chars.push(lower);
                glyph_at.push(index);
            }
        }
    }

    for term in terms {
        let needle: Vec<char> = term.to_lowercase().chars().collect();
        if needle.is_empty() {
            continue;
        }

        let mut offset = find_from(&chars, &needle, 0);
        while let Some(at) = offset {
            let end = at + needle.len();
            // Valid ending of a word? Trailing edge only.
            let following = chars.get(end).copied().unwrap_or(' ');
            if !following.is_ascii_lowercase() && !following.is_ascii_digit() {
                let first = &glyphs[glyph_at[at]];
                let last = &glyphs[glyph_at[end - 1]];
                let w = (last.x - first.x) + last.width;
                let h = first.height * 1.1;
                regions.push(Region::new(
                    page,
                    Rect::new(first.x, first.page_height - first.y, w, h),
                    RegionOrigin::TextMatch,
                ));
            }
            offset = find_from(&chars, &needle, at + needle.len());
        }
    }

    regions
}

/// First occurrence of `needle` in `haystack` at or after `from`.
fn find_from(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&i| haystack[i..i + needle.len()] == *needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE_HEIGHT: f64 = 792.0;

    /// Lay out `text` as one glyph per char, 6pt advance, baseline 100 from
    /// the page top.
    fn glyph_line(text: &str) -> Vec<Glyph> {
        text.chars()
            .enumerate()
            .map(|(i, ch)| Glyph {
                page: 0,
                unicode: ch.to_string(),
                code: ch as u32,
                code_bytes: 1,
                x: 72.0 + i as f64 * 6.0,
                y: 100.0,
                width: 6.0,
                height: 12.0,
                page_height: PAGE_HEIGHT,
            })
            .collect()
    }

    fn terms(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn simple_term_is_found() {
        let glyphs = glyph_line("the earthworks budget");
        let regions = find_term_regions(0, &glyphs, &terms(&["earthworks"]));
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].origin, RegionOrigin::TextMatch);
        assert_eq!(regions[0].page, 0);
    }

    #[test]
    fn match_is_case_insensitive() {
        let glyphs = glyph_line("The EarthWorks Budget");
        let regions = find_term_regions(0, &glyphs, &terms(&["EARTHWORKS"]));
        assert_eq!(regions.len(), 1);
    }

    #[test]
    fn region_geometry_spans_matched_glyphs() {
        let glyphs = glyph_line("abc rain xyz");
        let regions = find_term_regions(0, &glyphs, &terms(&["rain"]));
        assert_eq!(regions.len(), 1);
        let rect = regions[0].rect;
        // "rain" starts at glyph index 4: x = 72 + 4*6 = 96
        assert_eq!(rect.x, 96.0);
        // y = page_height - baseline-from-top
        assert_eq!(rect.y, PAGE_HEIGHT - 100.0);
        // last glyph x = 72 + 7*6 = 114; width = (114 - 96) + 6 = 24
        assert_eq!(rect.w, 24.0);
        // height = first glyph height * 1.1
        assert!((rect.h - 13.2).abs() < 1e-9);
    }

    #[test]
    fn rain_matches_inside_train() {
        // Trailing-edge-only boundary check: the leading 't' does not block
        // the match. Documented, non-strict behavior.
        let glyphs = glyph_line("the train left");
        let regions = find_term_regions(0, &glyphs, &terms(&["rain"]));
        assert_eq!(regions.len(), 1);
    }

    #[test]
    fn trailing_letter_blocks_match() {
        // "farm" inside "farming" ends in a letter: rejected.
        let glyphs = glyph_line("farming news");
        let regions = find_term_regions(0, &glyphs, &terms(&["farm"]));
        assert!(regions.is_empty());
    }

    #[test]
    fn trailing_digit_blocks_match() {
        let glyphs = glyph_line("area51 report");
        let regions = find_term_regions(0, &glyphs, &terms(&["area"]));
        assert!(regions.is_empty());
    }

    #[test]
    fn trailing_punctuation_allows_match() {
        let glyphs = glyph_line("roofing, then walls");
        let regions = find_term_regions(0, &glyphs, &terms(&["roofing"]));
        assert_eq!(regions.len(), 1);
    }

    #[test]
    fn match_at_end_of_text_is_accepted() {
        let glyphs = glyph_line("external");
        let regions = find_term_regions(0, &glyphs, &terms(&["external"]));
        assert_eq!(regions.len(), 1);
    }

    #[test]
    fn every_occurrence_gets_its_own_region() {
        let glyphs = glyph_line("farm and farm and farm");
        let regions = find_term_regions(0, &glyphs, &terms(&["farm"]));
        assert_eq!(regions.len(), 3);
        // Independent regions, not merged: distinct x positions.
        assert!(regions[0].rect.x < regions[1].rect.x);
        assert!(regions[1].rect.x < regions[2].rect.x);
    }

    #[test]
    fn overlapping_terms_each_produce_regions() {
        let glyphs = glyph_line("earthworks");
        let regions = find_term_regions(0, &glyphs, &terms(&["earthworks", "works"]));
        assert_eq!(regions.len(), 2);
    }

    #[test]
    fn empty_term_is_skipped() {
        let glyphs = glyph_line("anything");
        let regions = find_term_regions(0, &glyphs, &terms(&[""]));
        assert!(regions.is_empty());
    }

    #[test]
    fn no_glyphs_no_regions() {
        let regions = find_term_regions(0, &[], &terms(&["farm"]));
        assert!(regions.is_empty());
    }
}
