//! Marker drawing appended after the rewrite.
//!
//! For every region on a page, a rotation-remapped rectangle is drawn into
//! an appended drawing context. Redact mode paints opaque black rectangles
//! (fill after each region, one stroke call at the end); preview mode draws
//! red outlines only, leaving the original content visible beneath.

use pdfredact_core::{Mode, PageGeometry, Rect, RegionSet, remap_marker_rect};
use pdfredact_edit::tokenizer::{Operand, Operator};
use pdfredact_edit::writer::ContentSink;

fn number(value: f64) -> Operand {
    Operand::Real(value)
}

fn path_op(name: &str, coords: &[f64]) -> Operator {
    Operator::with_operands(name, coords.iter().map(|&c| number(c)).collect())
}

/// Emit a closed 4-segment rectangular path.
fn draw_rect(sink: &mut ContentSink, rect: &Rect) {
    sink.write_operator(&path_op("m", &[rect.x, rect.y]));
    sink.write_operator(&path_op("l", &[rect.x, rect.y + rect.h]));
    sink.write_operator(&path_op("l", &[rect.x + rect.w, rect.y + rect.h]));
    sink.write_operator(&path_op("l", &[rect.x + rect.w, rect.y]));
    sink.write_operator(&path_op("l", &[rect.x, rect.y]));
}

/// Render the markers for one page and append them to its rewritten
/// content.
pub fn append_markers(
    content: &mut Vec<u8>,
    regions: &RegionSet,
    page: usize,
    geometry: &PageGeometry,
    mode: Mode,
) {
    let mut sink = ContentSink::new();

    match mode {
        Mode::Redact => {
            // Black stroke; each region is filled as soon as its path is
            // complete, then one stroke call closes out the sequence.
            sink.write_operator(&path_op("RG", &[0.0, 0.0, 0.0]));
            for region in regions.for_page(page) {
                let rect = remap_marker_rect(&region.rect, geometry);
                draw_rect(&mut sink, &rect);
                sink.write_operator(&Operator::new("f"));
            }
            sink.write_operator(&Operator::new("S"));
        }
        Mode::Preview => {
            // Red outlines only; the content below stays visible.
            sink.write_operator(&path_op("RG", &[1.0, 0.0, 0.0]));
            for region in regions.for_page(page) {
                let rect = remap_marker_rect(&region.rect, geometry);
                draw_rect(&mut sink, &rect);
            }
            sink.write_operator(&Operator::new("S"));
        }
    }

    content.push(b'\n');
    content.extend_from_slice(&sink.finish());
}
