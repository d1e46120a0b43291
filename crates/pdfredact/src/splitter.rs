//! Rewriting of partially-redacted text-showing instructions.
//!
//! A text-showing instruction whose glyphs are only partly redacted cannot
//! simply be dropped: the kept glyphs must stay at their original visual
//! positions. The splitter rewrites the instruction into a positioning-array
//! (`TJ`) equivalent: removed glyphs contribute their negative advance width
//! to a pending offset, and the offset is flushed as a numeric operand
//! immediately before the next kept run (or at the end), so everything after
//! a removed run lands exactly where it used to.
//!
//! Three instruction shapes are handled: a fixed single string (`Tj`), a
//! positioning array (`TJ`), and show-with-line-advance (`'`, which emits an
//! explicit `T*` first and then reduces to the fixed-string case). Any other
//! text-showing opcode with a matching glyph is dropped wholesale; no
//! partial preservation is attempted for shapes whose operand layout the
//! splitter does not model.

use pdfredact_core::{Glyph, RedactError, RegionSet};
use pdfredact_edit::font::FontInfo;
use pdfredact_edit::tokenizer::{Operand, Operator};
use pdfredact_edit::writer::ContentSink;

/// The text-showing opcodes, as a closed enumeration. Anything else is
/// pass-through for the interception engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextShowingOp {
    /// `Tj`: show one string.
    Fixed,
    /// `TJ`: show strings with positioning adjustments.
    Adjusted,
    /// `'`: advance a line, then show one string.
    Line,
    /// `"`: set spacing, advance a line, then show. Not rewritten; dropped
    /// wholesale when any glyph matches.
    LineAndSpace,
}

impl TextShowingOp {
    pub fn classify(opcode: &str) -> Option<Self> {
        match opcode {
            "Tj" => Some(Self::Fixed),
            "TJ" => Some(Self::Adjusted),
            "'" => Some(Self::Line),
            "\"" => Some(Self::LineAndSpace),
            _ => None,
        }
    }
}

/// Rewrite a mixed-disposition text-showing instruction, emitting a single
/// adjusted-array (`TJ`) instruction that preserves only the non-matching
/// glyphs.
///
/// `elements` are the positioning-array elements: for the fixed-string
/// shapes this is just the instruction's operand list (a one-string array in
/// effect), for `TJ` it is the contents of the array operand. `glyphs` is
/// the instruction's aligned glyph list, with the same count and order as
/// the character codes across the string elements.
pub fn rewrite_kept_runs(
    sink: &mut ContentSink,
    elements: &[Operand],
    glyphs: &[Glyph],
    regions: &RegionSet,
    font: &FontInfo,
    page: usize,
    opcode: &str,
) -> Result<(), RedactError> {
    let mut rewritten: Vec<Operand> = Vec::new();
    let mut glyph_index = 0usize;
    let mut offset = 0.0f64;

    for element in elements {
        if let Some(adjustment) = element.as_number() {
            // Source adjustments fold into the running offset.
            offset += adjustment;
        } else if let Some(bytes) = element.as_string_bytes() {
            let codes = font.decode_codes(bytes);
            let mut from = 0usize;
            while from < codes.len() {
                let glyph = glyphs.get(glyph_index).ok_or_else(|| misaligned(page, opcode))?;

                if regions.glyph_matches(glyph) {
                    // Removed: the glyph paints nothing and occupies zero
                    // width; compensate with its negative advance.
                    let width = font.width(glyph.code).ok_or_else(|| {
                        RedactError::FontMetricUnavailable {
                            page,
                            opcode: opcode.to_string(),
                            code: glyph.code,
                        }
                    })?;
                    offset -= width;
                    from += 1;
                    glyph_index += 1;
                } else {
                    if offset != 0.0 {
                        rewritten.push(Operand::Real(offset));
                        offset = 0.0;
                    }

                    // Maximal run of consecutive kept codes, re-encoded
                    // big-endian at the font's code width.
                    let mut run = Vec::new();
                    while from < codes.len() {
                        let glyph = glyphs.get(glyph_index).ok_or_else(|| misaligned(page, opcode))?;
                        if regions.glyph_matches(glyph) {
                            break;
                        }
                        font.encode_code(glyph.code, &mut run);
                        from += 1;
                        glyph_index += 1;
                    }
                    rewritten.push(Operand::LiteralString(run));
                }
            }
        }
    }

    // Flush a trailing offset so the instruction's net advance still matches
    // the original; later relatively-positioned text depends on it.
    if offset != 0.0 {
        rewritten.push(Operand::Real(offset));
    }

    sink.write_operator(&Operator::with_operands(
        "TJ",
        vec![Operand::Array(rewritten)],
    ));
    Ok(())
}

fn misaligned(page: usize, opcode: &str) -> RedactError {
    RedactError::MalformedInstruction {
        page,
        opcode: opcode.to_string(),
        reason: "glyph list out of step with string operands".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfredact_core::{Mode, Rect, Region, RegionOrigin};
    use pdfredact_edit::font::extract_font_info;
    use pdfredact_edit::tokenizer::tokenize;
    use lopdf::{Object, dictionary};

    const PAGE_HEIGHT: f64 = 792.0;

    /// Fixed-width (600 units) single-byte font over codes 32..=126.
    fn test_font() -> FontInfo {
        let doc = lopdf::Document::with_version("1.5");
        let widths: Vec<Object> = (32..=126).map(|_| Object::Integer(600)).collect();
        let dict = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "FirstChar" => 32,
            "LastChar" => 126,
            "Widths" => widths,
        };
        extract_font_info(&doc, &dict).unwrap()
    }

    /// Two-byte CID font: every code 700 units wide.
    fn cid_font() -> FontInfo {
        let mut doc = lopdf::Document::with_version("1.5");
        let descendant = doc.add_object(dictionary! {
            "Subtype" => "CIDFontType2",
            "DW" => 700,
        });
        let dict = dictionary! {
            "Subtype" => "Type0",
            "BaseFont" => "Ident",
            "DescendantFonts" => vec![Object::Reference(descendant)],
        };
        extract_font_info(&doc, &dict).unwrap()
    }

    /// One glyph per code, 10pt apart starting at x=0, baseline 100.
    fn glyph_row(codes: &[u32], code_bytes: u8) -> Vec<Glyph> {
        codes
            .iter()
            .enumerate()
            .map(|(i, &code)| Glyph {
                page: 0,
                unicode: char::from_u32(code).unwrap_or('\u{FFFD}').to_string(),
                code,
                code_bytes,
                x: i as f64 * 10.0,
                y: 100.0,
                width: 10.0,
                height: 10.0,
                page_height: PAGE_HEIGHT,
            })
            .collect()
    }

    /// Region set matching glyphs whose index is in `indices` (by x band).
    fn regions_matching(indices: &[usize]) -> RegionSet {
        let mut set = RegionSet::new(Mode::Redact);
        for &i in indices {
            let x = i as f64 * 10.0;
            set.push(Region::new(
                0,
                Rect::new(x + 1.0, PAGE_HEIGHT - 100.0, 8.0, 10.0),
                RegionOrigin::User,
            ));
        }
        set
    }

    fn rewrite(
        elements: &[Operand],
        glyphs: &[Glyph],
        set: &RegionSet,
        font: &FontInfo,
    ) -> Vec<Operand> {
        let mut sink = ContentSink::new();
        rewrite_kept_runs(&mut sink, elements, glyphs, set, font, 0, "TJ").unwrap();
        let bytes = sink.finish();
        let ops = tokenize(&bytes).unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].name, "TJ");
        let Operand::Array(elements) = &ops[0].operands[0] else {
            panic!("expected a single array operand");
        };
        elements.clone()
    }

    #[test]
    fn classify_covers_the_closed_set() {
        assert_eq!(TextShowingOp::classify("Tj"), Some(TextShowingOp::Fixed));
        assert_eq!(TextShowingOp::classify("TJ"), Some(TextShowingOp::Adjusted));
        assert_eq!(TextShowingOp::classify("'"), Some(TextShowingOp::Line));
        assert_eq!(
            TextShowingOp::classify("\""),
            Some(TextShowingOp::LineAndSpace)
        );
        assert_eq!(TextShowingOp::classify("Td"), None);
        assert_eq!(TextShowingOp::classify("Do"), None);
    }

    #[test]
    fn removed_prefix_becomes_leading_offset() {
        // "ABCD": remove A, B; keep C, D.
        let glyphs = glyph_row(&[65, 66, 67, 68], 1);
        let set = regions_matching(&[0, 1]);
        let out = rewrite(
            &[Operand::LiteralString(b"ABCD".to_vec())],
            &glyphs,
            &set,
            &test_font(),
        );
        assert_eq!(
            out,
            vec![
                Operand::Integer(-1200),
                Operand::LiteralString(b"CD".to_vec()),
            ]
        );
    }

    #[test]
    fn removed_middle_splits_the_string() {
        // "ABCD": remove B, C.
        let glyphs = glyph_row(&[65, 66, 67, 68], 1);
        let set = regions_matching(&[1, 2]);
        let out = rewrite(
            &[Operand::LiteralString(b"ABCD".to_vec())],
            &glyphs,
            &set,
            &test_font(),
        );
        assert_eq!(
            out,
            vec![
                Operand::LiteralString(b"A".to_vec()),
                Operand::Integer(-1200),
                Operand::LiteralString(b"D".to_vec()),
            ]
        );
    }

    #[test]
    fn removed_suffix_flushes_trailing_offset() {
        // "ABCD": remove C, D. The trailing offset keeps the net advance of
        // the instruction equal to the original.
        let glyphs = glyph_row(&[65, 66, 67, 68], 1);
        let set = regions_matching(&[2, 3]);
        let out = rewrite(
            &[Operand::LiteralString(b"ABCD".to_vec())],
            &glyphs,
            &set,
            &test_font(),
        );
        assert_eq!(
            out,
            vec![
                Operand::LiteralString(b"AB".to_vec()),
                Operand::Integer(-1200),
            ]
        );
    }

    #[test]
    fn source_adjustments_fold_into_offset() {
        // [(AB) -50 (CD)]: remove B and C. The -50 joins B's and C's
        // compensation in one flushed number.
        let glyphs = glyph_row(&[65, 66, 67, 68], 1);
        let set = regions_matching(&[1, 2]);
        let out = rewrite(
            &[
                Operand::LiteralString(b"AB".to_vec()),
                Operand::Integer(-50),
                Operand::LiteralString(b"CD".to_vec()),
            ],
            &glyphs,
            &set,
            &test_font(),
        );
        assert_eq!(
            out,
            vec![
                Operand::LiteralString(b"A".to_vec()),
                Operand::Integer(-1250),
                Operand::LiteralString(b"D".to_vec()),
            ]
        );
    }

    #[test]
    fn kept_adjustment_between_kept_strings_is_preserved() {
        // [(A) -80 (B)] with nothing after the adjustment removed: the -80
        // flushes before B's run.
        let glyphs = glyph_row(&[65, 66], 1);
        let set = regions_matching(&[]);
        let mut set_with_unrelated = set;
        // A region on another page must change nothing.
        set_with_unrelated.push(Region::new(
            3,
            Rect::new(0.0, 0.0, 1000.0, 1000.0),
            RegionOrigin::User,
        ));
        let out = rewrite(
            &[
                Operand::LiteralString(b"A".to_vec()),
                Operand::Integer(-80),
                Operand::LiteralString(b"B".to_vec()),
            ],
            &glyphs,
            &set_with_unrelated,
            &test_font(),
        );
        assert_eq!(
            out,
            vec![
                Operand::LiteralString(b"A".to_vec()),
                Operand::Integer(-80),
                Operand::LiteralString(b"B".to_vec()),
            ]
        );
    }

    #[test]
    fn fully_removed_string_element_vanishes_into_offset() {
        // [(AB) (CD)]: remove all of "AB"; "CD" survives behind one offset.
        let glyphs = glyph_row(&[65, 66, 67, 68], 1);
        let set = regions_matching(&[0, 1]);
        let out = rewrite(
            &[
                Operand::LiteralString(b"AB".to_vec()),
                Operand::LiteralString(b"CD".to_vec()),
            ],
            &glyphs,
            &set,
            &test_font(),
        );
        assert_eq!(
            out,
            vec![
                Operand::Integer(-1200),
                Operand::LiteralString(b"CD".to_vec()),
            ]
        );
    }

    #[test]
    fn two_byte_codes_reencode_big_endian() {
        let glyphs = glyph_row(&[0x0102, 0x0203, 0x0304], 2);
        let set = regions_matching(&[1]);
        let out = rewrite(
            &[Operand::LiteralString(vec![0x01, 0x02, 0x02, 0x03, 0x03, 0x04])],
            &glyphs,
            &set,
            &cid_font(),
        );
        assert_eq!(
            out,
            vec![
                Operand::LiteralString(vec![0x01, 0x02]),
                Operand::Integer(-700),
                Operand::LiteralString(vec![0x03, 0x04]),
            ]
        );
    }

    #[test]
    fn misaligned_glyph_list_is_malformed() {
        let glyphs = glyph_row(&[65], 1); // one glyph, two codes
        let set = regions_matching(&[]);
        let mut sink = ContentSink::new();
        let err = rewrite_kept_runs(
            &mut sink,
            &[Operand::LiteralString(b"AB".to_vec())],
            &glyphs,
            &set,
            &test_font(),
            4,
            "TJ",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RedactError::MalformedInstruction { page: 4, .. }
        ));
    }

    #[test]
    fn unresolvable_width_of_removed_glyph_is_fatal() {
        // Glyph code outside the widths table, and it matches a region: its
        // advance cannot be compensated, so the rewrite must fail rather
        // than guess.
        let mut glyphs = glyph_row(&[65, 66], 1);
        glyphs[0].code = 5; // outside 32..=126
        let set = regions_matching(&[0]);
        let mut sink = ContentSink::new();
        let err = rewrite_kept_runs(
            &mut sink,
            &[Operand::LiteralString(vec![5, 66])],
            &glyphs,
            &set,
            &test_font(),
            0,
            "Tj",
        )
        .unwrap_err();
        assert_eq!(
            err,
            RedactError::FontMetricUnavailable {
                page: 0,
                opcode: "Tj".to_string(),
                code: 5,
            }
        );
    }
}
