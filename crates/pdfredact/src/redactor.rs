//! The redaction driver: regions, search terms, and the two-pass apply.
//!
//! Usage:
//! ```no_run
//! # fn main() -> Result<(), pdfredact_core::RedactError> {
//! use pdfredact::{Mode, Redactor};
//!
//! let mut doc = lopdf::Document::load("in.pdf")
//!     .map_err(|e| pdfredact_core::RedactError::Parse(e.to_string()))?;
//! let mut redactor = Redactor::new(Mode::Redact);
//! redactor.add_region(0, 100.0, 100.0, 200.0, 200.0);
//! redactor.set_text_redaction_list(["earthworks", "roofing", "farm"]);
//! redactor.apply(&mut doc)?;
//! doc.save("out.pdf").map_err(|e| pdfredact_core::RedactError::Io(e.to_string()))?;
//! # Ok(())
//! # }
//! ```
//!
//! Loading and saving the document stay with the caller; `apply` only
//! transforms page content in place.

use pdfredact_core::{
    Glyph, Mode, Rect, RedactError, Region, RegionOrigin, RegionSet, find_term_regions,
};
use pdfredact_edit::editor::{EditContext, EditHandler, StreamEditor, replace_page_content};
use pdfredact_edit::gatherer::TextGatherer;
use pdfredact_edit::tokenizer::{Operand, Operator};
use pdfredact_edit::writer::ContentSink;

use crate::overlay;
use crate::splitter::{TextShowingOp, rewrite_kept_runs};

/// Redacts (or previews redaction of) text and images in a PDF.
pub struct Redactor {
    mode: Mode,
    user_regions: Vec<Region>,
    terms: Vec<String>,
}

impl Redactor {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            user_regions: Vec::new(),
            terms: Vec::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Add a rectangular region to redact: `(x, y)` is the top-left corner
    /// in top-down page coordinates, `w`/`h` the extent.
    pub fn add_region(&mut self, page: usize, x: f64, y: f64, w: f64, h: f64) {
        self.user_regions
            .push(Region::new(page, Rect::new(x, y, w, h), RegionOrigin::User));
    }

    /// Add literal search terms; every occurrence on any page is redacted.
    pub fn set_text_redaction_list<I, S>(&mut self, terms: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.terms.extend(terms.into_iter().map(Into::into));
    }

    /// The caller-supplied regions added so far.
    pub fn regions(&self) -> &[Region] {
        &self.user_regions
    }

    /// Run the redaction: gather glyphs over the whole document, synthesize
    /// search regions, then rewrite each page and append its markers.
    ///
    /// All pages complete the gather pass before any page is rewritten;
    /// search matching needs full-page text. Pages are strictly sequential;
    /// there is no partial success. On error nothing further is committed,
    /// and the page being processed keeps its original content.
    pub fn apply(&self, doc: &mut lopdf::Document) -> Result<(), RedactError> {
        let gatherer = TextGatherer::gather(doc).map_err(RedactError::from)?;

        let mut regions = RegionSet::new(self.mode);
        regions.extend(self.user_regions.iter().cloned());

        let page_count = StreamEditor::new(doc).page_count();
        for page in 0..page_count {
            regions.extend(find_term_regions(
                page,
                gatherer.glyphs_for_page(page),
                &self.terms,
            ));
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            pages = page_count,
            regions = regions.regions().len(),
            "rewriting document"
        );

        for page in 0..page_count {
            let (mut content, geometry) = {
                let editor = StreamEditor::new(doc);
                let geometry = editor.page_geometry(page).map_err(RedactError::from)?;
                let mut pass = RedactionPass::new(&regions);
                let content = editor
                    .process_page(page, &mut pass)
                    .map_err(RedactError::from)?;
                (content, geometry)
            };

            overlay::append_markers(&mut content, &regions, page, &geometry, self.mode);
            replace_page_content(doc, page, content).map_err(RedactError::from)?;
        }

        Ok(())
    }
}

/// The rewrite-pass handler: decides, per instruction, between pass-through,
/// suppression, and splitter rewrite, and gates image draws.
struct RedactionPass<'a> {
    regions: &'a RegionSet,
    /// Glyphs painted by the current instruction. Reset at instruction
    /// entry; never carried across instructions.
    instruction_glyphs: Vec<Glyph>,
    /// Names of XObjects whose placement matched a region. Cleared once per
    /// page, since one resource may be drawn several times on the same page.
    suppressed_xobjects: Vec<String>,
    page: usize,
}

impl<'a> RedactionPass<'a> {
    fn new(regions: &'a RegionSet) -> Self {
        Self {
            regions,
            instruction_glyphs: Vec::new(),
            suppressed_xobjects: Vec::new(),
            page: 0,
        }
    }
}

impl EditHandler for RedactionPass<'_> {
    fn begin_page(&mut self, page: usize, _geometry: &pdfredact_core::PageGeometry) {
        self.page = page;
        self.suppressed_xobjects.clear();
        self.instruction_glyphs.clear();
    }

    fn next_operation(&mut self, _op: &Operator) {
        self.instruction_glyphs.clear();
    }

    fn on_glyph(&mut self, glyph: Glyph) {
        self.instruction_glyphs.push(glyph);
    }

    fn on_xobject(&mut self, name: &str, placement: Rect) {
        if self.regions.image_matches(self.page, &placement)
            && !self.suppressed_xobjects.iter().any(|n| n == name)
        {
            #[cfg(feature = "tracing")]
            tracing::debug!(page = self.page, name, "suppressing XObject draw");
            self.suppressed_xobjects.push(name.to_string());
        }
    }

    fn write(
        &mut self,
        sink: &mut ContentSink,
        op: &Operator,
        ctx: &EditContext<'_>,
    ) -> Result<(), RedactError> {
        if let Some(shape) = TextShowingOp::classify(&op.name) {
            let mut has_removed = false;
            let mut has_kept = false;
            for glyph in &self.instruction_glyphs {
                if self.regions.glyph_matches(glyph) {
                    has_removed = true;
                } else {
                    has_kept = true;
                }
            }

            if has_removed {
                if !has_kept {
                    // Every glyph matched: the instruction vanishes.
                    return Ok(());
                }

                let font = ctx.font.ok_or_else(|| RedactError::MalformedInstruction {
                    page: ctx.page,
                    opcode: op.name.clone(),
                    reason: "no font selected for text-showing instruction".to_string(),
                })?;

                let elements: &[Operand] = match shape {
                    // A fixed string is the one-element-array case.
                    TextShowingOp::Fixed => &op.operands,
                    TextShowingOp::Adjusted => match op.operands.first() {
                        Some(Operand::Array(elements)) => elements,
                        _ => {
                            return Err(RedactError::MalformedInstruction {
                                page: ctx.page,
                                opcode: op.name.clone(),
                                reason: "expected a positioning array operand".to_string(),
                            });
                        }
                    },
                    TextShowingOp::Line => {
                        // Advance the line explicitly, then rewrite the rest
                        // as a fixed string.
                        sink.write_operator(&Operator::new("T*"));
                        &op.operands
                    }
                    // No partial preservation for shapes the splitter does
                    // not model: drop the instruction wholesale.
                    TextShowingOp::LineAndSpace => return Ok(()),
                };

                return rewrite_kept_runs(
                    sink,
                    elements,
                    &self.instruction_glyphs,
                    self.regions,
                    font,
                    ctx.page,
                    &op.name,
                );
            }
        } else if op.name == "Do" {
            match op.operands.first() {
                Some(Operand::Name(name)) => {
                    if self.suppressed_xobjects.iter().any(|n| n == name) {
                        return Ok(());
                    }
                }
                // A Do whose operand is not a name paints nothing sensible;
                // drop it.
                _ => return Ok(()),
            }
        }

        sink.write_operator(op);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redactor_accumulates_regions_and_terms() {
        let mut redactor = Redactor::new(Mode::Redact);
        redactor.add_region(0, 10.0, 10.0, 100.0, 100.0);
        redactor.add_region(2, 5.0, 5.0, 50.0, 50.0);
        redactor.set_text_redaction_list(["alpha", "beta"]);
        redactor.set_text_redaction_list(["gamma"]);

        assert_eq!(redactor.regions().len(), 2);
        assert_eq!(redactor.regions()[0].page, 0);
        assert_eq!(redactor.regions()[1].page, 2);
        assert_eq!(redactor.regions()[1].rect, Rect::new(5.0, 5.0, 50.0, 50.0));
        assert!(
            redactor
                .regions()
                .iter()
                .all(|r| r.origin == RegionOrigin::User)
        );
        assert_eq!(redactor.terms, ["alpha", "beta", "gamma"]);
        assert_eq!(redactor.mode(), Mode::Redact);
    }
}
