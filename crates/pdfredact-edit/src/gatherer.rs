//! Read-only gather pass: glyph positions for every page.
//!
//! Search-term matching needs the full page text before any region can be
//! synthesized, so gathering runs over the whole document before any page is
//! rewritten. The gatherer is an [`EditHandler`] over the same
//! [`StreamEditor`] the rewrite pass uses; its write-hook output is
//! discarded.

use std::collections::BTreeMap;

use pdfredact_core::Glyph;

use crate::editor::{EditHandler, StreamEditor};
use crate::error::EditError;

/// Ordered glyph lists per page, collected before redaction decisions exist.
#[derive(Debug, Default)]
pub struct TextGatherer {
    by_page: BTreeMap<usize, Vec<Glyph>>,
}

impl TextGatherer {
    /// Run the gather pass over every page of a document.
    pub fn gather(doc: &lopdf::Document) -> Result<Self, EditError> {
        let editor = StreamEditor::new(doc);
        let mut gatherer = TextGatherer::default();
        for page in 0..editor.page_count() {
            // The rewritten bytes of a read-only pass are discarded.
            editor.process_page(page, &mut gatherer)?;
        }
        Ok(gatherer)
    }

    /// The glyphs of a page in stream paint order. Empty for pages with no
    /// text (or out-of-range indexes).
    pub fn glyphs_for_page(&self, page: usize) -> &[Glyph] {
        self.by_page.get(&page).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The page's text: glyph unicode values concatenated in stream order.
    pub fn page_text(&self, page: usize) -> String {
        self.glyphs_for_page(page)
            .iter()
            .map(|g| g.unicode.as_str())
            .collect()
    }
}

impl EditHandler for TextGatherer {
    fn on_glyph(&mut self, glyph: Glyph) {
        self.by_page.entry(glyph.page).or_default().push(glyph);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Object, Stream, dictionary};

    /// Multi-page document, one text line per page.
    fn doc_with_pages(texts: &[&str]) -> lopdf::Document {
        let mut doc = lopdf::Document::with_version("1.5");

        let widths: Vec<Object> = (32..=126).map(|_| Object::Integer(600)).collect();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "FirstChar" => 32,
            "LastChar" => 126,
            "Widths" => widths,
        });

        let mut kids = Vec::new();
        let mut page_ids = Vec::new();
        for text in texts {
            let content = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Contents" => Object::Reference(content_id),
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => Object::Reference(font_id) },
                },
            });
            kids.push(Object::Reference(page_id));
            page_ids.push(page_id);
        }

        let count = kids.len() as i64;
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        });
        for page_id in page_ids {
            if let Ok(dict) = doc.get_object_mut(page_id).and_then(|o| o.as_dict_mut()) {
                dict.set("Parent", Object::Reference(pages_id));
            }
        }
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc
    }

    #[test]
    fn gathers_text_per_page() {
        let doc = doc_with_pages(&["first page", "second page"]);
        let gatherer = TextGatherer::gather(&doc).unwrap();
        assert_eq!(gatherer.page_text(0), "first page");
        assert_eq!(gatherer.page_text(1), "second page");
        assert_eq!(gatherer.page_text(2), "");
    }

    #[test]
    fn glyphs_carry_page_index() {
        let doc = doc_with_pages(&["ab", "cd"]);
        let gatherer = TextGatherer::gather(&doc).unwrap();
        assert!(gatherer.glyphs_for_page(0).iter().all(|g| g.page == 0));
        assert!(gatherer.glyphs_for_page(1).iter().all(|g| g.page == 1));
        assert_eq!(gatherer.glyphs_for_page(0).len(), 2);
    }

    #[test]
    fn glyphs_keep_stream_order() {
        let doc = doc_with_pages(&["zyx"]);
        let gatherer = TextGatherer::gather(&doc).unwrap();
        let text: Vec<&str> = gatherer
            .glyphs_for_page(0)
            .iter()
            .map(|g| g.unicode.as_str())
            .collect();
        assert_eq!(text, ["z", "y", "x"]);
    }

    #[test]
    fn gather_twice_is_identical() {
        let doc = doc_with_pages(&["stable output"]);
        let first = TextGatherer::gather(&doc).unwrap();
        let second = TextGatherer::gather(&doc).unwrap();
        assert_eq!(first.glyphs_for_page(0), second.glyphs_for_page(0));
    }
}
