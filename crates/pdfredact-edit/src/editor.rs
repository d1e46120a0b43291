//! The shared traversal primitive driving both processing passes.
//!
//! [`StreamEditor`] visits every instruction of a page exactly once. For
//! each instruction it invokes the handler's pre-instruction hook, executes
//! the instruction against the graphics/text state machines (emitting glyph
//! and XObject events in lockstep), and then invokes the write hook, which
//! decides pass-through, suppression, or replacement.
//!
//! Both the gather pass and the rewrite pass run through this one engine
//! with different handlers. That is what guarantees the two passes enumerate
//! glyphs identically: there is no second, independently-written extraction
//! path to drift out of alignment.
//!
//! `Do` on a Form XObject does not recurse: regions apply only to the
//! top-level paint stream. A dispatch-depth counter guards reentrancy so
//! that instructions dispatched from inside a handler are executed against
//! the state machines but never re-enter the hooks.

use std::collections::HashMap;

use pdfredact_core::{Glyph, PageGeometry, Rect, RedactError};

use crate::error::EditError;
use crate::font::{FontInfo, extract_font_info};
use crate::state::{GraphicsState, TextState};
use crate::tokenizer::{Operand, Operator, tokenize};
use crate::writer::ContentSink;

/// Per-instruction context handed to the write hook.
pub struct EditContext<'a> {
    /// Zero-based page index.
    pub page: usize,
    /// Rotation and media-box extent of the page.
    pub geometry: PageGeometry,
    /// The currently selected font, if any.
    pub font: Option<&'a FontInfo>,
}

/// Callback hooks for one traversal pass.
///
/// All methods have default implementations; the default write hook copies
/// every instruction through unchanged, so a handler that overrides nothing
/// reproduces the page token-for-token.
pub trait EditHandler {
    /// Called once before the first instruction of a page.
    fn begin_page(&mut self, _page: usize, _geometry: &PageGeometry) {}

    /// Pre-instruction hook. Per-instruction scratch state must be reset
    /// here, before any event for the instruction is delivered.
    fn next_operation(&mut self, _op: &Operator) {}

    /// One glyph painted by the current instruction. Emitted in lockstep
    /// with instruction execution, before the write hook runs.
    fn on_glyph(&mut self, _glyph: Glyph) {}

    /// An XObject was invoked by `Do`. `placement` is derived from the CTM:
    /// translation components give the origin, scale components give the
    /// extent. Rotation and shear are not modeled.
    fn on_xobject(&mut self, _name: &str, _placement: Rect) {}

    /// Write hook: emit the instruction (or a replacement, or nothing) into
    /// the page's output sink.
    fn write(
        &mut self,
        sink: &mut ContentSink,
        op: &Operator,
        _ctx: &EditContext<'_>,
    ) -> Result<(), RedactError> {
        sink.write_operator(op);
        Ok(())
    }
}

/// Drives handler passes over the pages of a document.
pub struct StreamEditor<'a> {
    doc: &'a lopdf::Document,
    page_ids: Vec<lopdf::ObjectId>,
}

impl<'a> StreamEditor<'a> {
    pub fn new(doc: &'a lopdf::Document) -> Self {
        // get_pages returns a BTreeMap with 1-based keys in page order.
        let page_ids = doc.get_pages().values().copied().collect();
        Self { doc, page_ids }
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn page_id(&self, page: usize) -> Result<lopdf::ObjectId, EditError> {
        self.page_ids.get(page).copied().ok_or_else(|| {
            EditError::Parse(format!(
                "page index {page} out of range (0..{})",
                self.page_ids.len()
            ))
        })
    }

    /// Rotation and media-box extent for a page, following inherited
    /// attributes up the page tree.
    pub fn page_geometry(&self, page: usize) -> Result<PageGeometry, EditError> {
        let page_id = self.page_id(page)?;

        let media = resolve_inherited(self.doc, page_id, b"MediaBox")?
            .ok_or_else(|| EditError::Parse("MediaBox not found on page or ancestors".into()))?;
        let array = resolve_ref(self.doc, media)
            .as_array()
            .map_err(|e| EditError::Parse(format!("MediaBox is not an array: {e}")))?;
        if array.len() < 4 {
            return Err(EditError::Parse("MediaBox has fewer than 4 entries".into()));
        }
        let mut corners = [0.0f64; 4];
        for (slot, obj) in corners.iter_mut().zip(array.iter()) {
            *slot = object_number(resolve_ref(self.doc, obj))
                .ok_or_else(|| EditError::Parse("MediaBox entry is not a number".into()))?;
        }

        let rotation = match resolve_inherited(self.doc, page_id, b"Rotate")? {
            Some(obj) => resolve_ref(self.doc, obj)
                .as_i64()
                .map_err(|e| EditError::Parse(format!("Rotate is not an integer: {e}")))?
                as i32,
            None => 0,
        };

        Ok(PageGeometry::new(
            rotation,
            corners[2] - corners[0],
            corners[3] - corners[1],
        ))
    }

    /// Run one handler pass over one page and return the bytes the write
    /// hook produced. Nothing in the document is modified; committing the
    /// output is the caller's move (see [`replace_page_content`]).
    pub fn process_page(
        &self,
        page: usize,
        handler: &mut dyn EditHandler,
    ) -> Result<Vec<u8>, EditError> {
        let page_id = self.page_id(page)?;
        let geometry = self.page_geometry(page)?;
        let resources = page_resources(self.doc, page_id)?;
        let content = page_content_bytes(self.doc, page_id)?;
        let operators = tokenize(&content)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(page, instructions = operators.len(), "processing page");

        handler.begin_page(page, &geometry);

        let mut run = PageRun {
            doc: self.doc,
            resources,
            page,
            geometry,
            gstate: GraphicsState::new(),
            tstate: TextState::new(),
            fonts: HashMap::new(),
            sink: ContentSink::new(),
            depth: 0,
        };

        for op in &operators {
            run.dispatch(op, handler)?;
        }

        Ok(run.sink.finish())
    }
}

/// Replace a page's `/Contents` with a freshly written stream.
pub fn replace_page_content(
    doc: &mut lopdf::Document,
    page: usize,
    content: Vec<u8>,
) -> Result<(), EditError> {
    let page_id = doc
        .get_pages()
        .values()
        .nth(page)
        .copied()
        .ok_or_else(|| EditError::Parse(format!("page index {page} out of range")))?;

    let stream_id = doc.add_object(lopdf::Stream::new(lopdf::dictionary! {}, content));
    let dict = doc
        .get_object_mut(page_id)
        .and_then(|o| o.as_dict_mut())
        .map_err(|e| EditError::Parse(format!("failed to get page dictionary: {e}")))?;
    dict.set("Contents", lopdf::Object::Reference(stream_id));
    Ok(())
}

/// Mutable traversal state for one page pass.
struct PageRun<'a> {
    doc: &'a lopdf::Document,
    resources: Option<&'a lopdf::Dictionary>,
    page: usize,
    geometry: PageGeometry,
    gstate: GraphicsState,
    tstate: TextState,
    fonts: HashMap<String, FontInfo>,
    sink: ContentSink,
    /// Dispatch depth. Instructions dispatched from depth > 0 are executed
    /// against the state machines but do not re-enter the hooks.
    depth: u32,
}

impl PageRun<'_> {
    fn dispatch(&mut self, op: &Operator, handler: &mut dyn EditHandler) -> Result<(), EditError> {
        if self.depth > 0 {
            return self.execute(op, handler);
        }

        self.depth += 1;
        handler.next_operation(op);
        let result = match self.execute(op, handler) {
            Ok(()) => {
                let ctx = EditContext {
                    page: self.page,
                    geometry: self.geometry,
                    font: self.fonts.get(&self.tstate.font_name),
                };
                handler
                    .write(&mut self.sink, op, &ctx)
                    .map_err(EditError::Core)
            }
            Err(e) => Err(e),
        };
        self.depth -= 1;
        result
    }

    /// Apply an instruction to the state machines, emitting glyph and
    /// XObject events as a side effect.
    fn execute(&mut self, op: &Operator, handler: &mut dyn EditHandler) -> Result<(), EditError> {
        match op.name.as_str() {
            // --- Graphics state ---
            "q" => self.gstate.save(&self.tstate),
            "Q" => self.gstate.restore(&mut self.tstate),
            "cm" => {
                if op.operands.len() >= 6 {
                    self.gstate.concat_matrix(
                        operand_number(&op.operands, 0).unwrap_or(1.0),
                        operand_number(&op.operands, 1).unwrap_or(0.0),
                        operand_number(&op.operands, 2).unwrap_or(0.0),
                        operand_number(&op.operands, 3).unwrap_or(1.0),
                        operand_number(&op.operands, 4).unwrap_or(0.0),
                        operand_number(&op.operands, 5).unwrap_or(0.0),
                    );
                }
            }

            // --- Text state ---
            "BT" => self.tstate.begin_text(),
            "ET" => self.tstate.end_text(),
            "Tf" => {
                if op.operands.len() >= 2 {
                    let name = op.operands[0].as_name().unwrap_or("").to_string();
                    let size = operand_number(&op.operands, 1).unwrap_or(0.0);
                    self.load_font(&name)?;
                    self.tstate.set_font(name, size);
                }
            }
            "Tm" => {
                if op.operands.len() >= 6 {
                    self.tstate.set_text_matrix(
                        operand_number(&op.operands, 0).unwrap_or(1.0),
                        operand_number(&op.operands, 1).unwrap_or(0.0),
                        operand_number(&op.operands, 2).unwrap_or(0.0),
                        operand_number(&op.operands, 3).unwrap_or(1.0),
                        operand_number(&op.operands, 4).unwrap_or(0.0),
                        operand_number(&op.operands, 5).unwrap_or(0.0),
                    );
                }
            }
            "Td" => {
                if op.operands.len() >= 2 {
                    self.tstate.move_text_position(
                        operand_number(&op.operands, 0).unwrap_or(0.0),
                        operand_number(&op.operands, 1).unwrap_or(0.0),
                    );
                }
            }
            "TD" => {
                if op.operands.len() >= 2 {
                    self.tstate.move_text_position_and_set_leading(
                        operand_number(&op.operands, 0).unwrap_or(0.0),
                        operand_number(&op.operands, 1).unwrap_or(0.0),
                    );
                }
            }
            "T*" => self.tstate.move_to_next_line(),
            "TL" => {
                if let Some(v) = operand_number(&op.operands, 0) {
                    self.tstate.leading = v;
                }
            }
            "Tc" => {
                if let Some(v) = operand_number(&op.operands, 0) {
                    self.tstate.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some(v) = operand_number(&op.operands, 0) {
                    self.tstate.word_spacing = v;
                }
            }
            "Tz" => {
                if let Some(v) = operand_number(&op.operands, 0) {
                    self.tstate.h_scaling = v;
                }
            }
            "Ts" => {
                if let Some(v) = operand_number(&op.operands, 0) {
                    self.tstate.rise = v;
                }
            }

            // --- Text showing ---
            "Tj" => {
                if let Some(bytes) = op.operands.first().and_then(Operand::as_string_bytes) {
                    self.show_string(bytes, "Tj", handler)?;
                }
            }
            "TJ" => {
                let Some(Operand::Array(elements)) = op.operands.first() else {
                    return Ok(());
                };
                for element in elements {
                    if let Some(adjustment) = element.as_number() {
                        let tx = -(adjustment / 1000.0)
                            * self.tstate.font_size
                            * self.tstate.h_scaling_normalized();
                        self.tstate.advance(tx);
                    } else if let Some(bytes) = element.as_string_bytes() {
                        self.show_string(bytes, "TJ", handler)?;
                    }
                }
            }
            "'" => {
                self.tstate.move_to_next_line();
                if let Some(bytes) = op.operands.first().and_then(Operand::as_string_bytes) {
                    self.show_string(bytes, "'", handler)?;
                }
            }
            "\"" => {
                if op.operands.len() >= 3 {
                    if let Some(aw) = operand_number(&op.operands, 0) {
                        self.tstate.word_spacing = aw;
                    }
                    if let Some(ac) = operand_number(&op.operands, 1) {
                        self.tstate.char_spacing = ac;
                    }
                    self.tstate.move_to_next_line();
                    if let Some(bytes) = op.operands[2].as_string_bytes() {
                        self.show_string(bytes, "\"", handler)?;
                    }
                }
            }

            // --- XObjects ---
            "Do" => {
                if op.operands.is_empty() {
                    return Err(EditError::Core(RedactError::MalformedInstruction {
                        page: self.page,
                        opcode: "Do".to_string(),
                        reason: "missing XObject name operand".to_string(),
                    }));
                }
                // A non-name operand produces no event; the write hook drops
                // the instruction. Form XObjects are not descended into.
                if let Some(name) = op.operands[0].as_name() {
                    let ctm = self.gstate.ctm();
                    let placement = Rect::new(ctm.e, ctm.f, ctm.a, ctm.d);
                    handler.on_xobject(name, placement);
                }
            }

            // Everything else has no effect on tracked state.
            _ => {}
        }
        Ok(())
    }

    /// Decode a shown string into codes and emit one glyph per code,
    /// advancing the text position as the viewer would.
    fn show_string(
        &mut self,
        bytes: &[u8],
        opcode: &str,
        handler: &mut dyn EditHandler,
    ) -> Result<(), EditError> {
        let Some(font) = self.fonts.get(&self.tstate.font_name) else {
            return Err(EditError::Font(format!(
                "no usable font selected for {opcode} on page {}",
                self.page
            )));
        };

        let codes = font.decode_codes(bytes);
        let code_bytes = font.code_bytes();
        let glyph_height_norm = (font.ascent() - font.descent()) / 1000.0;

        for code in codes {
            let w0 = font.width(code).ok_or_else(|| {
                EditError::Core(RedactError::FontMetricUnavailable {
                    page: self.page,
                    opcode: opcode.to_string(),
                    code,
                })
            })?;

            let font_size = self.tstate.font_size;
            let h_scaling = self.tstate.h_scaling_normalized();
            let word_spacing = if code == 32 && code_bytes == 1 {
                self.tstate.word_spacing
            } else {
                0.0
            };
            let tx =
                ((w0 / 1000.0) * font_size + self.tstate.char_spacing + word_spacing) * h_scaling;

            // Device-space position and scale from Tm × CTM.
            let m = self.tstate.text_matrix().concat(self.gstate.ctm());
            let (device_x, device_y) = m.transform_point(0.0, self.tstate.rise);
            let scale_x = (m.a * m.a + m.b * m.b).sqrt();
            let scale_y = (m.c * m.c + m.d * m.d).sqrt();

            handler.on_glyph(Glyph {
                page: self.page,
                unicode: font.unicode(code),
                code,
                code_bytes,
                x: device_x,
                y: self.geometry.height - device_y,
                width: tx * scale_x,
                height: glyph_height_norm * font_size * scale_y,
                page_height: self.geometry.height,
            });

            self.tstate.advance(tx);
        }
        Ok(())
    }

    /// Resolve a font resource by name into the cache. A name with no entry
    /// in `/Resources /Font` stays unresolved; showing text with it fails.
    fn load_font(&mut self, name: &str) -> Result<(), EditError> {
        if name.is_empty() || self.fonts.contains_key(name) {
            return Ok(());
        }
        let Some(resources) = self.resources else {
            return Ok(());
        };
        let Ok(fonts_obj) = resources.get(b"Font") else {
            return Ok(());
        };
        let Ok(fonts_dict) = resolve_ref(self.doc, fonts_obj).as_dict() else {
            return Ok(());
        };
        let Ok(entry) = fonts_dict.get(name.as_bytes()) else {
            return Ok(());
        };
        let font_dict = resolve_ref(self.doc, entry)
            .as_dict()
            .map_err(|e| EditError::Font(format!("font /{name} is not a dictionary: {e}")))?;
        let info = extract_font_info(self.doc, font_dict)?;
        self.fonts.insert(name.to_string(), info);
        Ok(())
    }
}

// --- lopdf plumbing ---

/// Follow a reference to its object; non-references pass through.
fn resolve_ref<'a>(doc: &'a lopdf::Document, obj: &'a lopdf::Object) -> &'a lopdf::Object {
    match obj {
        lopdf::Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn object_number(obj: &lopdf::Object) -> Option<f64> {
    match obj {
        lopdf::Object::Integer(i) => Some(*i as f64),
        lopdf::Object::Real(f) => Some(f64::from(*f)),
        _ => None,
    }
}

fn operand_number(operands: &[Operand], index: usize) -> Option<f64> {
    operands.get(index).and_then(Operand::as_number)
}

/// Look up a page attribute, following `/Parent` links for inheritable
/// attributes (MediaBox, Rotate, Resources).
fn resolve_inherited<'a>(
    doc: &'a lopdf::Document,
    page_id: lopdf::ObjectId,
    key: &[u8],
) -> Result<Option<&'a lopdf::Object>, EditError> {
    let mut current_id = page_id;
    // Bounded walk to survive malformed /Parent cycles.
    for _ in 0..64 {
        let dict = doc
            .get_object(current_id)
            .and_then(|o| o.as_dict())
            .map_err(|e| EditError::Parse(format!("failed to get page dictionary: {e}")))?;

        if let Ok(value) = dict.get(key) {
            return Ok(Some(value));
        }

        match dict.get(b"Parent") {
            Ok(parent) => {
                current_id = parent
                    .as_reference()
                    .map_err(|e| EditError::Parse(format!("invalid /Parent reference: {e}")))?;
            }
            Err(_) => return Ok(None),
        }
    }
    Err(EditError::Parse("page tree /Parent cycle".into()))
}

fn page_resources<'a>(
    doc: &'a lopdf::Document,
    page_id: lopdf::ObjectId,
) -> Result<Option<&'a lopdf::Dictionary>, EditError> {
    match resolve_inherited(doc, page_id, b"Resources")? {
        Some(obj) => {
            let dict = resolve_ref(doc, obj)
                .as_dict()
                .map_err(|e| EditError::Parse(format!("/Resources is not a dictionary: {e}")))?;
            Ok(Some(dict))
        }
        None => Ok(None),
    }
}

/// Concatenated, decompressed content bytes of a page. Multiple streams are
/// joined with a separating space, as viewers do.
fn page_content_bytes(
    doc: &lopdf::Document,
    page_id: lopdf::ObjectId,
) -> Result<Vec<u8>, EditError> {
    let page_dict = doc
        .get_object(page_id)
        .and_then(|o| o.as_dict())
        .map_err(|e| EditError::Parse(format!("failed to get page dictionary: {e}")))?;

    let contents = match page_dict.get(b"Contents") {
        Ok(obj) => obj,
        Err(_) => return Ok(Vec::new()), // page with no content
    };

    match contents {
        lopdf::Object::Reference(id) => {
            let stream = doc
                .get_object(*id)
                .and_then(|o| o.as_stream())
                .map_err(|e| EditError::Parse(format!("/Contents is not a stream: {e}")))?;
            decode_stream(stream)
        }
        lopdf::Object::Array(items) => {
            let mut content = Vec::new();
            for item in items {
                let stream = resolve_ref(doc, item)
                    .as_stream()
                    .map_err(|e| EditError::Parse(format!("/Contents item is not a stream: {e}")))?;
                if !content.is_empty() {
                    content.push(b' ');
                }
                content.extend_from_slice(&decode_stream(stream)?);
            }
            Ok(content)
        }
        _ => Err(EditError::Parse(
            "/Contents is not a reference or array".into(),
        )),
    }
}

fn decode_stream(stream: &lopdf::Stream) -> Result<Vec<u8>, EditError> {
    if stream.dict.get(b"Filter").is_ok() {
        stream
            .decompressed_content()
            .map_err(|e| EditError::Parse(format!("failed to decompress content stream: {e}")))
    } else {
        Ok(stream.content.clone())
    }
}
