//! Graphics and text state machines for the traversal.
//!
//! Implements the slice of the PDF state model that glyph and image
//! positioning depend on: the CTM with its q/Q stack, and the text state
//! (font, matrices, spacing parameters). Painting parameters that do not
//! affect geometry are passed through without tracking.

use pdfredact_core::Matrix;

/// Text state parameters, including the text and line matrices.
///
/// Spacing parameters (Tc, Tw, Tz, TL, Ts) and the font selection are part
/// of the graphics state and are saved/restored by q/Q via
/// [`TextSnapshot`]; the matrices are managed by BT/ET/Tm/Td/T*.
#[derive(Debug, Clone, PartialEq)]
pub struct TextState {
    /// Character spacing (Tc). Extra space after each glyph.
    pub char_spacing: f64,
    /// Word spacing (Tw). Extra space after each space character (code 32).
    pub word_spacing: f64,
    /// Horizontal scaling (Tz), stored as a percentage (100 = normal).
    pub h_scaling: f64,
    /// Text leading (TL).
    pub leading: f64,
    /// Font resource name set by Tf (e.g., "F1").
    pub font_name: String,
    /// Font size set by Tf.
    pub font_size: f64,
    /// Text rise (Ts).
    pub rise: f64,
    text_matrix: Matrix,
    line_matrix: Matrix,
}

/// The q/Q-saved portion of the text state.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSnapshot {
    char_spacing: f64,
    word_spacing: f64,
    h_scaling: f64,
    leading: f64,
    font_name: String,
    font_size: f64,
    rise: f64,
}

impl Default for TextState {
    fn default() -> Self {
        Self::new()
    }
}

impl TextState {
    pub fn new() -> Self {
        Self {
            char_spacing: 0.0,
            word_spacing: 0.0,
            h_scaling: 100.0,
            leading: 0.0,
            font_name: String::new(),
            font_size: 0.0,
            rise: 0.0,
            text_matrix: Matrix::identity(),
            line_matrix: Matrix::identity(),
        }
    }

    pub fn text_matrix(&self) -> &Matrix {
        &self.text_matrix
    }

    /// Horizontal scaling as a fraction (1.0 = 100%).
    pub fn h_scaling_normalized(&self) -> f64 {
        self.h_scaling / 100.0
    }

    /// `BT`: reset both matrices to identity.
    pub fn begin_text(&mut self) {
        self.text_matrix = Matrix::identity();
        self.line_matrix = Matrix::identity();
    }

    /// `ET`: the matrices become meaningless until the next BT.
    pub fn end_text(&mut self) {}

    /// `Tf`: select font and size.
    pub fn set_font(&mut self, name: String, size: f64) {
        self.font_name = name;
        self.font_size = size;
    }

    /// `Tm`: replace both matrices.
    pub fn set_text_matrix(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) {
        let m = Matrix::new(a, b, c, d, e, f);
        self.text_matrix = m;
        self.line_matrix = m;
    }

    /// `Td`: move to the start of the next line, offset from the current
    /// line start.
    pub fn move_text_position(&mut self, tx: f64, ty: f64) {
        self.line_matrix = Matrix::translation(tx, ty).concat(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    /// `TD`: like Td but also sets leading to `-ty`.
    pub fn move_text_position_and_set_leading(&mut self, tx: f64, ty: f64) {
        self.leading = -ty;
        self.move_text_position(tx, ty);
    }

    /// `T*`: move to the start of the next line using the leading.
    pub fn move_to_next_line(&mut self) {
        self.move_text_position(0.0, -self.leading);
    }

    /// Advance the text position horizontally after showing a glyph or
    /// applying a TJ adjustment.
    pub fn advance(&mut self, tx: f64) {
        self.text_matrix = Matrix::translation(tx, 0.0).concat(&self.text_matrix);
    }

    pub fn snapshot(&self) -> TextSnapshot {
        TextSnapshot {
            char_spacing: self.char_spacing,
            word_spacing: self.word_spacing,
            h_scaling: self.h_scaling,
            leading: self.leading,
            font_name: self.font_name.clone(),
            font_size: self.font_size,
            rise: self.rise,
        }
    }

    pub fn restore(&mut self, snapshot: TextSnapshot) {
        self.char_spacing = snapshot.char_spacing;
        self.word_spacing = snapshot.word_spacing;
        self.h_scaling = snapshot.h_scaling;
        self.leading = snapshot.leading;
        self.font_name = snapshot.font_name;
        self.font_size = snapshot.font_size;
        self.rise = snapshot.rise;
    }
}

/// The CTM and its q/Q stack. Each saved level also snapshots the
/// q/Q-governed part of the text state.
#[derive(Debug, Clone)]
pub struct GraphicsState {
    ctm: Matrix,
    stack: Vec<(Matrix, TextSnapshot)>,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsState {
    pub fn new() -> Self {
        Self {
            ctm: Matrix::identity(),
            stack: Vec::new(),
        }
    }

    pub fn ctm(&self) -> &Matrix {
        &self.ctm
    }

    /// `cm`: concatenate onto the CTM.
    pub fn concat_matrix(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) {
        self.ctm = Matrix::new(a, b, c, d, e, f).concat(&self.ctm);
    }

    /// `q`: push the CTM and a text-state snapshot.
    pub fn save(&mut self, text: &TextState) {
        self.stack.push((self.ctm, text.snapshot()));
    }

    /// `Q`: pop. An unmatched Q is ignored, as PDF viewers do.
    pub fn restore(&mut self, text: &mut TextState) {
        if let Some((ctm, snapshot)) = self.stack.pop() {
            self.ctm = ctm;
            text.restore(snapshot);
        }
    }
}
