//! Content-stream serializer — the inverse of [`crate::tokenizer`].
//!
//! [`ContentSink`] is the per-page output sink: created once per page,
//! written to during the rewrite, and consumed by value when the page is
//! done. Dropping it on an error path discards the partial stream, so no
//! partially-written page content can ever replace the original.
//!
//! Serialization is deterministic: the same instruction always produces the
//! same bytes, and an instruction that round-trips through the tokenizer is
//! reproduced operand-for-operand.

use crate::tokenizer::{Operand, Operator};

/// Accumulates the rewritten content stream for one page.
#[derive(Debug, Default)]
pub struct ContentSink {
    buf: Vec<u8>,
}

impl ContentSink {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Serialize one instruction: operands, opcode, newline.
    pub fn write_operator(&mut self, op: &Operator) {
        if op.name == "BI" {
            self.write_inline_image(op);
            return;
        }
        for operand in &op.operands {
            write_operand(&mut self.buf, operand);
            self.buf.push(b' ');
        }
        self.buf.extend_from_slice(op.name.as_bytes());
        self.buf.push(b'\n');
    }

    /// Inline images serialize as `BI <pairs> ID <data> EI`, with the data
    /// bytes emitted verbatim.
    fn write_inline_image(&mut self, op: &Operator) {
        self.buf.extend_from_slice(b"BI");
        if let Some(Operand::Dictionary(entries)) = op.operands.first() {
            for (key, value) in entries {
                self.buf.push(b' ');
                write_name(&mut self.buf, key);
                self.buf.push(b' ');
                write_operand(&mut self.buf, value);
            }
        }
        self.buf.extend_from_slice(b" ID\n");
        if let Some(Operand::LiteralString(data)) = op.operands.get(1) {
            self.buf.extend_from_slice(data);
        }
        self.buf.extend_from_slice(b"\nEI\n");
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Close the sink and take the finished stream.
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

fn write_operand(buf: &mut Vec<u8>, operand: &Operand) {
    match operand {
        Operand::Integer(i) => buf.extend_from_slice(i.to_string().as_bytes()),
        Operand::Real(f) => write_real(buf, *f),
        Operand::Name(name) => write_name(buf, name),
        Operand::LiteralString(bytes) => write_literal_string(buf, bytes),
        Operand::HexString(bytes) => {
            buf.push(b'<');
            for b in bytes {
                buf.extend_from_slice(format!("{b:02X}").as_bytes());
            }
            buf.push(b'>');
        }
        Operand::Array(elements) => {
            buf.push(b'[');
            for (i, element) in elements.iter().enumerate() {
                if i > 0 {
                    buf.push(b' ');
                }
                write_operand(buf, element);
            }
            buf.push(b']');
        }
        Operand::Boolean(true) => buf.extend_from_slice(b"true"),
        Operand::Boolean(false) => buf.extend_from_slice(b"false"),
        Operand::Null => buf.extend_from_slice(b"null"),
        Operand::Dictionary(entries) => {
            buf.extend_from_slice(b"<<");
            for (key, value) in entries {
                buf.push(b' ');
                write_name(buf, key);
                buf.push(b' ');
                write_operand(buf, value);
            }
            buf.extend_from_slice(b" >>");
        }
    }
}

/// Real numbers print with up to six decimal places, trailing zeros trimmed.
/// PDF does not accept exponent notation, so plain fixed-point is used.
fn write_real(buf: &mut Vec<u8>, value: f64) {
    let mut text = format!("{value:.6}");
    while text.ends_with('0') {
        text.pop();
    }
    if text.ends_with('.') {
        text.pop();
    }
    if text == "-0" {
        text = "0".to_string();
    }
    buf.extend_from_slice(text.as_bytes());
}

/// Names escape delimiter, whitespace, `#`, and non-printable bytes as `#XX`.
fn write_name(buf: &mut Vec<u8>, name: &str) {
    buf.push(b'/');
    for &b in name.as_bytes() {
        let needs_escape = matches!(
            b,
            b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%' | b'#'
        ) || b <= b' '
            || b > b'~';
        if needs_escape {
            buf.extend_from_slice(format!("#{b:02X}").as_bytes());
        } else {
            buf.push(b);
        }
    }
}

/// Literal strings escape parentheses, backslash, and control bytes; all
/// other bytes pass through verbatim.
fn write_literal_string(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.push(b'(');
    for &b in bytes {
        match b {
            b'(' | b')' | b'\\' => {
                buf.push(b'\\');
                buf.push(b);
            }
            b'\n' => buf.extend_from_slice(b"\\n"),
            b'\r' => buf.extend_from_slice(b"\\r"),
            b'\t' => buf.extend_from_slice(b"\\t"),
            0x08 => buf.extend_from_slice(b"\\b"),
            0x0C => buf.extend_from_slice(b"\\f"),
            b if b < 0x20 => buf.extend_from_slice(format!("\\{b:03o}").as_bytes()),
            b => buf.push(b),
        }
    }
    buf.push(b')');
}
