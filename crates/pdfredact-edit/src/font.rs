//! Font metrics and encoding facts read from PDF font dictionaries.
//!
//! The engine needs exactly three things from a font: how many bytes one
//! character code occupies, the advance width of a code (in glyph space,
//! 1/1000 of text space), and a unicode value for gathered text. Simple
//! fonts carry `/Widths` + `/FirstChar`; Type0 (composite) fonts carry a
//! CID `/W` array with a `/DW` default. `/ToUnicode` CMaps are parsed for
//! their bfchar/bfrange sections.
//!
//! Width lookup returns `Option`: a code that resolves nowhere is reported
//! as `None` and the caller turns that into a fatal error. Guessing a width
//! here would silently misplace every glyph after the guess.

use std::collections::HashMap;

use crate::error::EditError;

/// Default ascent when the font descriptor does not specify one
/// (750/1000 of text space).
const DEFAULT_ASCENT: f64 = 750.0;

/// Default descent when the font descriptor does not specify one.
const DEFAULT_DESCENT: f64 = -250.0;

/// CID default width when `/DW` is absent, per the PDF specification.
const CID_DEFAULT_WIDTH: f64 = 1000.0;

/// Advance-width source: simple font widths array or CID width map.
#[derive(Debug, Clone)]
enum WidthSource {
    Simple {
        widths: Vec<f64>,
        first_char: u32,
        missing_width: Option<f64>,
    },
    Cid {
        widths: HashMap<u32, f64>,
        default_width: f64,
    },
}

/// Everything the engine knows about one font resource.
#[derive(Debug, Clone)]
pub struct FontInfo {
    base_name: String,
    code_bytes: u8,
    widths: WidthSource,
    ascent: f64,
    descent: f64,
    to_unicode: HashMap<u32, String>,
}

impl FontInfo {
    /// Width in bytes of one encoded character code.
    pub fn code_bytes(&self) -> u8 {
        self.code_bytes
    }

    /// The `/BaseFont` name, subset prefix included.
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn ascent(&self) -> f64 {
        self.ascent
    }

    pub fn descent(&self) -> f64 {
        self.descent
    }

    /// Advance width for a character code in glyph space (1/1000 text
    /// space), or `None` if the font resolves nothing for it.
    pub fn width(&self, code: u32) -> Option<f64> {
        match &self.widths {
            WidthSource::Simple {
                widths,
                first_char,
                missing_width,
            } => {
                if code >= *first_char {
                    if let Some(w) = widths.get((code - first_char) as usize) {
                        return Some(*w);
                    }
                }
                *missing_width
            }
            WidthSource::Cid {
                widths,
                default_width,
            } => Some(widths.get(&code).copied().unwrap_or(*default_width)),
        }
    }

    /// Unicode text for a character code: the `/ToUnicode` mapping when
    /// present, otherwise the code itself for single-byte fonts. A
    /// composite-font code with no mapping has no meaningful text.
    pub fn unicode(&self, code: u32) -> String {
        if let Some(text) = self.to_unicode.get(&code) {
            return text.clone();
        }
        if self.code_bytes == 1 {
            if let Some(ch) = char::from_u32(code) {
                return ch.to_string();
            }
        }
        "\u{FFFD}".to_string()
    }

    /// Split a string operand into fixed-width character codes. A trailing
    /// partial code is taken as-is.
    pub fn decode_codes(&self, bytes: &[u8]) -> Vec<u32> {
        let step = self.code_bytes as usize;
        let mut codes = Vec::with_capacity(bytes.len() / step + 1);
        let mut i = 0;
        while i < bytes.len() {
            let end = (i + step).min(bytes.len());
            let mut code = 0u32;
            for &b in &bytes[i..end] {
                code = (code << 8) | u32::from(b);
            }
            codes.push(code);
            i = end;
        }
        codes
    }

    /// Append a character code big-endian at this font's code width.
    pub fn encode_code(&self, code: u32, out: &mut Vec<u8>) {
        let step = self.code_bytes as usize;
        let mut remaining = code;
        let mut bytes = vec![0u8; step];
        for slot in (0..step).rev() {
            bytes[slot] = (remaining & 0xFF) as u8;
            remaining >>= 8;
        }
        out.extend_from_slice(&bytes);
    }
}

/// Build a [`FontInfo`] from a font dictionary.
///
/// Reads `/Subtype`, `/Widths`/`/FirstChar` or the descendant's `/W`/`/DW`,
/// the font descriptor's `/MissingWidth`/`/Ascent`/`/Descent`, and
/// `/ToUnicode`.
pub fn extract_font_info(
    doc: &lopdf::Document,
    font_dict: &lopdf::Dictionary,
) -> Result<FontInfo, EditError> {
    let subtype = font_dict
        .get(b"Subtype")
        .ok()
        .and_then(|o| o.as_name().ok())
        .and_then(|b| std::str::from_utf8(b).ok())
        .unwrap_or("");

    let base_name = font_dict
        .get(b"BaseFont")
        .ok()
        .and_then(|o| o.as_name().ok())
        .and_then(|b| std::str::from_utf8(b).ok())
        .unwrap_or("")
        .to_string();

    let to_unicode = match font_dict.get(b"ToUnicode") {
        Ok(obj) => {
            let stream = resolve(doc, obj)
                .as_stream()
                .map_err(|e| EditError::Font(format!("/ToUnicode is not a stream: {e}")))?;
            parse_to_unicode(&stream_bytes(stream)?)
        }
        Err(_) => HashMap::new(),
    };

    if subtype == "Type0" {
        let descendant = descendant_font(doc, font_dict)?;
        let default_width = descendant
            .get(b"DW")
            .ok()
            .and_then(|o| number(resolve(doc, o)))
            .unwrap_or(CID_DEFAULT_WIDTH);
        let widths = match descendant.get(b"W") {
            Ok(obj) => parse_cid_widths(doc, resolve(doc, obj))?,
            Err(_) => HashMap::new(),
        };
        let (ascent, descent) = descriptor_vertical_metrics(doc, descendant);

        return Ok(FontInfo {
            base_name,
            code_bytes: 2,
            widths: WidthSource::Cid {
                widths,
                default_width,
            },
            ascent,
            descent,
            to_unicode,
        });
    }

    let first_char = font_dict
        .get(b"FirstChar")
        .ok()
        .and_then(|o| number(resolve(doc, o)))
        .unwrap_or(0.0) as u32;

    let widths: Vec<f64> = match font_dict.get(b"Widths") {
        Ok(obj) => resolve(doc, obj)
            .as_array()
            .map_err(|e| EditError::Font(format!("/Widths is not an array: {e}")))?
            .iter()
            .map(|o| number(resolve(doc, o)).unwrap_or(0.0))
            .collect(),
        Err(_) => Vec::new(),
    };

    let missing_width = font_descriptor(doc, font_dict)
        .and_then(|desc| desc.get(b"MissingWidth").ok().and_then(|o| number(resolve(doc, o))));
    let (ascent, descent) = descriptor_vertical_metrics(doc, font_dict);

    Ok(FontInfo {
        base_name,
        code_bytes: 1,
        widths: WidthSource::Simple {
            widths,
            first_char,
            missing_width,
        },
        ascent,
        descent,
        to_unicode,
    })
}

/// Follow a reference to its object; non-references pass through.
fn resolve<'a>(doc: &'a lopdf::Document, obj: &'a lopdf::Object) -> &'a lopdf::Object {
    match obj {
        lopdf::Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn number(obj: &lopdf::Object) -> Option<f64> {
    match obj {
        lopdf::Object::Integer(i) => Some(*i as f64),
        lopdf::Object::Real(f) => Some(f64::from(*f)),
        _ => None,
    }
}

fn stream_bytes(stream: &lopdf::Stream) -> Result<Vec<u8>, EditError> {
    if stream.dict.get(b"Filter").is_ok() {
        stream
            .decompressed_content()
            .map_err(|e| EditError::Font(format!("failed to decompress /ToUnicode: {e}")))
    } else {
        Ok(stream.content.clone())
    }
}

fn descendant_font<'a>(
    doc: &'a lopdf::Document,
    font_dict: &'a lopdf::Dictionary,
) -> Result<&'a lopdf::Dictionary, EditError> {
    let descendants = font_dict
        .get(b"DescendantFonts")
        .map_err(|_| EditError::Font("Type0 font has no /DescendantFonts".into()))?;
    let array = resolve(doc, descendants)
        .as_array()
        .map_err(|e| EditError::Font(format!("/DescendantFonts is not an array: {e}")))?;
    let first = array
        .first()
        .ok_or_else(|| EditError::Font("/DescendantFonts is empty".into()))?;
    resolve(doc, first)
        .as_dict()
        .map_err(|e| EditError::Font(format!("descendant font is not a dictionary: {e}")))
}

fn font_descriptor<'a>(
    doc: &'a lopdf::Document,
    font_dict: &'a lopdf::Dictionary,
) -> Option<&'a lopdf::Dictionary> {
    let desc = font_dict.get(b"FontDescriptor").ok()?;
    resolve(doc, desc).as_dict().ok()
}

fn descriptor_vertical_metrics(doc: &lopdf::Document, font_dict: &lopdf::Dictionary) -> (f64, f64) {
    let Some(desc) = font_descriptor(doc, font_dict) else {
        return (DEFAULT_ASCENT, DEFAULT_DESCENT);
    };
    let ascent = desc
        .get(b"Ascent")
        .ok()
        .and_then(|o| number(resolve(doc, o)))
        .unwrap_or(DEFAULT_ASCENT);
    let descent = desc
        .get(b"Descent")
        .ok()
        .and_then(|o| number(resolve(doc, o)))
        .unwrap_or(DEFAULT_DESCENT);
    (ascent, descent)
}

/// Parse a CID `/W` array: `[ c [w…] ]` runs and `[ c1 c2 w ]` ranges mix
/// freely.
fn parse_cid_widths(
    doc: &lopdf::Document,
    obj: &lopdf::Object,
) -> Result<HashMap<u32, f64>, EditError> {
    let array = obj
        .as_array()
        .map_err(|e| EditError::Font(format!("/W is not an array: {e}")))?;
    let mut widths = HashMap::new();
    let mut i = 0;
    while i < array.len() {
        let start = number(resolve(doc, &array[i]))
            .ok_or_else(|| EditError::Font("/W: expected a starting CID".into()))?
            as u32;
        i += 1;
        let Some(next) = array.get(i) else {
            return Err(EditError::Font("/W: truncated entry".into()));
        };
        match resolve(doc, next) {
            lopdf::Object::Array(list) => {
                for (offset, w) in list.iter().enumerate() {
                    if let Some(w) = number(resolve(doc, w)) {
                        widths.insert(start + offset as u32, w);
                    }
                }
                i += 1;
            }
            other => {
                let end = number(other)
                    .ok_or_else(|| EditError::Font("/W: expected an ending CID or array".into()))?
                    as u32;
                let w = array
                    .get(i + 1)
                    .and_then(|o| number(resolve(doc, o)))
                    .ok_or_else(|| EditError::Font("/W: range entry missing width".into()))?;
                for code in start..=end {
                    widths.insert(code, w);
                }
                i += 2;
            }
        }
    }
    Ok(widths)
}

// --- ToUnicode CMap parsing (bfchar/bfrange subset) ---

#[derive(Debug, PartialEq)]
enum CmapToken {
    Hex(Vec<u8>),
    Array(Vec<Vec<u8>>),
    Keyword(String),
}

/// Parse the bfchar/bfrange sections of a ToUnicode CMap into a
/// code → unicode map. Everything else in the CMap is skipped.
fn parse_to_unicode(bytes: &[u8]) -> HashMap<u32, String> {
    let tokens = cmap_tokens(bytes);
    let mut map = HashMap::new();
    let mut i = 0;

    while i < tokens.len() {
        match &tokens[i] {
            CmapToken::Keyword(kw) if kw == "beginbfchar" => {
                i += 1;
                while i + 1 < tokens.len() {
                    let (CmapToken::Hex(src), CmapToken::Hex(dst)) = (&tokens[i], &tokens[i + 1])
                    else {
                        break;
                    };
                    map.insert(code_from_bytes(src), utf16_be_string(dst));
                    i += 2;
                }
            }
            CmapToken::Keyword(kw) if kw == "beginbfrange" => {
                i += 1;
                while i + 2 < tokens.len() {
                    let CmapToken::Hex(lo) = &tokens[i] else { break };
                    let CmapToken::Hex(hi) = &tokens[i + 1] else { break };
                    let lo = code_from_bytes(lo);
                    let hi = code_from_bytes(hi);
                    match &tokens[i + 2] {
                        CmapToken::Hex(base) => {
                            for code in lo..=hi {
                                map.insert(code, utf16_be_offset(base, code - lo));
                            }
                        }
                        CmapToken::Array(values) => {
                            for (offset, dst) in values.iter().enumerate() {
                                map.insert(lo + offset as u32, utf16_be_string(dst));
                            }
                        }
                        CmapToken::Keyword(_) => break,
                    }
                    i += 3;
                }
            }
            _ => i += 1,
        }
    }

    map
}

fn cmap_tokens(bytes: &[u8]) -> Vec<CmapToken> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        match bytes[pos] {
            b'<' => {
                if let Some(hex) = cmap_hex(bytes, &mut pos) {
                    tokens.push(CmapToken::Hex(hex));
                }
            }
            b'[' => {
                pos += 1;
                let mut values = Vec::new();
                while pos < bytes.len() && bytes[pos] != b']' {
                    if bytes[pos] == b'<' {
                        if let Some(hex) = cmap_hex(bytes, &mut pos) {
                            values.push(hex);
                        }
                    } else {
                        pos += 1;
                    }
                }
                pos += 1;
                tokens.push(CmapToken::Array(values));
            }
            b'a'..=b'z' | b'A'..=b'Z' => {
                let start = pos;
                while pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
                    pos += 1;
                }
                tokens.push(CmapToken::Keyword(
                    String::from_utf8_lossy(&bytes[start..pos]).into_owned(),
                ));
            }
            _ => pos += 1,
        }
    }

    tokens
}

fn cmap_hex(bytes: &[u8], pos: &mut usize) -> Option<Vec<u8>> {
    *pos += 1; // '<'
    let mut digits = Vec::new();
    while *pos < bytes.len() {
        let b = bytes[*pos];
        *pos += 1;
        if b == b'>' {
            if digits.len() % 2 != 0 {
                digits.push(b'0');
            }
            let mut out = Vec::with_capacity(digits.len() / 2);
            for pair in digits.chunks(2) {
                let hi = (pair[0] as char).to_digit(16)?;
                let lo = (pair[1] as char).to_digit(16)?;
                out.push(((hi << 4) | lo) as u8);
            }
            return Some(out);
        }
        if b.is_ascii_hexdigit() {
            digits.push(b);
        }
    }
    None
}

fn code_from_bytes(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b))
}

fn utf16_be_string(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks(2)
        .map(|pair| {
            if pair.len() == 2 {
                u16::from_be_bytes([pair[0], pair[1]])
            } else {
                u16::from(pair[0])
            }
        })
        .collect();
    String::from_utf16_lossy(&units)
}

/// A bfrange destination advances its final UTF-16 code unit.
fn utf16_be_offset(base: &[u8], offset: u32) -> String {
    let mut units: Vec<u16> = base
        .chunks(2)
        .map(|pair| {
            if pair.len() == 2 {
                u16::from_be_bytes([pair[0], pair[1]])
            } else {
                u16::from(pair[0])
            }
        })
        .collect();
    if let Some(last) = units.last_mut() {
        *last = last.wrapping_add(offset as u16);
    }
    String::from_utf16_lossy(&units)
}
