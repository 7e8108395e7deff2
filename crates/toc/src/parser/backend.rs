use std::collections::BTreeMap;

use lopdf::content::Content;
use lopdf::Object;

use crate::types::{PageId, PdfValue};
use crate::TocError;

/// A font resource of a page: its `/F1`-style key and `/BaseFont`.
#[derive(Debug, Clone)]
pub struct BackendFontInfo {
    pub name: Vec<u8>,
    pub base_font: Option<String>,
}

/// One content-stream operator with its operands.
#[derive(Debug, Clone)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

pub fn get_number_from_value(val: &PdfValue) -> Option<f32> {
    match val {
        PdfValue::Integer(i) => Some(*i as f32),
        PdfValue::Real(f) => Some(*f),
        _ => None,
    }
}

/// Detach a `lopdf::Object` from its document. References stay references;
/// streams keep only their dictionary.
pub fn convert_object(obj: &Object) -> PdfValue {
    let dict_entries = |dict: &lopdf::Dictionary| -> Vec<(Vec<u8>, PdfValue)> {
        dict.iter()
            .map(|(k, v)| (k.clone(), convert_object(v)))
            .collect()
    };
    match obj {
        Object::Null => PdfValue::Null,
        Object::Boolean(b) => PdfValue::Bool(*b),
        Object::Integer(i) => PdfValue::Integer(*i),
        Object::Real(f) => PdfValue::Real(*f),
        Object::Name(n) => PdfValue::Name(n.clone()),
        Object::String(s, _) => PdfValue::Str(s.clone()),
        Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_object).collect()),
        Object::Dictionary(dict) => PdfValue::Dict(dict_entries(dict)),
        Object::Stream(stream) => PdfValue::Dict(dict_entries(&stream.dict)),
        Object::Reference(id) => PdfValue::Reference(*id),
    }
}

fn decode_utf16be(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Text of a PDF string without font information: UTF-16BE when it starts
/// with a BOM, UTF-8 when valid, Latin-1 otherwise.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return decode_utf16be(rest);
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        // PDFDocEncoding agrees with Latin-1 on the printable range.
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Decode raw content-stream bytes into [`ContentOp`]s. Needs no document,
/// so it can run away from the thread that owns one.
pub fn decode_ops(data: &[u8]) -> Result<Vec<ContentOp>, TocError> {
    let content = Content::decode(data)
        .map_err(|e| TocError::Parse(format!("content stream decode error: {}", e)))?;

    Ok(content
        .operations
        .into_iter()
        .map(|op| ContentOp {
            operator: op.operator,
            operands: op.operands.iter().map(convert_object).collect(),
        })
        .collect())
}

/// Page-level access used by the text-state machine in [`super::content`].
pub trait PdfBackend {
    /// 1-based page number to page object id.
    fn pages(&self) -> BTreeMap<u32, PageId>;

    fn page_fonts(&self, page: PageId) -> Result<Vec<BackendFontInfo>, TocError>;

    /// Concatenated, decompressed content streams of a page.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>, TocError>;

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, TocError>;

    /// Text of a string shown with `font_name` on `page`.
    fn decode_text(&self, page: PageId, font_name: &[u8], bytes: &[u8]) -> String;
}

/// [`PdfBackend`] over a parsed, unencrypted [`lopdf::Document`].
pub struct LopdfBackend {
    doc: lopdf::Document,
}

impl LopdfBackend {
    pub fn load_bytes(data: &[u8]) -> Result<Self, TocError> {
        let doc = lopdf::Document::load_mem(data).map_err(|e| TocError::Parse(e.to_string()))?;
        Self::from_document(doc)
    }

    pub fn from_document(doc: lopdf::Document) -> Result<Self, TocError> {
        if doc.is_encrypted() {
            return Err(TocError::Encrypted);
        }
        Ok(Self { doc })
    }

    pub fn raw_doc(&self) -> &lopdf::Document {
        &self.doc
    }

    fn uses_identity_encoding(&self, page: PageId, font_name: &[u8]) -> bool {
        let Ok(fonts) = self.doc.get_page_fonts(page) else {
            return false;
        };
        fonts
            .get(font_name)
            .and_then(|font| font.get(b"Encoding").ok())
            .and_then(|enc| enc.as_name().ok())
            .is_some_and(|name| name.starts_with(b"Identity"))
    }
}

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn page_fonts(&self, page: PageId) -> Result<Vec<BackendFontInfo>, TocError> {
        let fonts = self
            .doc
            .get_page_fonts(page)
            .map_err(|e| TocError::Parse(format!("cannot get page fonts: {}", e)))?;

        Ok(fonts
            .iter()
            .map(|(name, dict)| BackendFontInfo {
                name: name.clone(),
                base_font: dict
                    .get(b"BaseFont")
                    .and_then(|o| o.as_name())
                    .ok()
                    .map(|n| String::from_utf8_lossy(n).into_owned()),
            })
            .collect())
    }

    fn page_content(&self, page: PageId) -> Result<Vec<u8>, TocError> {
        self.doc
            .get_page_content(page)
            .map_err(|e| TocError::Parse(format!("cannot get page content: {}", e)))
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, TocError> {
        decode_ops(data)
    }

    fn decode_text(&self, page: PageId, font_name: &[u8], bytes: &[u8]) -> String {
        // Identity-H/V strings are 2-byte codes; many producers map them
        // straight to UTF-16.
        if bytes.len() >= 2 && bytes.len() % 2 == 0 && self.uses_identity_encoding(page, font_name) {
            let decoded = decode_utf16be(bytes);
            if !decoded.chars().all(|c| c == '\u{FFFD}' || c == '\0') {
                return decoded;
            }
        }
        decode_text_simple(bytes)
    }
}
