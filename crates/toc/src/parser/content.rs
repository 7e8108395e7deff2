//! Text-content extraction from page content streams.
//!
//! Walks a page's content-stream operators with a simplified PDF text-state
//! machine and produces [`TextItem`]s whose `transform` mirrors what pdf.js
//! reports for a text run: the font-size matrix composed with the text
//! matrix and the current transformation matrix (`q`/`Q`/`cm`), so
//! `|transform[0]|` is the rendered glyph size and `(e, f)` the origin in
//! default user space.
//! All I/O lives behind the [`PdfBackend`] trait supplied by the caller.

use super::backend::{
    decode_text_simple, get_number_from_value, BackendFontInfo, ContentOp, PdfBackend,
};
use crate::types::{PageId, PdfValue, TextItem};
use crate::TocError;

/// Approximate character width as a fraction of font size when no better
/// metric is available.
const APPROX_CHAR_WIDTH_RATIO: f32 = 0.5;

/// The identity 2x3 text matrix: [a, b, c, d, tx, ty].
const IDENTITY_MATRIX: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// `lhs × rhs` for PDF's row-vector matrices: a point goes through `lhs`
/// first, then `rhs`.
fn multiply(lhs: [f32; 6], rhs: [f32; 6]) -> [f32; 6] {
    [
        lhs[0] * rhs[0] + lhs[1] * rhs[2],
        lhs[0] * rhs[1] + lhs[1] * rhs[3],
        lhs[2] * rhs[0] + lhs[3] * rhs[2],
        lhs[2] * rhs[1] + lhs[3] * rhs[3],
        lhs[4] * rhs[0] + lhs[5] * rhs[2] + rhs[4],
        lhs[4] * rhs[1] + lhs[5] * rhs[3] + rhs[5],
    ]
}

fn matrix_operands(operands: &[PdfValue]) -> Option<[f32; 6]> {
    let vals: Vec<f32> = operands
        .iter()
        .take(6)
        .filter_map(get_number_from_value)
        .collect();
    <[f32; 6]>::try_from(vals).ok()
}

// ---------------------------------------------------------------------------
// Internal: PDF text-state machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct TextState {
    /// Current font resource name (the `/F1`-style key).
    font_key: Vec<u8>,
    /// Resolved base-font name for the current font.
    font_name: String,
    font_size: f32,
    text_matrix: [f32; 6],
    /// Set by BT and updated by Td/TD/T*/Tm.
    line_matrix: [f32; 6],
    /// Horizontal scaling factor (percent / 100).
    horiz_scale: f32,
    char_spacing: f32,
    word_spacing: f32,
    text_rise: f32,
    leading: f32,
    /// Current transformation matrix. Not reset by BT.
    ctm: [f32; 6],
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_key: Vec::new(),
            font_name: String::new(),
            font_size: 0.0,
            text_matrix: IDENTITY_MATRIX,
            line_matrix: IDENTITY_MATRIX,
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            text_rise: 0.0,
            leading: 0.0,
            ctm: IDENTITY_MATRIX,
        }
    }
}

impl TextState {
    /// The pdf.js-style transform of a run starting at the current position.
    fn run_transform(&self) -> [f32; 6] {
        let fs = self.font_size;
        let text_space = [fs * self.horiz_scale, 0.0, 0.0, fs, 0.0, self.text_rise];
        multiply(multiply(text_space, self.text_matrix), self.ctm)
    }

    fn advance_x(&mut self, dx: f32) {
        self.text_matrix[4] += dx * self.text_matrix[0];
        self.text_matrix[5] += dx * self.text_matrix[1];
    }

    /// Multiply the text line matrix by a translation (Td / TD / T*).
    fn translate_line(&mut self, tx: f32, ty: f32) {
        let new_tx = self.line_matrix[0] * tx + self.line_matrix[2] * ty + self.line_matrix[4];
        let new_ty = self.line_matrix[1] * tx + self.line_matrix[3] * ty + self.line_matrix[5];
        self.line_matrix[4] = new_tx;
        self.line_matrix[5] = new_ty;
        self.text_matrix = self.line_matrix;
    }

    fn set_font(&mut self, key: Vec<u8>, base_font: &str, size: f32) {
        self.font_key = key;
        self.font_size = size;
        self.font_name = base_font.to_string();
    }

    /// Advance past `text` using an approximate glyph width.
    fn advance_after_show(&mut self, text: &str) {
        let mut total_dx: f32 = 0.0;
        for ch in text.chars() {
            total_dx += self.font_size * APPROX_CHAR_WIDTH_RATIO * self.horiz_scale;
            total_dx += self.char_spacing;
            if ch == ' ' {
                total_dx += self.word_spacing;
            }
        }
        self.advance_x(total_dx);
    }
}

fn resolve_font<'a>(key: &[u8], fonts: &'a [BackendFontInfo]) -> Option<&'a BackendFontInfo> {
    fonts.iter().find(|info| info.name == key)
}

fn decode_string(
    val: &PdfValue,
    backend: &dyn PdfBackend,
    page_id: PageId,
    font_key: &[u8],
) -> String {
    match val {
        PdfValue::Str(bytes) => {
            let decoded = backend.decode_text(page_id, font_key, bytes);
            if decoded.is_empty() {
                decode_text_simple(bytes)
            } else {
                decoded
            }
        }
        _ => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Walk a single page's content stream and produce its text items.
///
/// | Operator | Action |
/// |----------|--------|
/// | `q`/`Q`  | Save / restore the CTM |
/// | `cm`     | Concatenate onto the CTM |
/// | `BT`     | Begin text object -- reset matrices |
/// | `Tf`     | Set font and size |
/// | `Tm`     | Set text matrix directly |
/// | `Td`/`TD`/`T*` | Move the text position |
/// | `TL`/`Tc`/`Tw`/`Tz`/`Ts` | Leading, spacing, scaling, rise |
/// | `Tj`/`TJ`/`'`/`"` | Show text |
pub fn extract_page_items(
    backend: &dyn PdfBackend,
    page_id: PageId,
) -> Result<Vec<TextItem>, TocError> {
    let raw_content = backend.page_content(page_id)?;
    let ops = backend.decode_content(&raw_content)?;
    Ok(items_from_ops(backend, page_id, &ops))
}

/// Run the text-state machine over already decoded operators.
pub fn items_from_ops(backend: &dyn PdfBackend, page_id: PageId, ops: &[ContentOp]) -> Vec<TextItem> {
    let fonts = backend.page_fonts(page_id).unwrap_or_default();

    let mut state = TextState::default();
    let mut saved_ctm: Vec<[f32; 6]> = Vec::new();
    let mut items: Vec<TextItem> = Vec::new();

    for op in ops {
        match op.operator.as_str() {
            "q" => saved_ctm.push(state.ctm),
            "Q" => {
                if let Some(ctm) = saved_ctm.pop() {
                    state.ctm = ctm;
                }
            }
            "cm" => {
                if let Some(m) = matrix_operands(&op.operands) {
                    state.ctm = multiply(m, state.ctm);
                }
            }
            "BT" => {
                state.text_matrix = IDENTITY_MATRIX;
                state.line_matrix = IDENTITY_MATRIX;
            }
            "Tf" => handle_tf(&op.operands, &fonts, &mut state),
            "Tm" => handle_tm(&op.operands, &mut state),
            "Td" | "TD" => {
                if op.operands.len() >= 2 {
                    let tx = get_number_from_value(&op.operands[0]).unwrap_or(0.0);
                    let ty = get_number_from_value(&op.operands[1]).unwrap_or(0.0);
                    if op.operator == "TD" {
                        state.leading = -ty;
                    }
                    state.translate_line(tx, ty);
                }
            }
            "T*" => state.translate_line(0.0, -state.leading),
            "TL" => {
                if let Some(v) = op.operands.first().and_then(get_number_from_value) {
                    state.leading = v;
                }
            }
            "Tc" => {
                if let Some(v) = op.operands.first().and_then(get_number_from_value) {
                    state.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some(v) = op.operands.first().and_then(get_number_from_value) {
                    state.word_spacing = v;
                }
            }
            "Tz" => {
                if let Some(v) = op.operands.first().and_then(get_number_from_value) {
                    state.horiz_scale = v / 100.0;
                }
            }
            "Ts" => {
                if let Some(v) = op.operands.first().and_then(get_number_from_value) {
                    state.text_rise = v;
                }
            }
            "Tj" => {
                if let Some(first) = op.operands.first() {
                    emit_show_string(first, backend, page_id, &mut state, &mut items);
                }
            }
            "TJ" => {
                if let Some(PdfValue::Array(arr)) = op.operands.first() {
                    handle_tj_array(arr, backend, page_id, &mut state, &mut items);
                }
            }
            "'" => {
                state.translate_line(0.0, -state.leading);
                if let Some(first) = op.operands.first() {
                    emit_show_string(first, backend, page_id, &mut state, &mut items);
                }
            }
            "\"" => {
                if op.operands.len() >= 3 {
                    if let Some(aw) = get_number_from_value(&op.operands[0]) {
                        state.word_spacing = aw;
                    }
                    if let Some(ac) = get_number_from_value(&op.operands[1]) {
                        state.char_spacing = ac;
                    }
                    state.translate_line(0.0, -state.leading);
                    emit_show_string(&op.operands[2], backend, page_id, &mut state, &mut items);
                }
            }
            _ => {}
        }
    }

    items
}

fn handle_tf(operands: &[PdfValue], fonts: &[BackendFontInfo], state: &mut TextState) {
    if operands.len() < 2 {
        return;
    }
    let key = match &operands[0] {
        PdfValue::Name(n) => n.clone(),
        PdfValue::Str(s) => s.clone(),
        _ => return,
    };
    let size = get_number_from_value(&operands[1]).unwrap_or(0.0);
    match resolve_font(&key, fonts).and_then(|info| info.base_font.clone()) {
        Some(base) => state.set_font(key, &base, size),
        None => {
            // Font not in the resource dictionary -- keep the key as the name.
            let name = String::from_utf8_lossy(&key).to_string();
            state.set_font(key, &name, size);
        }
    }
}

fn handle_tm(operands: &[PdfValue], state: &mut TextState) {
    if let Some(m) = matrix_operands(operands) {
        state.text_matrix = m;
        state.line_matrix = m;
    }
}

fn push_item(text: String, transform: [f32; 6], state: &TextState, items: &mut Vec<TextItem>) {
    items.push(TextItem {
        text,
        transform,
        font_name: state.font_name.clone(),
    });
}

fn emit_show_string(
    operand: &PdfValue,
    backend: &dyn PdfBackend,
    page_id: PageId,
    state: &mut TextState,
    items: &mut Vec<TextItem>,
) {
    let text = decode_string(operand, backend, page_id, &state.font_key);
    if text.is_empty() {
        return;
    }
    let transform = state.run_transform();
    state.advance_after_show(&text);
    push_item(text, transform, state, items);
}

/// Process a `TJ` array: strings to render interleaved with kerning
/// adjustments in thousandths of a text-space unit. One item is emitted per
/// array; large negative adjustments become spaces.
fn handle_tj_array(
    arr: &[PdfValue],
    backend: &dyn PdfBackend,
    page_id: PageId,
    state: &mut TextState,
    items: &mut Vec<TextItem>,
) {
    let mut buf = String::new();
    let mut transform = state.run_transform();

    for elem in arr {
        match elem {
            PdfValue::Str(_) => {
                let fragment = decode_string(elem, backend, page_id, &state.font_key);
                if buf.is_empty() {
                    transform = state.run_transform();
                }
                buf.push_str(&fragment);
                state.advance_after_show(&fragment);
            }
            val => {
                if let Some(adj) = get_number_from_value(val) {
                    let dx = -adj / 1000.0 * state.font_size * state.horiz_scale;
                    let gap_threshold =
                        state.font_size * APPROX_CHAR_WIDTH_RATIO * state.horiz_scale * 0.3;
                    if dx > gap_threshold && !buf.is_empty() {
                        buf.push(' ');
                    }
                    state.advance_x(dx);
                }
            }
        }
    }

    let trimmed = buf.trim_end();
    if !trimmed.is_empty() {
        push_item(trimmed.to_string(), transform, state, items);
    }
}
