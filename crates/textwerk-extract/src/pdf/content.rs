// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content-stream walker producing positioned text spans.
//
// Tracks the text and line matrices through BT/ET, Tf, TL, Td/TD, Tm and T*,
// and emits one span per shown string (Tj, TJ, ', "). Positions are in PDF
// user space, y grows upwards.

use std::collections::BTreeMap;

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use textwerk_core::error::{Result, TextwerkError};

use super::reader::PdfReader;

/// TJ adjustments beyond this many thousandths of an em read as a word gap.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// A run of text shown at one position.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    pub x: f32,
    pub y: f32,
    /// Font size after the text matrix scale.
    pub font_size: f32,
}

impl TextSpan {
    /// Rough right edge; glyph widths average about half an em.
    pub fn end_x(&self) -> f32 {
        self.x + self.text.chars().count() as f32 * self.font_size * 0.5
    }
}

/// Spans sharing a baseline, left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub y: f32,
    pub font_size: f32,
    pub spans: Vec<TextSpan>,
}

impl TextLine {
    pub fn text(&self) -> String {
        let mut out = String::new();
        let mut previous_end: Option<f32> = None;
        for span in &self.spans {
            if let Some(end) = previous_end {
                let gap = span.x - end;
                if gap > span.font_size * 0.15 && !out.ends_with(' ') && !span.text.starts_with(' ')
                {
                    out.push(' ');
                }
            }
            out.push_str(&span.text);
            previous_end = Some(span.end_x());
        }
        out.trim().to_owned()
    }
}

#[derive(Debug, Clone, Copy)]
struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn translated(&self, tx: f32, ty: f32) -> Self {
        Self {
            e: self.e + tx * self.a + ty * self.c,
            f: self.f + tx * self.b + ty * self.d,
            ..*self
        }
    }

    fn vertical_scale(&self) -> f32 {
        (self.b * self.b + self.d * self.d).sqrt()
    }
}

#[derive(Debug)]
struct TextState {
    text_matrix: Matrix,
    line_matrix: Matrix,
    font: Vec<u8>,
    font_size: f32,
    leading: f32,
    in_text: bool,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            font: Vec::new(),
            font_size: 12.0,
            leading: 0.0,
            in_text: false,
        }
    }
}

impl TextState {
    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = self.line_matrix.translated(tx, ty);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = if self.leading > 0.0 {
            self.leading
        } else {
            self.font_size * 1.2
        };
        self.move_line(0.0, -leading);
    }

    fn effective_size(&self) -> f32 {
        (self.font_size * self.text_matrix.vertical_scale()).abs()
    }
}

/// Walk a page's content stream and collect its text spans.
pub fn page_spans(reader: &PdfReader, page_id: ObjectId) -> Result<Vec<TextSpan>> {
    let document = reader.document();
    let fonts = document.get_page_fonts(page_id).map_err(|err| {
        TextwerkError::PdfError(format!("cannot read fonts of page {:?}: {}", page_id, err))
    })?;
    let raw = reader.page_content(page_id)?;
    let content = Content::decode(&raw).map_err(|err| {
        TextwerkError::PdfError(format!("cannot decode content of page {:?}: {}", page_id, err))
    })?;

    let mut spans = Vec::new();
    let mut state = TextState::default();

    for op in &content.operations {
        let operands = &op.operands;
        match op.operator.as_str() {
            "BT" => {
                state.in_text = true;
                state.text_matrix = Matrix::IDENTITY;
                state.line_matrix = Matrix::IDENTITY;
            }
            "ET" => state.in_text = false,
            "Tf" if operands.len() >= 2 => {
                if let Object::Name(name) = &operands[0] {
                    state.font = name.clone();
                }
                state.font_size = number(&operands[1]).unwrap_or(12.0);
            }
            "TL" => {
                if let Some(leading) = operands.first().and_then(number) {
                    state.leading = leading;
                }
            }
            "Td" | "TD" if operands.len() >= 2 => {
                let tx = number(&operands[0]).unwrap_or(0.0);
                let ty = number(&operands[1]).unwrap_or(0.0);
                if op.operator == "TD" {
                    state.leading = -ty;
                }
                state.move_line(tx, ty);
            }
            "Tm" if operands.len() >= 6 => {
                let m = Matrix {
                    a: number(&operands[0]).unwrap_or(1.0),
                    b: number(&operands[1]).unwrap_or(0.0),
                    c: number(&operands[2]).unwrap_or(0.0),
                    d: number(&operands[3]).unwrap_or(1.0),
                    e: number(&operands[4]).unwrap_or(0.0),
                    f: number(&operands[5]).unwrap_or(0.0),
                };
                state.text_matrix = m;
                state.line_matrix = m;
            }
            "T*" => state.next_line(),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    let text = decode_with_font(document, &fonts, &state.font, bytes);
                    emit(&mut spans, &mut state, text);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    let text = decode_tj_array(document, &fonts, &state.font, items);
                    emit(&mut spans, &mut state, text);
                }
            }
            "'" => {
                state.next_line();
                if let Some(Object::String(bytes, _)) = operands.first() {
                    let text = decode_with_font(document, &fonts, &state.font, bytes);
                    emit(&mut spans, &mut state, text);
                }
            }
            "\"" => {
                state.next_line();
                if let Some(Object::String(bytes, _)) = operands.get(2) {
                    let text = decode_with_font(document, &fonts, &state.font, bytes);
                    emit(&mut spans, &mut state, text);
                }
            }
            _ => {}
        }
    }

    Ok(spans)
}

fn emit(spans: &mut Vec<TextSpan>, state: &mut TextState, text: String) {
    if !state.in_text || text.trim().is_empty() {
        return;
    }
    let span = TextSpan {
        x: state.text_matrix.e,
        y: state.text_matrix.f,
        font_size: state.effective_size(),
        text,
    };
    // Advance past the shown text so consecutive strings keep their order.
    let advance = span.end_x() - span.x;
    state.text_matrix.e += advance;
    spans.push(span);
}

fn decode_with_font(
    document: &Document,
    fonts: &BTreeMap<Vec<u8>, &Dictionary>,
    font: &[u8],
    bytes: &[u8],
) -> String {
    let encoding = fonts
        .get(font)
        .and_then(|dict| dict.get_font_encoding(document).ok());
    match encoding {
        Some(encoding) => Document::decode_text(&encoding, bytes)
            .unwrap_or_else(|_| decode_text_simple(bytes)),
        None => decode_text_simple(bytes),
    }
}

fn decode_tj_array(
    document: &Document,
    fonts: &BTreeMap<Vec<u8>, &Dictionary>,
    font: &[u8],
    items: &[Object],
) -> String {
    let mut combined = String::new();
    for item in items {
        match item {
            Object::String(bytes, _) => {
                combined.push_str(&decode_with_font(document, fonts, font, bytes));
            }
            other => {
                // Negative adjustments move the pen right.
                if let Some(adjustment) = number(other)
                    && -adjustment > TJ_SPACE_THRESHOLD
                    && !combined.is_empty()
                    && !combined.ends_with(' ')
                {
                    combined.push(' ');
                }
            }
        }
    }
    combined
}

/// Group spans into baseline-sharing lines, top of the page first.
///
/// Two spans share a line when their baselines differ by at most 40% of the
/// larger font size.
pub fn group_lines(mut spans: Vec<TextSpan>) -> Vec<TextLine> {
    spans.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut lines: Vec<TextLine> = Vec::new();
    for span in spans {
        let joins_last = lines.last().is_some_and(|line| {
            let tolerance = line.font_size.max(span.font_size).max(1.0) * 0.4;
            (line.y - span.y).abs() <= tolerance
        });
        if joins_last && let Some(line) = lines.last_mut() {
            line.font_size = line.font_size.max(span.font_size);
            line.spans.push(span);
        } else {
            lines.push(TextLine {
                y: span.y,
                font_size: span.font_size,
                spans: vec![span],
            });
        }
    }
    for line in &mut lines {
        line.spans.sort_by(|a, b| a.x.total_cmp(&b.x));
    }
    lines
}

/// Numeric operand as `f32`.
pub fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Decode a PDF string without font information: UTF-16BE with BOM, then
/// UTF-8, then Latin-1.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    if let Some(body) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = body
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_owned(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}
