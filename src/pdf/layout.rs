//! Page text rebuilt from positioned text runs.
//!
//! Table cells are usually placed one by one with `Td` or `Tm`, so the
//! column structure only survives in the run positions. Runs are grouped
//! into lines by baseline, ordered by x, and joined with a tab wherever the
//! horizontal gap is wider than a space.

use std::collections::BTreeMap;

use lopdf::{Dictionary, Document, Encoding, Object, ObjectId};
use tracing::debug;

/// Average glyph advance, in ems, when the font carries no widths.
const GLYPH_WIDTH: f32 = 0.5;
/// Gap between runs, in ems, that opens a new cell.
const CELL_GAP: f32 = 1.0;
/// Gap that still reads as a word break inside a cell.
const WORD_GAP: f32 = 0.15;

/// A piece of text drawn at one position, in default user space.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub x: f32,
    /// Baseline.
    pub y: f32,
    pub width: f32,
    /// Font size after scaling.
    pub size: f32,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix([f32; 6]);

impl Matrix {
    const IDENTITY: Self = Self([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    fn translation(tx: f32, ty: f32) -> Self {
        Self([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    fn from_operands(operands: &[Object]) -> Option<Self> {
        let values: Vec<f32> = operands.iter().filter_map(|o| o.as_float().ok()).collect();
        let values: [f32; 6] = values.try_into().ok()?;
        Some(Self(values))
    }

    /// `self × other`, row-vector convention.
    fn then(self, other: Self) -> Self {
        let [a, b, c, d, e, f] = self.0;
        let [a2, b2, c2, d2, e2, f2] = other.0;
        Self([
            a * a2 + b * c2,
            a * b2 + b * d2,
            c * a2 + d * c2,
            c * b2 + d * d2,
            e * a2 + f * c2 + e2,
            e * b2 + f * d2 + f2,
        ])
    }
}

/// Decoding and glyph widths of one page font.
struct PageFont<'a> {
    encoding: Option<Encoding<'a>>,
    first_char: i64,
    widths: Vec<f32>,
    composite: bool,
}

impl<'a> PageFont<'a> {
    fn load(doc: &'a Document, font: &'a Dictionary) -> Self {
        let encoding = font
            .get_font_encoding(doc)
            .map_err(|e| debug!("unsupported font encoding: {e}"))
            .ok();
        let widths = font
            .get_deref(b"Widths", doc)
            .and_then(Object::as_array)
            .map(|w| w.iter().map(|o| o.as_float().unwrap_or(0.0)).collect())
            .unwrap_or_default();
        Self {
            encoding,
            first_char: font.get(b"FirstChar").and_then(Object::as_i64).unwrap_or(0),
            widths,
            composite: font
                .get(b"Subtype")
                .and_then(Object::as_name)
                .is_ok_and(|subtype| subtype == b"Type0"),
        }
    }

    fn decode(&self, bytes: &[u8]) -> String {
        self.encoding
            .as_ref()
            .and_then(|enc| Document::decode_text(enc, bytes).ok())
            .unwrap_or_else(|| latin1(bytes))
    }

    /// Advance of `bytes` in ems.
    fn advance(&self, bytes: &[u8], chars: usize) -> f32 {
        if self.composite || self.widths.is_empty() {
            return chars as f32 * GLYPH_WIDTH;
        }
        bytes
            .iter()
            .map(|&b| {
                usize::try_from(i64::from(b) - self.first_char)
                    .ok()
                    .and_then(|i| self.widths.get(i))
                    .map_or(GLYPH_WIDTH, |w| w / 1000.0)
            })
            .sum()
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Graphics and text state while walking a content stream.
struct TextCursor {
    ctm: Matrix,
    saved: Vec<Matrix>,
    tm: Matrix,
    tlm: Matrix,
    leading: f32,
    font_size: f32,
    runs: Vec<TextRun>,
}

impl TextCursor {
    fn new() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            saved: Vec::new(),
            tm: Matrix::IDENTITY,
            tlm: Matrix::IDENTITY,
            leading: 0.0,
            font_size: 1.0,
            runs: Vec::new(),
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.tlm = Matrix::translation(tx, ty).then(self.tlm);
        self.tm = self.tlm;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.leading);
    }

    fn shift(&mut self, ems: f32) {
        self.tm = Matrix::translation(ems * self.font_size, 0.0).then(self.tm);
    }

    fn show(&mut self, bytes: &[u8], font: Option<&PageFont<'_>>) {
        let text = font.map_or_else(|| latin1(bytes), |f| f.decode(bytes));
        let chars = text.chars().count();
        let advance = font.map_or(chars as f32 * GLYPH_WIDTH, |f| f.advance(bytes, chars));

        let [a, b, c, d, x, y] = self.tm.then(self.ctm).0;
        self.runs.push(TextRun {
            x,
            y,
            width: advance * self.font_size * a.hypot(b),
            size: (self.font_size * c.hypot(d)).max(1.0),
            text,
        });
        self.shift(advance);
    }
}

/// Positioned text runs of one page, in content-stream order.
pub fn page_runs(doc: &Document, page_id: ObjectId) -> lopdf::Result<Vec<TextRun>> {
    let fonts: BTreeMap<Vec<u8>, PageFont<'_>> = doc
        .get_page_fonts(page_id)?
        .into_iter()
        .map(|(name, font)| (name, PageFont::load(doc, font)))
        .collect();
    let content = doc.get_and_decode_page_content(page_id)?;

    let mut cursor = TextCursor::new();
    let mut font: Option<&PageFont<'_>> = None;
    for op in &content.operations {
        let operands = op.operands.as_slice();
        let number = |i: usize| operands.get(i).and_then(|o| o.as_float().ok());
        match op.operator.as_str() {
            "q" => cursor.saved.push(cursor.ctm),
            "Q" => cursor.ctm = cursor.saved.pop().unwrap_or(Matrix::IDENTITY),
            "cm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    cursor.ctm = m.then(cursor.ctm);
                }
            }
            "BT" => {
                cursor.tm = Matrix::IDENTITY;
                cursor.tlm = Matrix::IDENTITY;
            }
            "Tf" => {
                font = operands
                    .first()
                    .and_then(|o| o.as_name().ok())
                    .and_then(|name| fonts.get(name));
                if let Some(size) = number(1) {
                    cursor.font_size = size;
                }
            }
            "TL" => cursor.leading = number(0).unwrap_or(cursor.leading),
            "Td" | "TD" => {
                if let (Some(tx), Some(ty)) = (number(0), number(1)) {
                    if op.operator == "TD" {
                        cursor.leading = -ty;
                    }
                    cursor.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    cursor.tlm = m;
                    cursor.tm = m;
                }
            }
            "T*" => cursor.next_line(),
            "Tj" | "'" | "\"" => {
                if op.operator != "Tj" {
                    cursor.next_line();
                }
                if let Some(Object::String(bytes, _)) = operands.last() {
                    cursor.show(bytes, font);
                }
            }
            "TJ" => {
                for element in operands.first().and_then(|o| o.as_array().ok()).into_iter().flatten() {
                    match element {
                        Object::String(bytes, _) => cursor.show(bytes, font),
                        other => {
                            if let Ok(adjust) = other.as_float() {
                                cursor.shift(-adjust / 1000.0);
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }
    Ok(cursor.runs)
}

/// Lines of text, top to bottom, with cells separated by tabs.
pub fn layout_text(runs: &[TextRun]) -> String {
    let mut sorted: Vec<&TextRun> = runs.iter().filter(|r| !r.text.trim().is_empty()).collect();
    sorted.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut lines: Vec<Vec<&TextRun>> = Vec::new();
    for run in sorted {
        match lines.last_mut() {
            Some(line) if (line[0].y - run.y).abs() <= line[0].size.max(run.size) * 0.5 => {
                line.push(run)
            }
            _ => lines.push(vec![run]),
        }
    }

    let mut text = String::new();
    for line in &mut lines {
        line.sort_by(|a, b| a.x.total_cmp(&b.x));
        let mut end: Option<f32> = None;
        for run in line.iter() {
            if let Some(end) = end {
                let gap = run.x - end;
                if gap > CELL_GAP * run.size {
                    text.push('\t');
                } else if gap > WORD_GAP * run.size && !text.ends_with(' ') && !run.text.starts_with(' ') {
                    text.push(' ');
                }
            }
            text.push_str(&run.text);
            end = Some(end.map_or(run.x + run.width, |e| e.max(run.x + run.width)));
        }
        text.push('\n');
    }
    text
}

/// Text of one page with its layout rebuilt.
pub fn page_text(doc: &Document, page_id: ObjectId) -> lopdf::Result<String> {
    Ok(layout_text(&page_runs(doc, page_id)?))
}
