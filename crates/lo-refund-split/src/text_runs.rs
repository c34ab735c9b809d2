use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};

use crate::pdf_reader::{decode_pdf_bytes, page_font_encodings};

/// Average glyph advance as a fraction of the font size. Standard fonts are
/// not embedded with metrics we can rely on, so widths are estimates.
pub(crate) const AVERAGE_GLYPH_WIDTH: f32 = 0.5;

type Matrix = [f32; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// A piece of text shown at one position on the page, in default user space.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TextRun {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub font_size: f32,
    pub text: String,
}

impl TextRun {
    pub fn end(&self) -> f32 {
        self.x + self.width
    }
}

#[must_use]
pub(crate) fn estimate_text_width(text: &str, font_size: f32) -> f32 {
    #[allow(clippy::cast_precision_loss)]
    let chars = text.chars().count() as f32;
    chars * font_size * AVERAGE_GLYPH_WIDTH
}

fn multiply(left: Matrix, right: Matrix) -> Matrix {
    [
        left[0] * right[0] + left[1] * right[2],
        left[0] * right[1] + left[1] * right[3],
        left[2] * right[0] + left[3] * right[2],
        left[2] * right[1] + left[3] * right[3],
        left[4] * right[0] + left[5] * right[2] + right[4],
        left[4] * right[1] + left[5] * right[3] + right[5],
    ]
}

fn translation(tx: f32, ty: f32) -> Matrix {
    [1.0, 0.0, 0.0, 1.0, tx, ty]
}

#[allow(clippy::cast_precision_loss)]
fn operand_number(operand: &Object) -> Option<f32> {
    match operand {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}

fn operand_numbers<const N: usize>(operands: &[Object]) -> Option<[f32; N]> {
    if operands.len() < N {
        return None;
    }
    let mut values = [0.0; N];
    for (slot, operand) in values.iter_mut().zip(operands) {
        *slot = operand_number(operand)?;
    }
    Some(values)
}

fn shown_text(encoding: Option<&str>, operands: &[Object]) -> String {
    let mut text = String::new();
    for operand in operands {
        match operand {
            Object::String(bytes, _) => text.push_str(&decode_pdf_bytes(encoding, bytes)),
            Object::Array(items) => {
                for item in items {
                    match item {
                        Object::String(bytes, _) => {
                            text.push_str(&decode_pdf_bytes(encoding, bytes));
                        }
                        other => {
                            if operand_number(other).is_some_and(|kern| kern < -100.0) {
                                text.push(' ');
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }
    text
}

#[derive(Debug)]
struct TextState {
    ctm: Matrix,
    ctm_stack: Vec<Matrix>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    leading: f32,
    font_size: f32,
    /// Set after a show operator until the next positioning operator, so
    /// consecutive show operators extend one run.
    continues_run: bool,
}

impl TextState {
    fn new() -> Self {
        Self {
            ctm: IDENTITY,
            ctm_stack: Vec::new(),
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            leading: 0.0,
            font_size: 0.0,
            continues_run: false,
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = multiply(translation(tx, ty), self.line_matrix);
        self.text_matrix = self.line_matrix;
        self.continues_run = false;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.leading);
    }

    fn show(&mut self, text: String, runs: &mut Vec<TextRun>) {
        let rendering = multiply(self.text_matrix, self.ctm);
        let scale = rendering[0].hypot(rendering[1]);
        let font_size = self.font_size * if scale > 0.0 { scale } else { 1.0 };
        let advance = estimate_text_width(&text, self.font_size);
        self.text_matrix = multiply(translation(advance, 0.0), self.text_matrix);

        if self.continues_run {
            if let Some(last) = runs.last_mut() {
                last.width += estimate_text_width(&text, font_size);
                last.text.push_str(&text);
                return;
            }
        }

        self.continues_run = true;
        runs.push(TextRun {
            x: rendering[4],
            y: rendering[5],
            width: estimate_text_width(&text, font_size),
            font_size,
            text,
        });
    }
}

/// Text runs of a page with their approximate positions, in content order.
pub(crate) fn read_text_runs(document: &Document, page_id: ObjectId) -> Vec<TextRun> {
    let Ok(raw_content) = document.get_page_content(page_id) else {
        return Vec::new();
    };
    let Ok(content) = Content::decode(&raw_content) else {
        return Vec::new();
    };
    let encodings = page_font_encodings(document, page_id);

    let mut state = TextState::new();
    let mut runs = Vec::new();
    let mut encoding = None;

    for operation in &content.operations {
        let operands = operation.operands.as_slice();
        match operation.operator.as_str() {
            "q" => state.ctm_stack.push(state.ctm),
            "Q" => {
                if let Some(ctm) = state.ctm_stack.pop() {
                    state.ctm = ctm;
                }
            }
            "cm" => {
                if let Some(matrix) = operand_numbers::<6>(operands) {
                    state.ctm = multiply(matrix, state.ctm);
                }
            }
            "BT" => {
                state.text_matrix = IDENTITY;
                state.line_matrix = IDENTITY;
                state.continues_run = false;
            }
            "ET" => state.continues_run = false,
            "Tf" => {
                if let Some(font_name) = operands.first().and_then(|name| name.as_name().ok()) {
                    encoding = encodings.get(font_name).copied();
                }
                if let Some(size) = operands.get(1).and_then(operand_number) {
                    state.font_size = size;
                }
            }
            "TL" => {
                if let Some([leading]) = operand_numbers::<1>(operands) {
                    state.leading = leading;
                }
            }
            "Td" => {
                if let Some([tx, ty]) = operand_numbers::<2>(operands) {
                    state.move_line(tx, ty);
                }
            }
            "TD" => {
                if let Some([tx, ty]) = operand_numbers::<2>(operands) {
                    state.leading = -ty;
                    state.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(matrix) = operand_numbers::<6>(operands) {
                    state.line_matrix = matrix;
                    state.text_matrix = matrix;
                    state.continues_run = false;
                }
            }
            "T*" => state.next_line(),
            "Tj" | "TJ" => {
                state.show(shown_text(encoding, operands), &mut runs);
            }
            "'" => {
                state.next_line();
                state.show(shown_text(encoding, operands), &mut runs);
            }
            "\"" => {
                state.next_line();
                state.show(shown_text(encoding, operands.get(2..).unwrap_or_default()), &mut runs);
            }
            _ => {}
        }
    }

    runs.retain(|run| !run.text.trim().is_empty());
    runs
}
