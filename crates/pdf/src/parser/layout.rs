//! Span extraction and reading-order layout.
//!
//! A page's content stream is walked with a small text-state machine that
//! emits one [`TextRun`] per shown string. Runs are then grouped into lines
//! by baseline, merged into style-uniform spans, and grouped into blocks by
//! vertical gap and size change:
//!
//! ```text
//! content ops  ->  TextRun[]  ->  lines  ->  Block[]  ->  Page
//!   (per page)     extract        group      group
//! ```
//!
//! Everything here is a pure transformation over what a [`PdfBackend`]
//! returns.

use std::collections::HashMap;

use tocgen_core::meta::strip_subset_prefix;
use tocgen_core::span::{BBox, Block, Color, Line, Page, PositionKey, Span, SpanFlags};

use super::backend::{get_number_from_value, BackendFontInfo, PageId, PdfBackend, PdfValue};
use super::cleanup::clean_span_text;
use crate::PdfError;

/// One shown string, in PDF user space (origin bottom-left).
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub x: f32,
    /// Baseline, without text rise.
    pub y: f32,
    pub rise: f32,
    pub width: f32,
    pub font_size: f32,
    /// `/BaseFont` as declared, subset tag included.
    pub font_name: String,
    pub flags: SpanFlags,
    pub color: Color,
}

impl TextRun {
    fn same_style(&self, other: &TextRun) -> bool {
        self.font_name == other.font_name
            && (self.font_size - other.font_size).abs() < SAME_SIZE_EPSILON
            && self.flags == other.flags
            && self.color == other.color
            && (self.rise - other.rise).abs() < SAME_SIZE_EPSILON
    }
}

/// Runs whose baselines differ by less than this share a line.
const Y_TOLERANCE: f32 = 1.0;

/// Character width as a fraction of font size when no metrics are known.
const APPROX_CHAR_WIDTH_RATIO: f32 = 0.5;

/// Gap (points) above which a space separates two merged runs.
const MIN_WORD_GAP: f32 = 1.5;

/// A vertical gap larger than this multiple of the font size starts a new
/// block.
const BLOCK_GAP_FACTOR: f32 = 1.4;

/// A line whose dominant size differs from the previous line's by more than
/// this starts a new block.
const BLOCK_SIZE_CHANGE: f32 = 0.5;

const SAME_SIZE_EPSILON: f32 = 0.01;

/// Returns `true` if `c` belongs to a script written without inter-word
/// spaces (CJK, Hiragana, Katakana, Hangul, Thai and neighbours).
pub fn is_spaceless_script_char(c: char) -> bool {
    matches!(
        c as u32,
        0x4E00..=0x9FFF
        | 0x3400..=0x4DBF
        | 0x20000..=0x2A6DF
        | 0xF900..=0xFAFF
        | 0x3040..=0x30FF
        | 0x31F0..=0x31FF
        | 0xAC00..=0xD7AF
        | 0x1100..=0x11FF
        | 0x3130..=0x318F
        | 0x3000..=0x303F
        | 0xFF00..=0xFFEF
        | 0x0E00..=0x0EFF
        | 0x1000..=0x109F
        | 0x1780..=0x17FF
        | 0x0F00..=0x0FFF
    )
}

// ---------------------------------------------------------------------------
// Text-state machine
// ---------------------------------------------------------------------------

const IDENTITY_MATRIX: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

#[derive(Debug, Clone)]
struct TextState {
    font_key: Vec<u8>,
    font_name: String,
    font_size: f32,
    font_flags: SpanFlags,
    text_matrix: [f32; 6],
    line_matrix: [f32; 6],
    horiz_scale: f32,
    char_spacing: f32,
    word_spacing: f32,
    text_rise: f32,
    leading: f32,
    fill: Color,
    /// Fill colors saved by `q`.
    saved_fill: Vec<Color>,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_key: Vec::new(),
            font_name: String::new(),
            font_size: 0.0,
            font_flags: SpanFlags::default(),
            text_matrix: IDENTITY_MATRIX,
            line_matrix: IDENTITY_MATRIX,
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            text_rise: 0.0,
            leading: 0.0,
            fill: Color::BLACK,
            saved_fill: Vec::new(),
        }
    }
}

impl TextState {
    fn x(&self) -> f32 {
        self.text_matrix[4]
    }

    fn y(&self) -> f32 {
        self.text_matrix[5]
    }

    /// `font_size * sqrt(b^2 + d^2)` of the text matrix.
    fn effective_font_size(&self) -> f32 {
        let scale = (self.text_matrix[1].powi(2) + self.text_matrix[3].powi(2)).sqrt();
        (self.font_size * scale).abs()
    }

    fn advance_x(&mut self, dx: f32) {
        self.text_matrix[4] += dx * self.text_matrix[0];
        self.text_matrix[5] += dx * self.text_matrix[1];
    }

    /// Td / TD: translate the line matrix and restart the text matrix there.
    fn translate_line(&mut self, tx: f32, ty: f32) {
        let new_tx = self.line_matrix[0] * tx + self.line_matrix[2] * ty + self.line_matrix[4];
        let new_ty = self.line_matrix[1] * tx + self.line_matrix[3] * ty + self.line_matrix[5];
        self.line_matrix[4] = new_tx;
        self.line_matrix[5] = new_ty;
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.translate_line(0.0, -self.leading);
    }

    fn set_font(&mut self, key: Vec<u8>, info: Option<&BackendFontInfo>, size: f32) {
        let base_font = info
            .and_then(|info| info.base_font.clone())
            .unwrap_or_else(|| String::from_utf8_lossy(&key).into_owned());
        self.font_flags = font_flags(&base_font, info);
        self.font_name = base_font;
        self.font_key = key;
        self.font_size = size;
    }

    fn span_flags(&self) -> SpanFlags {
        SpanFlags {
            superscript: self.text_rise > 0.0,
            ..self.font_flags
        }
    }

    fn text_width(&self, text: &str) -> f32 {
        text.chars().count() as f32 * self.font_size * APPROX_CHAR_WIDTH_RATIO * self.horiz_scale
    }

    /// Move past `text` and return the displacement.
    fn advance_after_show(&mut self, text: &str) -> f32 {
        let char_w = self.font_size * APPROX_CHAR_WIDTH_RATIO * self.horiz_scale;
        let dx: f32 = text
            .chars()
            .map(|ch| char_w + self.char_spacing + if ch == ' ' { self.word_spacing } else { 0.0 })
            .sum();
        self.advance_x(dx);
        dx
    }

    fn run(&self, text: String, x: f32) -> TextRun {
        TextRun {
            width: self.text_width(&text),
            text,
            x,
            y: self.y(),
            rise: self.text_rise,
            font_size: self.effective_font_size(),
            font_name: self.font_name.clone(),
            flags: self.span_flags(),
            color: self.fill,
        }
    }
}

/// Style flags implied by a font, from its descriptor when present and its
/// name otherwise.
fn font_flags(base_font: &str, info: Option<&BackendFontInfo>) -> SpanFlags {
    let upper = strip_subset_prefix(base_font).to_uppercase();
    let has = |flag| info.is_some_and(|info| info.has_flag(flag));
    let named = |needles: &[&str]| needles.iter().any(|n| upper.contains(n));

    let monospace = has(BackendFontInfo::FIXED_PITCH) || named(&["COURIER", "MONO", "CONSOLAS"]);
    SpanFlags {
        superscript: false,
        italic: has(BackendFontInfo::ITALIC) || named(&["ITALIC", "OBLIQUE"]),
        serif: has(BackendFontInfo::SERIF)
            || (!monospace
                && !upper.contains("SANS")
                && named(&["TIMES", "SERIF", "GEORGIA", "GARAMOND", "PALATINO", "CAMBRIA", "CMR"])),
        monospace,
        bold: has(BackendFontInfo::FORCE_BOLD) || named(&["BOLD", "BLACK", "HEAVY"]),
    }
}

fn color_component(value: &PdfValue) -> u8 {
    let v = get_number_from_value(value).unwrap_or(0.0).clamp(0.0, 1.0);
    (v * 255.0).round() as u8
}

/// Fill color from `g`, `rg`, `k` or `sc`/`scn` operands, picked by arity.
fn fill_color(operands: &[PdfValue]) -> Option<Color> {
    let nums: Vec<&PdfValue> = operands
        .iter()
        .filter(|v| get_number_from_value(v).is_some())
        .collect();
    match nums.as_slice() {
        [gray] => {
            let g = color_component(gray);
            Some(Color::from_rgb(g, g, g))
        }
        [r, g, b] => Some(Color::from_rgb(
            color_component(r),
            color_component(g),
            color_component(b),
        )),
        [c, m, y, k] => {
            let k = get_number_from_value(k).unwrap_or(0.0).clamp(0.0, 1.0);
            let channel = |v: &PdfValue| {
                let v = get_number_from_value(v).unwrap_or(0.0).clamp(0.0, 1.0);
                ((1.0 - v) * (1.0 - k) * 255.0).round() as u8
            };
            Some(Color::from_rgb(channel(c), channel(m), channel(y)))
        }
        _ => None,
    }
}

fn decode_string(val: &PdfValue, backend: &dyn PdfBackend, page_id: PageId, font_key: &[u8]) -> String {
    match val {
        PdfValue::Str(bytes) => backend.decode_text(page_id, font_key, bytes),
        _ => String::new(),
    }
}

fn number(operands: &[PdfValue], idx: usize) -> Option<f32> {
    operands.get(idx).and_then(get_number_from_value)
}

/// Walk one page's content stream and collect its [`TextRun`]s.
///
/// Handles the text operators `BT`, `Tf`, `Tm`, `Td`, `TD`, `T*`, `TL`,
/// `Tc`, `Tw`, `Tz`, `Ts`, `Tj`, `TJ`, `'` and `"`, plus the nonstroking
/// color operators and `q`/`Q` for the fill color. Everything else is
/// ignored.
pub fn extract_page_runs(backend: &dyn PdfBackend, page_id: PageId) -> Result<Vec<TextRun>, PdfError> {
    let raw_content = backend.page_content(page_id)?;
    let ops = backend.decode_content(&raw_content)?;
    let fonts = backend.page_fonts(page_id).unwrap_or_default();

    let mut state = TextState::default();
    let mut runs: Vec<TextRun> = Vec::new();

    for op in &ops {
        let operands = op.operands.as_slice();
        match op.operator.as_str() {
            "BT" => {
                state.text_matrix = IDENTITY_MATRIX;
                state.line_matrix = IDENTITY_MATRIX;
            }
            "q" => state.saved_fill.push(state.fill),
            "Q" => {
                if let Some(fill) = state.saved_fill.pop() {
                    state.fill = fill;
                }
            }
            "g" | "rg" | "k" | "sc" | "scn" => {
                if let Some(color) = fill_color(operands) {
                    state.fill = color;
                }
            }
            "Tf" => {
                let key = match operands.first() {
                    Some(PdfValue::Name(n)) => n.clone(),
                    _ => continue,
                };
                let size = number(operands, 1).unwrap_or(0.0);
                let info = fonts.iter().find(|info| info.name == key);
                state.set_font(key, info, size);
            }
            "Tm" => {
                let vals: Vec<f32> = operands.iter().filter_map(get_number_from_value).collect();
                if let [a, b, c, d, e, f] = vals[..] {
                    state.text_matrix = [a, b, c, d, e, f];
                    state.line_matrix = state.text_matrix;
                }
            }
            "Td" | "TD" => {
                if let (Some(tx), Some(ty)) = (number(operands, 0), number(operands, 1)) {
                    if op.operator == "TD" {
                        state.leading = -ty;
                    }
                    state.translate_line(tx, ty);
                }
            }
            "T*" => state.next_line(),
            "TL" => state.leading = number(operands, 0).unwrap_or(state.leading),
            "Tc" => state.char_spacing = number(operands, 0).unwrap_or(state.char_spacing),
            "Tw" => state.word_spacing = number(operands, 0).unwrap_or(state.word_spacing),
            "Tz" => {
                if let Some(v) = number(operands, 0) {
                    state.horiz_scale = v / 100.0;
                }
            }
            "Ts" => state.text_rise = number(operands, 0).unwrap_or(state.text_rise),
            "Tj" => {
                if let Some(first) = operands.first() {
                    show_string(first, backend, page_id, &mut state, &mut runs);
                }
            }
            "TJ" => {
                if let Some(PdfValue::Array(arr)) = operands.first() {
                    show_tj_array(arr, backend, page_id, &mut state, &mut runs);
                }
            }
            "'" => {
                state.next_line();
                if let Some(first) = operands.first() {
                    show_string(first, backend, page_id, &mut state, &mut runs);
                }
            }
            "\"" => {
                if let [aw, ac, text, ..] = operands {
                    state.word_spacing = get_number_from_value(aw).unwrap_or(state.word_spacing);
                    state.char_spacing = get_number_from_value(ac).unwrap_or(state.char_spacing);
                    state.next_line();
                    show_string(text, backend, page_id, &mut state, &mut runs);
                }
            }
            _ => {}
        }
    }

    log::trace!("page object {:?}: {} text runs", page_id, runs.len());
    Ok(runs)
}

fn show_string(
    operand: &PdfValue,
    backend: &dyn PdfBackend,
    page_id: PageId,
    state: &mut TextState,
    runs: &mut Vec<TextRun>,
) {
    let text = decode_string(operand, backend, page_id, &state.font_key);
    if text.is_empty() {
        return;
    }
    let x = state.x();
    state.advance_after_show(&text);
    runs.push(state.run(text, x));
}

/// `TJ`: strings interleaved with kerning adjustments in thousandths of a
/// text-space unit. A large enough negative adjustment reads as a space.
fn show_tj_array(
    arr: &[PdfValue],
    backend: &dyn PdfBackend,
    page_id: PageId,
    state: &mut TextState,
    runs: &mut Vec<TextRun>,
) {
    let mut buf = String::new();
    let mut run_x = state.x();

    for elem in arr {
        if let PdfValue::Str(_) = elem {
            let fragment = decode_string(elem, backend, page_id, &state.font_key);
            if buf.is_empty() {
                run_x = state.x();
            }
            buf.push_str(&fragment);
            state.advance_after_show(&fragment);
        } else if let Some(adj) = get_number_from_value(elem) {
            let dx = -adj / 1000.0 * state.font_size * state.horiz_scale;
            let gap_threshold = state.font_size * APPROX_CHAR_WIDTH_RATIO * state.horiz_scale * 0.3;
            if dx > gap_threshold && !buf.is_empty() {
                buf.push(' ');
            }
            state.advance_x(dx);
        }
    }

    let text = buf.trim_end();
    if !text.is_empty() {
        runs.push(state.run(text.to_string(), run_x));
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct RunLine {
    runs: Vec<TextRun>,
    y: f32,
    font_size: f32,
}

/// Group runs into lines, top of the page first, each line left to right.
fn group_runs_into_lines(mut runs: Vec<TextRun>) -> Vec<RunLine> {
    runs.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut lines: Vec<Vec<TextRun>> = Vec::new();
    for run in runs {
        match lines.last_mut() {
            Some(line) if (line[0].y - run.y).abs() <= Y_TOLERANCE => line.push(run),
            _ => lines.push(vec![run]),
        }
    }

    lines.into_iter().map(assemble_line).collect()
}

/// Sort a line left to right and merge neighbouring runs of the same style.
fn assemble_line(mut runs: Vec<TextRun>) -> RunLine {
    runs.sort_by(|a, b| a.x.total_cmp(&b.x));

    let mut merged: Vec<TextRun> = Vec::with_capacity(runs.len());
    for run in runs {
        if let Some(prev) = merged.last_mut() {
            let gap = run.x - (prev.x + prev.width);
            if prev.same_style(&run) && gap > -prev.font_size && gap < prev.font_size * 2.0 {
                if gap >= MIN_WORD_GAP && !boundary_is_spaceless(prev, &run) {
                    prev.text.push(' ');
                }
                prev.text.push_str(&run.text);
                prev.width = (run.x + run.width) - prev.x;
                continue;
            }
        }
        merged.push(run);
    }

    let y = merged.first().map(|r| r.y).unwrap_or(0.0);
    let font_size = dominant_font_size(&merged);
    RunLine {
        runs: merged,
        y,
        font_size,
    }
}

/// The font size covering the most characters.
fn dominant_font_size(runs: &[TextRun]) -> f32 {
    let mut counts: HashMap<i32, usize> = HashMap::new();
    for r in runs {
        let key = (r.font_size * 100.0).round() as i32;
        *counts.entry(key).or_insert(0) += r.text.chars().count();
    }
    counts
        .into_iter()
        .max_by_key(|(size, chars)| (*chars, *size))
        .map(|(k, _)| k as f32 / 100.0)
        .unwrap_or(0.0)
}

fn boundary_is_spaceless(prev: &TextRun, next: &TextRun) -> bool {
    match (prev.text.chars().next_back(), next.text.chars().next()) {
        (Some(l), Some(f)) => is_spaceless_script_char(l) && is_spaceless_script_char(f),
        _ => false,
    }
}

/// Group consecutive lines into blocks. A block ends at a vertical gap
/// wider than [`BLOCK_GAP_FACTOR`] times the font size, or where the
/// dominant size changes.
fn group_lines_into_blocks(lines: Vec<RunLine>) -> Vec<Vec<RunLine>> {
    let mut blocks: Vec<Vec<RunLine>> = Vec::new();
    for line in lines {
        let breaks = match blocks.last().and_then(|block| block.last()) {
            Some(prev) => {
                (prev.y - line.y).abs() > prev.font_size * BLOCK_GAP_FACTOR
                    || (prev.font_size - line.font_size).abs() > BLOCK_SIZE_CHANGE
            }
            None => true,
        };
        match blocks.last_mut() {
            Some(block) if !breaks => block.push(line),
            _ => blocks.push(vec![line]),
        }
    }
    blocks
}

/// Lay a page's runs out as a [`Page`] of spans in reading order.
///
/// Coordinates are flipped so that `bbox.top` is measured down from the top
/// edge of the MediaBox. Font names lose their subset tag.
pub fn layout_page(runs: Vec<TextRun>, number: usize, media_box: [f32; 4]) -> Page {
    let [llx, _, _, ury] = media_box;
    let blocks = group_lines_into_blocks(group_runs_into_lines(runs))
        .into_iter()
        .enumerate()
        .map(|(b, lines)| {
            let lines = lines
                .into_iter()
                .enumerate()
                .map(|(l, line)| {
                    let spans = line
                        .runs
                        .into_iter()
                        .enumerate()
                        .map(|(s, run)| {
                            let baseline = run.y + run.rise;
                            Span {
                                text: clean_span_text(&run.text),
                                font_name: run.font_name,
                                font_size: run.font_size as f64,
                                flags: run.flags,
                                color: run.color,
                                bbox: BBox {
                                    left: (run.x - llx) as f64,
                                    top: (ury - (baseline + run.font_size)) as f64,
                                    right: (run.x + run.width - llx) as f64,
                                    bottom: (ury - baseline) as f64,
                                },
                                page: number,
                                key: PositionKey {
                                    page: number,
                                    block: b,
                                    line: l,
                                    span: s,
                                },
                            }
                        })
                        .collect();
                    Line::new(spans)
                })
                .collect();
            Block::new(lines)
        })
        .collect();
    Page::new(number, blocks)
}

/// Extract page `number` (1-based) with id `page_id` into a [`Page`].
pub fn extract_page(backend: &dyn PdfBackend, number: usize, page_id: PageId) -> Result<Page, PdfError> {
    let runs = extract_page_runs(backend, page_id)?;
    let media_box = backend.media_box(page_id)?;
    let page = layout_page(runs, number, media_box);
    log::trace!("page {}: {} blocks", number, page.blocks.len());
    Ok(page)
}
