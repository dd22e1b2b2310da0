//! The span stream: classified text fragments in document reading order.
//!
//! Spans are produced by an extraction backend and only read here. A document
//! is streamed as [`Page`]s, each holding [`Block`]s of [`Line`]s of [`Span`]s,
//! which is the same block granularity the greedy heading rules expand to.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Style flags of a span.
///
/// The bit layout is `superscript = 1`, `italic = 2`, `serif = 4`,
/// `monospace = 8`, `bold = 16`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanFlags {
    pub superscript: bool,
    pub italic: bool,
    pub serif: bool,
    pub monospace: bool,
    pub bold: bool,
}

impl SpanFlags {
    pub const SUPERSCRIPT: u32 = 0b00001;
    pub const ITALIC: u32 = 0b00010;
    pub const SERIF: u32 = 0b00100;
    pub const MONOSPACE: u32 = 0b01000;
    pub const BOLD: u32 = 0b10000;

    pub fn from_bits(bits: u32) -> Self {
        SpanFlags {
            superscript: bits & Self::SUPERSCRIPT != 0,
            italic: bits & Self::ITALIC != 0,
            serif: bits & Self::SERIF != 0,
            monospace: bits & Self::MONOSPACE != 0,
            bold: bits & Self::BOLD != 0,
        }
    }

    pub fn bits(&self) -> u32 {
        let mut bits = 0;
        if self.superscript {
            bits |= Self::SUPERSCRIPT;
        }
        if self.italic {
            bits |= Self::ITALIC;
        }
        if self.serif {
            bits |= Self::SERIF;
        }
        if self.monospace {
            bits |= Self::MONOSPACE;
        }
        if self.bold {
            bits |= Self::BOLD;
        }
        bits
    }
}

/// A 24-bit RGB color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(u32);

impl Color {
    pub const BLACK: Self = Color(0);

    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Color(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    /// Build a color from a raw value, dropping anything above 24 bits.
    pub fn from_u32(value: u32) -> Self {
        Color(value & 0x00FF_FFFF)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#08x}", self.0)
    }
}

/// Bounding box in document units, measured from the top-left of the page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

/// Total order of spans within a document: page, then block, line and span
/// in reading order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PositionKey {
    pub page: usize,
    pub block: usize,
    pub line: usize,
    pub span: usize,
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "p{}:b{}:l{}:s{}",
            self.page, self.block, self.line, self.span
        )
    }
}

/// The smallest run of extracted text with uniform font and position
/// attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    pub font_name: String,
    pub font_size: f64,
    pub flags: SpanFlags,
    pub color: Color,
    pub bbox: BBox,
    /// 1-based page number.
    pub page: usize,
    pub key: PositionKey,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub spans: Vec<Span>,
}

impl Line {
    pub fn new(spans: Vec<Span>) -> Self {
        Line { spans }
    }
}

/// A group of lines the extraction backend considers one paragraph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub lines: Vec<Line>,
}

impl Block {
    pub fn new(lines: Vec<Line>) -> Self {
        Block { lines }
    }

    pub fn spans(&self) -> impl Iterator<Item = &Span> {
        self.lines.iter().flat_map(|line| line.spans.iter())
    }

    /// All span texts of the block, each trimmed, joined with single spaces.
    pub fn text(&self) -> String {
        self.spans()
            .map(|span| span.text.trim())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based page number.
    pub number: usize,
    pub blocks: Vec<Block>,
}

impl Page {
    pub fn new(number: usize, blocks: Vec<Block>) -> Self {
        Page { number, blocks }
    }

    pub fn spans(&self) -> impl Iterator<Item = &Span> {
        self.blocks.iter().flat_map(|block| block.spans())
    }
}
