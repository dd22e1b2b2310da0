//! Plain-text notation for a [`TocTree`].
//!
//! One heading per line, indented by two spaces per level below 1, followed
//! by ` | <page>` and optionally ` | <vpos>`:
//!
//! ```text
//! Introduction | 1 | 72.0000
//!   Motivation | 2
//!       A level-4 heading under a level-2 one | 3
//! ```
//!
//! Indentation encodes the declared level, not the depth in the tree, which
//! is what lets [`parse`] rebuild the exact same forest with the shared
//! insertion routine.

use thiserror::Error;

use crate::toc::{HeadingLevel, ToCEntry, TocBuilder, TocTree};

const INDENT: &str = "  ";
const SEPARATOR: &str = " | ";

/// Decimal places used when writing a vertical position.
pub const VPOS_PRECISION: usize = 4;

/// Round `vpos` to what the notation can carry, so a dumped tree parses back
/// to identical values.
pub fn quantize_vpos(vpos: f64) -> f64 {
    let scale = 10f64.powi(VPOS_PRECISION as i32);
    (vpos * scale).round() / scale
}

#[derive(Debug, Error, PartialEq)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    /// 1-based line number.
    pub line: usize,
    pub kind: ParseErrorKind,
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseErrorKind {
    #[error("indentation must use spaces only")]
    Indentation,
    #[error("heading has no title")]
    MissingTitle,
    #[error("missing page number")]
    MissingPage,
    #[error("page number must be a positive integer, got {0:?}")]
    InvalidPage(String),
    #[error("vertical position must be a finite number, got {0:?}")]
    InvalidVpos(String),
    #[error("heading level {0} is out of range")]
    InvalidLevel(usize),
}

/// Join the lines of `text` with single spaces. A title must fit on one
/// notation line.
pub fn single_line(text: &str) -> String {
    text.split(['\n', '\r'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render `tree` in the editable notation. With `vpos`, entries that carry a
/// vertical position get a third field. Line breaks inside a title are
/// written as single spaces.
pub fn dump(tree: &TocTree, vpos: bool) -> String {
    let mut out = String::new();
    for (_, entry) in tree.iter() {
        out.push_str(&indent(entry));
        if entry.title.contains(['\n', '\r']) {
            out.push_str(&single_line(&entry.title));
        } else {
            out.push_str(&entry.title);
        }
        out.push_str(&format!("{}{}", SEPARATOR, entry.page));
        if let (true, Some(v)) = (vpos, entry.vpos) {
            out.push_str(&format!("{}{:.*}", SEPARATOR, VPOS_PRECISION, v));
        }
        out.push('\n');
    }
    out
}

/// Render `tree` for reading only. The output is not accepted by [`parse`].
pub fn pretty(tree: &TocTree) -> String {
    tree.iter()
        .map(|(_, entry)| format!("{}- {} (p. {})", indent(entry), entry.title, entry.page))
        .collect::<Vec<_>>()
        .join("\n")
}

fn indent(entry: &ToCEntry) -> String {
    INDENT.repeat(entry.level.get().saturating_sub(1) as usize)
}

/// Parse the notation back into a tree. Blank lines are skipped; the first
/// malformed line aborts the whole parse.
pub fn parse(input: &str) -> Result<TocTree, ParseError> {
    let mut builder = TocBuilder::new();
    for (idx, raw) in input.lines().enumerate() {
        if raw.trim().is_empty() {
            continue;
        }
        let entry = parse_line(raw).map_err(|kind| ParseError {
            line: idx + 1,
            kind,
        })?;
        builder.push(entry);
    }
    Ok(builder.finish())
}

fn parse_line(line: &str) -> Result<ToCEntry, ParseErrorKind> {
    let body = line.trim_start_matches(' ');
    let spaces = line.len() - body.len();
    if body.starts_with(char::is_whitespace) {
        return Err(ParseErrorKind::Indentation);
    }

    let depth = spaces / INDENT.len() + 1;
    let level = u32::try_from(depth)
        .ok()
        .and_then(|n| HeadingLevel::try_from(n).ok())
        .ok_or(ParseErrorKind::InvalidLevel(depth))?;

    // Keep the space before the first separator so an empty title still
    // splits into fields.
    let fields = format!(" {body}");
    let (rest, last) = fields
        .rsplit_once(SEPARATOR)
        .ok_or(ParseErrorKind::MissingPage)?;

    // The last field is the page when it is an integer, the vpos otherwise.
    let (title, page, vpos) = if let Ok(page) = last.trim().parse::<i64>() {
        (rest, page_number(page, last)?, None)
    } else {
        let vpos = last
            .trim()
            .parse::<f64>()
            .map_err(|_| ParseErrorKind::InvalidPage(last.trim().to_string()))?;
        if !vpos.is_finite() {
            return Err(ParseErrorKind::InvalidVpos(last.trim().to_string()));
        }
        let (title, page_field) = rest
            .rsplit_once(SEPARATOR)
            .ok_or(ParseErrorKind::MissingPage)?;
        let page = page_field
            .trim()
            .parse::<i64>()
            .map_err(|_| ParseErrorKind::InvalidPage(page_field.trim().to_string()))?;
        (title, page_number(page, page_field)?, Some(vpos))
    };

    let title = title.trim();
    if title.is_empty() {
        return Err(ParseErrorKind::MissingTitle);
    }

    Ok(ToCEntry::new(title, level, page).with_vpos(vpos))
}

fn page_number(page: i64, field: &str) -> Result<usize, ParseErrorKind> {
    usize::try_from(page)
        .ok()
        .filter(|p| *p >= 1)
        .ok_or_else(|| ParseErrorKind::InvalidPage(field.trim().to_string()))
}
