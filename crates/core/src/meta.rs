//! Span metadata lookup, used to author recipes by hand.
//!
//! Find the spans whose text matches a pattern, then print their attributes
//! as TOML, or as a ready-to-paste `[[heading]]` entry.

use regex::Regex;

use crate::span::{Page, Span};

/// Spans whose text matches `pattern`, in document order.
///
/// With `page` set, only that 1-based page is searched; a page the document
/// does not have yields nothing.
pub fn search_spans<I>(pages: I, pattern: &Regex, page: Option<usize>) -> Vec<Span>
where
    I: IntoIterator<Item = Page>,
{
    pages
        .into_iter()
        .filter(|p| page.is_none_or(|wanted| wanted == p.number))
        .flat_map(|p| {
            p.spans()
                .filter(|span| pattern.is_match(&span.text))
                .cloned()
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Drop a font subset tag such as `ABCDEF+` from a font name.
pub fn strip_subset_prefix(font_name: &str) -> &str {
    match font_name.split_once('+') {
        Some((_, rest)) => rest,
        None => font_name,
    }
}

/// All attributes of `span` as TOML key/value lines.
pub fn dump_meta(span: &Span) -> String {
    meta_lines(span, "").join("\n")
}

/// A `[[heading]]` recipe entry admitting `span` at `level`.
///
/// The entry is greedy, matches on font name and size only, and lists the
/// remaining attributes as comments for the author to enable.
pub fn dump_heading(span: &Span, level: u32) -> String {
    let mut lines = vec![
        "[[heading]]".to_string(),
        format!("# {}", single_line(&span.text)),
        format!("level = {level}"),
        "greedy = true".to_string(),
        format!("font.name = {}", toml_str(strip_subset_prefix(&span.font_name))),
        format!("font.size = {}", toml_float(span.font_size)),
        "# font.size_tolerance = 1e-5".to_string(),
    ];
    lines.extend(meta_lines(span, "# ").into_iter().skip(2));
    lines.push("# bbox.tolerance = 1e-5".to_string());
    lines.join("\n")
}

fn meta_lines(span: &Span, prefix: &str) -> Vec<String> {
    let flags = span.flags;
    let bbox = span.bbox;
    [
        format!("font.name = {}", toml_str(&span.font_name)),
        format!("font.size = {}", toml_float(span.font_size)),
        format!("font.color = {}", span.color),
        format!("font.superscript = {}", flags.superscript),
        format!("font.italic = {}", flags.italic),
        format!("font.serif = {}", flags.serif),
        format!("font.monospace = {}", flags.monospace),
        format!("font.bold = {}", flags.bold),
        format!("bbox.left = {}", toml_float(bbox.left)),
        format!("bbox.top = {}", toml_float(bbox.top)),
        format!("bbox.right = {}", toml_float(bbox.right)),
        format!("bbox.bottom = {}", toml_float(bbox.bottom)),
    ]
    .into_iter()
    .map(|line| format!("{prefix}{line}"))
    .collect()
}

pub(crate) fn toml_str(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}

/// `Debug` prints the shortest representation that round-trips and always
/// keeps a decimal point, which is a valid TOML float.
pub(crate) fn toml_float(value: f64) -> String {
    format!("{value:?}")
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
