//! Best-effort starter recipe from a document's font-size histogram.

use std::collections::HashMap;

use crate::meta::{toml_float, toml_str};
use crate::span::Span;

/// At most this many heading levels are suggested.
const MAX_LEVELS: usize = 6;

/// One suggested `[[heading]]` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestedHeading {
    pub level: u32,
    pub font_name: String,
    pub font_size: f64,
    /// Characters set at this size across the scanned spans.
    pub char_count: usize,
}

#[derive(Default)]
struct SizeBucket {
    chars: usize,
    fonts: HashMap<String, usize>,
}

/// Suggest heading rules from `spans`.
///
/// The size carrying the most characters is taken as body text. Every larger
/// size becomes a heading level, largest first, matched on the font that sets
/// the most characters at that size.
pub fn suggest_recipe<'a, I>(spans: I) -> Vec<SuggestedHeading>
where
    I: IntoIterator<Item = &'a Span>,
{
    let mut buckets: Vec<(f64, SizeBucket)> = Vec::new();
    for span in spans {
        let chars = span.text.chars().filter(|c| !c.is_whitespace()).count();
        if span.font_size <= 0.0 || chars == 0 {
            continue;
        }
        let idx = match buckets.iter().position(|(size, _)| *size == span.font_size) {
            Some(idx) => idx,
            None => {
                buckets.push((span.font_size, SizeBucket::default()));
                buckets.len() - 1
            }
        };
        let bucket = &mut buckets[idx].1;
        bucket.chars += chars;
        *bucket.fonts.entry(span.font_name.clone()).or_insert(0) += chars;
    }

    let Some(body_size) = buckets
        .iter()
        .max_by_key(|(_, bucket)| bucket.chars)
        .map(|(size, _)| *size)
    else {
        return Vec::new();
    };
    log::debug!("body text size is {body_size}");

    let mut headings: Vec<(f64, SizeBucket)> = buckets
        .into_iter()
        .filter(|(size, _)| *size > body_size)
        .collect();
    headings.sort_by(|a, b| b.0.total_cmp(&a.0));
    headings.truncate(MAX_LEVELS);

    headings
        .into_iter()
        .enumerate()
        .map(|(idx, (size, bucket))| {
            let font_name = bucket
                .fonts
                .iter()
                .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
                .map(|(name, _)| name.clone())
                .unwrap_or_default();
            SuggestedHeading {
                level: idx as u32 + 1,
                font_name,
                font_size: size,
                char_count: bucket.chars,
            }
        })
        .collect()
}

/// Render suggestions as a TOML recipe.
pub fn render_recipe(headings: &[SuggestedHeading]) -> String {
    headings
        .iter()
        .map(|h| {
            [
                "[[heading]]".to_string(),
                format!("level = {}", h.level),
                "greedy = true".to_string(),
                format!("font.name = {}", toml_str(&h.font_name)),
                format!("font.size = {}", toml_float(h.font_size)),
                "# font.size_tolerance = 1e-5".to_string(),
            ]
            .join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
