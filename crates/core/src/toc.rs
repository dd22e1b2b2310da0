use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A heading level, strictly positive. Levels need not be contiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct HeadingLevel(u32);

impl HeadingLevel {
    pub const TOP: Self = HeadingLevel(1);

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for HeadingLevel {
    type Error = InvalidHeadingLevel;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if value >= 1 {
            Ok(HeadingLevel(value))
        } else {
            Err(InvalidHeadingLevel)
        }
    }
}

impl TryFrom<i64> for HeadingLevel {
    type Error = InvalidHeadingLevel;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u32::try_from(value)
            .map_err(|_| InvalidHeadingLevel)
            .and_then(HeadingLevel::try_from)
    }
}

impl From<HeadingLevel> for u32 {
    fn from(level: HeadingLevel) -> Self {
        level.0
    }
}

impl fmt::Display for HeadingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("Heading level must be >= 1")]
pub struct InvalidHeadingLevel;

/// One heading in the table of contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToCEntry {
    pub title: String,
    pub level: HeadingLevel,
    /// 1-based destination page.
    pub page: usize,
    /// Top of the heading's bounding box, when vertical positions were
    /// requested.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub vpos: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub children: Vec<ToCEntry>,
}

impl ToCEntry {
    pub fn new(title: impl Into<String>, level: HeadingLevel, page: usize) -> Self {
        ToCEntry {
            title: title.into(),
            level,
            page,
            vpos: None,
            children: Vec::new(),
        }
    }

    pub fn with_vpos(mut self, vpos: Option<f64>) -> Self {
        self.vpos = vpos;
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// The finished table of contents: an ordered forest of headings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TocTree {
    pub roots: Vec<ToCEntry>,
}

impl TocTree {
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total number of entries in the forest.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Depth-first, pre-order walk yielding `(depth, entry)`; roots are at
    /// depth 0.
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder {
            stack: self.roots.iter().rev().map(|entry| (0, entry)).collect(),
        }
    }
}

pub struct PreOrder<'a> {
    stack: Vec<(usize, &'a ToCEntry)>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = (usize, &'a ToCEntry);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, entry) = self.stack.pop()?;
        self.stack
            .extend(entry.children.iter().rev().map(|child| (depth + 1, child)));
        Some((depth, entry))
    }
}

/// Stack-based nesting shared by the heading generator and the notation
/// parser.
///
/// The stack holds the right spine of the tree built so far. Pushing an entry
/// at level `L` first closes every open entry whose level is `>= L`; each
/// closed entry becomes the last child of the entry beneath it, or a root.
#[derive(Debug, Default)]
pub struct TocBuilder {
    stack: Vec<ToCEntry>,
    roots: Vec<ToCEntry>,
}

impl TocBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ToCEntry) {
        while self
            .stack
            .last()
            .is_some_and(|top| top.level >= entry.level)
        {
            self.close_top();
        }
        self.stack.push(entry);
    }

    pub fn finish(mut self) -> TocTree {
        while !self.stack.is_empty() {
            self.close_top();
        }
        TocTree { roots: self.roots }
    }

    fn close_top(&mut self) {
        let Some(finished) = self.stack.pop() else {
            return;
        };
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(finished),
            None => self.roots.push(finished),
        }
    }
}

impl FromIterator<ToCEntry> for TocTree {
    fn from_iter<I: IntoIterator<Item = ToCEntry>>(iter: I) -> Self {
        let mut builder = TocBuilder::new();
        for entry in iter {
            builder.push(entry);
        }
        builder.finish()
    }
}
