//! Boundary with whatever writes the finished tree as native bookmarks.

use serde::Serialize;

use crate::toc::TocTree;

/// One bookmark, flattened. `depth` is the structural position in the forest
/// (roots are 0), not the heading level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlineItem {
    pub title: String,
    /// 1-based destination page.
    pub page: usize,
    pub vpos: Option<f64>,
    pub depth: usize,
}

/// A facility that materializes bookmarks, fed in pre-order.
pub trait OutlineSink {
    type Error;

    fn write_outline(&mut self, items: &[OutlineItem]) -> Result<(), Self::Error>;
}

/// Flatten `tree` in pre-order.
pub fn outline_items(tree: &TocTree) -> Vec<OutlineItem> {
    tree.iter()
        .map(|(depth, entry)| OutlineItem {
            title: entry.title.clone(),
            page: entry.page,
            vpos: entry.vpos,
            depth,
        })
        .collect()
}

/// Hand `tree` to `sink`.
pub fn write_outline<S: OutlineSink>(tree: &TocTree, sink: &mut S) -> Result<(), S::Error> {
    sink.write_outline(&outline_items(tree))
}
