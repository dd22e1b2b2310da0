//! Heading generation: span stream + recipe -> [`TocTree`].

use thiserror::Error;

use crate::notation::{quantize_vpos, single_line};
use crate::recipe::Recipe;
use crate::span::{Block, Page, PositionKey, Span};
use crate::toc::{ToCEntry, TocBuilder, TocTree};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Record the top of each heading's bounding box as its `vpos`.
    pub vpos: bool,
}

#[derive(Debug, Error, PartialEq)]
pub enum GenerateError {
    #[error("span stream is not in document order: {current} follows {previous}")]
    OutOfOrder {
        previous: PositionKey,
        current: PositionKey,
    },
}

/// Walk the span stream once, in document order, and nest every admitted
/// span into a table of contents.
///
/// Spans no filter admits are body text and are skipped. When several
/// filters admit a span, the first declared one decides its level. A greedy
/// match takes the text of its whole enclosing block as the title; two greedy
/// matches inside one block both capture that block.
pub fn generate<I>(pages: I, recipe: &Recipe, options: GenerateOptions) -> Result<TocTree, GenerateError>
where
    I: IntoIterator<Item = Page>,
{
    let mut builder = TocBuilder::new();
    let mut previous: Option<PositionKey> = None;

    for page in pages {
        log::trace!("scanning page {} ({} blocks)", page.number, page.blocks.len());
        for block in &page.blocks {
            for span in block.spans() {
                if let Some(prev) = previous {
                    if span.key <= prev {
                        return Err(GenerateError::OutOfOrder {
                            previous: prev,
                            current: span.key,
                        });
                    }
                }
                previous = Some(span.key);

                if let Some(entry) = match_span(span, block, recipe, options) {
                    log::debug!(
                        "heading level {} on page {}: {:?}",
                        entry.level,
                        entry.page,
                        entry.title
                    );
                    builder.push(entry);
                }
            }
        }
    }

    Ok(builder.finish())
}

/// Turn one span into a leaf entry if the recipe admits it.
fn match_span(span: &Span, block: &Block, recipe: &Recipe, options: GenerateOptions) -> Option<ToCEntry> {
    let filter = recipe.classify(span)?;

    let title = if filter.greedy {
        single_line(&block.text())
    } else {
        single_line(&span.text)
    };
    if title.is_empty() {
        return None;
    }

    let vpos = options.vpos.then(|| quantize_vpos(span.bbox.top));
    Some(ToCEntry::new(title, filter.level, span.page).with_vpos(vpos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::ToCFilter;
    use crate::span::fixtures::page;
    use crate::toc::HeadingLevel;

    const BODY: f64 = 10.0;
    const H1: f64 = 20.0;
    const H2: f64 = 14.0;

    fn level(n: u32) -> HeadingLevel {
        HeadingLevel::try_from(n).unwrap()
    }

    fn recipe() -> Recipe {
        Recipe::new(vec![
            ToCFilter::new(level(1)).font_name("Bold").font_size(H1),
            ToCFilter::new(level(2)).font_name("Bold").font_size(H2),
        ])
    }

    fn titles(tree: &TocTree) -> Vec<(usize, String)> {
        tree.iter()
            .map(|(depth, e)| (depth, e.title.clone()))
            .collect()
    }

    #[test]
    fn test_empty_stream_yields_empty_forest() {
        let tree = generate(Vec::<Page>::new(), &recipe(), GenerateOptions::default()).unwrap();
        assert!(tree.is_empty());
    }

    #[test]
    fn test_no_match_yields_empty_forest() {
        let pages = vec![page(1, &[&[("Just body text", "Roman", BODY)]])];
        let tree = generate(pages, &recipe(), GenerateOptions::default()).unwrap();
        assert!(tree.is_empty());
    }

    #[test]
    fn test_headings_nest_across_pages() {
        let pages = vec![
            page(
                1,
                &[
                    &[("Introduction", "Bold", H1)],
                    &[("Some text", "Roman", BODY)],
                    &[("Motivation", "Bold", H2)],
                ],
            ),
            page(
                2,
                &[&[("Background", "Bold", H2)], &[("Methods", "Bold", H1)]],
            ),
        ];

        let tree = generate(pages, &recipe(), GenerateOptions::default()).unwrap();
        assert_eq!(
            titles(&tree),
            vec![
                (0, "Introduction".to_string()),
                (1, "Motivation".to_string()),
                (1, "Background".to_string()),
                (0, "Methods".to_string()),
            ]
        );
        assert_eq!(tree.roots[0].children[1].page, 2);
        assert_eq!(tree.roots[1].page, 2);
        assert!(tree.roots[0].vpos.is_none());
    }

    #[test]
    fn test_non_contiguous_levels() {
        let recipe = Recipe::new(vec![
            ToCFilter::new(level(1)).font_size(H1),
            ToCFilter::new(level(3)).font_size(H2),
        ]);
        let pages = vec![page(
            1,
            &[&[("A", "F", H1)], &[("B", "F", H2)], &[("C", "F", H1)]],
        )];

        let tree = generate(pages, &recipe, GenerateOptions::default()).unwrap();
        assert_eq!(tree.roots.len(), 2);
        assert_eq!(tree.roots[0].title, "A");
        assert_eq!(tree.roots[0].children.len(), 1);
        assert_eq!(tree.roots[0].children[0].title, "B");
        assert_eq!(tree.roots[0].children[0].level.get(), 3);
        assert_eq!(tree.roots[1].title, "C");
        assert!(tree.roots[1].children.is_empty());
    }

    #[test]
    fn test_greedy_captures_whole_block() {
        let recipe = Recipe::new(vec![ToCFilter::new(level(1))
            .font_name("Bold")
            .font_size(H1)
            .greedy(true)]);
        let pages = vec![page(
            1,
            &[&[
                ("1.", "Roman", H1),
                (" Getting ", "Bold", H1),
                ("started", "Italic", H1),
            ]],
        )];

        let tree = generate(pages, &recipe, GenerateOptions::default()).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.roots[0].title, "1. Getting started");
    }

    #[test]
    fn test_non_greedy_uses_span_text() {
        let pages = vec![page(
            1,
            &[&[("1.", "Roman", H1), ("Getting started ", "Bold", H1)]],
        )];
        let tree = generate(pages, &recipe(), GenerateOptions::default()).unwrap();
        assert_eq!(tree.roots[0].title, "Getting started");
    }

    #[test]
    fn test_greedy_matches_are_not_deduplicated() {
        let recipe = Recipe::new(vec![ToCFilter::new(level(1)).font_name("Bold").greedy(true)]);
        let pages = vec![page(1, &[&[("Part", "Bold", H1), ("One", "Bold", H1)]])];

        let tree = generate(pages, &recipe, GenerateOptions::default()).unwrap();
        let all: Vec<_> = tree.iter().map(|(_, e)| e.title.as_str()).collect();
        assert_eq!(all, vec!["Part One", "Part One"]);
    }

    #[test]
    fn test_line_breaks_in_titles_become_spaces() {
        let greedy = Recipe::new(vec![ToCFilter::new(level(1)).font_name("Bold").greedy(true)]);
        let pages = vec![page(1, &[&[("Part\n", "Bold", H1), ("\rOne", "Roman", H1)]])];
        let tree = generate(pages.clone(), &greedy, GenerateOptions::default()).unwrap();
        assert_eq!(tree.roots[0].title, "Part One");

        let tree = generate(pages, &recipe(), GenerateOptions::default()).unwrap();
        assert_eq!(tree.roots[0].title, "Part");

        let pages = vec![page(1, &[&[("Getting\r\nstarted", "Bold", H1)]])];
        let tree = generate(pages, &recipe(), GenerateOptions::default()).unwrap();
        assert_eq!(tree.roots[0].title, "Getting started");
    }

    #[test]
    fn test_blank_spans_are_never_headings() {
        let pages = vec![page(1, &[&[("   ", "Bold", H1)]])];
        let tree = generate(pages, &recipe(), GenerateOptions::default()).unwrap();
        assert!(tree.is_empty());
    }

    #[test]
    fn test_vpos_is_recorded_on_request() {
        let pages = vec![page(1, &[&[("Title", "Bold", H1)]])];
        let tree = generate(pages, &recipe(), GenerateOptions { vpos: true }).unwrap();
        assert_eq!(tree.roots[0].vpos, Some(100.0));
    }

    #[test]
    fn test_out_of_order_stream_is_rejected() {
        let pages = vec![
            page(2, &[&[("Late", "Bold", H1)]]),
            page(1, &[&[("Early", "Bold", H1)]]),
        ];
        let err = generate(pages, &recipe(), GenerateOptions::default()).unwrap_err();
        assert!(matches!(err, GenerateError::OutOfOrder { .. }));
    }

    #[test]
    fn test_empty_recipe_matches_nothing() {
        let pages = vec![page(1, &[&[("Title", "Bold", H1)]])];
        let tree = generate(pages, &Recipe::default(), GenerateOptions::default()).unwrap();
        assert!(tree.is_empty());
    }
}
