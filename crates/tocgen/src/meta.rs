use std::path::PathBuf;

use pdf::PdfDocument;
use regex::RegexBuilder;
use tocgen_core::meta::{dump_heading, dump_meta, search_spans};
use tocgen_core::span::Page;

use crate::prelude::{println, *};

#[derive(Debug, clap::Args)]
pub struct MetaOptions {
    /// Path to the PDF file
    pub path: PathBuf,

    /// Regular expression matched against span text
    pub pattern: String,

    /// Only search this 1-based page
    #[arg(short, long)]
    pub page: Option<usize>,

    /// Match case-insensitively
    #[arg(short, long)]
    pub ignore_case: bool,

    /// Print a recipe entry at this heading level instead of the metadata
    #[arg(short = 'a', long = "auto", value_parser = clap::value_parser!(u32).range(1..))]
    pub level: Option<u32>,
}

pub fn run(options: MetaOptions, _global: crate::Global) -> Result<()> {
    let pattern = RegexBuilder::new(&options.pattern)
        .case_insensitive(options.ignore_case)
        .build()
        .context(f!("Invalid pattern {:?}", options.pattern))?;

    let doc = PdfDocument::open(&options.path).context(f!("Failed to open {}", options.path.display()))?;
    let pages = load_pages(&doc, options.page)?;

    let spans = search_spans(pages, &pattern, options.page);
    if spans.is_empty() {
        log::info!("no span matches {:?}", options.pattern);
    }

    let rendered: Vec<String> = spans
        .iter()
        .map(|span| match options.level {
            Some(level) => dump_heading(span, level),
            None => dump_meta(span),
        })
        .collect();
    if !rendered.is_empty() {
        println!("{}", rendered.join("\n\n"));
    }

    Ok(())
}

/// Pages to scan: one page when `page` is set, else the whole document. A
/// page the document does not have scans nothing.
pub fn load_pages(doc: &PdfDocument, page: Option<usize>) -> Result<Vec<Page>> {
    match page {
        Some(n) if n == 0 || n > doc.page_count() => {
            log::warn!("page {} is out of range, the document has {} pages", n, doc.page_count());
            Ok(Vec::new())
        }
        Some(n) => Ok(vec![doc.page(n)?]),
        None => Ok(doc.pages().collect::<Result<_, _>>()?),
    }
}
