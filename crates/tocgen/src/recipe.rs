use std::path::PathBuf;

use pdf::PdfDocument;
use tocgen_core::suggest::{render_recipe, suggest_recipe};

use crate::meta::load_pages;
use crate::prelude::{println, *};

#[derive(Debug, clap::Args)]
pub struct RecipeOptions {
    /// Path to the PDF file
    pub path: PathBuf,

    /// Only sample this 1-based page
    #[arg(short, long)]
    pub page: Option<usize>,
}

pub fn run(options: RecipeOptions, _global: crate::Global) -> Result<()> {
    let doc = PdfDocument::open(&options.path).context(f!("Failed to open {}", options.path.display()))?;
    let pages = load_pages(&doc, options.page)?;

    let headings = suggest_recipe(pages.iter().flat_map(|page| page.spans()));
    if headings.is_empty() {
        return Err(eyre!(
            "No heading sizes found in {}: every span shares the body text size",
            options.path.display()
        ));
    }
    log::debug!("suggested {} heading levels", headings.len());

    println!("{}", render_recipe(&headings));
    Ok(())
}
