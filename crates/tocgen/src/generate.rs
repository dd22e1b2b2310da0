use std::path::PathBuf;

use pdf::PdfDocument;
use tocgen_core::{GenerateOptions, Recipe};

use crate::input::{emit, read_text, Render};
use crate::prelude::{eprintln, *};

#[derive(Debug, clap::Args)]
pub struct GenOptions {
    /// Path to the PDF file
    pub path: PathBuf,

    /// Recipe file (TOML); read from stdin when omitted
    #[arg(short, long, env = "TOCGEN_RECIPE")]
    pub recipe: Option<PathBuf>,

    /// Print a readable tree instead of the editable notation
    #[arg(short = 'H', long)]
    pub human: bool,

    /// Record the vertical position of every heading
    #[arg(short, long)]
    pub vpos: bool,

    /// Write the table of contents to this file instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Also write a copy of the PDF with the generated outline
    #[arg(long, value_name = "OUT_PDF")]
    pub write: Option<PathBuf>,
}

pub fn run(options: GenOptions, _global: crate::Global) -> Result<()> {
    let recipe_text = read_text(options.recipe.as_deref(), "recipe")?;
    let recipe = Recipe::from_toml_str(&recipe_text).context("Invalid recipe")?;
    if recipe.is_empty() {
        log::warn!("recipe has no [[heading]] entries, the table of contents will be empty");
    }

    let mut doc = PdfDocument::open(&options.path).context(f!("Failed to open {}", options.path.display()))?;
    let tree = doc.generate_toc(
        &recipe,
        GenerateOptions {
            // A written outline always points at the heading itself.
            vpos: options.vpos || options.write.is_some(),
        },
    )?;
    log::debug!("generated {} entries from {} pages", tree.len(), doc.page_count());

    let render = Render {
        human: options.human,
        vpos: options.vpos,
        json: options.json,
    };
    emit(&render.render(&tree)?, options.out.as_deref())?;

    if let Some(out_pdf) = options.write {
        doc.write_toc(&tree)?;
        doc.save(&out_pdf).context(f!("Failed to save {}", out_pdf.display()))?;
        eprintln!("wrote {} entries to {}", tree.len(), out_pdf.display());
    }

    Ok(())
}
