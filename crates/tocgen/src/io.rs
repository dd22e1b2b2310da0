use std::path::PathBuf;

use pdf::PdfDocument;
use tocgen_core::notation;

use crate::input::{default_output, emit, read_text, Render};
use crate::prelude::{eprintln, *};

#[derive(Debug, clap::Args)]
pub struct IoOptions {
    /// Path to the PDF file
    pub path: PathBuf,

    /// Table of contents in the editable notation; read from stdin when omitted
    #[arg(short, long)]
    pub toc: Option<PathBuf>,

    /// Output PDF (default: `<name>_out.pdf` next to the input); with
    /// --print, the text file to write the outline to
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Print the existing outline instead of writing one
    #[arg(short, long)]
    pub print: bool,

    /// With --print, show a readable tree instead of the editable notation
    #[arg(short = 'H', long)]
    pub human: bool,

    /// With --print, include vertical positions
    #[arg(short, long)]
    pub vpos: bool,
}

pub fn run(options: IoOptions, _global: crate::Global) -> Result<()> {
    let mut doc = PdfDocument::open(&options.path).context(f!("Failed to open {}", options.path.display()))?;

    if options.print {
        let tree = doc.read_toc()?;
        if tree.is_empty() {
            log::info!("{} has no outline", options.path.display());
        }
        let render = Render {
            human: options.human,
            vpos: options.vpos,
            json: false,
        };
        return emit(&render.render(&tree)?, options.out.as_deref());
    }

    let text = read_text(options.toc.as_deref(), "table of contents")?;
    let tree = notation::parse(&text).context("Invalid table of contents")?;

    let out = match options.out {
        Some(out) => out,
        None => default_output(&options.path)?,
    };
    doc.write_toc(&tree)?;
    doc.save(&out).context(f!("Failed to save {}", out.display()))?;
    eprintln!("wrote {} entries to {}", tree.len(), out.display());

    Ok(())
}
