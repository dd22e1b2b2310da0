use std::path::Path;

use thiserror::Error;

use parser::backend::{LopdfBackend, PdfBackend};
use tocgen_core::generate::{generate, GenerateError, GenerateOptions};
use tocgen_core::outline::write_outline;
use tocgen_core::recipe::Recipe;
use tocgen_core::span::Page;
use tocgen_core::toc::TocTree;

pub mod outline;
pub mod parser;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("Page {page} is out of range, the document has {count} pages")]
    PageOutOfRange { page: usize, count: usize },
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// A loaded PDF document.
///
/// Pages are extracted on demand, one at a time, so a ToC can be generated
/// without holding every page's spans in memory.
pub struct PdfDocument {
    backend: LopdfBackend,
}

impl PdfDocument {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PdfError> {
        Ok(PdfDocument {
            backend: LopdfBackend::load_bytes(bytes)?,
        })
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, PdfError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    pub fn page_count(&self) -> usize {
        self.backend.page_count()
    }

    /// The span stream: every page in order, extracted lazily.
    pub fn pages(&self) -> impl Iterator<Item = Result<Page, PdfError>> + '_ {
        self.backend
            .pages()
            .into_iter()
            .map(move |(number, id)| parser::layout::extract_page(&self.backend, number as usize, id))
    }

    /// Extract a single 1-based page.
    pub fn page(&self, number: usize) -> Result<Page, PdfError> {
        let id = u32::try_from(number)
            .ok()
            .and_then(|n| self.backend.pages().get(&n).copied())
            .ok_or(PdfError::PageOutOfRange {
                page: number,
                count: self.page_count(),
            })?;
        parser::layout::extract_page(&self.backend, number, id)
    }

    /// Generate a ToC from the span stream. The first page that fails to
    /// extract aborts generation with its error.
    pub fn generate_toc(&self, recipe: &Recipe, options: GenerateOptions) -> Result<TocTree, PdfError> {
        let mut failure = None;
        let pages = self.pages().map_while(|page| match page {
            Ok(page) => Some(page),
            Err(e) => {
                failure = Some(e);
                None
            }
        });

        let tree = generate(pages, recipe, options)?;
        match failure {
            Some(e) => Err(e),
            None => Ok(tree),
        }
    }

    /// The document's existing outline as a ToC.
    pub fn read_toc(&self) -> Result<TocTree, PdfError> {
        outline::read_outline(&self.backend)
    }

    /// Replace the document's outline with `tree`. An empty tree removes
    /// the outline.
    pub fn write_toc(&mut self, tree: &TocTree) -> Result<(), PdfError> {
        write_outline(tree, &mut outline::OutlineWriter::new(&mut self.backend))
    }

    pub fn save_to_vec(&mut self) -> Result<Vec<u8>, PdfError> {
        let mut buf = Vec::new();
        self.backend
            .raw_doc_mut()
            .save_to(&mut buf)
            .map_err(|e| PdfError::Parse(format!("cannot serialize document: {}", e)))?;
        Ok(buf)
    }

    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<(), PdfError> {
        let bytes = self.save_to_vec()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Convenience free functions (stateless, re-parse each call)
// ---------------------------------------------------------------------------

/// Generate a ToC from PDF bytes.
pub fn generate_toc(bytes: &[u8], recipe: &Recipe, options: GenerateOptions) -> Result<TocTree, PdfError> {
    PdfDocument::from_bytes(bytes)?.generate_toc(recipe, options)
}

/// Read the outline of PDF bytes.
pub fn read_toc(bytes: &[u8]) -> Result<TocTree, PdfError> {
    PdfDocument::from_bytes(bytes)?.read_toc()
}

/// Return a copy of PDF bytes with `tree` as its outline.
pub fn write_toc(bytes: &[u8], tree: &TocTree) -> Result<Vec<u8>, PdfError> {
    let mut doc = PdfDocument::from_bytes(bytes)?;
    doc.write_toc(tree)?;
    doc.save_to_vec()
}


#[cfg(test)]
mod tests {
    use super::fixtures::pdf_bytes;
    use super::*;
    use tocgen_core::notation;

    const RECIPE: &str = r#"
[[heading]]
level = 1
font.name = "Helvetica-Bold"
font.size = 20.0

[[heading]]
level = 2
font.name = "Helvetica-Bold"
font.size = 14.0
"#;

    fn sample() -> Vec<u8> {
        pdf_bytes(&[
            vec![
                ("F2", 20, 72, 760, "Introduction"),
                ("F1", 10, 72, 700, "Some body text."),
                ("F2", 14, 72, 650, "Motivation"),
                ("F1", 10, 72, 620, "More body text."),
            ],
            vec![
                ("F2", 14, 72, 760, "Background"),
                ("F2", 20, 72, 500, "Methods"),
            ],
        ])
    }

    #[test]
    fn test_page_count_and_lazy_pages() {
        let doc = PdfDocument::from_bytes(&sample()).unwrap();
        assert_eq!(doc.page_count(), 2);

        let pages: Vec<Page> = doc.pages().collect::<Result<_, _>>().unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].number, 2);
        let first = pages[0].spans().next().unwrap();
        assert_eq!(first.text, "Introduction");
        assert_eq!(first.font_name, "Helvetica-Bold");
        assert_eq!(first.font_size, 20.0);
        assert!(first.flags.bold);
    }

    #[test]
    fn test_page_out_of_range() {
        let doc = PdfDocument::from_bytes(&sample()).unwrap();
        assert!(matches!(
            doc.page(3),
            Err(PdfError::PageOutOfRange { page: 3, count: 2 })
        ));
        assert!(doc.page(0).is_err());
        assert_eq!(doc.page(2).unwrap().number, 2);
    }

    #[test]
    fn test_generate_toc_from_pdf() {
        let recipe = Recipe::from_toml_str(RECIPE).unwrap();
        let tree = generate_toc(&sample(), &recipe, GenerateOptions { vpos: true }).unwrap();

        assert_eq!(
            notation::dump(&tree, true),
            "Introduction | 1 | 62.0000\n  Motivation | 1 | 178.0000\n  Background | 2 | 68.0000\nMethods | 2 | 322.0000\n"
        );
    }

    #[test]
    fn test_write_toc_then_read_it_back() {
        let recipe = Recipe::from_toml_str(RECIPE).unwrap();
        let bytes = sample();
        let tree = generate_toc(&bytes, &recipe, GenerateOptions { vpos: true }).unwrap();

        let written = write_toc(&bytes, &tree).unwrap();
        assert_eq!(read_toc(&written).unwrap(), tree);
        assert!(read_toc(&bytes).unwrap().is_empty());
    }

    #[test]
    fn test_subset_font_names_match_exactly() {
        let bytes = pdf_bytes(&[vec![
            ("F3", 20, 72, 760, "Introduction"),
            ("F2", 20, 72, 600, "Appendix"),
        ]]);
        let doc = PdfDocument::from_bytes(&bytes).unwrap();
        let first = doc.page(1).unwrap().spans().next().cloned().unwrap();
        assert_eq!(first.font_name, "ABCDEF+Helvetica-Bold");

        let subset = Recipe::from_toml_str(
            "[[heading]]\nlevel = 1\nfont.name = \"ABCDEF+Helvetica-Bold\"\nfont.size = 20.0\n",
        )
        .unwrap();
        let tree = doc.generate_toc(&subset, GenerateOptions::default()).unwrap();
        assert_eq!(notation::dump(&tree, false), "Introduction | 1\n");
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            PdfDocument::from_bytes(b"%PDF-1.5 nonsense"),
            Err(PdfError::Parse(_))
        ));
    }

    #[test]
    fn test_save_and_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdf");

        let mut doc = PdfDocument::from_bytes(&sample()).unwrap();
        doc.save(&path).unwrap();
        assert_eq!(PdfDocument::open(&path).unwrap().page_count(), 2);
        assert!(matches!(
            PdfDocument::open(dir.path().join("missing.pdf")),
            Err(PdfError::Io(_))
        ));
    }
}
