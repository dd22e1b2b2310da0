//! Core library for tocgen
//!
//! This crate is the **Functional Core** of tocgen: everything that turns a
//! stream of classified text spans into a table of contents, and a table of
//! contents into text and back, without touching a file.
//!
//! # Architecture Overview
//!
//! - **`tocgen_core`** (this crate): pure transformations over spans and trees
//! - **`pdf`**: span extraction and outline reading/writing on real documents
//! - **`tocgen`**: the command line shell wiring both together
//!
//! All functions here are deterministic and tested with fixture data. No
//! document is ever opened from this crate.
//!
//! # Module Organization
//!
//! - [`span`]: the span stream model (pages, blocks, lines, spans)
//! - [`filter`] and [`recipe`]: heading rules and their TOML form
//! - [`toc`]: the ToC forest and the stack-based nesting routine
//! - [`generate`]: span stream + recipe -> tree
//! - [`notation`]: the editable plain-text form of a tree
//! - [`outline`]: the boundary with bookmark writers
//! - [`meta`] and [`suggest`]: helpers for authoring recipes
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use tocgen_core::{generate, notation, GenerateOptions, Recipe};
//!
//! let recipe = Recipe::from_toml_str("[[heading]]\nlevel = 1\nfont.size = 20.0\n")?;
//! let tree = generate(pages, &recipe, GenerateOptions::default())?;
//! print!("{}", notation::dump(&tree, false));
//! ```

pub mod filter;
pub mod generate;
pub mod meta;
pub mod notation;
pub mod outline;
pub mod recipe;
pub mod span;
pub mod suggest;
pub mod toc;

pub use filter::{RecipeError, ToCFilter};
pub use generate::{generate, GenerateError, GenerateOptions};
pub use notation::ParseError;
pub use outline::{OutlineItem, OutlineSink};
pub use recipe::Recipe;
pub use span::{BBox, Block, Color, Line, Page, PositionKey, Span, SpanFlags};
pub use toc::{HeadingLevel, ToCEntry, TocBuilder, TocTree};
