//! File and stdin plumbing shared by the subcommands.

use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};

use tocgen_core::{notation, TocTree};

use crate::prelude::{print, *};

/// Read `path`, or stdin when no path is given. `what` names the input in
/// the error raised when stdin is an interactive terminal.
pub fn read_text(path: Option<&Path>, what: &'static str) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path).map_err(|e| {
            Error::UnreadableInput {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
            .into()
        }),
        None => {
            let mut stdin = std::io::stdin();
            if stdin.is_terminal() {
                return Err(Error::MissingInput(what).into());
            }
            let mut text = String::new();
            stdin.read_to_string(&mut text).context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

/// `dir/name.pdf` becomes `dir/name_out.pdf`.
pub fn default_output(path: &Path) -> Result<PathBuf> {
    let stem = path
        .file_stem()
        .ok_or_else(|| Error::NoOutputName(path.display().to_string()))?;
    Ok(path.with_file_name(f!("{}_out.pdf", stem.to_string_lossy())))
}

/// How a tree is printed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Render {
    pub human: bool,
    pub vpos: bool,
    pub json: bool,
}

impl Render {
    pub fn render(&self, tree: &TocTree) -> Result<String> {
        let mut out = if self.json {
            serde_json::to_string_pretty(tree)?
        } else if self.human {
            notation::pretty(tree)
        } else {
            notation::dump(tree, self.vpos)
        };
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        Ok(out)
    }
}

/// Write `text` to `output`, or stdout.
pub fn emit(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, text).context(f!("Failed to write {}", path.display())),
        None => {
            print!("{text}");
            Ok(())
        }
    }
}
