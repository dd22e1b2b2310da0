use crate::prelude::*;
use clap::Parser;

mod error;
mod generate;
mod input;
mod io;
mod meta;
mod prelude;
mod recipe;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Generate, inspect and apply PDF tables of contents"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Whether to display additional information.
    #[clap(long, env = "TOCGEN_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Generate a table of contents from a recipe
    Gen(crate::generate::GenOptions),

    /// Print or replace the outline of a PDF
    Io(crate::io::IoOptions),

    /// Search spans and print their font metadata
    Meta(crate::meta::MetaOptions),

    /// Suggest a starter recipe from font sizes
    Recipe(crate::recipe::RecipeOptions),
}

fn main() -> Result<()> {
    let app = App::parse();

    let default_filter = if app.global.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();
    color_eyre::install()?;

    match app.command {
        SubCommands::Gen(options) => crate::generate::run(options, app.global),
        SubCommands::Io(options) => crate::io::run(options, app.global),
        SubCommands::Meta(options) => crate::meta::run(options, app.global),
        SubCommands::Recipe(options) => crate::recipe::run(options, app.global),
    }
}
