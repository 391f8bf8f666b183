//! CLI command implementations
//!
//! Each subcommand has its own module with:
//! - Args struct for command-line arguments
//! - `run()` function to execute the command

use std::io::Read;
use std::path::Path;

use colored::{ColoredString, Colorize};

use crate::app::AppContext;
use crate::cli::Commands;
use crate::config::{EMBEDDED_LAYER_NAME, PROJECT_LAYER_NAME};
use crate::error::{LoreError, Result};

pub mod analyze;
pub mod layers;
pub mod list;
pub mod overrides;
pub mod rebuild;
pub mod resolve;
pub mod search;
pub mod specialists;
pub mod stats;
pub mod suggest;

/// Dispatch a command to its handler
pub fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Layers(args) => layers::run(ctx, args),
        Commands::Stats(args) => stats::run(ctx, args),
        Commands::List(args) => list::run(ctx, args),
        Commands::Resolve(args) => resolve::run(ctx, args),
        Commands::Overrides(args) => overrides::run(ctx, args),
        Commands::Search(args) => search::run(ctx, args),
        Commands::Analyze(args) => analyze::run(ctx, args),
        Commands::Suggest(args) => suggest::run(ctx, args),
        Commands::Specialists(args) => specialists::run(ctx, args),
        Commands::Rebuild(args) => rebuild::run(ctx, args),
    }
}

/// Text from an inline argument, a file, or stdin when the argument is `-`.
pub(crate) fn read_input(text: Option<&str>, file: Option<&Path>) -> Result<String> {
    if let Some(path) = file {
        return Ok(std::fs::read_to_string(path)?);
    }
    match text {
        Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(text) => Ok(text.to_string()),
        None => Err(LoreError::Config(
            "no input: pass text, --file <path>, or '-' for stdin".to_string(),
        )),
    }
}

pub(crate) fn layer_label(name: &str) -> ColoredString {
    match name {
        EMBEDDED_LAYER_NAME => name.blue(),
        PROJECT_LAYER_NAME => name.yellow(),
        _ => name.green(),
    }
}

/// Truncate to `max` characters, appending an ellipsis when cut.
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
