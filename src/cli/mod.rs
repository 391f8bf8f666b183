//! CLI module - Command-line interface definitions and handlers
//!
//! Uses clap v4 with derive macros for argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use output::OutputFormat;

pub mod commands;
pub mod output;

/// Lore - layered knowledge resolution, relevance search and specialist routing
#[derive(Parser, Debug)]
#[command(name = "lore")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (human, json, jsonl)
    #[arg(long, short = 'O', global = true, value_enum)]
    pub output_format: Option<OutputFormat>,

    /// Machine-readable JSON output (shorthand for --output-format=json)
    #[arg(long, short = 'm', global = true)]
    pub json: bool,

    /// Color mode: auto, always, never
    #[arg(long, global = true, value_name = "WHEN")]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file path (default: ~/.config/lore/config.toml)
    #[arg(long, global = true, env = "LORE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Project root holding `.lore/` (default: current directory)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Color output mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

impl Cli {
    #[must_use]
    pub fn output_format(&self) -> OutputFormat {
        OutputFormat::from_args(self.json, self.output_format)
    }

    /// Apply `--color` to the global `colored` switch.
    pub fn apply_color_mode(&self) {
        match self.color {
            Some(ColorMode::Always) => colored::control::set_override(true),
            Some(ColorMode::Never) => colored::control::set_override(false),
            Some(ColorMode::Auto) | None => {
                if self.output_format().is_machine_readable() {
                    colored::control::set_override(false);
                }
            }
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show configured layers and their load results
    Layers(commands::layers::LayersArgs),

    /// Show layer and index statistics
    Stats(commands::stats::StatsArgs),

    /// List resolved topic IDs
    List(commands::list::ListArgs),

    /// Resolve a topic ID to its winning version
    Resolve(commands::resolve::ResolveArgs),

    /// List topics defined in more than one layer
    Overrides(commands::overrides::OverridesArgs),

    /// Find topics relevant to a code snippet or query
    Search(commands::search::SearchArgs),

    /// Show the constructs and traits detected in a code snippet
    Analyze(commands::analyze::AnalyzeArgs),

    /// Suggest specialists for a request
    Suggest(commands::suggest::SuggestArgs),

    /// List specialists or show one
    Specialists(commands::specialists::SpecialistsArgs),

    /// Rebuild the relevance index and report its statistics
    Rebuild(commands::rebuild::RebuildArgs),
}
