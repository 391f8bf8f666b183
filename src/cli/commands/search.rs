//! lore search - Find topics relevant to a code snippet or query

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::commands::{layer_label, read_input};
use crate::cli::output::emit_items;
use crate::core::PatternType;
use crate::error::{LoreError, Result};

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Code snippet or free-text query ('-' reads stdin)
    pub query: Option<String>,

    /// Read the snippet from a file
    #[arg(long, short)]
    pub file: Option<PathBuf>,

    /// Maximum number of results
    #[arg(long, short)]
    pub limit: Option<usize>,

    /// Minimum normalized score (0.0-1.0)
    #[arg(long)]
    pub min_score: Option<f32>,

    /// Skip topics without relevance signals
    #[arg(long)]
    pub exclude_legacy: bool,

    /// Only topics applicable to this object type (table, page, codeunit, ...)
    #[arg(long)]
    pub object_type: Option<String>,

    /// Only topics in this category
    #[arg(long)]
    pub category: Option<String>,
}

pub fn run(ctx: &AppContext, args: &SearchArgs) -> Result<()> {
    let query = read_input(args.query.as_deref(), args.file.as_deref())?;

    let mut options = ctx.engine.default_find_options();
    if let Some(limit) = args.limit {
        options.limit = limit;
    }
    if let Some(min_score) = args.min_score {
        if !(0.0..=1.0).contains(&min_score) {
            return Err(LoreError::Config(format!(
                "--min-score must be between 0 and 1, got {min_score}"
            )));
        }
        options.min_score = min_score;
    }
    if args.exclude_legacy {
        options.include_legacy_topics = false;
    }
    options.object_type.clone_from(&args.object_type);
    options.category.clone_from(&args.category);

    let results = ctx.engine.find_relevant_topics(&query, &options)?;
    if ctx.machine_mode() {
        return emit_items(&results, ctx.format);
    }

    if results.is_empty() {
        println!("{}", "No relevant topics found".dimmed());
        println!();
        println!("Try:");
        println!("  - Lowering --min-score");
        println!("  - Removing filters (--object-type, --category)");
        return Ok(());
    }

    println!("{} relevant topics:", results.len().to_string().bold());
    println!();
    for (i, hit) in results.iter().enumerate() {
        let rank = format!("{}.", i + 1);
        let marker = match hit.pattern_type {
            PatternType::Good => " [good]".green().to_string(),
            PatternType::Bad => " [avoid]".red().to_string(),
            PatternType::Unknown => String::new(),
        };
        let legacy = if hit.is_legacy {
            " [legacy]".dimmed().to_string()
        } else {
            String::new()
        };
        println!("{:4} {}{}{}", rank.dimmed(), hit.title.bold(), marker, legacy);
        println!(
            "     {} {} (score: {:.2}, raw: {:.3})",
            hit.topic_id.dimmed(),
            layer_label(&hit.source_layer),
            hit.score,
            hit.raw_score
        );
        if !hit.matched_signals.is_empty() {
            println!("     matched: {}", hit.matched_signals.join(", ").cyan());
        }
    }
    Ok(())
}
