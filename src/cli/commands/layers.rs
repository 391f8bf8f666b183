//! lore layers - Show configured layers and their load results

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::commands::layer_label;
use crate::cli::output::emit_items;
use crate::error::Result;
use crate::layers::LayerStatistics;

#[derive(Args, Debug)]
pub struct LayersArgs {
    /// Show per-file errors and warnings from the last load
    #[arg(long)]
    pub details: bool,
}

pub fn run(ctx: &AppContext, args: &LayersArgs) -> Result<()> {
    let stats = ctx.engine.layers().statistics().layers;
    if ctx.machine_mode() {
        return emit_items(&stats, ctx.format);
    }

    println!(
        "{:16} {:9} {:>8} {:9} {:>7} {:>12} {:>8}",
        "NAME".bold(),
        "TYPE".bold(),
        "PRIORITY".bold(),
        "STATUS".bold(),
        "TOPICS".bold(),
        "SPECIALISTS".bold(),
        "TIME".bold()
    );
    println!("{}", "─".repeat(76).dimmed());

    for layer in &stats {
        let time = layer
            .last_load
            .as_ref()
            .map_or_else(|| "-".to_string(), |r| format!("{}ms", r.load_time_ms));
        println!(
            "{:16} {:9} {:>8} {:9} {:>7} {:>12} {:>8}",
            layer_label(&layer.name),
            layer.layer_type.as_str(),
            layer.priority,
            status(layer),
            layer.topic_count,
            layer.specialist_count,
            time
        );
        if args.details {
            print_details(layer);
        }
    }
    Ok(())
}

fn status(layer: &LayerStatistics) -> colored::ColoredString {
    if !layer.enabled {
        return "disabled".dimmed();
    }
    match &layer.last_load {
        Some(result) if result.success && result.errors.is_empty() => "loaded".green(),
        Some(result) if result.success => "partial".yellow(),
        Some(_) => "failed".red(),
        None => "pending".dimmed(),
    }
}

fn print_details(layer: &LayerStatistics) {
    let Some(result) = &layer.last_load else {
        return;
    };
    for error in &result.errors {
        println!("    {} {error}", "error:".red());
    }
    for warning in &result.warnings {
        println!("    {} {warning}", "warning:".yellow());
    }
}
