//! lore overrides - Topics defined in more than one layer

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::commands::layer_label;
use crate::cli::output::emit_items;
use crate::error::Result;

#[derive(Args, Debug)]
pub struct OverridesArgs {}

pub fn run(ctx: &AppContext, _args: &OverridesArgs) -> Result<()> {
    let overridden = ctx.engine.overridden_topics();
    if ctx.machine_mode() {
        return emit_items(&overridden, ctx.format);
    }

    if overridden.is_empty() {
        println!("{}", "No overridden topics".dimmed());
        return Ok(());
    }

    for entry in &overridden {
        let Some((winner, shadowed)) = entry.layers.split_first() else {
            continue;
        };
        let shadowed: Vec<String> = shadowed.iter().map(|l| l.dimmed().to_string()).collect();
        println!(
            "{} {} {} {}",
            entry.id.bold(),
            layer_label(winner),
            "over".dimmed(),
            shadowed.join(", ")
        );
    }
    Ok(())
}
