//! lore specialists - List specialists or show one

use std::collections::BTreeMap;

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_items, emit_json, robot_ok};
use crate::error::{LoreError, Result};

#[derive(Args, Debug)]
pub struct SpecialistsArgs {
    /// Show one specialist in full
    pub id: Option<String>,

    /// Group specialists by domain
    #[arg(long)]
    pub by_domain: bool,
}

pub fn run(ctx: &AppContext, args: &SpecialistsArgs) -> Result<()> {
    if let Some(id) = &args.id {
        return show(ctx, id);
    }

    if args.by_domain {
        let groups: BTreeMap<String, Vec<String>> = ctx
            .engine
            .specialists_by_domain()
            .into_iter()
            .map(|(domain, specialists)| {
                let ids = specialists.iter().map(|s| s.specialist_id.clone()).collect();
                (domain, ids)
            })
            .collect();
        if ctx.machine_mode() {
            return emit_json(&robot_ok(&groups));
        }
        for (domain, ids) in &groups {
            println!("{}: {}", domain.bold(), ids.join(", "));
        }
        return Ok(());
    }

    let specialists = ctx.engine.list_specialists();
    if ctx.machine_mode() {
        return emit_items(&specialists, ctx.format);
    }
    if specialists.is_empty() {
        println!("{}", "No specialists loaded".dimmed());
        return Ok(());
    }
    for specialist in &specialists {
        println!(
            "{:20} {:24} {}",
            specialist.specialist_id.bold(),
            specialist.title,
            specialist.role.dimmed()
        );
    }
    Ok(())
}

fn show(ctx: &AppContext, id: &str) -> Result<()> {
    let specialist = ctx
        .engine
        .get_specialist(id)
        .ok_or_else(|| LoreError::SpecialistNotFound(id.to_string()))?;
    if ctx.machine_mode() {
        return emit_json(&robot_ok(&specialist));
    }

    let mut layout = HumanLayout::new();
    layout
        .title(&specialist.title)
        .kv("ID", &specialist.specialist_id)
        .kv("Role", &specialist.role)
        .kv("Domains", &specialist.domains.join(", "))
        .kv("Expertise", &specialist.expertise.primary.join(", "));
    if !specialist.expertise.secondary.is_empty() {
        layout.kv("Also", &specialist.expertise.secondary.join(", "));
    }
    if !specialist.when_to_use.is_empty() {
        layout.blank().section("When to use");
        for item in &specialist.when_to_use {
            layout.bullet(item);
        }
    }
    if let Some(collaboration) = &specialist.collaboration {
        if !collaboration.natural_handoffs.is_empty() {
            layout.blank().kv("Hands off to", &collaboration.natural_handoffs.join(", "));
        }
    }
    if !specialist.persona.greeting.is_empty() {
        layout.blank().push_line(specialist.persona.greeting.italic().to_string());
    }
    emit_human(layout);
    Ok(())
}
