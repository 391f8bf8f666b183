//! lore list - List resolved topics

use clap::Args;
use colored::Colorize;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::commands::{layer_label, truncate_chars};
use crate::cli::output::emit_items;
use crate::error::Result;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only topics won by this layer
    #[arg(long)]
    pub layer: Option<String>,

    /// Only topics in this domain
    #[arg(long, short)]
    pub domain: Option<String>,

    /// Only topics without relevance signals
    #[arg(long)]
    pub legacy: bool,

    /// Maximum number of topics to show
    #[arg(long, short = 'n', default_value = "200")]
    pub limit: usize,
}

#[derive(Debug, Serialize)]
struct TopicRow {
    id: String,
    title: String,
    domain: Vec<String>,
    source_layer: String,
    is_override: bool,
    is_legacy: bool,
}

pub fn run(ctx: &AppContext, args: &ListArgs) -> Result<()> {
    let rows: Vec<TopicRow> = ctx
        .engine
        .layers()
        .resolve_all()
        .into_iter()
        .filter(|r| args.layer.as_ref().is_none_or(|l| &r.source_layer == l))
        .filter(|r| {
            args.domain
                .as_ref()
                .is_none_or(|d| r.topic.domain.iter().any(|td| td.eq_ignore_ascii_case(d)))
        })
        .filter(|r| !args.legacy || r.topic.is_legacy())
        .take(args.limit)
        .map(|r| TopicRow {
            id: r.topic.id.clone(),
            title: r.topic.title.clone(),
            domain: r.topic.domain.clone(),
            is_legacy: r.topic.is_legacy(),
            source_layer: r.source_layer,
            is_override: r.is_override,
        })
        .collect();

    if ctx.machine_mode() {
        return emit_items(&rows, ctx.format);
    }

    if rows.is_empty() {
        println!("{}", "No topics found".dimmed());
        return Ok(());
    }

    println!("{:48} {:12} {}", "ID".bold(), "LAYER".bold(), "TITLE".bold());
    println!("{}", "─".repeat(96).dimmed());
    for row in &rows {
        let mut markers = String::new();
        if row.is_override {
            markers.push_str(&" [override]".yellow().to_string());
        }
        if row.is_legacy {
            markers.push_str(&" [legacy]".dimmed().to_string());
        }
        println!(
            "{:48} {:12} {}{}",
            truncate_chars(&row.id, 47),
            layer_label(&row.source_layer),
            truncate_chars(&row.title, 40),
            markers
        );
    }
    println!();
    println!("{} topics", rows.len().to_string().bold());
    Ok(())
}
