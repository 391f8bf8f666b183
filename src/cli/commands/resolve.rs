//! lore resolve - Resolve a topic ID to its winning version

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::commands::layer_label;
use crate::cli::output::{HumanLayout, emit_human, emit_json, robot_ok};
use crate::error::{LoreError, Result, suggest_similar_topics};

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Topic ID, e.g. performance/calcfields-in-loops
    pub id: String,

    /// Print the markdown body
    #[arg(long)]
    pub content: bool,
}

pub fn run(ctx: &AppContext, args: &ResolveArgs) -> Result<()> {
    let Some(resolved) = ctx.engine.resolve_topic(&args.id) else {
        if !ctx.machine_mode() {
            let ids = ctx.engine.all_topic_ids();
            let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
            let similar = suggest_similar_topics(&args.id, &refs, 3);
            if !similar.is_empty() {
                eprintln!("Did you mean:");
                for id in similar {
                    eprintln!("  {}", id.cyan());
                }
            }
        }
        return Err(LoreError::TopicNotFound(args.id.clone()));
    };

    if ctx.machine_mode() {
        return emit_json(&robot_ok(&resolved));
    }

    let topic = &resolved.topic;
    let mut layout = HumanLayout::new();
    layout
        .title(&topic.title)
        .kv("ID", &topic.id)
        .kv("Layer", &layer_label(&resolved.source_layer).to_string())
        .kv("Domain", &topic.domain.join(", "))
        .kv("Difficulty", topic.difficulty.as_str());
    if !topic.tags.is_empty() {
        let tags: Vec<&str> = topic.tags.iter().map(String::as_str).collect();
        layout.kv("Tags", &tags.join(", "));
    }
    if let Some(category) = &topic.category {
        layout.kv("Category", category);
    }
    if let Some(severity) = &topic.severity {
        layout.kv("Severity", severity);
    }
    if topic.is_legacy() {
        layout.kv("Signals", &"none (legacy)".dimmed().to_string());
    } else {
        layout.kv("Constructs", &topic.constructs().join(", "));
    }
    if resolved.is_override {
        layout.kv("Overrides", &resolved.overridden_layers.join(", "));
    }

    if args.content {
        layout.blank().push_line(topic.content.trim_end());
        if let Some(sample) = &topic.sample_code {
            layout.blank().section("Sample").push_line(sample.trim_end());
        }
    }
    emit_human(layout);
    Ok(())
}
