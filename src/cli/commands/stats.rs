//! lore stats - Layer and index statistics

use clap::Args;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json, robot_ok};
use crate::error::Result;

#[derive(Args, Debug)]
pub struct StatsArgs {}

pub fn run(ctx: &AppContext, _args: &StatsArgs) -> Result<()> {
    let stats = ctx.engine.statistics();
    if ctx.machine_mode() {
        return emit_json(&robot_ok(&stats));
    }

    let mut layout = HumanLayout::new();
    layout
        .title("Knowledge statistics")
        .kv(
            "Layers",
            &format!(
                "{} total, {} enabled, {} loaded",
                stats.layers.total_layers, stats.layers.enabled_layers, stats.layers.loaded_layers
            ),
        )
        .kv("Topics", &stats.layers.unique_topics.to_string())
        .kv("Overridden", &stats.layers.overridden_topics.to_string())
        .kv("Specialists", &stats.layers.unique_specialists.to_string());

    if let Some(index) = &stats.index {
        layout
            .blank()
            .section("Relevance index")
            .kv("Indexed", &index.total_topics.to_string())
            .kv("With signals", &index.v2_topics.to_string())
            .kv("Legacy", &index.legacy_topics.to_string())
            .kv("Built", &index.built_at.to_rfc3339())
            .kv("Build time", &format!("{}ms", index.build_time_ms));
    }

    layout.blank().section("Per layer");
    for layer in &stats.layers.layers {
        layout.bullet(&format!(
            "{} ({}, priority {}): {} topics ({} legacy), {} specialists",
            layer.name,
            layer.layer_type,
            layer.priority,
            layer.topic_count,
            layer.legacy_topic_count,
            layer.specialist_count
        ));
    }
    emit_human(layout);
    Ok(())
}
