//! lore rebuild - Rebuild the relevance index

use clap::Args;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json, robot_ok};
use crate::error::Result;

#[derive(Args, Debug)]
pub struct RebuildArgs {}

pub fn run(ctx: &AppContext, _args: &RebuildArgs) -> Result<()> {
    let stats = ctx.engine.rebuild_index()?;
    if ctx.machine_mode() {
        return emit_json(&robot_ok(&stats));
    }

    let mut layout = HumanLayout::new();
    layout
        .title("Relevance index rebuilt")
        .kv("Topics", &stats.total_topics.to_string())
        .kv("With signals", &stats.v2_topics.to_string())
        .kv("Legacy", &stats.legacy_topics.to_string())
        .kv("Build time", &format!("{}ms", stats.build_time_ms));
    emit_human(layout);
    Ok(())
}
