//! lore analyze - Show what the code analyzer detects in a snippet

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::commands::read_input;
use crate::cli::output::{HumanLayout, emit_human, emit_json, robot_ok};
use crate::error::Result;

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Code snippet ('-' reads stdin)
    pub code: Option<String>,

    /// Read the snippet from a file
    #[arg(long, short)]
    pub file: Option<PathBuf>,
}

pub fn run(ctx: &AppContext, args: &AnalyzeArgs) -> Result<()> {
    let code = read_input(args.code.as_deref(), args.file.as_deref())?;
    let analysis = ctx.engine.analyze_code(&code);
    if ctx.machine_mode() {
        return emit_json(&robot_ok(&analysis));
    }

    let yes_no = |flag: bool| if flag { "yes".green() } else { "no".dimmed() }.to_string();
    let constructs = if analysis.constructs.is_empty() {
        "none".dimmed().to_string()
    } else {
        analysis.constructs.join(", ")
    };

    let mut layout = HumanLayout::new();
    layout
        .title("Code analysis")
        .kv("Constructs", &constructs)
        .kv("Object type", analysis.object_type.as_deref().unwrap_or("-"))
        .kv("Loop", &yes_no(analysis.has_loop))
        .kv("Field access", &yes_no(analysis.has_field_access))
        .kv("Record mutation", &yes_no(analysis.has_record_mutation))
        .kv("Validation", &yes_no(analysis.has_validation))
        .kv("Error handling", &yes_no(analysis.has_error_handling))
        .kv("Security call", &yes_no(analysis.has_security_call))
        .kv("Query terms", &analysis.query_terms().join(" "));
    emit_human(layout);
    Ok(())
}
