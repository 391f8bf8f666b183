//! lore suggest - Route a request to specialists

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::emit_items;
use crate::error::Result;
use crate::router::{MatchKind, SuggestionContext};

#[derive(Args, Debug)]
pub struct SuggestArgs {
    /// The request, e.g. "why is my FindSet loop slow"
    pub query: Vec<String>,

    /// Domain currently being worked in
    #[arg(long, short)]
    pub domain: Option<String>,

    /// Maximum number of suggestions
    #[arg(long, short = 'n')]
    pub max: Option<usize>,
}

pub fn run(ctx: &AppContext, args: &SuggestArgs) -> Result<()> {
    let mut context = SuggestionContext::new();
    if !args.query.is_empty() {
        context = context.with_query(args.query.join(" "));
    }
    if let Some(domain) = &args.domain {
        context = context.with_current_domain(domain.clone());
    }

    let suggestions = ctx.engine.suggest_specialists(&context, args.max)?;
    if ctx.machine_mode() {
        return emit_items(&suggestions, ctx.format);
    }

    if suggestions.is_empty() {
        println!("{}", "No specialist matched the request".dimmed());
        return Ok(());
    }

    for suggestion in &suggestions {
        let kind = match suggestion.match_kind {
            MatchKind::NameMatch => "by name".cyan(),
            MatchKind::Scored => "scored".normal(),
            MatchKind::Generalist => "generalist".dimmed(),
        };
        println!(
            "{} {} ({:.0}% confidence, {})",
            suggestion.title.bold(),
            suggestion.specialist_id.dimmed(),
            suggestion.confidence * 100.0,
            kind
        );
        println!("     {}", suggestion.role);
        for reason in &suggestion.reasons {
            println!("     - {reason}");
        }
        if !suggestion.relevant_topics.is_empty() {
            println!("     topics: {}", suggestion.relevant_topics.join(", ").cyan());
        }
        println!();
    }
    Ok(())
}
