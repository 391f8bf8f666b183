//! Per-invocation state shared by CLI commands.

use std::path::PathBuf;

use crate::cli::{Cli, OutputFormat};
use crate::config::Config;
use crate::engine::KnowledgeEngine;
use crate::error::Result;
use crate::layers::LoadResult;

pub struct AppContext {
    pub engine: KnowledgeEngine,
    pub format: OutputFormat,
    /// Load results of the initial layer load, in priority order
    pub load_results: Vec<(String, LoadResult)>,
}

impl AppContext {
    /// Load config, then initialize the engine.
    pub async fn from_cli(cli: &Cli) -> Result<Self> {
        let project_root = match &cli.project {
            Some(path) => path.clone(),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        };
        let config = Config::load(cli.config.as_deref(), &project_root)?;
        let mut engine = KnowledgeEngine::from_config(config)?;
        let load_results = engine.initialize().await?;

        Ok(Self {
            engine,
            format: cli.output_format(),
            load_results,
        })
    }

    pub const fn machine_mode(&self) -> bool {
        self.format.is_machine_readable()
    }
}
