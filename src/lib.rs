pub mod app;
pub mod cli;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod layers;
pub mod resolution;
pub mod router;
pub mod search;
pub mod test_utils;

pub use engine::KnowledgeEngine;
pub use error::{LoreError, Result};

/// Package version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
