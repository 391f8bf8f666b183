//! The read-only knowledge bundle shipped inside the binary.
//!
//! An embedded layer configured with a `path` reads that directory instead,
//! which lets packagers ship the bundle beside the binary.

use std::path::{Path, PathBuf};

use crate::error::Result;

use super::LayerContents;
use super::local::load_tree;
use super::scan::{self, SourceFile};

macro_rules! bundle {
    ($($path:literal),* $(,)?) => {
        &[$(($path, include_str!(concat!("../../knowledge/", $path)))),*]
    };
}

/// `(relative path, contents)` for every file in the built-in bundle.
pub static BUILTIN: &[(&str, &str)] = bundle![
    "domains/performance/setloadfields-before-findset.md",
    "domains/performance/samples/setloadfields.al",
    "domains/performance/calcfields-in-loops.md",
    "domains/performance/bulk-modify-operations.md",
    "domains/error-handling/tryfunction-usage.md",
    "domains/events/event-subscriber-patterns.md",
    "domains/security/isolated-storage-secrets.md",
    "domains/data-quality/validate-vs-assignment.md",
    "domains/integration/httpclient-json.md",
    "domains/testing/test-isolation.md",
    "specialists/sam-coder.md",
    "specialists/alex-architect.md",
    "specialists/dean-debug.md",
    "specialists/roger-reviewer.md",
    "specialists/quinn-tester.md",
    "specialists/seth-security.md",
];

#[derive(Debug, Clone, Default)]
pub struct EmbeddedSource {
    dir: Option<PathBuf>,
}

impl EmbeddedSource {
    /// The bundle compiled into the binary.
    pub const fn builtin() -> Self {
        Self { dir: None }
    }

    /// A bundle unpacked on disk.
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn load(&self) -> Result<LayerContents> {
        match &self.dir {
            Some(dir) => load_tree(dir),
            None => Ok(load_builtin()),
        }
    }
}

fn load_builtin() -> LayerContents {
    let files = BUILTIN
        .iter()
        .filter(|(path, _)| {
            let name = path.rsplit('/').next().unwrap_or(path);
            path.ends_with(".md") && !scan::is_skipped(name)
        })
        .map(|(path, raw)| SourceFile {
            relative: (*path).to_string(),
            raw: (*raw).to_string(),
            modified: None,
            origin: None,
        })
        .collect();

    scan::build_contents(files, Vec::new(), |relative| {
        BUILTIN
            .iter()
            .find(|(path, _)| *path == relative)
            .map(|(_, raw)| (*raw).to_string())
    })
}
