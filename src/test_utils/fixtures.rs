use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::layers::scan::{DOMAINS_DIR, SPECIALISTS_DIR};

/// A temporary knowledge layer tree (`domains/`, `specialists/`).
pub struct KnowledgeFixture {
    pub temp_dir: TempDir,
}

impl Default for KnowledgeFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl KnowledgeFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        Self { temp_dir }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write a file relative to the layer root, creating parent directories.
    pub fn file(&self, relative_path: &str, content: &str) -> PathBuf {
        let full_path = self.root().join(relative_path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        std::fs::write(&full_path, content).expect("Failed to write file");
        full_path
    }

    /// Write `domains/{id}.md`.
    pub fn topic(&self, id: &str, content: &str) -> PathBuf {
        self.file(&format!("{DOMAINS_DIR}/{id}.md"), content)
    }

    /// Write `specialists/{id}.md`.
    pub fn specialist(&self, id: &str, content: &str) -> PathBuf {
        self.file(&format!("{SPECIALISTS_DIR}/{id}.md"), content)
    }
}
