//! Filesystem directory layer. No caching: every load re-reads the tree.

use std::path::{Path, PathBuf};

use crate::error::Result;

use super::LayerContents;
use super::scan;

#[derive(Debug, Clone)]
pub struct LocalSource {
    root: PathBuf,
    #[cfg(test)]
    load_delay: Option<std::time::Duration>,
}

impl LocalSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            #[cfg(test)]
            load_delay: None,
        }
    }

    /// Stall every load before scanning, to stand in for a slow source.
    #[cfg(test)]
    pub(crate) fn with_load_delay(mut self, delay: std::time::Duration) -> Self {
        self.load_delay = Some(delay);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn load(&self) -> Result<LayerContents> {
        #[cfg(test)]
        if let Some(delay) = self.load_delay {
            std::thread::sleep(delay);
        }
        load_tree(&self.root)
    }
}

/// Scan a knowledge tree on disk, reading samples relative to it.
pub(crate) fn load_tree(root: &Path) -> Result<LayerContents> {
    let (files, errors) = scan::collect_directory(root)?;
    Ok(scan::build_contents(files, errors, |relative| {
        std::fs::read_to_string(root.join(relative)).ok()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::KnowledgeFixture;

    #[test]
    fn reload_sees_new_files() {
        let fixture = KnowledgeFixture::new();
        fixture.topic("perf/first", "# First");
        let source = LocalSource::new(fixture.root());

        assert_eq!(source.load().unwrap().topics.len(), 1);
        fixture.topic("perf/second", "# Second");
        assert_eq!(source.load().unwrap().topics.len(), 2);
    }

    #[test]
    fn empty_tree_loads_nothing() {
        let fixture = KnowledgeFixture::new();
        let contents = LocalSource::new(fixture.root()).load().unwrap();
        assert!(contents.topics.is_empty());
        assert!(contents.specialists.is_empty());
    }
}
