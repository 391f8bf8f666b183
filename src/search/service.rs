//! Owner of the current relevance index.
//!
//! Readers clone an `Arc` to the current index and search it without holding
//! the lock. A rebuild constructs a complete new index first and then swaps
//! the pointer, so a search never sees a partially built index.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::config::SearchConfig;
use crate::error::{LoreError, Result};
use crate::resolution::LayerService;

use super::analyzer::{CodeAnalyzer, CodeCharacteristics};
use super::index::{FindOptions, IndexStatistics, RelevanceIndex, RelevantTopic};

#[derive(Debug)]
pub struct RelevanceService {
    analyzer: CodeAnalyzer,
    excerpt_chars: usize,
    current: RwLock<Option<Arc<RelevanceIndex>>>,
}

impl RelevanceService {
    pub fn new(analyzer: CodeAnalyzer, excerpt_chars: usize) -> Self {
        Self {
            analyzer,
            excerpt_chars,
            current: RwLock::new(None),
        }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(
            CodeAnalyzer::new().with_extra_patterns(&config.extra_patterns),
            config.content_excerpt_chars,
        )
    }

    pub fn analyze(&self, code: &str) -> CodeCharacteristics {
        self.analyzer.analyze(code)
    }

    /// Build a fresh index from the current resolution and swap it in.
    pub fn rebuild(&self, layers: &LayerService) -> Result<IndexStatistics> {
        let resolved = layers.resolve_all();
        let index = Arc::new(RelevanceIndex::build(&resolved, self.excerpt_chars)?);
        let stats = index.statistics().clone();
        *self.current.write() = Some(index);
        info!(
            topics = stats.total_topics,
            legacy = stats.legacy_topics,
            ms = stats.build_time_ms,
            "relevance index rebuilt"
        );
        Ok(stats)
    }

    pub fn current(&self) -> Option<Arc<RelevanceIndex>> {
        self.current.read().clone()
    }

    pub fn is_built(&self) -> bool {
        self.current.read().is_some()
    }

    /// The current index, building it first if none exists yet.
    pub fn ensure_built(&self, layers: &LayerService) -> Result<Arc<RelevanceIndex>> {
        if let Some(index) = self.current() {
            return Ok(index);
        }
        self.rebuild(layers)?;
        self.current().ok_or_else(|| {
            LoreError::SearchIndex(tantivy::TantivyError::InternalError(
                "index missing after rebuild".to_string(),
            ))
        })
    }

    pub fn find_relevant_topics(
        &self,
        layers: &LayerService,
        query: &str,
        options: &FindOptions,
    ) -> Result<Vec<RelevantTopic>> {
        let index = self.ensure_built(layers)?;
        let characteristics = self.analyzer.analyze(query);
        index.search(&characteristics, options)
    }

    pub fn statistics(&self) -> Option<IndexStatistics> {
        self.current().map(|index| index.statistics().clone())
    }

    /// Drop the current index; the next search rebuilds it.
    pub fn invalidate(&self) {
        *self.current.write() = None;
    }
}
