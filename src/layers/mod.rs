//! Knowledge layers
//!
//! A layer is one prioritized source of topics and specialists. Sources form a
//! closed set ([`LayerSource`]) behind a single capability surface on
//! [`KnowledgeLayer`]. Loading never fails on a single bad document: per-item
//! problems are accumulated in the [`LoadResult`] and the rest of the corpus
//! still loads.

pub mod embedded;
pub mod git;
pub mod local;
pub mod scan;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{CacheConfig, LayerConfig, OverrideStrategy};
use crate::core::{Specialist, Topic};
use crate::error::{LoreError, Result};

pub use crate::config::LayerType;
pub use embedded::EmbeddedSource;
pub use git::GitSource;
pub use local::LocalSource;

/// Everything a layer produced during one load.
#[derive(Debug, Clone, Default)]
pub struct LayerContents {
    pub topics: BTreeMap<String, Arc<Topic>>,
    pub specialists: BTreeMap<String, Arc<Specialist>>,
    /// Per-item failures (unparseable documents, duplicate IDs)
    pub errors: Vec<String>,
    /// Non-fatal notices (missing sample files, stale git checkouts)
    pub warnings: Vec<String>,
}

/// Outcome of a single layer load.
#[derive(Debug, Clone, Serialize)]
pub struct LoadResult {
    pub success: bool,
    pub topics_loaded: usize,
    pub specialists_loaded: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub load_time_ms: u64,
}

impl LoadResult {
    /// A result for a layer that produced nothing.
    pub fn failed(reason: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            success: false,
            topics_loaded: 0,
            specialists_loaded: 0,
            errors: vec![reason.into()],
            warnings: Vec::new(),
            load_time_ms: millis(elapsed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LayerStatistics {
    pub name: String,
    pub layer_type: LayerType,
    pub priority: i32,
    pub enabled: bool,
    pub loaded: bool,
    pub topic_count: usize,
    pub legacy_topic_count: usize,
    pub specialist_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_load: Option<LoadResult>,
}

/// The closed set of layer sources.
#[derive(Debug, Clone)]
pub enum LayerSource {
    Embedded(EmbeddedSource),
    Local(LocalSource),
    Git(GitSource),
    Http { url: Option<String> },
    Npm { package: Option<String> },
}

impl LayerSource {
    /// Blocking load of the source's full contents.
    ///
    /// `Err` means the layer as a whole is unavailable; per-document failures
    /// are reported inside the returned contents.
    pub fn load(&self) -> Result<LayerContents> {
        match self {
            Self::Embedded(source) => source.load(),
            Self::Local(source) => source.load(),
            Self::Git(source) => source.load(),
            Self::Http { url } => Err(LoreError::NotImplemented(format!(
                "http layers are not supported (url: {})",
                url.as_deref().unwrap_or("<none>")
            ))),
            Self::Npm { package } => Err(LoreError::NotImplemented(format!(
                "npm layers are not supported (package: {})",
                package.as_deref().unwrap_or("<none>")
            ))),
        }
    }

    pub const fn layer_type(&self) -> LayerType {
        match self {
            Self::Embedded(_) => LayerType::Embedded,
            Self::Local(_) => LayerType::Local,
            Self::Git(_) => LayerType::Git,
            Self::Http { .. } => LayerType::Http,
            Self::Npm { .. } => LayerType::Npm,
        }
    }
}

/// A named, prioritized knowledge source and its loaded contents.
#[derive(Debug, Clone)]
pub struct KnowledgeLayer {
    name: String,
    priority: i32,
    enabled: bool,
    override_strategy: OverrideStrategy,
    source: LayerSource,
    contents: LayerContents,
    loaded: bool,
    last_load: Option<LoadResult>,
}

impl KnowledgeLayer {
    pub fn new(name: impl Into<String>, priority: i32, source: LayerSource) -> Self {
        Self {
            name: name.into(),
            priority,
            enabled: true,
            override_strategy: OverrideStrategy::Replace,
            source,
            contents: LayerContents::default(),
            loaded: false,
            last_load: None,
        }
    }

    /// Build an unloaded layer from its configuration record.
    pub fn from_config(config: &LayerConfig, cache: &CacheConfig) -> Result<Self> {
        let source = match config.layer_type {
            LayerType::Embedded => LayerSource::Embedded(match &config.path {
                Some(dir) => EmbeddedSource::from_dir(dir),
                None => EmbeddedSource::builtin(),
            }),
            LayerType::Local => {
                let path = config.path.as_ref().ok_or_else(|| LoreError::InvalidConfig {
                    issues: vec![format!("layer '{}': path is required", config.name)],
                })?;
                LayerSource::Local(LocalSource::new(path))
            }
            LayerType::Git => LayerSource::Git(GitSource::from_config(config, cache)?),
            LayerType::Http => LayerSource::Http {
                url: config.url.clone(),
            },
            LayerType::Npm => LayerSource::Npm {
                package: config.url.clone(),
            },
        };

        let mut layer = Self::new(&config.name, config.priority, source);
        layer.enabled = config.enabled;
        layer.override_strategy = config.override_strategy;
        Ok(layer)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn priority(&self) -> i32 {
        self.priority
    }

    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    pub const fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub const fn layer_type(&self) -> LayerType {
        self.source.layer_type()
    }

    /// How this layer's topics combine with the ones they override.
    pub const fn override_strategy(&self) -> OverrideStrategy {
        self.override_strategy
    }

    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub const fn source(&self) -> &LayerSource {
        &self.source
    }

    pub const fn last_load(&self) -> Option<&LoadResult> {
        self.last_load.as_ref()
    }

    /// Load synchronously and install the result.
    pub fn initialize(&mut self) -> LoadResult {
        let started = Instant::now();
        let outcome = self.source.load();
        self.finish_load(outcome, started.elapsed())
    }

    /// Re-read the source. Local layers are always re-read from disk; git
    /// layers honor their cache TTL.
    pub fn reload(&mut self) -> LoadResult {
        self.initialize()
    }

    /// Install the outcome of a load performed elsewhere.
    ///
    /// A failed load leaves the layer empty so lower layers keep answering.
    pub fn finish_load(&mut self, outcome: Result<LayerContents>, elapsed: Duration) -> LoadResult {
        let result = match outcome {
            Ok(contents) => {
                for error in &contents.errors {
                    warn!(layer = %self.name, %error, "skipped document");
                }
                let result = LoadResult {
                    success: true,
                    topics_loaded: contents.topics.len(),
                    specialists_loaded: contents.specialists.len(),
                    errors: contents.errors.clone(),
                    warnings: contents.warnings.clone(),
                    load_time_ms: millis(elapsed),
                };
                info!(
                    layer = %self.name,
                    topics = result.topics_loaded,
                    specialists = result.specialists_loaded,
                    errors = result.errors.len(),
                    ms = result.load_time_ms,
                    "layer loaded"
                );
                self.contents = contents;
                self.loaded = true;
                result
            }
            Err(err) => {
                let err = LoreError::LayerLoad {
                    layer: self.name.clone(),
                    reason: err.to_string(),
                };
                warn!(layer = %self.name, error = %err, "layer unavailable");
                self.contents = LayerContents::default();
                self.loaded = false;
                LoadResult::failed(err.to_string(), elapsed)
            }
        };

        self.last_load = Some(result.clone());
        result
    }

    pub fn has_topic(&self, id: &str) -> bool {
        self.contents.topics.contains_key(id)
    }

    pub fn get_topic(&self, id: &str) -> Option<Arc<Topic>> {
        self.contents.topics.get(id).cloned()
    }

    /// Topic IDs in lexical order.
    pub fn topic_ids(&self) -> Vec<String> {
        self.contents.topics.keys().cloned().collect()
    }

    pub fn topics(&self) -> impl Iterator<Item = &Arc<Topic>> {
        self.contents.topics.values()
    }

    pub fn specialists(&self) -> impl Iterator<Item = &Arc<Specialist>> {
        self.contents.specialists.values()
    }

    pub fn get_specialist(&self, id: &str) -> Option<Arc<Specialist>> {
        self.contents.specialists.get(id).cloned()
    }

    /// Naive layer-local search: lowercase term hits weighted title ×3,
    /// tags ×2, content ×1.
    pub fn search_topics(&self, query: &str, limit: usize) -> Vec<Arc<Topic>> {
        let terms: Vec<String> = query
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();
        if terms.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(u32, &Arc<Topic>)> = self
            .contents
            .topics
            .values()
            .filter_map(|topic| {
                let title = topic.title.to_lowercase();
                let content = topic.content.to_lowercase();
                let score: u32 = terms
                    .iter()
                    .map(|term| {
                        let mut s = 0;
                        if title.contains(term.as_str()) {
                            s += 3;
                        }
                        if topic.tags.iter().any(|t| t.to_lowercase().contains(term.as_str())) {
                            s += 2;
                        }
                        if content.contains(term.as_str()) {
                            s += 1;
                        }
                        s
                    })
                    .sum();
                (score > 0).then_some((score, topic))
            })
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.id.cmp(&b.1.id)));
        scored
            .into_iter()
            .take(limit)
            .map(|(_, topic)| Arc::clone(topic))
            .collect()
    }

    pub fn statistics(&self) -> LayerStatistics {
        LayerStatistics {
            name: self.name.clone(),
            layer_type: self.layer_type(),
            priority: self.priority,
            enabled: self.enabled,
            loaded: self.loaded,
            topic_count: self.contents.topics.len(),
            legacy_topic_count: self.topics().filter(|t| t.is_legacy()).count(),
            specialist_count: self.contents.specialists.len(),
            last_load: self.last_load.clone(),
        }
    }

    /// Drop loaded contents. The layer can be initialized again afterwards.
    pub fn dispose(&mut self) {
        debug!(layer = %self.name, "disposing layer");
        self.contents = LayerContents::default();
        self.loaded = false;
    }
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
