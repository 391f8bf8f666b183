//! Layer loading and override resolution
//!
//! Layers are kept sorted by priority, highest first. For any topic ID the
//! first enabled layer holding it wins; every other enabled layer holding it
//! is reported as overridden.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::{Config, LoadingConfig, OverrideStrategy};
use crate::core::{Specialist, Topic};
use crate::error::{LoreError, Result};
use crate::layers::{KnowledgeLayer, LayerContents, LayerStatistics, LoadResult};

/// The winning version of a topic and the layers it shadows.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedTopic {
    pub topic: Arc<Topic>,
    pub source_layer: String,
    pub is_override: bool,
    /// Other enabled layers holding the same ID, highest priority first
    pub overridden_layers: Vec<String>,
}

/// A topic ID present in more than one enabled layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverriddenTopic {
    pub id: String,
    /// Layers holding the ID, highest priority (the winner) first
    pub layers: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemStatistics {
    pub total_layers: usize,
    pub enabled_layers: usize,
    pub loaded_layers: usize,
    pub unique_topics: usize,
    pub overridden_topics: usize,
    pub unique_specialists: usize,
    pub layers: Vec<LayerStatistics>,
}

/// Owns the configured layers and answers resolution queries over them.
#[derive(Debug)]
pub struct LayerService {
    layers: Vec<KnowledgeLayer>,
    loading: LoadingConfig,
}

impl LayerService {
    /// Layers are ordered by priority descending; ties keep their given order.
    pub fn new(mut layers: Vec<KnowledgeLayer>, loading: LoadingConfig) -> Self {
        layers.sort_by(|a, b| b.priority().cmp(&a.priority()));
        Self { layers, loading }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let layers = config
            .layers
            .iter()
            .map(|layer| KnowledgeLayer::from_config(layer, &config.cache))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(layers, config.loading.clone()))
    }

    /// Load every enabled layer with bounded parallelism and a per-layer
    /// timeout. Failures are recorded per layer; this never fails as a whole.
    pub async fn initialize(&mut self) -> Vec<(String, LoadResult)> {
        let started = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.loading.max_concurrent_loads.max(1)));
        let timeout = self.loading.load_timeout;
        let mut tasks = JoinSet::new();

        for (idx, layer) in self.layers.iter().enumerate() {
            if !layer.enabled() {
                debug!(layer = %layer.name(), "layer disabled, skipping load");
                continue;
            }
            let source = layer.source().clone();
            let name = layer.name().to_string();
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let load_started = Instant::now();
                let load = tokio::task::spawn_blocking(move || source.load());
                let outcome: Result<LayerContents> = match tokio::time::timeout(timeout, load).await {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(join)) => Err(LoreError::LayerLoad {
                        layer: name,
                        reason: format!("load task failed: {join}"),
                    }),
                    Err(_) => Err(LoreError::Timeout(format!(
                        "layer '{name}' did not load within {timeout:?}"
                    ))),
                };
                (idx, outcome, load_started.elapsed())
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, outcome, elapsed)) => {
                    let layer = &mut self.layers[idx];
                    let result = layer.finish_load(outcome, elapsed);
                    results.push((layer.name().to_string(), result));
                }
                Err(err) => warn!(error = %err, "layer load task aborted"),
            }
        }

        // Report in priority order regardless of completion order.
        results.sort_by_key(|(name, _)| self.position(name));
        info!(
            layers = results.len(),
            failed = results.iter().filter(|(_, r)| !r.success).count(),
            topics = self.all_topic_ids().len(),
            ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "knowledge layers initialized"
        );
        results
    }

    fn position(&self, name: &str) -> usize {
        self.layers
            .iter()
            .position(|l| l.name() == name)
            .unwrap_or(usize::MAX)
    }

    /// All layers, highest priority first.
    pub fn layers(&self) -> &[KnowledgeLayer] {
        &self.layers
    }

    pub fn layer(&self, name: &str) -> Option<&KnowledgeLayer> {
        self.layers.iter().find(|l| l.name() == name)
    }

    pub fn layer_mut(&mut self, name: &str) -> Option<&mut KnowledgeLayer> {
        self.layers.iter_mut().find(|l| l.name() == name)
    }

    fn enabled_layers(&self) -> impl Iterator<Item = &KnowledgeLayer> {
        self.layers.iter().filter(|l| l.enabled())
    }

    /// Resolve a topic ID to its winning version, or `None` when no enabled
    /// layer holds it.
    pub fn resolve_topic(&self, id: &str) -> Option<ResolvedTopic> {
        let mut holders = self.enabled_layers().filter(|l| l.has_topic(id));
        let winner = holders.next()?;
        let shadowed: Vec<&KnowledgeLayer> = holders.collect();

        let winning_topic = winner.get_topic(id)?;
        let lower_topics: Vec<Arc<Topic>> = shadowed
            .iter()
            .filter_map(|l| l.get_topic(id))
            .collect();
        let topic = apply_override_strategy(winner.override_strategy(), winning_topic, &lower_topics);

        let overridden_layers: Vec<String> =
            shadowed.iter().map(|l| l.name().to_string()).collect();
        Some(ResolvedTopic {
            topic,
            source_layer: winner.name().to_string(),
            is_override: !overridden_layers.is_empty(),
            overridden_layers,
        })
    }

    /// Union of topic IDs over enabled layers, sorted.
    pub fn all_topic_ids(&self) -> Vec<String> {
        self.enabled_layers()
            .flat_map(KnowledgeLayer::topic_ids)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Every resolvable topic in ID order.
    pub fn resolve_all(&self) -> Vec<ResolvedTopic> {
        self.all_topic_ids()
            .iter()
            .filter_map(|id| self.resolve_topic(id))
            .collect()
    }

    pub fn overridden_topics(&self) -> Vec<OverriddenTopic> {
        let mut holders: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for layer in self.enabled_layers() {
            for id in layer.topic_ids() {
                holders
                    .entry(id)
                    .or_default()
                    .push(layer.name().to_string());
            }
        }
        holders
            .into_iter()
            .filter(|(_, layers)| layers.len() > 1)
            .map(|(id, layers)| OverriddenTopic { id, layers })
            .collect()
    }

    /// Specialists from all enabled layers, one per ID. The copy from the
    /// highest-priority layer is kept.
    pub fn specialists(&self) -> Vec<Arc<Specialist>> {
        let mut seen: HashMap<&str, Arc<Specialist>> = HashMap::new();
        for layer in self.enabled_layers() {
            for specialist in layer.specialists() {
                seen.entry(specialist.specialist_id.as_str())
                    .or_insert_with(|| Arc::clone(specialist));
            }
        }
        let mut specialists: Vec<Arc<Specialist>> = seen.into_values().collect();
        specialists.sort_by(|a, b| a.specialist_id.cmp(&b.specialist_id));
        specialists
    }

    pub fn get_specialist(&self, id: &str) -> Option<Arc<Specialist>> {
        self.enabled_layers().find_map(|l| l.get_specialist(id))
    }

    pub fn statistics(&self) -> SystemStatistics {
        SystemStatistics {
            total_layers: self.layers.len(),
            enabled_layers: self.enabled_layers().count(),
            loaded_layers: self.layers.iter().filter(|l| l.is_loaded()).count(),
            unique_topics: self.all_topic_ids().len(),
            overridden_topics: self.overridden_topics().len(),
            unique_specialists: self.specialists().len(),
            layers: self.layers.iter().map(KnowledgeLayer::statistics).collect(),
        }
    }

    pub fn dispose(&mut self) {
        for layer in &mut self.layers {
            layer.dispose();
        }
    }
}

/// Combine a winning topic with the versions it overrides.
///
/// Only `Replace` has merge logic; the other strategies resolve as `Replace`.
pub fn apply_override_strategy(
    strategy: OverrideStrategy,
    winner: Arc<Topic>,
    overridden: &[Arc<Topic>],
) -> Arc<Topic> {
    match strategy {
        OverrideStrategy::Replace => winner,
        OverrideStrategy::MergeContent
        | OverrideStrategy::MergeFrontmatter
        | OverrideStrategy::AppendContent => {
            debug!(
                topic = %winner.id,
                ?strategy,
                overridden = overridden.len(),
                "merge strategy not implemented, replacing"
            );
            winner
        }
    }
}
