//! The knowledge engine facade.
//!
//! Wires the layer service, the relevance service and the specialist router
//! together behind the operations callers use.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::core::Specialist;
use crate::error::Result;
use crate::layers::{KnowledgeLayer, LoadResult};
use crate::resolution::{LayerService, OverriddenTopic, ResolvedTopic, SystemStatistics};
use crate::router::{SpecialistRouter, SpecialistSuggestion, SuggestionContext};
use crate::search::{CodeCharacteristics, FindOptions, IndexStatistics, RelevanceService, RelevantTopic};

/// Topics attached to each specialist suggestion.
const TOPICS_PER_SUGGESTION: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct EngineStatistics {
    #[serde(flatten)]
    pub layers: SystemStatistics,
    pub index: Option<IndexStatistics>,
}

#[derive(Debug)]
pub struct KnowledgeEngine {
    config: Config,
    layers: LayerService,
    relevance: RelevanceService,
    router: SpecialistRouter,
}

impl KnowledgeEngine {
    /// Validate the configuration and build unloaded layers from it.
    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;
        let layers = LayerService::from_config(&config)?;
        Ok(Self::assemble(config, layers))
    }

    /// Use explicitly constructed layers with the rest of `config`.
    pub fn with_layers(config: Config, layers: Vec<KnowledgeLayer>) -> Self {
        let layers = LayerService::new(layers, config.loading.clone());
        Self::assemble(config, layers)
    }

    fn assemble(config: Config, layers: LayerService) -> Self {
        let relevance = RelevanceService::from_config(&config.search);
        let router = SpecialistRouter::new(Vec::new(), config.router.generalists.clone());
        Self {
            config,
            layers,
            relevance,
            router,
        }
    }

    pub const fn config(&self) -> &Config {
        &self.config
    }

    pub const fn layers(&self) -> &LayerService {
        &self.layers
    }

    /// Load every enabled layer, then build the router and the index.
    ///
    /// Layer failures are reported in the returned results; only an index
    /// build failure is an error.
    pub async fn initialize(&mut self) -> Result<Vec<(String, LoadResult)>> {
        let results = self.layers.initialize().await;
        let failed = results.iter().filter(|(_, r)| !r.success).count();
        if failed > 0 {
            warn!(failed, total = results.len(), "some layers failed to load");
        }
        self.refresh()?;
        info!(
            layers = results.len(),
            topics = self.layers.all_topic_ids().len(),
            specialists = self.router.len(),
            "knowledge engine ready"
        );
        Ok(results)
    }

    /// Dispose and re-load every layer.
    pub async fn reload(&mut self) -> Result<Vec<(String, LoadResult)>> {
        self.layers.dispose();
        self.relevance.invalidate();
        self.initialize().await
    }

    /// Enable or disable a layer and re-derive everything resolved from it.
    ///
    /// Returns false when no layer has that name.
    pub fn set_layer_enabled(&mut self, name: &str, enabled: bool) -> Result<bool> {
        let Some(layer) = self.layers.layer_mut(name) else {
            return Ok(false);
        };
        layer.set_enabled(enabled);
        self.refresh()?;
        Ok(true)
    }

    fn refresh(&mut self) -> Result<()> {
        self.router = SpecialistRouter::new(
            self.layers.specialists(),
            self.config.router.generalists.clone(),
        );
        self.relevance.rebuild(&self.layers)?;
        Ok(())
    }

    pub fn resolve_topic(&self, id: &str) -> Option<ResolvedTopic> {
        self.layers.resolve_topic(id)
    }

    pub fn all_topic_ids(&self) -> Vec<String> {
        self.layers.all_topic_ids()
    }

    pub fn overridden_topics(&self) -> Vec<OverriddenTopic> {
        self.layers.overridden_topics()
    }

    pub fn statistics(&self) -> EngineStatistics {
        EngineStatistics {
            layers: self.layers.statistics(),
            index: self.relevance.statistics(),
        }
    }

    /// Search options seeded from the `[search]` config section.
    pub fn default_find_options(&self) -> FindOptions {
        let search = &self.config.search;
        FindOptions {
            limit: search.default_limit,
            min_score: search.min_score,
            include_legacy_topics: search.include_legacy_topics,
            ..FindOptions::default()
        }
    }

    pub fn find_relevant_topics(&self, query: &str, options: &FindOptions) -> Result<Vec<RelevantTopic>> {
        self.relevance.find_relevant_topics(&self.layers, query, options)
    }

    pub fn analyze_code(&self, code: &str) -> CodeCharacteristics {
        self.relevance.analyze(code)
    }

    pub fn rebuild_index(&self) -> Result<IndexStatistics> {
        self.relevance.rebuild(&self.layers)
    }

    /// Route a request to specialists; `max_suggestions` defaults to the
    /// configured `router.max_suggestions`.
    pub fn suggest_specialists(
        &self,
        context: &SuggestionContext,
        max_suggestions: Option<usize>,
    ) -> Result<Vec<SpecialistSuggestion>> {
        let max = max_suggestions.unwrap_or(self.config.router.max_suggestions);
        let mut suggestions = self.router.suggest(context, max);

        let Some(query) = context.query.as_deref().filter(|q| !q.trim().is_empty()) else {
            return Ok(suggestions);
        };
        let hits = self.find_relevant_topics(query, &self.default_find_options())?;
        if hits.is_empty() {
            return Ok(suggestions);
        }

        for suggestion in &mut suggestions {
            let Some(specialist) = self.router.get_specialist(&suggestion.specialist_id) else {
                continue;
            };
            let domains: BTreeSet<String> =
                specialist.domains.iter().map(|d| d.to_lowercase()).collect();
            suggestion.relevant_topics = hits
                .iter()
                .filter(|hit| hit.domain.iter().any(|d| domains.contains(&d.to_lowercase())))
                .take(TOPICS_PER_SUGGESTION)
                .map(|hit| hit.topic_id.clone())
                .collect();
        }
        Ok(suggestions)
    }

    pub fn get_specialist(&self, id: &str) -> Option<Arc<Specialist>> {
        self.router.get_specialist(id)
    }

    /// All specialists, sorted by ID.
    pub fn list_specialists(&self) -> Vec<Arc<Specialist>> {
        self.router.specialists().cloned().collect()
    }

    pub fn specialists_by_domain(&self) -> BTreeMap<String, Vec<Arc<Specialist>>> {
        self.router.specialists_by_domain()
    }
}
