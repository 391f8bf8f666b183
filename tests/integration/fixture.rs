use lore::KnowledgeEngine;
use lore::config::{Config, LayerConfig};
use lore::test_utils::fixtures::KnowledgeFixture;
use tempfile::TempDir;

/// Local layer trees plus a private git cache, turned into an engine.
pub struct EngineFixture {
    pub layers: Vec<(String, KnowledgeFixture)>,
    pub cache: TempDir,
    pub config: Config,
}

impl EngineFixture {
    /// A config with no layers at all.
    pub fn empty() -> Self {
        let cache = TempDir::new().expect("Failed to create cache dir");
        let mut config = Config::default();
        config.layers.clear();
        config.cache.git_dir = cache.path().to_path_buf();
        Self {
            layers: Vec::new(),
            cache,
            config,
        }
    }

    /// Builtin bundle at priority 0.
    pub fn with_builtin() -> Self {
        let mut fixture = Self::empty();
        fixture.config.layers.push(LayerConfig::embedded("embedded", 0));
        fixture
    }

    /// Add a local layer and return its tree for population.
    pub fn local_layer(&mut self, name: &str, priority: i32) -> &KnowledgeFixture {
        let tree = KnowledgeFixture::new();
        self.config
            .layers
            .push(LayerConfig::local(name, priority, tree.root()));
        self.layers.push((name.to_string(), tree));
        &self.layers[self.layers.len() - 1].1
    }

    pub async fn engine(&self) -> KnowledgeEngine {
        let mut engine = KnowledgeEngine::from_config(self.config.clone()).expect("valid config");
        engine.initialize().await.expect("engine initializes");
        engine
    }
}
