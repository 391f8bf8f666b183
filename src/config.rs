use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{LoreError, Result};

/// Name of the default project layer added when `.lore/knowledge` exists.
pub const PROJECT_LAYER_NAME: &str = "project";
/// Name of the built-in layer.
pub const EMBEDDED_LAYER_NAME: &str = "embedded";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_layers")]
    pub layers: Vec<LayerConfig>,
    #[serde(default)]
    pub loading: LoadingConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            layers: default_layers(),
            loading: LoadingConfig::default(),
            search: SearchConfig::default(),
            router: RouterConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

fn default_layers() -> Vec<LayerConfig> {
    vec![LayerConfig::embedded(EMBEDDED_LAYER_NAME, 0)]
}

impl Config {
    /// Load configuration, then validate it.
    ///
    /// Sources, later ones patching earlier ones: defaults, then either the
    /// explicit path / `LORE_CONFIG`, or the global config followed by the
    /// project config, then `LORE_*` environment overrides.
    pub fn load(explicit_path: Option<&Path>, project_root: &Path) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("LORE_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = explicit {
            match Self::load_patch(&path)? {
                Some(patch) => config.merge_patch(patch),
                None => {
                    return Err(LoreError::Config(format!(
                        "config file {} does not exist",
                        path.display()
                    )));
                }
            }
        } else {
            if let Some(global) = Self::load_global()? {
                config.merge_patch(global);
            }
            if let Some(project) = Self::load_patch(&project_root.join(".lore/config.toml"))? {
                config.merge_patch(project);
            }
        }

        config.add_project_layer(project_root);
        config.apply_overrides_from(|key| std::env::var(key).ok())?;
        config.resolve_paths(project_root);
        config.validate()?;

        Ok(config)
    }

    /// Parse a complete configuration from TOML text (defaults fill gaps).
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let patch: ConfigPatch =
            toml::from_str(raw).map_err(|err| LoreError::Config(format!("parse config: {err}")))?;
        let mut config = Self::default();
        config.merge_patch(patch);
        Ok(config)
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        let Some(dir) = dirs::config_dir() else {
            return Ok(None);
        };
        Self::load_patch(&dir.join("lore/config.toml"))
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| LoreError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| LoreError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(layers) = patch.layers {
            merge_layers(&mut self.layers, layers);
        }
        if let Some(patch) = patch.loading {
            self.loading.merge(patch);
        }
        if let Some(patch) = patch.search {
            self.search.merge(patch);
        }
        if let Some(patch) = patch.router {
            self.router.merge(patch);
        }
        if let Some(patch) = patch.cache {
            self.cache.merge(patch);
        }
    }

    fn add_project_layer(&mut self, project_root: &Path) {
        if self.layers.iter().any(|l| l.name == PROJECT_LAYER_NAME) {
            return;
        }
        let dir = project_root.join(".lore/knowledge");
        if dir.is_dir() {
            self.layers
                .push(LayerConfig::local(PROJECT_LAYER_NAME, 100, dir));
        }
    }

    /// Apply `LORE_*` overrides using `lookup` to read variables.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = parse_var::<f32, _>(&lookup, "LORE_MIN_SCORE")? {
            self.search.min_score = value;
        }
        if let Some(value) = lookup("LORE_INCLUDE_LEGACY") {
            self.search.include_legacy_topics = parse_bool(&value);
        }
        if let Some(value) = parse_var::<usize, _>(&lookup, "LORE_MAX_CONCURRENT_LOADS")? {
            self.loading.max_concurrent_loads = value;
        }
        if let Some(value) = parse_var::<u64, _>(&lookup, "LORE_LOAD_TIMEOUT_SECS")? {
            self.loading.load_timeout = Duration::from_secs(value);
        }
        if let Some(value) = lookup("LORE_GIT_CACHE_DIR") {
            self.cache.git_dir = PathBuf::from(value);
        }
        Ok(())
    }

    fn resolve_paths(&mut self, project_root: &Path) {
        for layer in &mut self.layers {
            if let Some(path) = &layer.path {
                if path.is_relative() {
                    layer.path = Some(project_root.join(path));
                }
            }
        }
        if self.cache.git_dir.is_relative() {
            self.cache.git_dir = project_root.join(&self.cache.git_dir);
        }
    }

    /// Check the configuration and report every invalid field at once.
    pub fn validate(&self) -> Result<()> {
        let mut issues = Vec::new();

        if self.layers.is_empty() {
            issues.push("layers: at least one layer is required".to_string());
        }

        let mut names = HashSet::new();
        for (idx, layer) in self.layers.iter().enumerate() {
            let field = |name: &str| format!("layers[{idx}].{name}");

            if layer.name.trim().is_empty() {
                issues.push(format!("{}: must not be empty", field("name")));
            } else if !names.insert(layer.name.as_str()) {
                issues.push(format!(
                    "{}: duplicate layer name '{}'",
                    field("name"),
                    layer.name
                ));
            }

            match layer.layer_type {
                LayerType::Local if layer.path.is_none() => {
                    issues.push(format!("{}: required for local layers", field("path")));
                }
                LayerType::Git if layer.url.as_deref().is_none_or(|u| u.trim().is_empty()) => {
                    issues.push(format!("{}: required for git layers", field("url")));
                }
                _ => {}
            }

            if let Some(auth) = &layer.auth {
                match auth.kind {
                    AuthKind::Token if auth.token_env.is_none() => {
                        issues.push(format!("{}: required for token auth", field("auth.token_env")));
                    }
                    AuthKind::SshKey if auth.key_path.is_none() => {
                        issues.push(format!("{}: required for ssh_key auth", field("auth.key_path")));
                    }
                    _ => {}
                }
            }

            if layer.override_strategy != OverrideStrategy::Replace {
                warn!(
                    layer = %layer.name,
                    strategy = ?layer.override_strategy,
                    "override strategy is not implemented; topics will be replaced"
                );
            }
        }

        if self.loading.max_concurrent_loads == 0 {
            issues.push("loading.max_concurrent_loads: must be at least 1".to_string());
        }
        if self.loading.load_timeout.is_zero() {
            issues.push("loading.load_timeout: must be greater than zero".to_string());
        }

        if !(0.0..=1.0).contains(&self.search.min_score) {
            issues.push(format!(
                "search.min_score: {} is outside 0.0..=1.0",
                self.search.min_score
            ));
        }
        if self.search.default_limit == 0 {
            issues.push("search.default_limit: must be at least 1".to_string());
        }
        if self.search.content_excerpt_chars == 0 {
            issues.push("search.content_excerpt_chars: must be at least 1".to_string());
        }
        for (idx, pattern) in self.search.extra_patterns.iter().enumerate() {
            if pattern.name.trim().is_empty() {
                issues.push(format!("search.extra_patterns[{idx}].name: must not be empty"));
            } else if !pattern
                .name
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '-'))
            {
                issues.push(format!(
                    "search.extra_patterns[{idx}].name: {:?} must use only alphanumerics, '.', '_' or '-'",
                    pattern.name
                ));
            }
        }

        if self.router.max_suggestions == 0 {
            issues.push("router.max_suggestions: must be at least 1".to_string());
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(LoreError::InvalidConfig { issues })
        }
    }
}

// =============================================================================
// LAYERS
// =============================================================================

/// Source type of a knowledge layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerType {
    /// Read-only bundle shipped with the binary
    Embedded,
    /// Filesystem directory
    Local,
    /// Remote git repository checked out into the cache
    Git,
    /// Reserved, not implemented
    Http,
    /// Reserved, not implemented
    Npm,
}

impl LayerType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Embedded => "embedded",
            Self::Local => "local",
            Self::Git => "git",
            Self::Http => "http",
            Self::Npm => "npm",
        }
    }
}

impl std::fmt::Display for LayerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a winning layer's topic combines with the topics it overrides.
///
/// Only `Replace` has an implementation; the others are accepted in config
/// and resolve as `Replace`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideStrategy {
    #[default]
    Replace,
    MergeContent,
    MergeFrontmatter,
    AppendContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthKind {
    #[default]
    None,
    /// HTTPS token read from the environment variable named by `token_env`
    Token,
    /// SSH private key at `key_path`
    SshKey,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(rename = "type", default)]
    pub kind: AuthKind,
    #[serde(default)]
    pub token_env: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub key_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub name: String,
    /// Higher value wins on conflict
    #[serde(default)]
    pub priority: i32,
    #[serde(rename = "type")]
    pub layer_type: LayerType,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Directory for local layers, optional bundle directory for embedded ones
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    /// Directory inside a git checkout holding the knowledge tree
    #[serde(default)]
    pub subpath: Option<PathBuf>,
    #[serde(default)]
    pub override_strategy: OverrideStrategy,
    #[serde(default)]
    pub auth: Option<AuthConfig>,
}

impl LayerConfig {
    fn base(name: &str, priority: i32, layer_type: LayerType) -> Self {
        Self {
            name: name.to_string(),
            priority,
            layer_type,
            enabled: true,
            path: None,
            url: None,
            branch: None,
            subpath: None,
            override_strategy: OverrideStrategy::Replace,
            auth: None,
        }
    }

    pub fn embedded(name: &str, priority: i32) -> Self {
        Self::base(name, priority, LayerType::Embedded)
    }

    pub fn local(name: &str, priority: i32, path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::base(name, priority, LayerType::Local)
        }
    }

    pub fn git(name: &str, priority: i32, url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::base(name, priority, LayerType::Git)
        }
    }

    pub fn of_type(name: &str, priority: i32, layer_type: LayerType) -> Self {
        Self::base(name, priority, layer_type)
    }
}

/// Patch layers by name: same name replaces, new names append.
fn merge_layers(current: &mut Vec<LayerConfig>, patch: Vec<LayerConfig>) {
    for layer in patch {
        if let Some(existing) = current.iter_mut().find(|l| l.name == layer.name) {
            *existing = layer;
        } else {
            current.push(layer);
        }
    }
}

// =============================================================================
// SECTIONS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadingConfig {
    #[serde(default = "default_max_concurrent_loads")]
    pub max_concurrent_loads: usize,
    #[serde(default = "default_load_timeout", with = "humantime_serde")]
    pub load_timeout: Duration,
}

const fn default_max_concurrent_loads() -> usize {
    4
}

const fn default_load_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Default for LoadingConfig {
    fn default() -> Self {
        Self {
            max_concurrent_loads: default_max_concurrent_loads(),
            load_timeout: default_load_timeout(),
        }
    }
}

impl LoadingConfig {
    fn merge(&mut self, patch: LoadingPatch) {
        if let Some(value) = patch.max_concurrent_loads {
            self.max_concurrent_loads = value;
        }
        if let Some(value) = patch.load_timeout {
            self.load_timeout = value;
        }
    }
}

/// A named detection regex supplied from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSpec {
    pub name: String,
    pub pattern: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub min_score: f32,
    #[serde(default)]
    pub default_limit: usize,
    #[serde(default)]
    pub include_legacy_topics: bool,
    #[serde(default)]
    pub content_excerpt_chars: usize,
    #[serde(default)]
    pub extra_patterns: Vec<PatternSpec>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_score: 0.3,
            default_limit: 10,
            include_legacy_topics: true,
            content_excerpt_chars: 2000,
            extra_patterns: Vec::new(),
        }
    }
}

impl SearchConfig {
    fn merge(&mut self, patch: SearchPatch) {
        if let Some(value) = patch.min_score {
            self.min_score = value;
        }
        if let Some(value) = patch.default_limit {
            self.default_limit = value;
        }
        if let Some(value) = patch.include_legacy_topics {
            self.include_legacy_topics = value;
        }
        if let Some(value) = patch.content_excerpt_chars {
            self.content_excerpt_chars = value;
        }
        if let Some(values) = patch.extra_patterns {
            self.extra_patterns.extend(values);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default)]
    pub max_suggestions: usize,
    /// Specialists offered when a request carries no query text
    #[serde(default)]
    pub generalists: Vec<String>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_suggestions: 3,
            generalists: vec![
                "sam-coder".to_string(),
                "alex-architect".to_string(),
                "dean-debug".to_string(),
            ],
        }
    }
}

impl RouterConfig {
    fn merge(&mut self, patch: RouterPatch) {
        if let Some(value) = patch.max_suggestions {
            self.max_suggestions = value;
        }
        if let Some(values) = patch.generalists {
            self.generalists = values;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub git_dir: PathBuf,
    #[serde(with = "humantime_serde")]
    pub git_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            git_dir: dirs::cache_dir()
                .map(|dir| dir.join("lore/git"))
                .unwrap_or_else(|| PathBuf::from(".lore/cache/git")),
            git_ttl: Duration::from_secs(60 * 60),
        }
    }
}

impl CacheConfig {
    fn merge(&mut self, patch: CachePatch) {
        if let Some(value) = patch.git_dir {
            self.git_dir = value;
        }
        if let Some(value) = patch.git_ttl {
            self.git_ttl = value;
        }
    }
}

// =============================================================================
// PATCHES
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigPatch {
    pub layers: Option<Vec<LayerConfig>>,
    pub loading: Option<LoadingPatch>,
    pub search: Option<SearchPatch>,
    pub router: Option<RouterPatch>,
    pub cache: Option<CachePatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct LoadingPatch {
    pub max_concurrent_loads: Option<usize>,
    #[serde(default, with = "humantime_serde::option")]
    pub load_timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SearchPatch {
    pub min_score: Option<f32>,
    pub default_limit: Option<usize>,
    pub include_legacy_topics: Option<bool>,
    pub content_excerpt_chars: Option<usize>,
    pub extra_patterns: Option<Vec<PatternSpec>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RouterPatch {
    pub max_suggestions: Option<usize>,
    pub generalists: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CachePatch {
    pub git_dir: Option<PathBuf>,
    #[serde(default, with = "humantime_serde::option")]
    pub git_ttl: Option<Duration>,
}

const fn default_true() -> bool {
    true
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|err| LoreError::Config(format!("invalid {key} value {value}: {err}"))),
        None => Ok(None),
    }
}
