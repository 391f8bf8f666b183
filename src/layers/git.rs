//! Remote git repository layer.
//!
//! The repository is cloned into `<cache.git_dir>/<sha256(url)[..16]>`. A
//! `.lore-fetched` marker records the last successful fetch; within the TTL
//! the checkout is reused without network access. A failed refresh falls back
//! to the stale checkout; a failed first clone makes the layer unavailable.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use git2::{Cred, FetchOptions, RemoteCallbacks, Repository, ResetType, build::RepoBuilder};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::config::{AuthConfig, AuthKind, CacheConfig, LayerConfig};
use crate::error::{LoreError, Result};

use super::LayerContents;
use super::local::load_tree;

pub const FETCH_MARKER: &str = ".lore-fetched";

#[derive(Debug, Clone)]
pub struct GitSource {
    url: String,
    branch: Option<String>,
    subpath: Option<PathBuf>,
    auth: Option<AuthConfig>,
    cache_root: PathBuf,
    ttl: Duration,
}

#[derive(Debug, Clone)]
enum ResolvedAuth {
    Default,
    Token { token: String, username: Option<String> },
    SshKey { key_path: PathBuf, username: Option<String> },
}

impl GitSource {
    pub fn new(url: impl Into<String>, cache_root: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            url: url.into(),
            branch: None,
            subpath: None,
            auth: None,
            cache_root: cache_root.into(),
            ttl,
        }
    }

    pub fn from_config(config: &LayerConfig, cache: &CacheConfig) -> Result<Self> {
        let url = config.url.clone().ok_or_else(|| LoreError::InvalidConfig {
            issues: vec![format!("layer '{}': url is required", config.name)],
        })?;
        Ok(Self {
            branch: config.branch.clone(),
            subpath: config.subpath.clone(),
            auth: config.auth.clone(),
            ..Self::new(url, &cache.git_dir, cache.git_ttl)
        })
    }

    #[must_use]
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    #[must_use]
    pub fn with_subpath(mut self, subpath: impl Into<PathBuf>) -> Self {
        self.subpath = Some(subpath.into());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Cache directory for this URL.
    pub fn checkout_dir(&self) -> PathBuf {
        let digest = hex::encode(Sha256::digest(self.url.as_bytes()));
        self.cache_root.join(&digest[..16])
    }

    pub fn load(&self) -> Result<LayerContents> {
        let checkout = self.checkout_dir();
        let mut warnings = Vec::new();

        if is_fresh(&checkout, self.ttl) {
            debug!(url = %self.url, "git checkout within ttl, skipping fetch");
        } else if checkout.join(".git").exists() {
            match self.refresh(&checkout) {
                Ok(()) => write_marker(&checkout)?,
                Err(err) => {
                    warn!(url = %self.url, error = %err, "fetch failed, using stale checkout");
                    warnings.push(format!("using stale checkout of {}: {err}", self.url));
                }
            }
        } else {
            std::fs::create_dir_all(&self.cache_root)?;
            if let Err(err) = self.clone_into(&checkout) {
                if checkout.exists() {
                    if let Err(cleanup) = std::fs::remove_dir_all(&checkout) {
                        debug!(error = %cleanup, "failed to remove partial clone");
                    }
                }
                return Err(err);
            }
            write_marker(&checkout)?;
        }

        let root = self
            .subpath
            .as_ref()
            .map_or_else(|| checkout.clone(), |sub| checkout.join(sub));
        let mut contents = load_tree(&root)?;
        contents.warnings.extend(warnings);
        Ok(contents)
    }

    fn clone_into(&self, path: &Path) -> Result<()> {
        info!(url = %self.url, path = %path.display(), "cloning knowledge repository");
        let auth = self.resolve_auth()?;
        let mut fetch = FetchOptions::new();
        fetch.remote_callbacks(build_callbacks(&auth));

        let mut builder = RepoBuilder::new();
        builder.fetch_options(fetch);
        if let Some(branch) = self.branch.as_deref() {
            builder.branch(branch);
        }
        builder.clone(&self.url, path)?;
        Ok(())
    }

    /// Fetch and hard-reset the checkout to the remote branch head.
    fn refresh(&self, path: &Path) -> Result<()> {
        info!(url = %self.url, "refreshing knowledge repository");
        let repo = Repository::open(path)?;
        let auth = self.resolve_auth()?;

        let mut remote = repo
            .find_remote("origin")
            .or_else(|_| repo.remote_anonymous(&self.url))?;
        let mut fetch = FetchOptions::new();
        fetch.remote_callbacks(build_callbacks(&auth));
        remote.fetch(
            &["+refs/heads/*:refs/remotes/origin/*"],
            Some(&mut fetch),
            None,
        )?;

        let branch = match self.branch.as_deref() {
            Some(branch) => branch.to_string(),
            None => repo.head()?.shorthand().unwrap_or("main").to_string(),
        };
        let remote_ref = format!("refs/remotes/origin/{branch}");
        let commit = repo
            .find_reference(&remote_ref)
            .map_err(|_| LoreError::Config(format!("remote branch not found: {branch}")))?
            .peel_to_commit()?;

        repo.reset(commit.as_object(), ResetType::Hard, None)?;
        Ok(())
    }

    fn resolve_auth(&self) -> Result<ResolvedAuth> {
        let Some(auth) = &self.auth else {
            return Ok(ResolvedAuth::Default);
        };
        match auth.kind {
            AuthKind::None => Ok(ResolvedAuth::Default),
            AuthKind::Token => {
                let env = auth.token_env.as_deref().unwrap_or_default();
                let token = std::env::var(env)
                    .map_err(|_| LoreError::Config(format!("missing token env var: {env}")))?;
                Ok(ResolvedAuth::Token {
                    token,
                    username: auth.username.clone(),
                })
            }
            AuthKind::SshKey => {
                let key_path = auth
                    .key_path
                    .clone()
                    .ok_or_else(|| LoreError::MissingConfig("auth.key_path".to_string()))?;
                Ok(ResolvedAuth::SshKey {
                    key_path,
                    username: auth.username.clone(),
                })
            }
        }
    }
}

fn build_callbacks(auth: &ResolvedAuth) -> RemoteCallbacks<'static> {
    let auth = auth.clone();
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |_url, username_from_url, _allowed| match &auth {
        ResolvedAuth::Default => Cred::default(),
        ResolvedAuth::Token { token, username } => {
            let user = username
                .as_deref()
                .or(username_from_url)
                .unwrap_or("x-access-token");
            Cred::userpass_plaintext(user, token)
        }
        ResolvedAuth::SshKey { key_path, username } => {
            let user = username.as_deref().or(username_from_url).unwrap_or("git");
            Cred::ssh_key(user, None, key_path, None)
        }
    });
    callbacks
}

/// Whether the checkout was fetched less than `ttl` ago.
pub fn is_fresh(checkout: &Path, ttl: Duration) -> bool {
    let Ok(raw) = std::fs::read_to_string(checkout.join(FETCH_MARKER)) else {
        return false;
    };
    let Ok(fetched) = DateTime::parse_from_rfc3339(raw.trim()) else {
        return false;
    };
    let Ok(ttl) = chrono::Duration::from_std(ttl) else {
        return false;
    };
    Utc::now().signed_duration_since(fetched.with_timezone(&Utc)) < ttl
}

fn write_marker(checkout: &Path) -> Result<()> {
    std::fs::write(checkout.join(FETCH_MARKER), Utc::now().to_rfc3339())?;
    Ok(())
}
