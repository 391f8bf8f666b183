//! Turning a knowledge tree into layer contents.
//!
//! Layout: `domains/**/*.md` are topics, `specialists/*.md` are specialists.
//! Files starting with `_` and `README.md`/`index.md` are skipped.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;
use walkdir::WalkDir;

use crate::core::{Specialist, Topic};
use crate::error::{LoreError, Result};

use super::LayerContents;

pub const DOMAINS_DIR: &str = "domains";
pub const SPECIALISTS_DIR: &str = "specialists";

/// One markdown document read from a knowledge tree.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path relative to the tree root, `/`-separated
    pub relative: String,
    pub raw: String,
    pub modified: Option<DateTime<Utc>>,
    /// Absolute path when the file came from disk
    pub origin: Option<PathBuf>,
}

/// Whether a file name should be ignored by the loader.
pub fn is_skipped(file_name: &str) -> bool {
    file_name.starts_with('_')
        || file_name.eq_ignore_ascii_case("README.md")
        || file_name.eq_ignore_ascii_case("index.md")
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
}

/// Read every candidate document under `root`.
///
/// A missing `root` is a layer failure; unreadable files are reported in the
/// returned error list.
pub fn collect_directory(root: &Path) -> Result<(Vec<SourceFile>, Vec<String>)> {
    if !root.is_dir() {
        return Err(LoreError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("knowledge directory {} does not exist", root.display()),
        )));
    }

    let mut files = Vec::new();
    let mut errors = Vec::new();

    for (dir, max_depth) in [(DOMAINS_DIR, usize::MAX), (SPECIALISTS_DIR, 1)] {
        let base = root.join(dir);
        if !base.is_dir() {
            continue;
        }

        for entry in WalkDir::new(&base)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    errors.push(format!("walk {}: {err}", base.display()));
                    continue;
                }
            };
            let path = entry.path();
            let name = entry.file_name().to_string_lossy();
            if !entry.file_type().is_file() || !is_markdown(path) || is_skipped(&name) {
                continue;
            }

            let relative = relative_slash_path(root, path);
            match std::fs::read_to_string(path) {
                Ok(raw) => {
                    let modified = entry
                        .metadata()
                        .ok()
                        .and_then(|meta| meta.modified().ok())
                        .map(DateTime::<Utc>::from);
                    files.push(SourceFile {
                        relative,
                        raw,
                        modified,
                        origin: Some(path.to_path_buf()),
                    });
                }
                Err(err) => errors.push(format!("{relative}: {err}")),
            }
        }
    }

    Ok((files, errors))
}

/// Parse collected documents into layer contents.
///
/// `read_sample` receives a normalized root-relative path and returns the
/// sample text when it exists.
pub fn build_contents<F>(files: Vec<SourceFile>, read_errors: Vec<String>, read_sample: F) -> LayerContents
where
    F: Fn(&str) -> Option<String>,
{
    let mut contents = LayerContents {
        errors: read_errors,
        ..LayerContents::default()
    };

    for file in files {
        if let Some(rest) = file.relative.strip_prefix(&format!("{DOMAINS_DIR}/")) {
            ingest_topic(&mut contents, rest, &file, &read_sample);
        } else if let Some(rest) = file.relative.strip_prefix(&format!("{SPECIALISTS_DIR}/")) {
            ingest_specialist(&mut contents, rest, &file);
        }
    }

    debug!(
        topics = contents.topics.len(),
        specialists = contents.specialists.len(),
        errors = contents.errors.len(),
        "scanned knowledge tree"
    );
    contents
}

fn ingest_topic<F>(contents: &mut LayerContents, domain_relative: &str, file: &SourceFile, read_sample: &F)
where
    F: Fn(&str) -> Option<String>,
{
    let fallback_id = domain_relative
        .strip_suffix(".md")
        .unwrap_or(domain_relative);
    let fallback_domain = fallback_id
        .split_once('/')
        .map(|(domain, _)| domain);

    let mut topic = match Topic::from_markdown(fallback_id, fallback_domain, &file.raw) {
        Ok(topic) => topic,
        Err(err) => {
            contents.errors.push(format!("{}: {err}", file.relative));
            return;
        }
    };

    if contents.topics.contains_key(&topic.id) {
        contents.errors.push(format!(
            "{}: duplicate topic id '{}' in layer, keeping the first",
            file.relative, topic.id
        ));
        return;
    }

    if topic.last_modified.is_none() {
        topic.last_modified = file.modified;
    }
    topic.source_path.clone_from(&file.origin);

    if let Some(sample) = topic.samples.clone() {
        let parent = file
            .relative
            .rsplit_once('/')
            .map_or("", |(parent, _)| parent);
        match normalize_relative(parent, &sample).and_then(|path| read_sample(&path)) {
            Some(code) => topic.sample_code = Some(code),
            None => contents.warnings.push(format!(
                "{}: sample file '{sample}' not found",
                file.relative
            )),
        }
    }

    contents.topics.insert(topic.id.clone(), Arc::new(topic));
}

fn ingest_specialist(contents: &mut LayerContents, file_name: &str, file: &SourceFile) {
    let fallback_id = file_name.strip_suffix(".md").unwrap_or(file_name);
    match Specialist::from_markdown(fallback_id, &file.raw) {
        Ok(specialist) => {
            if contents.specialists.contains_key(&specialist.specialist_id) {
                contents.errors.push(format!(
                    "{}: duplicate specialist id '{}' in layer, keeping the first",
                    file.relative, specialist.specialist_id
                ));
                return;
            }
            contents
                .specialists
                .insert(specialist.specialist_id.clone(), Arc::new(specialist));
        }
        Err(err) => contents.errors.push(format!("{}: {err}", file.relative)),
    }
}

fn relative_slash_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Join `reference` onto `parent`, resolving `.` and `..`.
///
/// Returns `None` when the result would escape the tree root or is absolute.
pub fn normalize_relative(parent: &str, reference: &str) -> Option<String> {
    let reference = Path::new(reference);
    if reference.is_absolute() {
        return None;
    }

    let mut parts: Vec<String> = parent
        .split('/')
        .filter(|p| !p.is_empty())
        .map(ToString::to_string)
        .collect();

    for component in reference.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::CurDir => {}
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    Some(parts.join("/"))
}
