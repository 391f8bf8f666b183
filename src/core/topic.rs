//! Topic data structure
//!
//! A topic is a single addressable knowledge document: a stable ID, structured
//! frontmatter metadata and a markdown body. Topic IDs are unique within a
//! layer but repeat across layers; that repetition is how overrides work.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LoreError, Result};

use super::frontmatter;

/// Ordinal difficulty of a topic.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
    Expert,
}

impl Difficulty {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
            Self::Expert => "expert",
        }
    }
}

/// Whether a topic documents a pattern to follow or one to avoid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternType {
    Good,
    Bad,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Authored relevance signals. Topics without them are "legacy".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevanceSignals {
    /// Construct names (as produced by the code analyzer) this topic is about
    #[serde(default)]
    pub constructs: Vec<String>,
    /// Free keywords boosted during ranking
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Textual indicators that a snippet exhibits the anti-pattern
    #[serde(default)]
    pub anti_pattern_indicators: Vec<String>,
    /// Textual indicators that a snippet already follows the pattern
    #[serde(default)]
    pub positive_pattern_indicators: Vec<String>,
}

/// A frontmatter value that may be written as a scalar or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

/// A knowledge document as loaded from one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    /// Stable ID, unique within a layer
    pub id: String,
    pub title: String,
    /// One or more domain tags
    pub domain: Vec<String>,
    pub difficulty: Difficulty,
    pub tags: BTreeSet<String>,
    /// Topic IDs; existence is not checked
    pub prerequisites: BTreeSet<String>,
    /// Topic IDs; existence is not checked
    pub related_topics: BTreeSet<String>,
    /// Markdown body
    pub content: String,
    pub relevance_signals: Option<RelevanceSignals>,
    pub category: Option<String>,
    pub severity: Option<String>,
    pub pattern_type: PatternType,
    pub applicable_object_types: Vec<String>,
    /// Per-topic override of the global minimum score
    pub relevance_threshold: Option<f32>,
    /// Companion sample file, relative to the topic file
    pub samples: Option<String>,
    /// Text of the companion sample file when it could be read
    pub sample_code: Option<String>,
    pub word_count: usize,
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_path: Option<PathBuf>,
    /// Unrecognized frontmatter fields, preserved as written
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// Frontmatter schema for topic files.
#[derive(Debug, Clone, Default, Deserialize)]
struct TopicFrontmatter {
    id: Option<String>,
    title: Option<String>,
    domain: Option<OneOrMany>,
    difficulty: Option<Difficulty>,
    tags: Option<OneOrMany>,
    #[serde(default)]
    prerequisites: Vec<String>,
    #[serde(default)]
    related_topics: Vec<String>,
    relevance_signals: Option<RelevanceSignals>,
    category: Option<String>,
    severity: Option<String>,
    pattern_type: Option<PatternType>,
    #[serde(default)]
    applicable_object_types: Vec<String>,
    relevance_threshold: Option<f32>,
    samples: Option<String>,
    word_count: Option<usize>,
    last_modified: Option<String>,
    #[serde(flatten)]
    extra: BTreeMap<String, serde_yaml::Value>,
}

impl Topic {
    /// Create a topic with the given ID, title and body and default metadata.
    pub fn new(id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            id: id.into(),
            title: title.into(),
            domain: Vec::new(),
            difficulty: Difficulty::default(),
            tags: BTreeSet::new(),
            prerequisites: BTreeSet::new(),
            related_topics: BTreeSet::new(),
            word_count: count_words(&content),
            content,
            relevance_signals: None,
            category: None,
            severity: None,
            pattern_type: PatternType::default(),
            applicable_object_types: Vec::new(),
            relevance_threshold: None,
            samples: None,
            sample_code: None,
            last_modified: None,
            source_path: None,
            extra: BTreeMap::new(),
        }
    }

    /// Parse a topic from a markdown document with YAML frontmatter.
    ///
    /// `fallback_id` is used when the frontmatter carries no `id`;
    /// `fallback_domain` when it carries no `domain`.
    pub fn from_markdown(
        fallback_id: &str,
        fallback_domain: Option<&str>,
        raw: &str,
    ) -> Result<Self> {
        let doc = frontmatter::split(raw)?;
        let meta: TopicFrontmatter = frontmatter::parse(doc.yaml)
            .map_err(|err| LoreError::InvalidTopic(format!("{fallback_id}: {err}")))?;

        let id = meta
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| fallback_id.to_string());
        if id.trim().is_empty() {
            return Err(LoreError::InvalidTopic("topic has an empty id".to_string()));
        }

        if let Some(threshold) = meta.relevance_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(LoreError::InvalidTopic(format!(
                    "{id}: relevance_threshold {threshold} is outside 0.0..=1.0"
                )));
            }
        }

        let body = doc.body.to_string();
        let title = meta
            .title
            .or_else(|| first_heading(&body))
            .unwrap_or_else(|| id.clone());
        let domain = meta.domain.map(OneOrMany::into_vec).unwrap_or_else(|| {
            fallback_domain
                .map(|d| vec![d.to_string()])
                .unwrap_or_default()
        });

        Ok(Self {
            title,
            domain,
            difficulty: meta.difficulty.unwrap_or_default(),
            tags: meta
                .tags
                .map(OneOrMany::into_vec)
                .unwrap_or_default()
                .into_iter()
                .collect(),
            prerequisites: meta.prerequisites.into_iter().collect(),
            related_topics: meta.related_topics.into_iter().collect(),
            word_count: meta.word_count.unwrap_or_else(|| count_words(&body)),
            content: body,
            relevance_signals: meta.relevance_signals,
            category: meta.category,
            severity: meta.severity,
            pattern_type: meta.pattern_type.unwrap_or_default(),
            applicable_object_types: meta
                .applicable_object_types
                .into_iter()
                .map(|t| t.to_lowercase())
                .collect(),
            relevance_threshold: meta.relevance_threshold,
            samples: meta.samples,
            sample_code: None,
            last_modified: meta.last_modified.as_deref().and_then(parse_timestamp),
            source_path: None,
            extra: meta.extra,
            id,
        })
    }

    /// Topics without authored relevance signals predate the signal format.
    pub const fn is_legacy(&self) -> bool {
        self.relevance_signals.is_none()
    }

    /// Declared construct signals (empty for legacy topics).
    pub fn constructs(&self) -> &[String] {
        self.relevance_signals
            .as_ref()
            .map_or(&[], |signals| signals.constructs.as_slice())
    }

    /// Declared keyword signals (empty for legacy topics).
    pub fn keywords(&self) -> &[String] {
        self.relevance_signals
            .as_ref()
            .map_or(&[], |signals| signals.keywords.as_slice())
    }

    pub fn applies_to_object_type(&self, object_type: &str) -> bool {
        self.applicable_object_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(object_type))
    }
}

fn first_heading(body: &str) -> Option<String> {
    body.lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("# "))
        .map(|heading| heading.trim().to_string())
        .filter(|heading| !heading.is_empty())
}

fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_TOPIC: &str = r#"---
title: Use SetLoadFields before FindSet
domain: [performance, data-access]
difficulty: advanced
tags: [performance, partial-records]
prerequisites: [performance/findset-basics]
related_topics: [performance/calcfields]
category: performance
severity: high
pattern_type: good
applicable_object_types: [Codeunit, Page]
relevance_threshold: 0.5
relevance_signals:
  constructs: [FindSet, SetLoadFields]
  keywords: [partial records]
last_modified: 2024-03-01
owner: platform-team
---

# SetLoadFields

Load only the fields you need.
"#;

    #[test]
    fn parses_full_frontmatter() {
        let topic = Topic::from_markdown("performance/setloadfields", None, FULL_TOPIC).unwrap();

        assert_eq!(topic.id, "performance/setloadfields");
        assert_eq!(topic.title, "Use SetLoadFields before FindSet");
        assert_eq!(topic.domain, vec!["performance", "data-access"]);
        assert_eq!(topic.difficulty, Difficulty::Advanced);
        assert!(topic.tags.contains("partial-records"));
        assert_eq!(topic.pattern_type, PatternType::Good);
        assert_eq!(topic.applicable_object_types, vec!["codeunit", "page"]);
        assert_eq!(topic.relevance_threshold, Some(0.5));
        assert_eq!(topic.constructs(), ["FindSet", "SetLoadFields"]);
        assert!(!topic.is_legacy());
        assert!(topic.last_modified.is_some());
        assert_eq!(topic.word_count, 8);
    }

    #[test]
    fn preserves_unknown_fields() {
        let topic = Topic::from_markdown("x", None, FULL_TOPIC).unwrap();
        assert_eq!(
            topic.extra.get("owner"),
            Some(&serde_yaml::Value::String("platform-team".to_string()))
        );
    }

    #[test]
    fn missing_signals_marks_legacy() {
        let raw = "---\ntitle: Old Topic\ndomain: testing\n---\nBody text";
        let topic = Topic::from_markdown("testing/old", None, raw).unwrap();
        assert!(topic.is_legacy());
        assert!(topic.constructs().is_empty());
        assert_eq!(topic.domain, vec!["testing"]);
    }

    #[test]
    fn falls_back_to_heading_and_path_domain() {
        let raw = "# Heading Title\n\nno frontmatter";
        let topic = Topic::from_markdown("security/perm", Some("security"), raw).unwrap();
        assert_eq!(topic.title, "Heading Title");
        assert_eq!(topic.domain, vec!["security"]);
    }

    #[test]
    fn frontmatter_id_wins_over_path() {
        let raw = "---\nid: custom-id\ntitle: T\n---\nbody";
        let topic = Topic::from_markdown("path/id", None, raw).unwrap();
        assert_eq!(topic.id, "custom-id");
    }

    #[test]
    fn rejects_threshold_out_of_range() {
        let raw = "---\ntitle: T\nrelevance_threshold: 1.5\n---\nbody";
        assert!(Topic::from_markdown("t", None, raw).is_err());
    }

    #[test]
    fn unknown_pattern_type_is_tolerated() {
        let raw = "---\ntitle: T\npattern_type: mixed\n---\nbody";
        let topic = Topic::from_markdown("t", None, raw).unwrap();
        assert_eq!(topic.pattern_type, PatternType::Unknown);
    }

    #[test]
    fn difficulty_is_ordinal() {
        assert!(Difficulty::Beginner < Difficulty::Expert);
        assert!(Difficulty::Intermediate < Difficulty::Advanced);
    }
}
