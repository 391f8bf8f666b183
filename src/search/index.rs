//! Weighted multi-field BM25 index over resolved topics
//!
//! An index is built once from a snapshot of resolved topics and never
//! mutated afterwards; rebuilding produces a new instance.

use std::collections::HashMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{
    Field, IndexRecordOption, STORED, STRING, Schema, TextFieldIndexing, TextOptions, Value,
};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument};
use tracing::debug;

use crate::core::PatternType;
use crate::error::{LoreError, Result};
use crate::resolution::ResolvedTopic;

use super::analyzer::CodeCharacteristics;

pub const TITLE_BOOST: f32 = 2.0;
pub const CONSTRUCTS_BOOST: f32 = 3.0;
pub const KEYWORDS_BOOST: f32 = 2.0;
pub const TAGS_BOOST: f32 = 1.5;
pub const CONTENT_BOOST: f32 = 1.0;

/// Default minimum normalized score.
pub const DEFAULT_MIN_SCORE: f32 = 0.3;

/// Raw results fetched per requested result, leaving room for filtering.
const OVERFETCH_FACTOR: usize = 2;

const WRITER_HEAP_BYTES: usize = 50_000_000;

/// Options for [`RelevanceIndex::search`].
#[derive(Debug, Clone, PartialEq)]
pub struct FindOptions {
    pub limit: usize,
    pub min_score: f32,
    pub include_legacy_topics: bool,
    /// Keep only topics whose `applicable_object_types` contains this
    pub object_type: Option<String>,
    pub category: Option<String>,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            min_score: DEFAULT_MIN_SCORE,
            include_legacy_topics: true,
            object_type: None,
            category: None,
        }
    }
}

/// A ranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelevantTopic {
    pub topic_id: String,
    pub title: String,
    /// Score relative to the best hit of the same search (best = 1.0)
    pub score: f32,
    pub raw_score: f32,
    /// Declared constructs of the topic that were detected in the query
    pub matched_signals: Vec<String>,
    pub domain: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    pub pattern_type: PatternType,
    pub is_legacy: bool,
    pub source_layer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexStatistics {
    pub total_topics: usize,
    pub legacy_topics: usize,
    pub v2_topics: usize,
    pub built_at: DateTime<Utc>,
    pub build_time_ms: u64,
}

/// Per-topic data consulted while filtering raw hits.
#[derive(Debug, Clone)]
struct TopicMetadata {
    title: String,
    domain: Vec<String>,
    category: Option<String>,
    severity: Option<String>,
    pattern_type: PatternType,
    is_legacy: bool,
    constructs: Vec<String>,
    object_types: Vec<String>,
    relevance_threshold: Option<f32>,
    source_layer: String,
}

#[derive(Clone, Copy)]
struct IndexFields {
    id: Field,
    title: Field,
    constructs: Field,
    keywords: Field,
    tags: Field,
    content: Field,
}

pub struct RelevanceIndex {
    index: Index,
    reader: IndexReader,
    fields: IndexFields,
    metadata: HashMap<String, TopicMetadata>,
    stats: IndexStatistics,
}

impl std::fmt::Debug for RelevanceIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelevanceIndex")
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl RelevanceIndex {
    /// Index every resolved topic. Content is truncated to `excerpt_chars`.
    pub fn build(topics: &[ResolvedTopic], excerpt_chars: usize) -> Result<Self> {
        let started = Instant::now();
        let schema = build_schema();
        let fields = extract_fields(&schema)?;
        let index = Index::create_in_ram(schema);
        let mut writer: IndexWriter = index.writer_with_num_threads(1, WRITER_HEAP_BYTES)?;

        let mut metadata = HashMap::with_capacity(topics.len());
        for resolved in topics {
            let topic = &resolved.topic;
            let mut doc = TantivyDocument::new();
            doc.add_text(fields.id, &topic.id);
            doc.add_text(fields.title, &topic.title);
            doc.add_text(fields.constructs, topic.constructs().join(" "));
            doc.add_text(fields.keywords, topic.keywords().join(" "));
            doc.add_text(
                fields.tags,
                topic.tags.iter().map(String::as_str).collect::<Vec<_>>().join(" "),
            );
            doc.add_text(fields.content, excerpt(&topic.content, excerpt_chars));
            writer.add_document(doc)?;

            metadata.insert(
                topic.id.clone(),
                TopicMetadata {
                    title: topic.title.clone(),
                    domain: topic.domain.clone(),
                    category: topic.category.clone(),
                    severity: topic.severity.clone(),
                    pattern_type: topic.pattern_type,
                    is_legacy: topic.is_legacy(),
                    constructs: topic.constructs().to_vec(),
                    object_types: topic.applicable_object_types.clone(),
                    relevance_threshold: topic.relevance_threshold,
                    source_layer: resolved.source_layer.clone(),
                },
            );
        }

        writer.commit()?;
        drop(writer);

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        let legacy_topics = metadata.values().filter(|m| m.is_legacy).count();
        let stats = IndexStatistics {
            total_topics: metadata.len(),
            legacy_topics,
            v2_topics: metadata.len() - legacy_topics,
            built_at: Utc::now(),
            build_time_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        debug!(topics = stats.total_topics, ms = stats.build_time_ms, "relevance index built");

        Ok(Self {
            index,
            reader,
            fields,
            metadata,
            stats,
        })
    }

    pub const fn statistics(&self) -> &IndexStatistics {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    /// Rank topics against the characteristics of a snippet or query.
    pub fn search(
        &self,
        characteristics: &CodeCharacteristics,
        options: &FindOptions,
    ) -> Result<Vec<RelevantTopic>> {
        let terms = characteristics.query_terms();
        if terms.is_empty() || options.limit == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let hits = self.raw_search(&terms.join(" "), options.limit * OVERFETCH_FACTOR)?;

        let candidates: Vec<(&str, &TopicMetadata, f32)> = hits
            .iter()
            .filter_map(|(id, raw)| {
                let (id, meta) = self.metadata.get_key_value(id.as_str())?;
                Some((id.as_str(), meta, *raw))
            })
            .filter(|(_, meta, _)| options.include_legacy_topics || !meta.is_legacy)
            .filter(|(_, meta, _)| {
                options.object_type.as_deref().is_none_or(|wanted| {
                    meta.object_types
                        .iter()
                        .any(|t| t.eq_ignore_ascii_case(wanted))
                })
            })
            .filter(|(_, meta, _)| {
                options.category.as_deref().is_none_or(|wanted| {
                    meta.category
                        .as_deref()
                        .is_some_and(|c| c.eq_ignore_ascii_case(wanted))
                })
            })
            .collect();

        let top = candidates
            .iter()
            .map(|(_, _, raw)| *raw)
            .fold(0.0_f32, f32::max);
        if top <= 0.0 {
            return Ok(Vec::new());
        }

        let mut results: Vec<RelevantTopic> = candidates
            .into_iter()
            .filter_map(|(id, meta, raw)| {
                let score = raw / top;
                let threshold = meta.relevance_threshold.unwrap_or(options.min_score);
                if score < threshold {
                    return None;
                }
                Some(RelevantTopic {
                    topic_id: id.to_string(),
                    title: meta.title.clone(),
                    score,
                    raw_score: raw,
                    matched_signals: meta
                        .constructs
                        .iter()
                        .filter(|c| characteristics.has_construct(c))
                        .cloned()
                        .collect(),
                    domain: meta.domain.clone(),
                    category: meta.category.clone(),
                    severity: meta.severity.clone(),
                    pattern_type: meta.pattern_type,
                    is_legacy: meta.is_legacy,
                    source_layer: meta.source_layer.clone(),
                })
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.topic_id.cmp(&b.topic_id))
        });
        results.truncate(options.limit);
        Ok(results)
    }

    fn raw_search(&self, query: &str, limit: usize) -> Result<Vec<(String, f32)>> {
        let searcher = self.reader.searcher();

        let mut parser = QueryParser::for_index(
            &self.index,
            vec![
                self.fields.title,
                self.fields.constructs,
                self.fields.keywords,
                self.fields.tags,
                self.fields.content,
            ],
        );
        parser.set_field_boost(self.fields.title, TITLE_BOOST);
        parser.set_field_boost(self.fields.constructs, CONSTRUCTS_BOOST);
        parser.set_field_boost(self.fields.keywords, KEYWORDS_BOOST);
        parser.set_field_boost(self.fields.tags, TAGS_BOOST);
        parser.set_field_boost(self.fields.content, CONTENT_BOOST);

        let parsed = parser
            .parse_query(query)
            .map_err(|e| LoreError::QueryParse(format!("Failed to parse query: {e}")))?;

        let top_docs = searcher.search(&parsed, &TopDocs::with_limit(limit))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let doc: TantivyDocument = searcher.doc(address)?;
            let id = doc
                .get_first(self.fields.id)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            hits.push((id, score));
        }
        Ok(hits)
    }
}

fn build_schema() -> Schema {
    let mut builder = Schema::builder();

    let text_options = TextOptions::default().set_indexing_options(
        TextFieldIndexing::default()
            .set_tokenizer("default")
            .set_index_option(IndexRecordOption::WithFreqsAndPositions),
    );

    builder.add_text_field("id", STRING | STORED);
    builder.add_text_field("title", text_options.clone());
    builder.add_text_field("constructs", text_options.clone());
    builder.add_text_field("keywords", text_options.clone());
    builder.add_text_field("tags", text_options.clone());
    builder.add_text_field("content", text_options);

    builder.build()
}

fn extract_fields(schema: &Schema) -> Result<IndexFields> {
    let field = |name: &str| {
        schema.get_field(name).map_err(|_| {
            LoreError::SearchIndex(tantivy::TantivyError::SchemaError(format!(
                "missing {name} field"
            )))
        })
    };
    Ok(IndexFields {
        id: field("id")?,
        title: field("title")?,
        constructs: field("constructs")?,
        keywords: field("keywords")?,
        tags: field("tags")?,
        content: field("content")?,
    })
}

/// The first `max_chars` characters of `content`.
fn excerpt(content: &str, max_chars: usize) -> &str {
    content
        .char_indices()
        .nth(max_chars)
        .map_or(content, |(idx, _)| &content[..idx])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{RelevanceSignals, Topic};
    use crate::search::analyzer::CodeAnalyzer;
    use std::sync::Arc;

    fn topic(id: &str, title: &str, constructs: &[&str]) -> Topic {
        let mut topic = Topic::new(id, title, format!("{title} body text"));
        if !constructs.is_empty() {
            topic.relevance_signals = Some(RelevanceSignals {
                constructs: constructs.iter().map(ToString::to_string).collect(),
                ..RelevanceSignals::default()
            });
        }
        topic
    }

    fn resolved(topic: Topic) -> ResolvedTopic {
        ResolvedTopic {
            topic: Arc::new(topic),
            source_layer: "test".to_string(),
            is_override: false,
            overridden_layers: Vec::new(),
        }
    }

    fn sample_index() -> RelevanceIndex {
        let mut calc = topic("perf/calcfields", "CalcFields in loops", &["CalcFields", "FindSet"]);
        calc.category = Some("performance".into());
        calc.applicable_object_types = vec!["codeunit".into()];

        let mut load = topic("perf/setloadfields", "SetLoadFields", &["SetLoadFields", "FindSet"]);
        load.category = Some("performance".into());
        load.applicable_object_types = vec!["page".into()];

        let mut strict = topic("perf/strict", "Strict FindSet topic", &["FindSet"]);
        strict.relevance_threshold = Some(0.99);

        let legacy = topic("testing/legacy", "FindSet legacy notes", &[]);

        RelevanceIndex::build(
            &[resolved(calc), resolved(load), resolved(strict), resolved(legacy)],
            2000,
        )
        .unwrap()
    }

    fn search(index: &RelevanceIndex, code: &str, options: &FindOptions) -> Vec<RelevantTopic> {
        let chars = CodeAnalyzer::new().analyze(code);
        index.search(&chars, options).unwrap()
    }

    #[test]
    fn top_hit_is_normalized_to_one() {
        let index = sample_index();
        let results = search(&index, "Rec.FindSet(); Rec.CalcFields(Amount);", &FindOptions {
            min_score: 0.0,
            ..FindOptions::default()
        });

        assert!(!results.is_empty());
        assert_eq!(results[0].topic_id, "perf/calcfields");
        assert!((results[0].score - 1.0).abs() < f32::EPSILON);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(results[0].matched_signals, vec!["CalcFields", "FindSet"]);
    }

    #[test]
    fn per_topic_threshold_overrides_min_score() {
        let index = sample_index();
        let results = search(&index, "Rec.FindSet(); Rec.CalcFields(Amount);", &FindOptions {
            min_score: 0.0,
            ..FindOptions::default()
        });
        assert!(results.iter().all(|r| r.topic_id != "perf/strict"));
    }

    #[test]
    fn legacy_topics_can_be_excluded() {
        let index = sample_index();
        let options = FindOptions {
            min_score: 0.0,
            include_legacy_topics: false,
            ..FindOptions::default()
        };
        let results = search(&index, "Rec.FindSet();", &options);
        assert!(!results.is_empty());
        assert!(results.iter().all(|r| !r.is_legacy));
    }

    #[test]
    fn object_type_and_category_filters() {
        let index = sample_index();
        let options = FindOptions {
            min_score: 0.0,
            object_type: Some("Page".into()),
            ..FindOptions::default()
        };
        let results = search(&index, "Rec.FindSet();", &options);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].topic_id, "perf/setloadfields");

        let options = FindOptions {
            min_score: 0.0,
            category: Some("security".into()),
            ..FindOptions::default()
        };
        assert!(search(&index, "Rec.FindSet();", &options).is_empty());
    }

    #[test]
    fn limit_truncates_results() {
        let index = sample_index();
        let options = FindOptions {
            min_score: 0.0,
            limit: 1,
            ..FindOptions::default()
        };
        assert_eq!(search(&index, "Rec.FindSet();", &options).len(), 1);
        let options = FindOptions {
            limit: 0,
            ..FindOptions::default()
        };
        assert!(search(&index, "Rec.FindSet();", &options).is_empty());
    }

    #[test]
    fn natural_language_query_uses_tokens() {
        let index = sample_index();
        let results = search(&index, "legacy notes", &FindOptions::default());
        assert_eq!(results[0].topic_id, "testing/legacy");
    }

    #[test]
    fn no_match_returns_empty() {
        let index = sample_index();
        assert!(search(&index, "zebra quantum", &FindOptions::default()).is_empty());
        assert!(search(&index, "", &FindOptions::default()).is_empty());
    }

    #[test]
    fn statistics_split_legacy() {
        let stats = sample_index().statistics().clone();
        assert_eq!(stats.total_topics, 4);
        assert_eq!(stats.legacy_topics, 1);
        assert_eq!(stats.v2_topics, 3);
    }

    #[test]
    fn excerpt_respects_char_boundaries() {
        assert_eq!(excerpt("héllo", 2), "hé");
        assert_eq!(excerpt("short", 100), "short");
    }

    #[test]
    fn empty_index_answers_empty() {
        let index = RelevanceIndex::build(&[], 100).unwrap();
        assert!(index.is_empty());
        assert!(search(&index, "Rec.FindSet();", &FindOptions::default()).is_empty());
    }
}
