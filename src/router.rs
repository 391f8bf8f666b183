//! Specialist routing
//!
//! Routes a free-text request to the specialists best suited to answer it.
//! A request that names a specialist short-circuits to that specialist;
//! otherwise every specialist is scored by additive weighted token matching
//! across several signal classes.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::core::Specialist;
use crate::search::tokenize;

/// Confidence assigned to a specialist requested by name.
pub const NAME_MATCH_CONFIDENCE: f32 = 0.95;
/// Confidence assigned to generalists when there is no query.
pub const GENERALIST_CONFIDENCE: f32 = 0.5;
/// Scored suggestions below this are dropped.
pub const MIN_CONFIDENCE: f32 = 0.1;
/// Scored suggestions above this always carry at least one reason.
pub const GENERIC_REASON_THRESHOLD: f32 = 0.3;
pub const GENERIC_REASON: &str = "Good keyword and expertise match";
pub const DEFAULT_MAX_SUGGESTIONS: usize = 3;

/// Query tokens no longer than this are ignored by the scored path.
const MIN_TOKEN_LEN: usize = 3;
/// Minimum query length for substring name matching.
const MIN_NAME_SUBSTRING_LEN: usize = 3;

/// Score added per matching signal.
#[derive(Debug, Clone, PartialEq)]
pub struct RouterWeights {
    /// Per query token found in the specialist's keyword set (default: 0.15)
    pub keyword: f32,
    /// Per matching primary expertise item (default: 0.15)
    pub primary_expertise: f32,
    /// Per matching secondary expertise item (default: 0.10)
    pub secondary_expertise: f32,
    /// Per matching domain (default: 0.10)
    pub domain: f32,
    /// Per matching usage scenario (default: 0.15)
    pub when_to_use: f32,
    /// Once, when role tokens intersect the query (default: 0.20)
    pub role: f32,
    /// Once, when the caller's current domain is one of the specialist's (default: 0.15)
    pub current_domain: f32,
}

impl Default for RouterWeights {
    fn default() -> Self {
        Self {
            keyword: 0.15,
            primary_expertise: 0.15,
            secondary_expertise: 0.10,
            domain: 0.10,
            when_to_use: 0.15,
            role: 0.20,
            current_domain: 0.15,
        }
    }
}

/// What the caller knows about the request.
#[derive(Debug, Clone, Default)]
pub struct SuggestionContext {
    pub query: Option<String>,
    pub current_domain: Option<String>,
}

impl SuggestionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_current_domain(mut self, domain: impl Into<String>) -> Self {
        self.current_domain = Some(domain.into());
        self
    }

    fn query_text(&self) -> Option<&str> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    NameMatch,
    Scored,
    Generalist,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecialistSuggestion {
    pub specialist_id: String,
    pub title: String,
    pub role: String,
    /// 0.0-1.0
    pub confidence: f32,
    pub reasons: Vec<String>,
    pub match_kind: MatchKind,
    /// Topic IDs in the specialist's domains relevant to the request
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub relevant_topics: Vec<String>,
}

impl SpecialistSuggestion {
    fn new(specialist: &Specialist, confidence: f32, match_kind: MatchKind) -> Self {
        Self {
            specialist_id: specialist.specialist_id.clone(),
            title: specialist.title.clone(),
            role: specialist.role.clone(),
            confidence,
            reasons: Vec::new(),
            match_kind,
            relevant_topics: Vec::new(),
        }
    }
}

/// A list item (expertise, domain, scenario) with its scoring tokens.
#[derive(Debug, Clone)]
struct SignalItem {
    text: String,
    tokens: Vec<String>,
}

impl SignalItem {
    fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            tokens: scoring_tokens(text),
        }
    }

    /// Substring relationship in either direction with any query token.
    fn matches(&self, query_tokens: &[String]) -> bool {
        self.tokens.iter().any(|item| {
            query_tokens
                .iter()
                .any(|q| item.contains(q.as_str()) || q.contains(item.as_str()))
        })
    }
}

/// Precomputed matching data for one specialist.
#[derive(Debug, Clone)]
struct SpecialistProfile {
    specialist: Arc<Specialist>,
    keywords: HashSet<String>,
    primary: Vec<SignalItem>,
    secondary: Vec<SignalItem>,
    domains: Vec<SignalItem>,
    when_to_use: Vec<SignalItem>,
    role_tokens: HashSet<String>,
}

impl SpecialistProfile {
    fn new(specialist: Arc<Specialist>) -> Self {
        let s = &specialist;
        let keywords = [
            s.specialist_id.as_str(),
            s.title.as_str(),
            s.role.as_str(),
            s.persona.communication_style.as_str(),
        ]
        .into_iter()
        .chain(s.expertise.primary.iter().map(String::as_str))
        .chain(s.expertise.secondary.iter().map(String::as_str))
        .chain(s.domains.iter().map(String::as_str))
        .chain(s.when_to_use.iter().map(String::as_str))
        .chain(s.persona.personality.iter().map(String::as_str))
        .flat_map(tokenize)
        .collect();

        Self {
            keywords,
            primary: s.expertise.primary.iter().map(|t| SignalItem::new(t)).collect(),
            secondary: s.expertise.secondary.iter().map(|t| SignalItem::new(t)).collect(),
            domains: s.domains.iter().map(|t| SignalItem::new(t)).collect(),
            when_to_use: s.when_to_use.iter().map(|t| SignalItem::new(t)).collect(),
            role_tokens: scoring_tokens(&s.role).into_iter().collect(),
            specialist,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpecialistRouter {
    profiles: Vec<SpecialistProfile>,
    weights: RouterWeights,
    generalists: Vec<String>,
}

impl SpecialistRouter {
    /// Specialists are kept in ID order.
    pub fn new(mut specialists: Vec<Arc<Specialist>>, generalists: Vec<String>) -> Self {
        specialists.sort_by(|a, b| a.specialist_id.cmp(&b.specialist_id));
        Self {
            profiles: specialists.into_iter().map(SpecialistProfile::new).collect(),
            weights: RouterWeights::default(),
            generalists,
        }
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn specialists(&self) -> impl Iterator<Item = &Arc<Specialist>> {
        self.profiles.iter().map(|p| &p.specialist)
    }

    fn profiled(&self) -> impl Iterator<Item = &Specialist> {
        self.profiles.iter().map(|p| &*p.specialist)
    }

    pub fn get_specialist(&self, id: &str) -> Option<Arc<Specialist>> {
        self.specialists()
            .find(|s| s.specialist_id == id)
            .cloned()
    }

    /// Specialists grouped under each declared domain (lowercased).
    pub fn specialists_by_domain(&self) -> BTreeMap<String, Vec<Arc<Specialist>>> {
        let mut groups: BTreeMap<String, Vec<Arc<Specialist>>> = BTreeMap::new();
        for specialist in self.specialists() {
            for domain in &specialist.domains {
                groups
                    .entry(domain.to_lowercase())
                    .or_default()
                    .push(Arc::clone(specialist));
            }
        }
        groups
    }

    /// Suggest up to `max_suggestions` specialists for the request.
    pub fn suggest(&self, context: &SuggestionContext, max_suggestions: usize) -> Vec<SpecialistSuggestion> {
        if max_suggestions == 0 || self.profiles.is_empty() {
            return Vec::new();
        }

        let Some(query) = context.query_text() else {
            return self.generalist_suggestions(max_suggestions);
        };

        if let Some(hit) = self.name_match(query) {
            debug!(specialist = %hit.specialist_id, "routed by name");
            return vec![hit];
        }

        let query_tokens = scoring_tokens(query);
        let mut scored: Vec<SpecialistSuggestion> = self
            .profiles
            .iter()
            .filter_map(|profile| self.score(profile, &query_tokens, context))
            .collect();

        scored.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.specialist_id.cmp(&b.specialist_id))
        });
        scored.truncate(max_suggestions);
        scored
    }

    /// Exact or partial name lookup, full query first, then per token.
    ///
    /// Partial ID and title matches must include the first name, so a
    /// topical word such as "security" is scored instead of routed.
    fn name_match(&self, query: &str) -> Option<SpecialistSuggestion> {
        let query = query.to_lowercase();
        let substring_ok = |s: &Specialist| {
            query.chars().count() >= MIN_NAME_SUBSTRING_LEN
                && query.contains(&s.first_name().to_lowercase())
        };

        let checks: [&dyn Fn(&Specialist) -> bool; 4] = [
            &|s: &Specialist| s.specialist_id.eq_ignore_ascii_case(&query),
            &|s: &Specialist| substring_ok(s) && s.specialist_id.to_lowercase().contains(&query),
            &|s: &Specialist| s.first_name().eq_ignore_ascii_case(&query),
            &|s: &Specialist| substring_ok(s) && s.title.to_lowercase().contains(&query),
        ];
        let found = checks
            .iter()
            .find_map(|check| self.profiled().find(|&s| check(s)))
            .or_else(|| {
                tokenize(&query).iter().find_map(|token| {
                    self.profiled().find(|s| {
                        s.specialist_id.eq_ignore_ascii_case(token)
                            || s.first_name().eq_ignore_ascii_case(token)
                    })
                })
            })?;

        let mut suggestion = SpecialistSuggestion::new(found, NAME_MATCH_CONFIDENCE, MatchKind::NameMatch);
        suggestion
            .reasons
            .push(format!("Requested by name: {}", found.title));
        Some(suggestion)
    }

    fn score(
        &self,
        profile: &SpecialistProfile,
        query_tokens: &[String],
        context: &SuggestionContext,
    ) -> Option<SpecialistSuggestion> {
        let w = &self.weights;
        let mut score = 0.0_f32;
        let mut reasons = Vec::new();

        for token in query_tokens {
            if profile.keywords.contains(token) {
                score += w.keyword;
            }
        }

        for item in profile.primary.iter().filter(|i| i.matches(query_tokens)) {
            score += w.primary_expertise;
            reasons.push(format!("Expert in {}", item.text));
        }
        for item in profile.secondary.iter().filter(|i| i.matches(query_tokens)) {
            score += w.secondary_expertise;
            reasons.push(format!("Also knows {}", item.text));
        }
        for item in profile.domains.iter().filter(|i| i.matches(query_tokens)) {
            score += w.domain;
            reasons.push(format!("Works in the {} domain", item.text));
        }
        for item in profile.when_to_use.iter().filter(|i| i.matches(query_tokens)) {
            score += w.when_to_use;
            reasons.push(format!("Good for: {}", item.text));
        }

        if query_tokens.iter().any(|t| profile.role_tokens.contains(t)) {
            score += w.role;
            reasons.push(format!("Role: {}", profile.specialist.role));
        }

        if let Some(current) = context.current_domain.as_deref() {
            if profile.specialist.has_domain(current) {
                score += w.current_domain;
                reasons.push(format!("Matches current domain {current}"));
            }
        }

        let confidence = score.min(1.0);
        if confidence < MIN_CONFIDENCE {
            return None;
        }
        if confidence > GENERIC_REASON_THRESHOLD && reasons.is_empty() {
            reasons.push(GENERIC_REASON.to_string());
        }

        let mut suggestion =
            SpecialistSuggestion::new(&profile.specialist, confidence, MatchKind::Scored);
        suggestion.reasons = reasons;
        Some(suggestion)
    }

    fn generalist_suggestions(&self, max: usize) -> Vec<SpecialistSuggestion> {
        let configured: Vec<&Arc<Specialist>> = self
            .generalists
            .iter()
            .filter_map(|id| self.specialists().find(|s| &s.specialist_id == id))
            .collect();

        let chosen: Vec<&Arc<Specialist>> = if configured.is_empty() {
            self.specialists().take(max).collect()
        } else {
            configured.into_iter().take(max).collect()
        };

        chosen
            .into_iter()
            .map(|s| {
                let mut suggestion =
                    SpecialistSuggestion::new(s, GENERALIST_CONFIDENCE, MatchKind::Generalist);
                suggestion
                    .reasons
                    .push("General-purpose specialist".to_string());
                suggestion
            })
            .collect()
    }
}

/// Lowercase tokens longer than three characters.
fn scoring_tokens(text: &str) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .filter(|t| t.chars().count() > MIN_TOKEN_LEN)
        .collect()
}
