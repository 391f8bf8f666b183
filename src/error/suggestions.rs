//! Context-aware error suggestions.
//!
//! Complements the static suggestions in the `codes` module with hints that
//! use the error's JSON context.

use serde_json::Value;

use super::codes::ErrorCode;

/// Generate a context-aware suggestion for an error.
pub fn suggest_for_error(code: ErrorCode, context: Option<&Value>) -> String {
    match code {
        ErrorCode::TopicNotFound => suggest_topic_not_found(context),
        ErrorCode::LayerLoadFailed => suggest_layer_load_failed(context),
        ErrorCode::ConfigInvalid => suggest_config_invalid(context),
        _ => code.suggestion().to_string(),
    }
}

fn suggest_topic_not_found(context: Option<&Value>) -> String {
    let topic_id = context
        .and_then(|c| c.get("topic_id"))
        .and_then(Value::as_str);

    let Some(topic_id) = topic_id else {
        return ErrorCode::TopicNotFound.suggestion().to_string();
    };

    let similar: Vec<&str> = context
        .and_then(|c| c.get("similar"))
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    if similar.is_empty() {
        format!(
            "Topic '{topic_id}' not found. Try:\n  - `lore search {topic_id}` to find related topics\n  - `lore list` to see every resolvable topic"
        )
    } else {
        format!(
            "Topic '{topic_id}' not found. Did you mean: {}?",
            similar.join(", ")
        )
    }
}

fn suggest_layer_load_failed(context: Option<&Value>) -> String {
    match context.and_then(|c| c.get("layer")).and_then(Value::as_str) {
        Some(layer) => format!(
            "Layer '{layer}' failed to load. Run `lore layers` for details; the remaining layers are still served"
        ),
        None => ErrorCode::LayerLoadFailed.suggestion().to_string(),
    }
}

fn suggest_config_invalid(context: Option<&Value>) -> String {
    let issues: Vec<&str> = context
        .and_then(|c| c.get("issues"))
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    if issues.is_empty() {
        return ErrorCode::ConfigInvalid.suggestion().to_string();
    }

    let mut out = String::from("Fix these config fields:");
    for issue in issues {
        out.push_str("\n  - ");
        out.push_str(issue);
    }
    out
}

/// Suggest topic IDs similar to a misspelled one.
pub fn suggest_similar_topics(query: &str, available: &[&str], max_suggestions: usize) -> Vec<String> {
    let query_lower = query.to_lowercase();
    let mut scored: Vec<_> = available
        .iter()
        .map(|s| (s, similarity_score(&query_lower, &s.to_lowercase())))
        .filter(|(_, score)| *score > 0.3)
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored
        .into_iter()
        .take(max_suggestions)
        .map(|(s, _)| (*s).to_string())
        .collect()
}

/// Jaccard similarity on character trigrams, with a substring fallback for short strings.
fn similarity_score(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let a_trigrams: std::collections::HashSet<_> = trigrams(a).collect();
    let b_trigrams: std::collections::HashSet<_> = trigrams(b).collect();

    if a_trigrams.is_empty() || b_trigrams.is_empty() {
        if a.starts_with(b) || b.starts_with(a) {
            return 0.8;
        }
        if a.contains(b) || b.contains(a) {
            return 0.5;
        }
        return 0.0;
    }

    let intersection = a_trigrams.intersection(&b_trigrams).count();
    let union = a_trigrams.union(&b_trigrams).count();

    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

fn trigrams(s: &str) -> impl Iterator<Item = &str> {
    (0..s.len().saturating_sub(2)).filter_map(move |i| s.get(i..i + 3))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn topic_not_found_mentions_id() {
        let context = json!({ "topic_id": "performance/setloadfields" });
        let suggestion = suggest_for_error(ErrorCode::TopicNotFound, Some(&context));
        assert!(suggestion.contains("performance/setloadfields"));
        assert!(suggestion.contains("lore search"));
    }

    #[test]
    fn topic_not_found_lists_similar_ids() {
        let context = json!({
            "topic_id": "performance/setloadfield",
            "similar": ["performance/setloadfields"]
        });
        let suggestion = suggest_for_error(ErrorCode::TopicNotFound, Some(&context));
        assert!(suggestion.contains("Did you mean"));
    }

    #[test]
    fn topic_not_found_without_context_uses_default() {
        let suggestion = suggest_for_error(ErrorCode::TopicNotFound, None);
        assert_eq!(suggestion, ErrorCode::TopicNotFound.suggestion());
    }

    #[test]
    fn config_invalid_lists_issues() {
        let context = json!({ "issues": ["layers[0].name: must not be empty"] });
        let suggestion = suggest_for_error(ErrorCode::ConfigInvalid, Some(&context));
        assert!(suggestion.contains("layers[0].name"));
    }

    #[test]
    fn similar_topics_ranks_close_matches() {
        let available = ["performance/setloadfields", "security/permissions", "performance/findset"];
        let similar = suggest_similar_topics("performance/setloadfield", &available, 2);
        assert_eq!(similar.first().map(String::as_str), Some("performance/setloadfields"));
    }

    #[test]
    fn similar_topics_empty_for_unrelated() {
        let available = ["alpha", "beta"];
        assert!(suggest_similar_topics("zzzzzz", &available, 3).is_empty());
    }
}
