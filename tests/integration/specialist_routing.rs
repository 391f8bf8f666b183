use lore::router::{GENERALIST_CONFIDENCE, MatchKind, NAME_MATCH_CONFIDENCE, SuggestionContext};

use crate::fixture::EngineFixture;

fn ask(query: &str) -> SuggestionContext {
    SuggestionContext::new().with_query(query)
}

#[tokio::test]
async fn first_name_returns_single_confident_match() {
    let engine = EngineFixture::with_builtin().engine().await;
    let suggestions = engine.suggest_specialists(&ask("sam"), None).unwrap();

    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].specialist_id, "sam-coder");
    assert!((suggestions[0].confidence - NAME_MATCH_CONFIDENCE).abs() < f32::EPSILON);
}

#[tokio::test]
async fn crafted_query_caps_at_one() {
    let mut fixture = EngineFixture::empty();
    fixture.local_layer("team", 10).specialist(
        "nora-network",
        "---\nspecialist_id: nora-network\ntitle: Nora Network\nrole: Integration Engineer\nexpertise:\n  primary: [webservices, httpclient]\n  secondary: [json parsing]\ndomains: [integration]\nwhen_to_use:\n  - Calling external webservices\npersona:\n  personality: [patient]\n---\n",
    );
    let engine = fixture.engine().await;

    let context = ask("integration engineer calling webservices httpclient json parsing patient")
        .with_current_domain("integration");
    let suggestions = engine.suggest_specialists(&context, None).unwrap();

    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].match_kind, MatchKind::Scored);
    assert!((suggestions[0].confidence - 1.0).abs() < f32::EPSILON);
}

#[tokio::test]
async fn scored_results_are_ranked_and_bounded() {
    let engine = EngineFixture::with_builtin().engine().await;
    let suggestions = engine
        .suggest_specialists(&ask("troubleshooting errors and crashes in posting"), Some(2))
        .unwrap();

    assert!(!suggestions.is_empty());
    assert!(suggestions.len() <= 2);
    assert_eq!(suggestions[0].specialist_id, "dean-debug");
    assert!(suggestions.windows(2).all(|w| w[0].confidence >= w[1].confidence));
    assert!(suggestions.iter().all(|s| s.confidence > 0.0 && s.confidence <= 1.0));
}

#[tokio::test]
async fn no_query_returns_generalists() {
    let engine = EngineFixture::with_builtin().engine().await;
    let suggestions = engine
        .suggest_specialists(&SuggestionContext::new(), None)
        .unwrap();

    let ids: Vec<&str> = suggestions.iter().map(|s| s.specialist_id.as_str()).collect();
    assert_eq!(ids, vec!["sam-coder", "alex-architect", "dean-debug"]);
    assert!(suggestions
        .iter()
        .all(|s| (s.confidence - GENERALIST_CONFIDENCE).abs() < f32::EPSILON));
}

#[tokio::test]
async fn grouping_by_domain_covers_every_specialist() {
    let engine = EngineFixture::with_builtin().engine().await;
    let groups = engine.specialists_by_domain();

    let performance: Vec<&str> = groups["performance"]
        .iter()
        .map(|s| s.specialist_id.as_str())
        .collect();
    assert_eq!(performance, vec!["dean-debug", "sam-coder"]);
    for specialist in engine.list_specialists() {
        assert!(groups.values().flatten().any(|s| s.specialist_id == specialist.specialist_id));
    }
}
