use lore::config::{LayerConfig, LayerType};

use crate::fixture::EngineFixture;

#[tokio::test]
async fn higher_priority_layer_wins() {
    let mut fixture = EngineFixture::empty();
    fixture
        .local_layer("base", 10)
        .topic("perf/shared", "---\ntitle: Base\n---\nfrom base");
    fixture
        .local_layer("team", 20)
        .topic("perf/shared", "---\ntitle: Team\n---\nfrom team");
    let engine = fixture.engine().await;

    let resolved = engine.resolve_topic("perf/shared").unwrap();
    assert_eq!(resolved.source_layer, "team");
    assert_eq!(resolved.topic.title, "Team");
    assert!(resolved.is_override);
    assert_eq!(resolved.overridden_layers, vec!["base"]);
}

#[tokio::test]
async fn resolution_is_idempotent() {
    let mut fixture = EngineFixture::with_builtin();
    fixture
        .local_layer("project", 100)
        .topic("performance/calcfields-in-loops", "---\ntitle: Ours\n---\nbody");
    let engine = fixture.engine().await;

    let first = engine.resolve_topic("performance/calcfields-in-loops").unwrap();
    let second = engine.resolve_topic("performance/calcfields-in-loops").unwrap();
    assert_eq!(first.source_layer, second.source_layer);
    assert_eq!(first.topic, second.topic);
    assert_eq!(first.overridden_layers, second.overridden_layers);
}

#[tokio::test]
async fn disabled_layer_does_not_participate() {
    let mut fixture = EngineFixture::empty();
    fixture
        .local_layer("base", 10)
        .topic("perf/shared", "---\ntitle: Base\n---\nbase");
    fixture
        .local_layer("team", 20)
        .topic("perf/shared", "---\ntitle: Team\n---\nteam");
    fixture.config.layers[1].enabled = false;
    let engine = fixture.engine().await;

    let resolved = engine.resolve_topic("perf/shared").unwrap();
    assert_eq!(resolved.source_layer, "base");
    assert!(!resolved.is_override);
    assert!(engine.overridden_topics().is_empty());
}

#[tokio::test]
async fn one_failing_layer_does_not_block_startup() {
    let mut fixture = EngineFixture::empty();
    fixture
        .local_layer("base", 10)
        .topic("perf/base-only", "# Base only");
    fixture
        .local_layer("team", 20)
        .topic("perf/team-only", "# Team only");
    let unreachable = fixture.cache.path().join("no-such-repo");
    fixture.config.layers.push(LayerConfig::git(
        "remote",
        30,
        format!("file://{}", unreachable.display()),
    ));
    let engine = fixture.engine().await;

    assert_eq!(engine.all_topic_ids(), vec!["perf/base-only", "perf/team-only"]);
    let stats = engine.statistics();
    let remote = stats.layers.layers.iter().find(|l| l.name == "remote").unwrap();
    assert!(!remote.loaded);
    assert!(!remote.last_load.as_ref().unwrap().success);
}

#[tokio::test]
async fn unsupported_layer_types_fail_fast() {
    let mut fixture = EngineFixture::with_builtin();
    let mut http = LayerConfig::of_type("cdn", 50, LayerType::Http);
    http.url = Some("https://example.invalid/knowledge".to_string());
    fixture.config.layers.push(http);
    let engine = fixture.engine().await;

    let stats = engine.statistics();
    let cdn = stats.layers.layers.iter().find(|l| l.name == "cdn").unwrap();
    let result = cdn.last_load.as_ref().unwrap();
    assert!(!result.success);
    assert!(result.errors[0].contains("not supported"));
    assert_eq!(stats.layers.unique_topics, 9);
}

#[tokio::test]
async fn missing_topic_resolves_to_none() {
    let engine = EngineFixture::with_builtin().engine().await;
    assert!(engine.resolve_topic("performance/does-not-exist").is_none());
}

#[tokio::test]
async fn specialists_are_deduplicated_by_priority() {
    let mut fixture = EngineFixture::with_builtin();
    fixture.local_layer("project", 100).specialist(
        "sam-coder",
        "---\nspecialist_id: sam-coder\ntitle: Sam (team edition)\nrole: Implementation Specialist\n---\n",
    );
    let engine = fixture.engine().await;

    assert_eq!(engine.list_specialists().len(), 6);
    assert_eq!(
        engine.get_specialist("sam-coder").unwrap().title,
        "Sam (team edition)"
    );
}

#[test]
fn invalid_configuration_is_reported_per_field() {
    let mut fixture = EngineFixture::empty();
    fixture.config.layers.push(LayerConfig::of_type("remote", 1, LayerType::Git));
    fixture.config.search.min_score = 2.0;

    let err = lore::KnowledgeEngine::from_config(fixture.config.clone()).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("layers[0].url"), "{message}");
    assert!(message.contains("search.min_score"), "{message}");
}
