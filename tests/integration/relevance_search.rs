use lore::search::FindOptions;

use crate::fixture::EngineFixture;

const LOOP_SNIPPET: &str = r"
codeunit 50100 CustomerStats
{
    procedure Total(var Customer: Record Customer)
    begin
        Customer.SetLoadFields(Name);
        if Customer.FindSet() then
            repeat
                Customer.CalcFields(Balance);
            until Customer.Next() = 0;
    end;
}
";

fn all_hits() -> FindOptions {
    FindOptions {
        min_score: 0.0,
        ..FindOptions::default()
    }
}

#[tokio::test]
async fn scores_are_normalized_and_sorted() {
    let engine = EngineFixture::with_builtin().engine().await;
    let results = engine.find_relevant_topics(LOOP_SNIPPET, &all_hits()).unwrap();

    assert!(!results.is_empty());
    assert!((results[0].score - 1.0).abs() < f32::EPSILON);
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    assert!(results.iter().all(|r| r.score <= 1.0));
}

#[tokio::test]
async fn matched_signals_explain_hits() {
    let engine = EngineFixture::with_builtin().engine().await;
    let results = engine
        .find_relevant_topics(LOOP_SNIPPET, &engine.default_find_options())
        .unwrap();

    let calcfields = results
        .iter()
        .find(|r| r.topic_id == "performance/calcfields-in-loops")
        .unwrap();
    assert!(calcfields.matched_signals.iter().any(|s| s == "CalcFields"));
}

#[tokio::test]
async fn topic_threshold_overrides_min_score() {
    let mut fixture = EngineFixture::empty();
    let tree = fixture.local_layer("team", 10);
    tree.topic(
        "perf/broad",
        "---\ntitle: Broad loop guidance\nrelevance_signals:\n  constructs: [FindSet, CalcFields, SetLoadFields]\n---\nplain body\n",
    );
    tree.topic(
        "perf/narrow",
        "---\ntitle: Narrow note\nrelevance_threshold: 0.9\nrelevance_signals:\n  constructs: [FindSet]\n---\nplain body\n",
    );
    tree.topic(
        "perf/narrow-copy",
        "---\ntitle: Narrow copy\nrelevance_signals:\n  constructs: [FindSet]\n---\nplain body\n",
    );
    let engine = fixture.engine().await;

    let results = engine.find_relevant_topics(LOOP_SNIPPET, &all_hits()).unwrap();
    let ids: Vec<&str> = results.iter().map(|r| r.topic_id.as_str()).collect();

    assert_eq!(ids[0], "perf/broad");
    let copy = results.iter().find(|r| r.topic_id == "perf/narrow-copy").unwrap();
    assert!(copy.score < 0.9);
    assert!(!ids.contains(&"perf/narrow"));
}

#[tokio::test]
async fn legacy_topics_can_be_excluded() {
    let engine = EngineFixture::with_builtin().engine().await;
    let query = "test isolation rollback between test methods";

    let with_legacy = engine.find_relevant_topics(query, &all_hits()).unwrap();
    assert!(with_legacy.iter().any(|r| r.is_legacy));

    let options = FindOptions {
        include_legacy_topics: false,
        ..all_hits()
    };
    let without = engine.find_relevant_topics(query, &options).unwrap();
    assert!(without.iter().all(|r| !r.is_legacy));
}

#[tokio::test]
async fn object_type_filter_applies() {
    let engine = EngineFixture::with_builtin().engine().await;
    let options = FindOptions {
        object_type: Some("table".to_string()),
        ..all_hits()
    };
    let results = engine
        .find_relevant_topics("Rec.Validate(Name, NewName);", &options)
        .unwrap();
    assert!(!results.is_empty());
    for hit in &results {
        let topic = engine.resolve_topic(&hit.topic_id).unwrap().topic;
        assert!(topic.applicable_object_types.iter().any(|t| t == "table"));
    }
}

#[tokio::test]
async fn duplicate_constructs_are_counted_once() {
    let engine = EngineFixture::with_builtin().engine().await;
    let analysis = engine.analyze_code("Rec.FindSet();\nOther.FindSet();\nRec.CalcFields(Amount);");
    assert_eq!(analysis.constructs, vec!["FindSet", "CalcFields"]);
}

#[tokio::test]
async fn project_override_is_what_gets_indexed() {
    let mut fixture = EngineFixture::with_builtin();
    fixture.local_layer("project", 100).topic(
        "performance/calcfields-in-loops",
        "---\ntitle: Team CalcFields policy\nrelevance_signals:\n  constructs: [CalcFields]\n---\nbody\n",
    );
    let engine = fixture.engine().await;

    let results = engine
        .find_relevant_topics("Rec.CalcFields(Amount);", &all_hits())
        .unwrap();
    let hit = results
        .iter()
        .find(|r| r.topic_id == "performance/calcfields-in-loops")
        .unwrap();
    assert_eq!(hit.title, "Team CalcFields policy");
    assert_eq!(hit.source_layer, "project");
    assert_eq!(engine.statistics().index.unwrap().total_topics, 9);
}
