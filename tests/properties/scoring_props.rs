use std::sync::Arc;

use proptest::prelude::*;

use lore::config::LoadingConfig;
use lore::core::Specialist;
use lore::layers::{EmbeddedSource, KnowledgeLayer, LayerSource};
use lore::resolution::LayerService;
use lore::router::{SpecialistRouter, SuggestionContext};
use lore::search::{CodeAnalyzer, FindOptions, RelevanceIndex};

const CALLS: &[&str] = &[
    "Rec.FindSet();",
    "Rec.Next();",
    "Rec.CalcFields(Amount);",
    "Rec.SetLoadFields(Name);",
    "Rec.Validate(Name, Value);",
    "Rec.Modify(true);",
    "Rec.ModifyAll(Blocked, true);",
    "Error('failed');",
    "IsolatedStorage.Get(Key, Value);",
    "Client: HttpClient;",
    "[EventSubscriber(ObjectType::Table, Database::Customer, 'OnAfterInsertEvent', '', false, false)]",
    "[TryFunction]",
];

fn builtin() -> LayerService {
    let mut layer = KnowledgeLayer::new("embedded", 0, LayerSource::Embedded(EmbeddedSource::builtin()));
    layer.initialize();
    LayerService::new(vec![layer], LoadingConfig::default())
}

fn snippet() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(CALLS), 1..8).prop_map(|calls| calls.join("\n"))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn scores_are_normalized_and_non_increasing(code in snippet(), include_legacy in any::<bool>()) {
        let service = builtin();
        let index = RelevanceIndex::build(&service.resolve_all(), 2000).unwrap();
        let analysis = CodeAnalyzer::new().analyze(&code);
        let options = FindOptions {
            min_score: 0.0,
            include_legacy_topics: include_legacy,
            ..FindOptions::default()
        };
        let results = index.search(&analysis, &options).unwrap();

        if let Some(top) = results.first() {
            prop_assert!((top.score - 1.0).abs() < f32::EPSILON);
        }
        prop_assert!(results.len() <= options.limit);
        for pair in results.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
        }
        for hit in &results {
            prop_assert!(hit.score >= 0.0 && hit.score <= 1.0);
            prop_assert!(include_legacy || !hit.is_legacy);
        }
    }

    #[test]
    fn repeated_calls_do_not_change_constructs(code in snippet(), times in 2usize..5) {
        let analyzer = CodeAnalyzer::new();
        let once = analyzer.analyze(&code);
        let repeated = analyzer.analyze(&vec![code.as_str(); times].join("\n"));
        prop_assert_eq!(once.constructs, repeated.constructs);
    }

    #[test]
    fn router_confidence_stays_in_bounds(query in "[a-zA-Z \\-]{0,60}", max in 1usize..6) {
        let service = builtin();
        let specialists: Vec<Arc<Specialist>> = service.specialists();
        let router = SpecialistRouter::new(specialists, vec!["sam-coder".to_string()]);

        let suggestions = router.suggest(&SuggestionContext::new().with_query(query), max);
        prop_assert!(suggestions.len() <= max);
        for s in &suggestions {
            prop_assert!(s.confidence > 0.0 && s.confidence <= 1.0);
        }
        for pair in suggestions.windows(2) {
            prop_assert!(pair[0].confidence >= pair[1].confidence);
        }
    }
}
