use std::collections::BTreeSet;

use proptest::prelude::*;

use lore::config::LoadingConfig;
use lore::layers::{KnowledgeLayer, LayerSource, LocalSource};
use lore::resolution::LayerService;
use lore::test_utils::fixtures::KnowledgeFixture;

const IDS: &[&str] = &["perf/a", "perf/b", "perf/c", "events/d", "security/e", "testing/f"];

fn loaded_layer(name: &str, priority: i32, fixture: &KnowledgeFixture, ids: &BTreeSet<usize>) -> KnowledgeLayer {
    for &idx in ids {
        fixture.topic(IDS[idx], &format!("---\ntitle: {name} {idx}\n---\nfrom {name}"));
    }
    let mut layer = KnowledgeLayer::new(name, priority, LayerSource::Local(LocalSource::new(fixture.root())));
    layer.initialize();
    layer
}

fn id_subset() -> impl Strategy<Value = BTreeSet<usize>> {
    prop::collection::btree_set(0..IDS.len(), 0..=IDS.len())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn higher_priority_always_wins(low_ids in id_subset(), high_ids in id_subset(), low_priority in -50i32..50, gap in 1i32..50) {
        let low_tree = KnowledgeFixture::new();
        let high_tree = KnowledgeFixture::new();
        let service = LayerService::new(
            vec![
                loaded_layer("low", low_priority, &low_tree, &low_ids),
                loaded_layer("high", low_priority + gap, &high_tree, &high_ids),
            ],
            LoadingConfig::default(),
        );

        let expected: Vec<String> = low_ids
            .union(&high_ids)
            .map(|&idx| IDS[idx].to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        prop_assert_eq!(service.all_topic_ids(), expected);

        for (idx, id) in IDS.iter().enumerate() {
            let resolved = service.resolve_topic(id);
            match (low_ids.contains(&idx), high_ids.contains(&idx)) {
                (_, true) => {
                    let resolved = resolved.unwrap();
                    prop_assert_eq!(resolved.source_layer.as_str(), "high");
                    prop_assert_eq!(resolved.is_override, low_ids.contains(&idx));
                }
                (true, false) => {
                    let resolved = resolved.unwrap();
                    prop_assert_eq!(resolved.source_layer.as_str(), "low");
                }
                (false, false) => prop_assert!(resolved.is_none()),
            }
        }

        let overridden = service.overridden_topics().len();
        prop_assert_eq!(overridden, low_ids.intersection(&high_ids).count());
    }

    #[test]
    fn resolution_is_idempotent(ids in id_subset()) {
        let tree = KnowledgeFixture::new();
        let service = LayerService::new(vec![loaded_layer("only", 1, &tree, &ids)], LoadingConfig::default());

        for id in IDS {
            let first = service.resolve_topic(id).map(|r| (r.source_layer, r.topic));
            let second = service.resolve_topic(id).map(|r| (r.source_layer, r.topic));
            prop_assert_eq!(first, second);
        }
    }
}
