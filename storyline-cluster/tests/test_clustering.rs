//! Near-duplicate and topic clustering over realistic item sets
//!
//! Run with: cargo test -p storyline-cluster --test test_clustering

use chrono::{Duration, TimeZone, Utc};
use storyline_cluster::{
    cluster_by_topic, cluster_near_duplicates, NearDuplicateConfig, TopicConfig,
};
use storyline_core::{Item, SourceType};

fn item(id: &str, source_id: &str, title: &str, hours_ago: i64) -> Item {
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
    Item::new(
        id,
        source_id,
        SourceType::Editorial,
        title,
        format!("https://{}.example/{}", source_id, id),
        now - Duration::hours(hours_ago),
    )
    .unwrap()
}

fn tagged(mut item: Item, tags: &[&str]) -> Item {
    item.tags = tags.iter().map(|t| t.to_string()).collect();
    item
}

#[test]
fn test_identical_items_form_one_cluster() {
    let items: Vec<Item> = (0..5)
        .map(|i| {
            let mut it = item(&format!("copy{}", i), "wire", "Chip shortage eases", i);
            it.embedding = Some(vec![0.3, 0.4, 0.5]);
            it
        })
        .collect();

    let clusters = cluster_near_duplicates(&items, &NearDuplicateConfig::default());
    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].item_ids.len(), 5);
}

#[test]
fn test_disjoint_titles_stay_apart() {
    let items = vec![
        item("a", "one", "Volcano erupts near Iceland", 0),
        item("b", "two", "Stock markets rally strongly", 1),
    ];
    let clusters = cluster_near_duplicates(&items, &NearDuplicateConfig::default());
    assert_eq!(clusters.len(), 2);
    assert!(clusters.iter().all(|c| c.item_ids.len() == 1));
}

#[test]
fn test_headline_variants_merge_and_unrelated_stays_alone() {
    let items = vec![
        item("gpt-a", "verge", "OpenAI releases GPT-5", 0),
        item("gpt-b", "techcrunch", "OpenAI Launches GPT-5 Model", 1),
        item("mac", "macrumors", "Apple announces new MacBook", 2),
    ];
    let clusters = cluster_near_duplicates(&items, &NearDuplicateConfig::default());

    assert_eq!(clusters.len(), 2);
    assert_eq!(clusters[0].item_ids, vec!["gpt-a".to_string(), "gpt-b".to_string()]);
    assert_eq!(clusters[0].title, "OpenAI releases GPT-5");
    assert_eq!(clusters[1].item_ids, vec!["mac".to_string()]);
}

fn topic_pair() -> Vec<Item> {
    // One shared token out of ten distinct ones: Jaccard 0.1
    vec![
        tagged(
            item("x", "alpha", "Quantum startup raises seed funding", 0),
            &["ai", "llm"],
        ),
        tagged(
            item("y", "beta", "Quantum benchmark reveals surprising latency regression", 1),
            &["ai", "llm"],
        ),
    ]
}

#[test]
fn test_shared_informative_tag_lifts_topic_score() {
    let config = TopicConfig {
        token_threshold: 0.25,
        min_tag_overlap: 1,
        tag_weight: 0.25,
        ..Default::default()
    };
    let clusters = cluster_by_topic(&topic_pair(), &config);
    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].item_ids, vec!["x".to_string(), "y".to_string()]);
    assert_eq!(clusters[0].tags, vec!["ai".to_string(), "llm".to_string()]);
}

#[test]
fn test_min_tag_overlap_blocks_single_shared_tag() {
    let config = TopicConfig {
        token_threshold: 0.25,
        min_tag_overlap: 2,
        tag_weight: 0.25,
        ..Default::default()
    };
    let clusters = cluster_by_topic(&topic_pair(), &config);
    // Both singletons fall below min_size
    assert!(clusters.is_empty());
}

#[test]
fn test_topic_singletons_are_dropped() {
    let items = vec![
        item("a", "one", "Rust compiler speeds builds", 0),
        item("b", "two", "Rust compiler speeds builds", 1),
        item("c", "three", "Volcano erupts near Iceland", 2),
    ];
    let clusters = cluster_by_topic(&items, &TopicConfig::default());
    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].item_ids.len(), 2);
}

#[test]
fn test_cluster_tags_are_union_of_members() {
    let items = vec![
        tagged(item("a", "one", "Rust compiler speeds builds", 0), &["rust"]),
        tagged(item("b", "two", "Rust compiler speeds builds", 1), &["devtools", "rust"]),
    ];
    let clusters = cluster_near_duplicates(&items, &NearDuplicateConfig::default());
    assert_eq!(clusters[0].tags, vec!["rust".to_string(), "devtools".to_string()]);
}

#[test]
fn test_lenses_always_carry_every_source_type() {
    let clusters = cluster_near_duplicates(
        &[item("a", "one", "Rust compiler speeds builds", 0)],
        &NearDuplicateConfig::default(),
    );
    let json = serde_json::to_value(&clusters[0]).unwrap();
    let lenses = json["lenses"].as_object().unwrap();
    for key in ["editorial", "community", "primary", "vc_blog", "aggregator", "social"] {
        assert!(lenses[key].is_array(), "missing lens {}", key);
    }
    assert_eq!(lenses["editorial"][0], "a");
}
