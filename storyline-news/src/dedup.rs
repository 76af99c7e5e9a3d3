//! Cross-source deduplication by canonical URL

use indexmap::map::Entry;
use indexmap::IndexMap;
use tracing::debug;

use storyline_core::Item;

/// Keep one item per canonical URL, newest first
///
/// When two items share a key the strictly later `published_at` wins and
/// equal timestamps keep the first one seen. The result is sorted by
/// `published_at` descending; downstream clustering relies on this order.
pub fn dedupe_by_canonical_url<I>(pairs: I) -> Vec<Item>
where
    I: IntoIterator<Item = (Item, String)>,
{
    let mut by_url: IndexMap<String, Item> = IndexMap::new();
    let mut seen = 0usize;

    for (item, canonical_url) in pairs {
        seen += 1;
        match by_url.entry(canonical_url) {
            Entry::Vacant(slot) => {
                slot.insert(item);
            }
            Entry::Occupied(mut slot) => {
                if item.published_at > slot.get().published_at {
                    slot.insert(item);
                }
            }
        }
    }

    let mut items: Vec<Item> = by_url.into_values().collect();
    items.sort_by(|a, b| b.published_at.cmp(&a.published_at));

    debug!("Deduplicated {} items down to {}", seen, items.len());
    items
}

/// Deduplicate items by their own dedup key, skipping items without one
pub fn dedupe_items<I>(items: I) -> Vec<Item>
where
    I: IntoIterator<Item = Item>,
{
    dedupe_by_canonical_url(items.into_iter().filter_map(|item| {
        let key = item.dedup_key().to_string();
        (!key.is_empty()).then_some((item, key))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};
    use storyline_core::SourceType;

    fn item(id: &str, url: &str, at: DateTime<Utc>) -> Item {
        Item::new(id, "src", SourceType::Editorial, id, url, at).unwrap()
    }

    #[test]
    fn test_later_item_wins() {
        let t1 = Utc::now() - Duration::hours(2);
        let t2 = Utc::now();
        let out = dedupe_by_canonical_url(vec![
            (item("old", "https://a.com/x", t1), "https://a.com/x".to_string()),
            (item("new", "https://a.com/x", t2), "https://a.com/x".to_string()),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "new");
        assert_eq!(out[0].published_at, t2);
    }

    #[test]
    fn test_tie_keeps_incumbent() {
        let t = Utc::now();
        let out = dedupe_by_canonical_url(vec![
            (item("first", "https://a.com/x", t), "k".to_string()),
            (item("second", "https://a.com/x", t), "k".to_string()),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "first");
    }

    #[test]
    fn test_output_sorted_newest_first() {
        let base = Utc::now();
        let out = dedupe_by_canonical_url(
            [3, 1, 4, 1, 5, 9, 2, 6]
                .iter()
                .enumerate()
                .map(|(i, h)| {
                    let url = format!("https://a.com/{}", i);
                    (item(&format!("i{}", i), &url, base - Duration::hours(*h)), url)
                }),
        );
        assert_eq!(out.len(), 8);
        for pair in out.windows(2) {
            assert!(pair[0].published_at >= pair[1].published_at);
        }
    }

    #[test]
    fn test_dedupe_items_skips_empty_keys() {
        let t = Utc::now();
        let mut keyless = item("keyless", "https://a.com/z", t);
        keyless.canonical_url = Some(String::new());
        keyless.url = String::new();

        let mut persisted = item("persisted", "https://a.com/x?utm_source=a", t);
        persisted.canonical_url = Some("https://a.com/x".to_string());
        let fresh = item("fresh", "https://a.com/x", t + Duration::minutes(1));

        let out = dedupe_items(vec![keyless, persisted, fresh]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "fresh");
    }
}
