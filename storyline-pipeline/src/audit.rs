//! Quality audit of a written dataset
//!
//! Counts thin stories and thin items. A dataset where any share exceeds
//! [`INVALID_PCT`] is reported as invalid; the files are still written.

use std::collections::{HashMap, HashSet};

use tracing::{info, warn};

use crate::dataset::FeedFile;

/// Any metric above this percentage marks the dataset invalid
pub const INVALID_PCT: f64 = 20.0;
/// Extracted text shorter than this counts as short
pub const SHORT_TEXT_CHARS: usize = 500;
/// Summaries shorter than this add nothing beyond the title
pub const THIN_SUMMARY_CHARS: usize = 80;
/// Stories with fewer items are counted as small
pub const SMALL_STORY_ITEMS: usize = 3;

/// A count and its share of the relevant total, in percent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metric {
    pub count: usize,
    pub pct: f64,
}

impl Metric {
    fn of(count: usize, total: usize) -> Self {
        let pct = if total == 0 {
            0.0
        } else {
            count as f64 * 100.0 / total as f64
        };
        Self { count, pct }
    }
}

/// Audit results for one feed
#[derive(Debug, Clone, PartialEq)]
pub struct AuditReport {
    pub items: usize,
    pub stories: usize,
    /// Stories whose items all come from one source
    pub one_source_stories: Metric,
    /// Stories with fewer than [`SMALL_STORY_ITEMS`] items
    pub small_stories: Metric,
    /// Items whose summary is empty, repeats the title or is very short
    pub title_only_items: Metric,
    /// Items with little or no extracted article text
    pub short_text_items: Metric,
}

impl AuditReport {
    pub fn is_invalid(&self) -> bool {
        [
            self.one_source_stories,
            self.small_stories,
            self.title_only_items,
            self.short_text_items,
        ]
        .iter()
        .any(|m| m.pct > INVALID_PCT)
    }

    pub fn log(&self) {
        info!(
            "Audit - items={}, stories={}, one_source={} ({:.1}%), lt{}={} ({:.1}%), title_only={} ({:.1}%), short_text={} ({:.1}%)",
            self.items,
            self.stories,
            self.one_source_stories.count,
            self.one_source_stories.pct,
            SMALL_STORY_ITEMS,
            self.small_stories.count,
            self.small_stories.pct,
            self.title_only_items.count,
            self.title_only_items.pct,
            self.short_text_items.count,
            self.short_text_items.pct
        );
        if self.is_invalid() {
            warn!(
                "Dataset marked INVALID by audit thresholds (a metric exceeds {}%)",
                INVALID_PCT
            );
        }
    }
}

/// Audit a feed without touching the filesystem
pub fn audit(feed: &FeedFile) -> AuditReport {
    let source_of: HashMap<&str, &str> = feed
        .items
        .iter()
        .map(|i| (i.id.as_str(), i.source_id.as_str()))
        .collect();

    let one_source = feed
        .stories
        .iter()
        .filter(|story| {
            // member ids missing from the feed are ignored
            let sources: HashSet<&str> = story
                .item_ids
                .iter()
                .filter_map(|id| source_of.get(id.as_str()).copied())
                .collect();
            sources.len() <= 1
        })
        .count();

    let small = feed
        .stories
        .iter()
        .filter(|s| s.item_ids.len() < SMALL_STORY_ITEMS)
        .count();

    let title_only = feed
        .items
        .iter()
        .filter(|item| {
            let summary = item.summary.trim();
            summary.is_empty()
                || summary.to_lowercase() == item.title.trim().to_lowercase()
                || summary.chars().count() < THIN_SUMMARY_CHARS
        })
        .count();

    let short_text = feed
        .items
        .iter()
        .filter(|item| {
            let text = item.extracted_text.as_deref().unwrap_or_default().trim();
            text.chars().count() < SHORT_TEXT_CHARS
        })
        .count();

    let items = feed.items.len();
    let stories = feed.stories.len();
    AuditReport {
        items,
        stories,
        one_source_stories: Metric::of(one_source, stories),
        small_stories: Metric::of(small, stories),
        title_only_items: Metric::of(title_only, items),
        short_text_items: Metric::of(short_text, items),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use storyline_core::{Item, Lenses, SourceType, StoryCluster, Verification};

    fn item(id: &str, source_id: &str, summary: &str, text_chars: usize) -> Item {
        let mut item = Item::new(
            id,
            source_id,
            SourceType::Editorial,
            format!("Headline {}", id),
            format!("https://example.com/{}", id),
            Utc::now(),
        )
        .unwrap();
        item.summary = summary.to_string();
        item.extracted_text = (text_chars > 0).then(|| "x".repeat(text_chars));
        item
    }

    fn rich(id: &str, source_id: &str) -> Item {
        item(id, source_id, &"detail ".repeat(20), 600)
    }

    fn story(id: &str, item_ids: &[&str]) -> StoryCluster {
        StoryCluster {
            id: id.to_string(),
            title: id.to_string(),
            tags: Vec::new(),
            item_ids: item_ids.iter().map(|i| i.to_string()).collect(),
            lenses: Lenses::default(),
            representative_item_id: item_ids[0].to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            narrative_diff: None,
            verify: Verification::default(),
            opposing: None,
        }
    }

    #[test]
    fn test_empty_feed_is_valid() {
        let report = audit(&FeedFile::new(Vec::new(), Vec::new(), Utc::now()));
        assert_eq!(report.items, 0);
        assert_eq!(report.one_source_stories.pct, 0.0);
        assert_eq!(report.short_text_items.pct, 0.0);
        assert!(!report.is_invalid());
    }

    #[test]
    fn test_counts_and_percentages() {
        let items = vec![
            rich("i1", "a"),
            item("i2", "b", "", 0),
            item("i3", "a", "Headline i3", 10),
            rich("i4", "c"),
            rich("i5", "d"),
        ];
        let stories = vec![
            story("s1", &["i1", "i2", "i4"]),
            story("s2", &["i1", "i3"]),
            story("s3", &["i5", "gone"]),
        ];
        let report = audit(&FeedFile::new(items, stories, Utc::now()));

        assert_eq!(report.items, 5);
        assert_eq!(report.stories, 3);
        assert_eq!(report.one_source_stories.count, 2);
        assert!((report.one_source_stories.pct - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(report.small_stories.count, 2);
        assert_eq!(report.title_only_items.count, 2);
        assert_eq!(report.title_only_items.pct, 40.0);
        assert_eq!(report.short_text_items.count, 2);
        assert_eq!(report.short_text_items.pct, 40.0);
        assert!(report.is_invalid());
    }

    #[test]
    fn test_summary_repeating_title_is_title_only() {
        let mut repeated = rich("i1", "a");
        repeated.summary = format!("  {}  ", repeated.title.to_uppercase());
        let report = audit(&FeedFile::new(vec![repeated], Vec::new(), Utc::now()));
        assert_eq!(report.title_only_items.count, 1);
    }

    #[test]
    fn test_invalid_only_above_threshold() {
        let mut items: Vec<Item> = ["a", "b", "c", "d", "e"]
            .iter()
            .enumerate()
            .map(|(n, source)| rich(&format!("i{}", n), source))
            .collect();
        let stories = vec![story("s1", &["i0", "i1", "i2"])];

        // one thin item out of five is exactly the limit
        items[4].summary.clear();
        let at_limit = audit(&FeedFile::new(items.clone(), stories.clone(), Utc::now()));
        assert_eq!(at_limit.title_only_items.pct, INVALID_PCT);
        assert!(!at_limit.is_invalid());

        items[3].summary.clear();
        let over = audit(&FeedFile::new(items, stories, Utc::now()));
        assert_eq!(over.title_only_items.pct, 40.0);
        assert!(over.is_invalid());
    }
}
