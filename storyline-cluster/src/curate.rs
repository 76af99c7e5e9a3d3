//! Story-group curation
//!
//! Groups items by normalized headline, then keeps the latest item of each
//! source as one perspective. Groups covered by too few perspectives or
//! sources are dropped, so every surviving group shows the same event through
//! several outlets.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use storyline_core::{Item, SourceType};
use storyline_embedding::{jaccard, tokenize_title};
use storyline_news::stable_id;

static BRACKETED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]|\([^)]*\)").expect("valid regex"));

/// A colon this close to the start marks an outlet prefix ("Reuters: ...")
const SOURCE_PREFIX_MAX_CHARS: usize = 30;

/// Topic tag used when no member carries any tag
const FALLBACK_TOPIC: &str = "general";

/// Curation thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurateConfig {
    /// Minimum headline Jaccard to join a group
    pub threshold: f64,
    /// Groups with fewer perspectives are dropped
    pub min_perspectives: usize,
    /// Groups drawing on fewer distinct sources are dropped
    pub min_sources: usize,
    /// Perspectives kept per group, never below 2
    pub max_perspectives: usize,
}

impl Default for CurateConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            min_perspectives: 2,
            min_sources: 2,
            max_perspectives: 6,
        }
    }
}

/// Coarse tone of a perspective, from keywords in its title and summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StanceTag {
    Mainstream,
    Balanced,
    Skeptical,
}

const SKEPTICAL_KEYWORDS: &[&str] = &[
    "fails",
    "failure",
    "concern",
    "criticism",
    "critic",
    "lawsuit",
    "backlash",
    "risk",
    "ban",
    "warn",
    "probe",
    "investigation",
    "breach",
    "vulnerability",
    "exploit",
    "decline",
    "cut",
    "layoff",
    "miss",
];

const MAINSTREAM_KEYWORDS: &[&str] = &[
    "launch",
    "release",
    "breakthrough",
    "wins",
    "growth",
    "record",
    "raises",
    "funding",
    "approval",
    "clears",
    "acquires",
    "ships",
    "expands",
];

impl StanceTag {
    /// Substring match over the lowercased text; skeptical keywords win
    pub fn from_text(title: &str, summary: &str) -> Self {
        let text = format!("{} {}", title, summary).to_lowercase();
        if SKEPTICAL_KEYWORDS.iter().any(|kw| text.contains(kw)) {
            Self::Skeptical
        } else if MAINSTREAM_KEYWORDS.iter().any(|kw| text.contains(kw)) {
            Self::Mainstream
        } else {
            Self::Balanced
        }
    }

    pub fn framing(&self) -> &'static str {
        match self {
            Self::Skeptical => "Emphasizes risks, caveats, or unresolved questions.",
            Self::Mainstream => "Highlights the core announcement and immediate implications.",
            Self::Balanced => "Balances key facts with context and constraints.",
        }
    }
}

/// One source's take on a story group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Perspective {
    pub id: String,
    /// Display name of the source
    pub source: String,
    pub source_type: SourceType,
    pub url: String,
    pub title: String,
    pub stance_tag: StanceTag,
    pub framing: String,
    pub summary: String,
    pub published_at: DateTime<Utc>,
    pub image_url: Option<String>,
}

/// Editorial digest of a group, filled by a later enrichment pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryGroupSummary {
    pub bullets: Vec<String>,
    pub implications: Vec<String>,
    pub risks: Vec<String>,
}

impl StoryGroupSummary {
    /// Trim every entry, dropping blanks and repeats
    pub fn cleaned(self) -> Self {
        fn uniq(values: Vec<String>) -> Vec<String> {
            values
                .into_iter()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect::<IndexSet<_>>()
                .into_iter()
                .collect()
        }

        Self {
            bullets: uniq(self.bullets),
            implications: uniq(self.implications),
            risks: uniq(self.risks),
        }
    }
}

/// A curated story: several sources covering one event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryGroup {
    pub id: String,
    pub canonical_title: String,
    pub canonical_url: String,
    pub topic_tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub perspectives: Vec<Perspective>,
    pub image_url: Option<String>,
    /// Ids of the items behind the perspectives, newest first
    pub item_ids: Vec<String>,
    #[serde(default)]
    pub summary: StoryGroupSummary,
}

/// Headline tokens with bracketed asides and any outlet prefix removed
pub fn headline_tokens(title: &str) -> HashSet<String> {
    let unbracketed = BRACKETED_RE.replace_all(title, " ");
    tokenize_title(strip_source_prefix(&unbracketed))
}

fn strip_source_prefix(title: &str) -> &str {
    match title.find(':') {
        Some(idx) if idx > 0 && title[..idx].chars().count() < SOURCE_PREFIX_MAX_CHARS => {
            title[idx + 1..].trim()
        }
        _ => title,
    }
}

/// Greedy single pass over headlines; groups keep their seed's tokens
pub fn group_by_headline<'a>(items: &'a [Item], threshold: f64) -> Vec<Vec<&'a Item>> {
    let mut groups: Vec<(HashSet<String>, Vec<&Item>)> = Vec::new();

    for item in items {
        let tokens = headline_tokens(&item.title);

        let mut best: Option<(usize, f64)> = None;
        for (index, (rep_tokens, _)) in groups.iter().enumerate() {
            let score = jaccard(&tokens, rep_tokens);
            if score > best.map_or(0.0, |(_, b)| b) {
                best = Some((index, score));
            }
        }

        match best {
            Some((index, score)) if score >= threshold => groups[index].1.push(item),
            _ => groups.push((tokens, vec![item])),
        }
    }

    groups.into_iter().map(|(_, members)| members).collect()
}

/// Latest item of each source, newest first, capped at `max(2, max_perspectives)`
///
/// `items` must already be sorted newest first.
fn latest_by_source<'a>(items: &[&'a Item], max_perspectives: usize) -> Vec<&'a Item> {
    let mut by_source: IndexMap<&str, &'a Item> = IndexMap::new();
    for &item in items {
        by_source
            .entry(item.source_id.as_str())
            .and_modify(|existing| {
                if item.published_at > existing.published_at {
                    *existing = item;
                }
            })
            .or_insert(item);
    }

    let mut chosen: Vec<&Item> = by_source.into_values().collect();
    chosen.sort_by_key(|i| Reverse(i.published_at));
    chosen.truncate(max_perspectives.max(2));
    chosen
}

/// Build story groups from items in a deterministic order
///
/// `source_names` maps source ids to display names; unknown ids are shown
/// as-is. Groups come back newest first.
pub fn curate_story_groups(
    items: &[Item],
    source_names: &HashMap<String, String>,
    config: &CurateConfig,
) -> Vec<StoryGroup> {
    let clusters = group_by_headline(items, config.threshold);
    let formed = clusters.len();

    let mut groups: Vec<StoryGroup> = Vec::new();
    for mut members in clusters {
        members.sort_by_key(|i| Reverse(i.published_at));
        let chosen = latest_by_source(&members, config.max_perspectives);

        let sources: HashSet<&str> = chosen.iter().map(|i| i.source_id.as_str()).collect();
        if chosen.len() < config.min_perspectives || sources.len() < config.min_sources {
            continue;
        }
        let Some(canonical) = chosen.first() else {
            continue;
        };

        let mut topic_tags: Vec<String> = members
            .iter()
            .flat_map(|i| i.tags.iter())
            .filter(|t| !t.is_empty())
            .cloned()
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect();
        if topic_tags.is_empty() {
            topic_tags.push(FALLBACK_TOPIC.to_string());
        }

        let perspectives = chosen
            .iter()
            .map(|item| {
                let stance_tag = StanceTag::from_text(&item.title, &item.summary);
                Perspective {
                    id: stable_id(&["perspective", item.id.as_str()]),
                    source: source_names
                        .get(&item.source_id)
                        .cloned()
                        .unwrap_or_else(|| item.source_id.clone()),
                    source_type: item.source_type,
                    url: item.url.clone(),
                    title: item.title.clone(),
                    stance_tag,
                    framing: stance_tag.framing().to_string(),
                    summary: item.summary.clone(),
                    published_at: item.published_at,
                    image_url: item.image_url.clone(),
                }
            })
            .collect();

        let mut sorted_ids: Vec<&str> = chosen.iter().map(|i| i.id.as_str()).collect();
        sorted_ids.sort_unstable();
        let id_parts: Vec<&str> = std::iter::once("story").chain(sorted_ids).collect();

        groups.push(StoryGroup {
            id: stable_id(id_parts.as_slice()),
            canonical_title: canonical.title.clone(),
            canonical_url: canonical.url.clone(),
            topic_tags,
            created_at: canonical.published_at,
            perspectives,
            image_url: chosen.iter().find_map(|i| i.image_url.clone()),
            item_ids: chosen.iter().map(|i| i.id.clone()).collect(),
            summary: StoryGroupSummary::default(),
        });
    }

    groups.sort_by_key(|g| Reverse(g.created_at));

    debug!(
        "Story groups with 3+ perspectives: {}",
        groups.iter().filter(|g| g.perspectives.len() >= 3).count()
    );
    info!(
        "Curated {} story groups from {} headline groups ({} items)",
        groups.len(),
        formed,
        items.len()
    );
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

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

    fn names() -> HashMap<String, String> {
        [("reuters", "Reuters"), ("verge", "The Verge")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn config(threshold: f64) -> CurateConfig {
        CurateConfig {
            threshold,
            min_perspectives: 2,
            min_sources: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_headline_tokens_drop_prefix_and_brackets() {
        let tokens = headline_tokens("Reuters: Nvidia unveils Blackwell GPU [video] (updated)");
        let expected: HashSet<String> = ["nvidia", "blackwell", "gpu"]
            .iter()
            .map(|t| t.to_string())
            .collect();
        assert_eq!(tokens, expected);

        // a colon far into the headline is not a prefix
        let long = headline_tokens("Thirty-one characters of headline text: tail");
        assert!(long.contains("thirty"));
        assert!(long.contains("tail"));
    }

    #[test]
    fn test_one_event_three_perspectives() {
        let mut older = item(
            "r0",
            "reuters",
            "Nvidia Blackwell Ultra GPU datacenters preview",
            9,
        );
        older.tags = vec!["chips".to_string()];
        let mut with_image = item(
            "v1",
            "verge",
            "Nvidia Blackwell Ultra GPU targets datacenters [video]",
            3,
        );
        with_image.image_url = Some("https://verge.example/gpu.jpg".to_string());
        let items = vec![
            item(
                "r1",
                "reuters",
                "Reuters: Nvidia unveils Blackwell Ultra GPU for datacenters",
                1,
            ),
            with_image,
            item("w1", "wired", "Nvidia debuts Blackwell Ultra GPU (updated)", 5),
            older,
        ];

        let groups = curate_story_groups(&items, &names(), &config(0.4));
        assert_eq!(groups.len(), 1);

        let group = &groups[0];
        assert_eq!(group.perspectives.len(), 3);
        assert_eq!(group.item_ids, vec!["r1", "v1", "w1"]);
        assert_eq!(group.canonical_title, items[0].title);
        assert_eq!(group.created_at, items[0].published_at);
        assert_eq!(group.id, stable_id(&["story", "r1", "v1", "w1"]));
        assert_eq!(group.topic_tags, vec!["chips".to_string()]);
        assert_eq!(group.image_url.as_deref(), Some("https://verge.example/gpu.jpg"));

        let sources: Vec<&str> = group.perspectives.iter().map(|p| p.source.as_str()).collect();
        assert_eq!(sources, vec!["Reuters", "The Verge", "wired"]);
        assert_eq!(group.perspectives[0].id, stable_id(&["perspective", "r1"]));
    }

    #[test]
    fn test_distinct_events_stay_apart() {
        let items = vec![
            item("a1", "reuters", "Apple ships Vision Pro headset update", 1),
            item("s1", "reuters", "SpaceX Starship completes orbital test flight", 2),
            item("a2", "verge", "Apple Vision Pro headset ships globally", 3),
            item("s2", "wired", "Starship orbital test flight completes for SpaceX", 4),
        ];

        let groups = curate_story_groups(&items, &names(), &config(0.45));
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].item_ids, vec!["a1", "a2"]);
        assert_eq!(groups[1].item_ids, vec!["s1", "s2"]);
        assert!(groups.iter().all(|g| g.topic_tags == vec!["general".to_string()]));
    }

    #[test]
    fn test_single_source_story_is_dropped() {
        let items = vec![
            item("r1", "reuters", "Chip export rules tighten again", 1),
            item("r2", "reuters", "Chip export rules tighten again", 4),
        ];
        assert!(curate_story_groups(&items, &names(), &config(0.4)).is_empty());
    }

    #[test]
    fn test_perspectives_are_capped() {
        let items: Vec<Item> = (0..5)
            .map(|i| {
                let id = format!("i{}", i);
                let source = format!("src{}", i);
                item(&id, &source, "Rust compiler speeds builds", i)
            })
            .collect();
        let capped = CurateConfig {
            max_perspectives: 3,
            ..Default::default()
        };
        let groups = curate_story_groups(&items, &names(), &capped);
        assert_eq!(groups[0].perspectives.len(), 3);

        // the cap never drops below two
        let floor = CurateConfig {
            max_perspectives: 1,
            ..Default::default()
        };
        let groups = curate_story_groups(&items, &names(), &floor);
        assert_eq!(groups[0].perspectives.len(), 2);
    }

    #[test]
    fn test_stance_from_keywords() {
        assert_eq!(
            StanceTag::from_text("Regulators open investigation", ""),
            StanceTag::Skeptical
        );
        assert_eq!(
            StanceTag::from_text("Startup raises seed round", ""),
            StanceTag::Mainstream
        );
        // skeptical keywords take precedence
        assert_eq!(
            StanceTag::from_text("Funding round", "amid lawsuit"),
            StanceTag::Skeptical
        );
        assert_eq!(
            StanceTag::from_text("Weekly notes on compilers", ""),
            StanceTag::Balanced
        );
        assert_eq!(
            StanceTag::Balanced.framing(),
            "Balances key facts with context and constraints."
        );
    }

    #[test]
    fn test_summary_cleaned() {
        let summary = StoryGroupSummary {
            bullets: vec![" a ".to_string(), "a".to_string(), "".to_string(), "b".to_string()],
            implications: vec!["  ".to_string()],
            risks: Vec::new(),
        }
        .cleaned();
        assert_eq!(summary.bullets, vec!["a".to_string(), "b".to_string()]);
        assert!(summary.implications.is_empty());
    }

    #[test]
    fn test_story_group_serializes_camel_case() {
        let items = vec![
            item("a", "reuters", "Kernel maintainers merge scheduler rework", 1),
            item("b", "verge", "Kernel maintainers merge scheduler rework", 2),
        ];
        let groups = curate_story_groups(&items, &names(), &CurateConfig::default());
        let value = serde_json::to_value(&groups[0]).unwrap();
        assert!(value["canonicalTitle"].is_string());
        assert!(value["topicTags"].is_array());
        assert_eq!(value["perspectives"][0]["stanceTag"], "balanced");
        assert_eq!(value["perspectives"][0]["sourceType"], "editorial");
        assert!(value["summary"]["bullets"].as_array().unwrap().is_empty());
    }
}
