//! Hacker News Algolia search hits

use chrono::Utc;
use serde::{Deserialize, Serialize};

use storyline_core::{HnSignals, Item, ItemSignals, SourceType};

use crate::canonical::{canonicalize, domain_from_url, stable_id};
use crate::error::NewsError;
use crate::normalize::{non_blank, parse_date, NormalizedItem};

/// Source id every Hacker News item is filed under
pub const HN_SOURCE_ID: &str = "hackernews";

const SUMMARY_CHARS: usize = 240;

/// A story hit from the Algolia `search_by_date` endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HnAlgoliaHit {
    #[serde(rename = "objectID")]
    pub object_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default, rename = "created_at")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub points: Option<u64>,
    #[serde(default, rename = "num_comments")]
    pub num_comments: Option<u64>,
    #[serde(default, rename = "story_text")]
    pub story_text: Option<String>,
}

/// Algolia search response envelope
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HnAlgoliaResponse {
    #[serde(default)]
    pub hits: Vec<HnAlgoliaHit>,
}

/// Parse an Algolia response body into its hits
pub fn parse_hn_response(content: &[u8]) -> Result<Vec<HnAlgoliaHit>, NewsError> {
    let response: HnAlgoliaResponse = serde_json::from_slice(content)?;
    Ok(response.hits)
}

/// Convert an Algolia hit into an item; hits without a url or title are skipped
pub fn normalize_hn_hit(hit: &HnAlgoliaHit) -> Option<NormalizedItem> {
    let url = hit
        .url
        .as_deref()
        .filter(|u| !u.is_empty())
        .map(canonicalize)?;
    let title = hit.title.as_deref().map(str::trim).filter(|t| !t.is_empty())?;

    let published_at = hit
        .created_at
        .as_deref()
        .and_then(parse_date)
        .unwrap_or_else(Utc::now);
    let id = stable_id(&[HN_SOURCE_ID, url.as_str()]);

    let mut item = Item::new(
        id,
        HN_SOURCE_ID,
        SourceType::Community,
        title,
        url.clone(),
        published_at,
    )
    .ok()?;

    item.author = non_blank(hit.author.as_deref());
    item.summary = hit
        .story_text
        .as_deref()
        .map(|t| t.chars().take(SUMMARY_CHARS).collect())
        .unwrap_or_default();
    item.domain = domain_from_url(&url);
    item.signals = Some(ItemSignals {
        hn: Some(HnSignals {
            id: hit.object_id.parse().unwrap_or(0),
            score: hit.points,
            comments: hit.num_comments,
        }),
    });
    item.raw = serde_json::to_value(hit).unwrap_or_default();

    Some(NormalizedItem {
        item,
        canonical_url: url,
        image_url: None,
    })
}
