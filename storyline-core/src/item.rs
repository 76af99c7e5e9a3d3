//! Normalized item data structures

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StorylineError, StorylineResult};

/// Kind of outlet an item was published by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Editorial,
    Community,
    Primary,
    VcBlog,
    Aggregator,
    Social,
}

impl SourceType {
    /// Every source type, in lens order
    pub const ALL: [SourceType; 6] = [
        SourceType::Editorial,
        SourceType::Community,
        SourceType::Primary,
        SourceType::VcBlog,
        SourceType::Aggregator,
        SourceType::Social,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Editorial => "editorial",
            SourceType::Community => "community",
            SourceType::Primary => "primary",
            SourceType::VcBlog => "vc_blog",
            SourceType::Aggregator => "aggregator",
            SourceType::Social => "social",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = StorylineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| StorylineError::unknown_source_type(s))
    }
}

/// Hacker News engagement numbers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HnSignals {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<u64>,
}

/// Community signals attached to an item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemSignals {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hn: Option<HnSignals>,
}

/// One normalized piece of content from one source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Stable identity: hash of `source_id | canonical_url`
    pub id: String,
    pub source_id: String,
    pub source_type: SourceType,
    pub title: String,
    pub url: String,
    /// Cross-source dedup key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_url: Option<String>,
    pub published_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    /// Hostname without a leading `www.`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Best-effort lead image URL from the feed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Topic tags (order-insensitive for matching)
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signals: Option<ItemSignals>,
    /// Source record kept verbatim for provenance, never interpreted
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub raw: serde_json::Value,
}

impl Item {
    /// Create an item, rejecting blank identity, source, title or URL fields
    pub fn new(
        id: impl Into<String>,
        source_id: impl Into<String>,
        source_type: SourceType,
        title: impl Into<String>,
        url: impl Into<String>,
        published_at: DateTime<Utc>,
    ) -> StorylineResult<Self> {
        let id = id.into();
        let source_id = source_id.into();
        let title = title.into();
        let url = url.into();

        if id.trim().is_empty() {
            return Err(StorylineError::MissingField("id"));
        }
        if source_id.trim().is_empty() {
            return Err(StorylineError::MissingField("sourceId"));
        }
        if title.trim().is_empty() {
            return Err(StorylineError::MissingField("title"));
        }
        if url.trim().is_empty() {
            return Err(StorylineError::MissingField("url"));
        }

        Ok(Self {
            id,
            source_id,
            source_type,
            title,
            canonical_url: Some(url.clone()),
            url,
            published_at,
            author: None,
            summary: String::new(),
            extracted_text: None,
            domain: None,
            image_url: None,
            tags: Vec::new(),
            embedding: None,
            signals: None,
            raw: serde_json::Value::Null,
        })
    }

    /// Embedding, if present and non-empty
    pub fn embedding(&self) -> Option<&[f32]> {
        self.embedding.as_deref().filter(|e| !e.is_empty())
    }

    /// Key used for cross-source deduplication
    pub fn dedup_key(&self) -> &str {
        self.canonical_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or(&self.url)
    }
}
