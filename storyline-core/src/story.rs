//! Story cluster output structures

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::item::SourceType;

/// Member item ids of a cluster grouped by source type
///
/// Every source type is always present, empty when unused.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lenses {
    pub editorial: Vec<String>,
    pub community: Vec<String>,
    pub primary: Vec<String>,
    pub vc_blog: Vec<String>,
    pub aggregator: Vec<String>,
    pub social: Vec<String>,
}

impl Lenses {
    pub fn get(&self, source_type: SourceType) -> &[String] {
        match source_type {
            SourceType::Editorial => &self.editorial,
            SourceType::Community => &self.community,
            SourceType::Primary => &self.primary,
            SourceType::VcBlog => &self.vc_blog,
            SourceType::Aggregator => &self.aggregator,
            SourceType::Social => &self.social,
        }
    }

    pub fn push(&mut self, source_type: SourceType, item_id: impl Into<String>) {
        let bucket = match source_type {
            SourceType::Editorial => &mut self.editorial,
            SourceType::Community => &mut self.community,
            SourceType::Primary => &mut self.primary,
            SourceType::VcBlog => &mut self.vc_blog,
            SourceType::Aggregator => &mut self.aggregator,
            SourceType::Social => &mut self.social,
        };
        bucket.push(item_id.into());
    }

    /// Source types with at least one member
    pub fn covered(&self) -> Vec<SourceType> {
        SourceType::ALL
            .into_iter()
            .filter(|t| !self.get(*t).is_empty())
            .collect()
    }
}

/// Claim verification placeholder filled by a later enrichment pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    pub claims: Vec<serde_json::Value>,
}

/// A group of items covering the same event or topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryCluster {
    pub id: String,
    /// Title of the seed item, never recomputed
    pub title: String,
    pub tags: Vec<String>,
    /// Member ids in merge order, never empty
    pub item_ids: Vec<String>,
    pub lenses: Lenses,
    pub representative_item_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub narrative_diff: Option<serde_json::Value>,
    pub verify: Verification,
    pub opposing: Option<serde_json::Value>,
}

impl StoryCluster {
    pub fn len(&self) -> usize {
        self.item_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.item_ids.is_empty()
    }
}

/// Item id to related item ids, ordered by similarity
pub type NeighborMap = IndexMap<String, Vec<String>>;
