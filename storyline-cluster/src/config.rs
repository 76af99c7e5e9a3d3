//! Clustering tunables

use serde::{Deserialize, Serialize};

/// Tags too generic to count as shared topic evidence on their own
pub const DEFAULT_STOP_TAGS: &[&str] = &["ai", "general", "frontend", "devtools", "data"];

/// Thresholds for near-duplicate clustering
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NearDuplicateConfig {
    /// Minimum title Jaccard when embeddings are not compared
    pub token_threshold: f64,
    /// Minimum cosine when both sides carry embeddings
    pub embedding_threshold: f64,
}

impl Default for NearDuplicateConfig {
    fn default() -> Self {
        Self {
            token_threshold: 0.5,
            embedding_threshold: 0.85,
        }
    }
}

/// Tunables for topic clustering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicConfig {
    /// Minimum combined score on the token path
    pub token_threshold: f64,
    /// Minimum combined score on the embedding path
    pub embedding_threshold: f64,
    /// Clusters smaller than this are dropped from the output
    pub min_size: usize,
    /// Weight of the tag-overlap bonus, clamped to `[0, 1]`
    pub tag_weight: f64,
    /// Flat bonus for a matching domain, clamped to `[0, 0.4]`
    pub domain_bonus: f64,
    /// Shared informative tags needed before the tag bonus applies (at least 1)
    pub min_tag_overlap: usize,
    /// Tags ignored by the tag bonus
    pub stop_tags: Vec<String>,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            token_threshold: 0.25,
            embedding_threshold: 0.78,
            min_size: 2,
            tag_weight: 0.25,
            domain_bonus: 0.05,
            min_tag_overlap: 1,
            stop_tags: DEFAULT_STOP_TAGS.iter().map(|t| t.to_string()).collect(),
        }
    }
}
