//! Match scoring policies
//!
//! Both policies share a base score: cosine against the cluster centroid when
//! the item and the cluster both carry embeddings, title-token Jaccard against
//! the seed title otherwise. The [`MatchBasis`] of that base score picks the
//! threshold the builder compares against.

use std::collections::HashSet;

use storyline_core::Item;
use storyline_embedding::{cosine_similarity, jaccard, tokenize_title};

use crate::builder::ClusterState;
use crate::config::{NearDuplicateConfig, TopicConfig};

/// Maximum weight of the tag-overlap bonus
pub const MAX_TAG_WEIGHT: f64 = 1.0;
/// Maximum flat domain bonus
pub const MAX_DOMAIN_BONUS: f64 = 0.4;

/// Which comparison produced a score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchBasis {
    /// Cosine similarity between embeddings
    Embedding,
    /// Jaccard similarity between title token sets
    Tokens,
}

/// A score together with the comparison it came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchScore {
    pub value: f64,
    pub basis: MatchBasis,
}

impl MatchScore {
    pub fn new(value: f64, basis: MatchBasis) -> Self {
        Self { value, basis }
    }
}

/// An incoming item with its derived comparison inputs
///
/// Built once per ingested item and reused against every cluster.
#[derive(Debug)]
pub struct Candidate<'a> {
    pub item: &'a Item,
    pub tokens: HashSet<String>,
    /// Item tags, lowercased
    pub tags: HashSet<String>,
    pub embedding: Option<&'a [f32]>,
}

impl<'a> Candidate<'a> {
    pub fn new(item: &'a Item) -> Self {
        Self {
            item,
            tokens: tokenize_title(&item.title),
            tags: item.tags.iter().map(|t| t.to_lowercase()).collect(),
            embedding: item.embedding(),
        }
    }
}

/// Scoring rules plugged into [`crate::ClusterBuilder`]
pub trait ClusterPolicy {
    /// Namespace hashed with the seed item id to form cluster ids
    fn namespace(&self) -> &'static str;

    /// Score a candidate against one cluster's representative
    fn score(&self, candidate: &Candidate<'_>, cluster: &ClusterState) -> MatchScore;

    /// Minimum score needed to merge, by the basis of the best score
    fn threshold(&self, basis: MatchBasis) -> f64;

    /// Clusters with fewer members are dropped when the pass finishes
    fn min_size(&self) -> usize {
        1
    }
}

/// Cosine when both sides have embeddings, token Jaccard otherwise
pub fn base_score(candidate: &Candidate<'_>, cluster: &ClusterState) -> MatchScore {
    match (candidate.embedding, cluster.rep_embedding()) {
        (Some(a), Some(b)) => MatchScore::new(cosine_similarity(a, b), MatchBasis::Embedding),
        _ => MatchScore::new(
            jaccard(&candidate.tokens, cluster.rep_tokens()),
            MatchBasis::Tokens,
        ),
    }
}

/// Groups coverage of the identical event with near-identical headlines
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearDuplicatePolicy {
    config: NearDuplicateConfig,
}

impl NearDuplicatePolicy {
    pub fn new(config: NearDuplicateConfig) -> Self {
        Self { config }
    }
}

impl Default for NearDuplicatePolicy {
    fn default() -> Self {
        Self::new(NearDuplicateConfig::default())
    }
}

impl ClusterPolicy for NearDuplicatePolicy {
    fn namespace(&self) -> &'static str {
        "cluster"
    }

    fn score(&self, candidate: &Candidate<'_>, cluster: &ClusterState) -> MatchScore {
        base_score(candidate, cluster)
    }

    fn threshold(&self, basis: MatchBasis) -> f64 {
        match basis {
            MatchBasis::Embedding => self.config.embedding_threshold,
            MatchBasis::Tokens => self.config.token_threshold,
        }
    }
}

/// Looser related-coverage grouping with tag and domain bonuses
#[derive(Debug, Clone)]
pub struct TopicPolicy {
    token_threshold: f64,
    embedding_threshold: f64,
    min_size: usize,
    tag_weight: f64,
    domain_bonus: f64,
    min_tag_overlap: usize,
    stop_tags: HashSet<String>,
}

impl TopicPolicy {
    /// Build from config, clamping the bonus parameters into range
    pub fn new(config: TopicConfig) -> Self {
        let tag_weight = if config.tag_weight.is_finite() {
            config.tag_weight.clamp(0.0, MAX_TAG_WEIGHT)
        } else {
            0.0
        };
        let domain_bonus = if config.domain_bonus.is_finite() {
            config.domain_bonus.clamp(0.0, MAX_DOMAIN_BONUS)
        } else {
            0.0
        };

        Self {
            token_threshold: config.token_threshold,
            embedding_threshold: config.embedding_threshold,
            min_size: config.min_size,
            tag_weight,
            domain_bonus,
            min_tag_overlap: config.min_tag_overlap.max(1),
            stop_tags: config
                .stop_tags
                .iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    pub fn tag_weight(&self) -> f64 {
        self.tag_weight
    }

    pub fn domain_bonus(&self) -> f64 {
        self.domain_bonus
    }

    pub fn min_tag_overlap(&self) -> usize {
        self.min_tag_overlap
    }

    fn is_informative(&self, tag: &str) -> bool {
        !self.stop_tags.contains(tag)
    }

    /// Both sides are already lowercased sets, so counting needs no allocation
    fn tag_bonus(&self, candidate: &Candidate<'_>, cluster: &ClusterState) -> f64 {
        let cluster_keys = cluster.tag_keys();
        let item_count = candidate
            .tags
            .iter()
            .filter(|t| self.is_informative(t))
            .count();
        if item_count == 0 || cluster_keys.is_empty() {
            return 0.0;
        }

        let overlap = candidate
            .tags
            .iter()
            .filter(|t| self.is_informative(t) && cluster_keys.contains(*t))
            .count();
        if overlap < self.min_tag_overlap {
            return 0.0;
        }

        let cluster_count = cluster_keys
            .iter()
            .filter(|t| self.is_informative(t))
            .count();
        let denom = item_count.min(cluster_count).max(1);
        (overlap as f64 / denom as f64) * self.tag_weight
    }

    fn domain_match(&self, candidate: &Candidate<'_>, cluster: &ClusterState) -> f64 {
        match (candidate.item.domain.as_deref(), cluster.rep_domain()) {
            (Some(a), Some(b)) if !a.is_empty() && a == b => self.domain_bonus,
            _ => 0.0,
        }
    }
}

impl Default for TopicPolicy {
    fn default() -> Self {
        Self::new(TopicConfig::default())
    }
}

impl ClusterPolicy for TopicPolicy {
    fn namespace(&self) -> &'static str {
        "topic"
    }

    fn score(&self, candidate: &Candidate<'_>, cluster: &ClusterState) -> MatchScore {
        let base = base_score(candidate, cluster);
        let value = base.value
            + self.tag_bonus(candidate, cluster)
            + self.domain_match(candidate, cluster);
        MatchScore::new(value.clamp(0.0, 1.0), base.basis)
    }

    fn threshold(&self, basis: MatchBasis) -> f64 {
        match basis {
            MatchBasis::Embedding => self.embedding_threshold,
            MatchBasis::Tokens => self.token_threshold,
        }
    }

    fn min_size(&self) -> usize {
        self.min_size
    }
}
