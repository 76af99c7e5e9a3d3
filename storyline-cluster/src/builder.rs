//! Greedy incremental clustering
//!
//! Items are assigned in the order they are ingested. Each item joins the
//! best-scoring existing cluster if that score clears the policy threshold
//! for its basis, otherwise it seeds a new cluster. A cluster's title and
//! token set stay those of its seed item; only the embedding centroid, tags
//! and timestamps evolve as members join.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use tracing::{debug, info};

use storyline_core::{Item, Lenses, StoryCluster, Verification};
use storyline_embedding::{running_average_embedding, tokenize_title};
use storyline_news::stable_id;

use crate::policy::{Candidate, ClusterPolicy, MatchScore};

/// Progress is logged every this many ingested items
const PROGRESS_INTERVAL: usize = 500;

/// One cluster under construction
#[derive(Debug, Clone)]
pub struct ClusterState {
    id: String,
    rep_title: String,
    rep_tokens: HashSet<String>,
    rep_embedding: Option<Vec<f32>>,
    rep_domain: Option<String>,
    rep_item_id: String,
    count: usize,
    item_ids: Vec<String>,
    tags: IndexSet<String>,
    tag_keys: HashSet<String>,
    lenses: Lenses,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ClusterState {
    /// Start a cluster from its seed item
    pub fn seed(namespace: &str, item: &Item) -> Self {
        let mut lenses = Lenses::default();
        lenses.push(item.source_type, item.id.clone());

        Self {
            id: stable_id(&[namespace, item.id.as_str()]),
            rep_title: item.title.clone(),
            rep_tokens: tokenize_title(&item.title),
            rep_embedding: item.embedding().map(<[f32]>::to_vec),
            rep_domain: item.domain.clone().filter(|d| !d.is_empty()),
            rep_item_id: item.id.clone(),
            count: 1,
            item_ids: vec![item.id.clone()],
            tags: item.tags.iter().cloned().collect(),
            tag_keys: item.tags.iter().map(|t| t.to_lowercase()).collect(),
            lenses,
            created_at: item.published_at,
            updated_at: item.published_at,
        }
    }

    fn merge(&mut self, item: &Item) {
        self.item_ids.push(item.id.clone());
        self.tags.extend(item.tags.iter().cloned());
        self.tag_keys.extend(item.tags.iter().map(|t| t.to_lowercase()));
        self.lenses.push(item.source_type, item.id.clone());

        if let Some(embedding) = item.embedding() {
            self.rep_embedding = Some(running_average_embedding(
                self.rep_embedding.as_deref(),
                embedding,
                self.count,
            ));
        }

        if item.published_at > self.updated_at {
            self.updated_at = item.published_at;
        }
        self.count += 1;
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn rep_title(&self) -> &str {
        &self.rep_title
    }

    pub fn rep_tokens(&self) -> &HashSet<String> {
        &self.rep_tokens
    }

    pub fn rep_embedding(&self) -> Option<&[f32]> {
        self.rep_embedding.as_deref().filter(|e| !e.is_empty())
    }

    pub fn rep_domain(&self) -> Option<&str> {
        self.rep_domain.as_deref()
    }

    pub fn tags(&self) -> &IndexSet<String> {
        &self.tags
    }

    /// Lowercased member tags, for case-insensitive overlap
    pub fn tag_keys(&self) -> &HashSet<String> {
        &self.tag_keys
    }

    pub fn item_ids(&self) -> &[String] {
        &self.item_ids
    }

    pub fn len(&self) -> usize {
        self.item_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.item_ids.is_empty()
    }

    fn into_story(self) -> StoryCluster {
        StoryCluster {
            id: self.id,
            title: self.rep_title,
            tags: self.tags.into_iter().collect(),
            item_ids: self.item_ids,
            lenses: self.lenses,
            representative_item_id: self.rep_item_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
            narrative_diff: None,
            verify: Verification::default(),
            opposing: None,
        }
    }
}

/// Outcome of ingesting one item
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Assignment {
    /// Joined the cluster at this index with this score
    Merged { index: usize, score: MatchScore },
    /// Seeded a new cluster at this index
    Seeded { index: usize },
}

/// Single-pass cluster accumulator
///
/// Feed items with [`ClusterBuilder::ingest`] in a deterministic order
/// (newest first, as the deduplicator returns them); a different order can
/// produce different cluster boundaries.
pub struct ClusterBuilder<P> {
    policy: P,
    clusters: Vec<ClusterState>,
    ingested: usize,
}

impl<P: ClusterPolicy> ClusterBuilder<P> {
    pub fn new(policy: P) -> Self {
        Self {
            policy,
            clusters: Vec::new(),
            ingested: 0,
        }
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Clusters formed so far, in creation order
    pub fn clusters(&self) -> &[ClusterState] {
        &self.clusters
    }

    pub fn ingested(&self) -> usize {
        self.ingested
    }

    /// Assign one item to the best matching cluster or seed a new one
    pub fn ingest(&mut self, item: &Item) -> Assignment {
        let candidate = Candidate::new(item);

        // Ties keep the earlier cluster; a zero score never selects one.
        let mut best: Option<(usize, MatchScore)> = None;
        for (index, cluster) in self.clusters.iter().enumerate() {
            let score = self.policy.score(&candidate, cluster);
            let best_value = best.map_or(0.0, |(_, b)| b.value);
            if score.value > best_value {
                best = Some((index, score));
            }
        }

        self.ingested += 1;
        if self.ingested % PROGRESS_INTERVAL == 0 {
            info!(
                "Clustering progress - processed={}, clusters={}",
                self.ingested,
                self.clusters.len()
            );
        }

        match best {
            Some((index, score)) if score.value >= self.policy.threshold(score.basis) => {
                self.clusters[index].merge(item);
                Assignment::Merged { index, score }
            }
            _ => {
                self.clusters
                    .push(ClusterState::seed(self.policy.namespace(), item));
                Assignment::Seeded {
                    index: self.clusters.len() - 1,
                }
            }
        }
    }

    /// Ingest every item in order
    pub fn extend<'a>(&mut self, items: impl IntoIterator<Item = &'a Item>) {
        for item in items {
            self.ingest(item);
        }
    }

    /// Project the pass into story clusters, dropping those below the
    /// policy's minimum size
    pub fn finish(self) -> Vec<StoryCluster> {
        let min_size = self.policy.min_size();
        let formed = self.clusters.len();

        let stories: Vec<StoryCluster> = self
            .clusters
            .into_iter()
            .filter(|c| c.len() >= min_size)
            .map(ClusterState::into_story)
            .collect();

        let sizes: Vec<usize> = stories.iter().map(StoryCluster::len).collect();
        if let (Some(min), Some(max)) = (sizes.iter().min(), sizes.iter().max()) {
            let avg = sizes.iter().sum::<usize>() as f32 / sizes.len() as f32;
            debug!(
                "Cluster size distribution - min={}, max={}, avg={:.1}",
                min, max, avg
            );
        }

        info!(
            "Clustering finished ({}) - items={}, formed={}, kept={} (min_size={})",
            self.policy.namespace(),
            self.ingested,
            formed,
            stories.len(),
            min_size
        );
        stories
    }
}
