//! Related-item neighbor search
//!
//! Exhaustive pairwise cosine comparison over every embedded item. Fine for
//! the low thousands of items a run holds; a larger corpus would need an
//! approximate index.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use storyline_core::{Item, NeighborMap};

use crate::similarity::cosine_similarity;
use crate::types::SimilarityMatch;

/// Neighbor search tunables
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeighborConfig {
    /// Maximum neighbors per item
    pub k: usize,
    /// Minimum cosine similarity to qualify
    pub min_similarity: f64,
    /// Maximum neighbors contributed by one source
    pub max_per_source: usize,
}

impl Default for NeighborConfig {
    fn default() -> Self {
        Self {
            k: 8,
            min_similarity: 0.78,
            max_per_source: 3,
        }
    }
}

/// Greedily pick up to `k` matches (already sorted best first), skipping any
/// whose source has reached `max_per_source`
pub fn select_diverse(matches: &[SimilarityMatch], k: usize, max_per_source: usize) -> Vec<String> {
    let mut per_source: HashMap<&str, usize> = HashMap::new();
    let mut picked = Vec::new();

    for m in matches {
        if picked.len() >= k {
            break;
        }
        let count = per_source.entry(m.source_id.as_str()).or_insert(0);
        if *count >= max_per_source {
            continue;
        }
        *count += 1;
        picked.push(m.item_id.clone());
    }

    picked
}

/// Compute the related-items map for every embedded item
///
/// A candidate must share at least one tag with the subject and reach
/// `min_similarity`. Subjects without any qualifying neighbor are left out
/// of the map. Items without a non-empty embedding take no part.
pub fn find_neighbors(items: &[Item], config: &NeighborConfig) -> NeighborMap {
    let embedded: Vec<(&Item, &[f32], HashSet<&str>)> = items
        .iter()
        .filter_map(|item| {
            let embedding = item.embedding()?;
            let tags = item.tags.iter().map(String::as_str).collect();
            Some((item, embedding, tags))
        })
        .collect();

    debug!(
        "Finding neighbors: {} embedded of {} items, k={}, min_sim={}, max_per_source={}",
        embedded.len(),
        items.len(),
        config.k,
        config.min_similarity,
        config.max_per_source
    );

    let mut neighbors = NeighborMap::new();

    for (i, (subject, subject_emb, subject_tags)) in embedded.iter().enumerate() {
        let mut matches: Vec<SimilarityMatch> = embedded
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .filter(|(_, (_, _, tags))| !tags.is_disjoint(subject_tags))
            .filter_map(|(_, (candidate, emb, _))| {
                let score = cosine_similarity(subject_emb, emb);
                (score >= config.min_similarity).then(|| SimilarityMatch {
                    item_id: candidate.id.clone(),
                    source_id: candidate.source_id.clone(),
                    score,
                })
            })
            .collect();

        // Sort by score descending
        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let picked = select_diverse(&matches, config.k, config.max_per_source);
        if !picked.is_empty() {
            neighbors.insert(subject.id.clone(), picked);
        }
    }

    info!("Computed neighbors for {} items", neighbors.len());
    neighbors
}
