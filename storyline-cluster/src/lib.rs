//! Story clustering for the Storyline pipeline
//!
//! Two policies share one greedy single-pass algorithm:
//! - [`NearDuplicatePolicy`] groups coverage of the same event
//! - [`TopicPolicy`] groups related coverage, adding tag and domain bonuses
//!   and dropping undersized clusters
//!
//! [`curate_story_groups`] separately groups headlines into multi-source
//! story groups with one perspective per outlet.

pub mod builder;
pub mod config;
pub mod curate;
pub mod policy;

pub use builder::{Assignment, ClusterBuilder, ClusterState};
pub use config::{NearDuplicateConfig, TopicConfig, DEFAULT_STOP_TAGS};
pub use curate::{
    curate_story_groups, group_by_headline, headline_tokens, CurateConfig, Perspective,
    StanceTag, StoryGroup, StoryGroupSummary,
};
pub use policy::{
    base_score, Candidate, ClusterPolicy, MatchBasis, MatchScore, NearDuplicatePolicy,
    TopicPolicy,
};

use storyline_core::{Item, StoryCluster};

/// Cluster items sharing the same story, in the given order
pub fn cluster_near_duplicates(items: &[Item], config: &NearDuplicateConfig) -> Vec<StoryCluster> {
    let mut builder = ClusterBuilder::new(NearDuplicatePolicy::new(*config));
    builder.extend(items);
    builder.finish()
}

/// Cluster items by topic, in the given order
pub fn cluster_by_topic(items: &[Item], config: &TopicConfig) -> Vec<StoryCluster> {
    let mut builder = ClusterBuilder::new(TopicPolicy::new(config.clone()));
    builder.extend(items);
    builder.finish()
}
