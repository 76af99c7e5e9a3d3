//! Pipeline configuration
//!
//! Every knob is read from the environment. Malformed values fall back to
//! their defaults with a warning; they never abort a run.

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use storyline_cluster::{CurateConfig, NearDuplicateConfig, TopicConfig, DEFAULT_STOP_TAGS};
use storyline_core::SourceType;
use storyline_embedding::NeighborConfig;

/// Which clustering policy the pipeline runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterMode {
    Topic,
    NearDuplicate,
}

impl ClusterMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "topic" => Some(Self::Topic),
            "near_duplicate" | "near-duplicate" | "neardup" => Some(Self::NearDuplicate),
            _ => None,
        }
    }
}

/// Configuration for one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory holding the source manifest, feed files and outputs
    pub data_dir: PathBuf,
    /// Maximum items kept after the recency window
    pub max_items: usize,
    /// Items older than this many days are dropped
    pub since_days: usize,
    /// Items whose title or summary contain any of these are dropped
    pub blocked_terms: Vec<String>,
    /// Skip embedding attachment and neighbor search
    pub skip_embed: bool,
    /// Skip clustering
    pub skip_cluster: bool,
    pub cluster_mode: ClusterMode,
    pub topic: TopicConfig,
    pub near_duplicate: NearDuplicateConfig,
    pub neighbors: NeighborConfig,
    pub story_groups: CurateConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            max_items: 4000,
            since_days: 7,
            blocked_terms: ["deal", "discount", "coupon", "sale"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
            skip_embed: false,
            skip_cluster: false,
            cluster_mode: ClusterMode::Topic,
            // Tighter than the library defaults to keep generic stories apart
            topic: TopicConfig {
                token_threshold: 0.22,
                min_tag_overlap: 2,
                ..TopicConfig::default()
            },
            near_duplicate: NearDuplicateConfig::default(),
            neighbors: NeighborConfig::default(),
            // Looser than the library defaults so outlets phrasing one event
            // differently still meet
            story_groups: CurateConfig {
                threshold: 0.25,
                max_perspectives: 10,
                ..CurateConfig::default()
            },
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables
    ///
    /// Reads:
    /// - STORYLINE_DATA_DIR, DATASET_MAX_ITEMS, DATASET_SINCE_DAYS, DATASET_BLOCKED_TERMS
    /// - SKIP_EMBED, SKIP_CLUSTER
    /// - CLUSTER_MODE, CLUSTER_TOKEN_THRESHOLD, CLUSTER_EMBED_THRESHOLD,
    ///   CLUSTER_TAG_WEIGHT, CLUSTER_DOMAIN_BONUS, CLUSTER_MIN_TAG_OVERLAP,
    ///   CLUSTER_MIN_SIZE, CLUSTER_STOP_TAGS
    /// - NEARDUP_TOKEN_THRESHOLD, NEARDUP_EMBED_THRESHOLD
    /// - NEIGHBOR_K, NEIGHBOR_MIN_SIM, NEIGHBOR_MAX_PER_SOURCE
    /// - STORY_GROUP_THRESHOLD, STORY_GROUP_MIN_PERSPECTIVES,
    ///   STORY_GROUP_MIN_SOURCES, STORY_GROUP_MAX_PERSPECTIVES
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };
        let defaults = Self::default();

        let cluster_mode = match vars.get("CLUSTER_MODE") {
            Some(raw) => ClusterMode::parse(&raw).unwrap_or_else(|| {
                warn!("Ignoring CLUSTER_MODE={:?}, using {:?}", raw, defaults.cluster_mode);
                defaults.cluster_mode
            }),
            None => defaults.cluster_mode,
        };

        let default_stop_tags: Vec<String> =
            DEFAULT_STOP_TAGS.iter().map(|t| t.to_string()).collect();

        Self {
            data_dir: vars
                .get("STORYLINE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            max_items: vars.int("DATASET_MAX_ITEMS", defaults.max_items),
            since_days: vars.int("DATASET_SINCE_DAYS", defaults.since_days),
            blocked_terms: vars.csv("DATASET_BLOCKED_TERMS", defaults.blocked_terms),
            skip_embed: vars.bool("SKIP_EMBED", defaults.skip_embed),
            skip_cluster: vars.bool("SKIP_CLUSTER", defaults.skip_cluster),
            cluster_mode,
            topic: TopicConfig {
                token_threshold: vars
                    .float("CLUSTER_TOKEN_THRESHOLD", defaults.topic.token_threshold),
                embedding_threshold: vars
                    .float("CLUSTER_EMBED_THRESHOLD", defaults.topic.embedding_threshold),
                min_size: vars.int("CLUSTER_MIN_SIZE", defaults.topic.min_size),
                tag_weight: vars.float("CLUSTER_TAG_WEIGHT", defaults.topic.tag_weight),
                domain_bonus: vars.float("CLUSTER_DOMAIN_BONUS", defaults.topic.domain_bonus),
                min_tag_overlap: vars
                    .int("CLUSTER_MIN_TAG_OVERLAP", defaults.topic.min_tag_overlap),
                stop_tags: vars.csv("CLUSTER_STOP_TAGS", default_stop_tags),
            },
            near_duplicate: NearDuplicateConfig {
                token_threshold: vars.float(
                    "NEARDUP_TOKEN_THRESHOLD",
                    defaults.near_duplicate.token_threshold,
                ),
                embedding_threshold: vars.float(
                    "NEARDUP_EMBED_THRESHOLD",
                    defaults.near_duplicate.embedding_threshold,
                ),
            },
            neighbors: NeighborConfig {
                k: vars.int("NEIGHBOR_K", defaults.neighbors.k),
                min_similarity: vars.float("NEIGHBOR_MIN_SIM", defaults.neighbors.min_similarity),
                max_per_source: vars
                    .int("NEIGHBOR_MAX_PER_SOURCE", defaults.neighbors.max_per_source),
            },
            story_groups: CurateConfig {
                threshold: vars.float("STORY_GROUP_THRESHOLD", defaults.story_groups.threshold),
                min_perspectives: vars.int(
                    "STORY_GROUP_MIN_PERSPECTIVES",
                    defaults.story_groups.min_perspectives,
                ),
                min_sources: vars
                    .int("STORY_GROUP_MIN_SOURCES", defaults.story_groups.min_sources),
                max_perspectives: vars.int(
                    "STORY_GROUP_MAX_PERSPECTIVES",
                    defaults.story_groups.max_perspectives,
                ),
            },
        }
    }
}

struct Vars<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    fn int(&self, key: &str, default: usize) -> usize {
        let Some(raw) = self.get(key) else {
            return default;
        };
        match raw.trim().parse::<usize>() {
            Ok(value) if value > 0 => value,
            _ => {
                warn!("Ignoring {}={:?}, expected a positive integer", key, raw);
                default
            }
        }
    }

    fn float(&self, key: &str, default: f64) -> f64 {
        let Some(raw) = self.get(key) else {
            return default;
        };
        match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => value,
            _ => {
                warn!("Ignoring {}={:?}, expected a number", key, raw);
                default
            }
        }
    }

    fn bool(&self, key: &str, default: bool) -> bool {
        let Some(raw) = self.get(key) else {
            return default;
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "y" | "on" => true,
            "0" | "false" | "no" | "n" | "off" => false,
            _ => {
                warn!("Ignoring {}={:?}, expected a boolean", key, raw);
                default
            }
        }
    }

    fn csv(&self, key: &str, default: Vec<String>) -> Vec<String> {
        match self.get(key) {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
            None => default,
        }
    }
}

/// How a source's feed file is parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// RSS 2.0 or Atom document
    Rss,
    /// Hacker News Algolia search response
    HnAlgolia,
}

/// One entry of the source manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Stable source identifier
    pub id: String,
    /// Human-readable source name
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub kind: SourceKind,
    /// Feed file path, relative to the data directory unless absolute
    pub path: PathBuf,
    /// Fallback link for records carrying neither link nor guid
    #[serde(default)]
    pub homepage: Option<String>,
}

/// Load the source manifest (`sources.json`)
///
/// A missing manifest means there are no sources to read.
pub async fn load_manifest(path: &Path) -> Result<Vec<SourceEntry>, ConfigError> {
    let content = match tokio::fs::read(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("No source manifest at {}", path.display());
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(ConfigError::Io {
                path: path.display().to_string(),
                error: e.to_string(),
            })
        }
    };

    serde_json::from_slice(&content).map_err(|e| ConfigError::InvalidJson {
        field: path.display().to_string(),
        error: e.to_string(),
    })
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid JSON in {field}: {error}")]
    InvalidJson { field: String, error: String },

    #[error("Failed to read {path}: {error}")]
    Io { path: String, error: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> PipelineConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PipelineConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.max_items, 4000);
        assert_eq!(config.since_days, 7);
        assert_eq!(config.cluster_mode, ClusterMode::Topic);
        assert_eq!(config.topic.token_threshold, 0.22);
        assert_eq!(config.topic.min_tag_overlap, 2);
        assert_eq!(config.topic.stop_tags.len(), 5);
        assert_eq!(config.near_duplicate.token_threshold, 0.5);
        assert_eq!(config.neighbors.k, 8);
        assert_eq!(config.story_groups.threshold, 0.25);
        assert_eq!(config.story_groups.min_sources, 2);
        assert_eq!(config.story_groups.max_perspectives, 10);
        assert!(!config.skip_embed);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("CLUSTER_MODE", "near_duplicate"),
            ("CLUSTER_TAG_WEIGHT", "0.5"),
            ("CLUSTER_STOP_TAGS", " ai, ,web "),
            ("NEIGHBOR_K", "3"),
            ("SKIP_EMBED", "Yes"),
            ("DATASET_BLOCKED_TERMS", "promo"),
            ("STORY_GROUP_THRESHOLD", "0.4"),
            ("STORY_GROUP_MAX_PERSPECTIVES", "4"),
        ]);
        assert_eq!(config.cluster_mode, ClusterMode::NearDuplicate);
        assert_eq!(config.topic.tag_weight, 0.5);
        assert_eq!(config.topic.stop_tags, vec!["ai".to_string(), "web".to_string()]);
        assert_eq!(config.neighbors.k, 3);
        assert!(config.skip_embed);
        assert_eq!(config.blocked_terms, vec!["promo".to_string()]);
        assert_eq!(config.story_groups.threshold, 0.4);
        assert_eq!(config.story_groups.max_perspectives, 4);
        assert_eq!(config.story_groups.min_perspectives, 2);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config_from(&[
            ("CLUSTER_MODE", "fuzzy"),
            ("NEIGHBOR_K", "-4"),
            ("DATASET_MAX_ITEMS", "0"),
            ("NEIGHBOR_MIN_SIM", "NaN"),
            ("CLUSTER_EMBED_THRESHOLD", "inf"),
            ("SKIP_CLUSTER", "maybe"),
        ]);
        assert_eq!(config.cluster_mode, ClusterMode::Topic);
        assert_eq!(config.neighbors.k, 8);
        assert_eq!(config.max_items, 4000);
        assert_eq!(config.neighbors.min_similarity, 0.78);
        assert_eq!(config.topic.embedding_threshold, 0.78);
        assert!(!config.skip_cluster);
    }

    #[test]
    fn test_parse_manifest() {
        let json = r#"
        [
            {"id": "verge", "name": "The Verge", "type": "editorial", "kind": "rss", "path": "feeds/verge.xml"},
            {"id": "hackernews", "name": "Hacker News", "type": "community", "kind": "hn_algolia",
             "path": "feeds/hn.json", "homepage": "https://news.ycombinator.com"}
        ]
        "#;
        let sources: Vec<SourceEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].source_type, SourceType::Editorial);
        assert_eq!(sources[0].kind, SourceKind::Rss);
        assert_eq!(sources[1].kind, SourceKind::HnAlgolia);
        assert_eq!(sources[1].homepage.as_deref(), Some("https://news.ycombinator.com"));
    }

    #[tokio::test]
    async fn test_missing_manifest_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let sources = load_manifest(&dir.path().join("sources.json")).await.unwrap();
        assert!(sources.is_empty());

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{not json").unwrap();
        assert!(matches!(
            load_manifest(&bad).await,
            Err(ConfigError::InvalidJson { .. })
        ));
    }
}
