//! Dataset files read and written by the pipeline

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info};

use storyline_cluster::StoryGroup;
use storyline_core::{Item, NeighborMap, StoryCluster};

pub const DATASET_VERSION: &str = "0.1";

pub const FEED_FILE: &str = "feed.json";
pub const NEIGHBORS_FILE: &str = "neighbors.json";
pub const CLUSTERS_FILE: &str = "clusters.json";
pub const STORY_GROUPS_FILE: &str = "storyGroups.json";
pub const SOURCES_FILE: &str = "sources.json";
pub const EMBEDDINGS_FILE: &str = "embeddings.json";
pub const EMBEDDINGS_DB: &str = "embeddings.db";

/// The published feed: items newest first plus their story clusters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedFile {
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub items: Vec<Item>,
    #[serde(default)]
    pub stories: Vec<StoryCluster>,
}

impl FeedFile {
    pub fn new(items: Vec<Item>, stories: Vec<StoryCluster>, generated_at: DateTime<Utc>) -> Self {
        Self {
            version: DATASET_VERSION.to_string(),
            generated_at,
            items,
            stories,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NeighborsFile {
    pub neighbors: NeighborMap,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClustersFile {
    pub clusters: Vec<StoryCluster>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoryGroupsFile {
    #[serde(default)]
    pub groups: Vec<StoryGroup>,
}

/// Paths of every dataset file under one data directory
#[derive(Debug, Clone)]
pub struct DatasetPaths {
    pub root: PathBuf,
}

impl DatasetPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn feed(&self) -> PathBuf {
        self.root.join(FEED_FILE)
    }

    pub fn neighbors(&self) -> PathBuf {
        self.root.join(NEIGHBORS_FILE)
    }

    pub fn clusters(&self) -> PathBuf {
        self.root.join(CLUSTERS_FILE)
    }

    pub fn story_groups(&self) -> PathBuf {
        self.root.join(STORY_GROUPS_FILE)
    }

    pub fn sources(&self) -> PathBuf {
        self.root.join(SOURCES_FILE)
    }

    pub fn embeddings_file(&self) -> PathBuf {
        self.root.join(EMBEDDINGS_FILE)
    }

    pub fn embeddings_db(&self) -> PathBuf {
        self.root.join(EMBEDDINGS_DB)
    }

    /// Resolve a manifest path against the data directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// Read a JSON file, returning `None` when it does not exist
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Option<T>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };
    let value = serde_json::from_slice(&bytes)
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(value))
}

/// Write JSON through a sibling `.tmp` file renamed into place
pub async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }

    let json = serde_json::to_vec_pretty(value)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, &json)
        .await
        .with_context(|| format!("writing {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("renaming {} into place", tmp.display()))?;

    debug!("Wrote {} ({} bytes)", path.display(), json.len());
    Ok(())
}

/// Load items from the previous run's feed, if any
pub async fn load_prior_items(paths: &DatasetPaths) -> anyhow::Result<Vec<Item>> {
    let feed: Option<FeedFile> = read_json(&paths.feed()).await?;
    let items = feed.map(|f| f.items).unwrap_or_default();
    info!("Loaded {} items from prior dataset", items.len());
    Ok(items)
}

/// Load story groups from the previous run, if any
pub async fn load_prior_story_groups(paths: &DatasetPaths) -> anyhow::Result<Vec<StoryGroup>> {
    let file: Option<StoryGroupsFile> = read_json(&paths.story_groups()).await?;
    Ok(file.map(|f| f.groups).unwrap_or_default())
}

/// Write every output file of a run
pub async fn write_outputs(
    paths: &DatasetPaths,
    feed: &FeedFile,
    neighbors: &NeighborMap,
    groups: &[StoryGroup],
) -> anyhow::Result<()> {
    write_json_atomic(&paths.feed(), feed).await?;
    write_json_atomic(
        &paths.neighbors(),
        &NeighborsFile {
            neighbors: neighbors.clone(),
        },
    )
    .await?;
    write_json_atomic(
        &paths.clusters(),
        &ClustersFile {
            clusters: feed.stories.clone(),
        },
    )
    .await?;
    write_json_atomic(
        &paths.story_groups(),
        &StoryGroupsFile {
            groups: groups.to_vec(),
        },
    )
    .await?;

    info!(
        "Wrote dataset to {} ({} items, {} stories, {} story groups, {} neighbor lists)",
        paths.root.display(),
        feed.items.len(),
        feed.stories.len(),
        groups.len(),
        neighbors.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyline_core::SourceType;

    #[tokio::test]
    async fn test_write_then_read_feed() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DatasetPaths::new(dir.path().join("out"));

        let mut item = Item::new(
            "abc",
            "verge",
            SourceType::Editorial,
            "Title",
            "https://example.com/a",
            Utc::now(),
        )
        .unwrap();
        item.tags = vec!["ai".to_string()];
        let feed = FeedFile::new(vec![item], Vec::new(), Utc::now());

        let mut neighbors = NeighborMap::new();
        neighbors.insert("abc".to_string(), vec!["def".to_string()]);
        write_outputs(&paths, &feed, &neighbors, &[]).await.unwrap();

        let prior = load_prior_items(&paths).await.unwrap();
        assert_eq!(prior.len(), 1);
        assert_eq!(prior[0].tags, vec!["ai".to_string()]);

        let raw: serde_json::Value = read_json(&paths.feed()).await.unwrap().unwrap();
        assert_eq!(raw["version"], "0.1");
        assert!(raw["generatedAt"].is_string());

        let written: NeighborsFile = read_json(&paths.neighbors()).await.unwrap().unwrap();
        assert_eq!(written.neighbors["abc"], vec!["def".to_string()]);

        let clusters: ClustersFile = read_json(&paths.clusters()).await.unwrap().unwrap();
        assert!(clusters.clusters.is_empty());
        assert!(load_prior_story_groups(&paths).await.unwrap().is_empty());
        assert!(dir.path().join("out/storyGroups.json").exists());
        assert!(!dir.path().join("out/feed.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_missing_prior_dataset_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DatasetPaths::new(dir.path());
        assert!(load_prior_items(&paths).await.unwrap().is_empty());
        assert!(load_prior_story_groups(&paths).await.unwrap().is_empty());
    }

    #[test]
    fn test_resolve_relative_paths() {
        let paths = DatasetPaths::new("/srv/data");
        assert_eq!(
            paths.resolve(Path::new("feeds/a.xml")),
            PathBuf::from("/srv/data/feeds/a.xml")
        );
        assert_eq!(paths.resolve(Path::new("/tmp/b.xml")), PathBuf::from("/tmp/b.xml"));
    }
}
