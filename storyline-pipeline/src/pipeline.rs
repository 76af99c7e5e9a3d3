//! One batch run: read feeds, merge with the prior dataset, enrich, cluster
//! and write the outputs

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use tracing::{debug, info, warn};

use storyline_cluster::{
    cluster_by_topic, cluster_near_duplicates, curate_story_groups, StoryGroup, StoryGroupSummary,
};
use storyline_core::{Item, NeighborMap, StoryCluster};
use storyline_embedding::{attach_embeddings, find_neighbors, EmbeddingStore, EmbeddingVector};
use storyline_news::{
    default_topics, dedupe_by_canonical_url, dedupe_items, normalize_hn_hit, normalize_record,
    parse_feed_bytes, parse_hn_response, tag_items, top_tag_counts, NewsError, NormalizedItem,
};

use crate::audit::audit;
use crate::config::{load_manifest, ClusterMode, PipelineConfig, SourceEntry, SourceKind};
use crate::dataset::{
    load_prior_items, load_prior_story_groups, write_outputs, DatasetPaths, FeedFile,
};

/// Counts reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub prior_items: usize,
    pub fetched_items: usize,
    pub new_items: usize,
    pub items: usize,
    pub embedded: usize,
    pub neighbor_lists: usize,
    pub stories: usize,
    pub story_groups: usize,
}

/// Result of the in-memory stages
#[derive(Debug, Clone)]
pub struct Dataset {
    pub items: Vec<Item>,
    pub neighbors: NeighborMap,
    pub stories: Vec<StoryCluster>,
    pub story_groups: Vec<StoryGroup>,
    pub summary: RunSummary,
}

/// Run the whole pipeline against the configured data directory
pub async fn run(config: &PipelineConfig) -> anyhow::Result<RunSummary> {
    let paths = DatasetPaths::new(&config.data_dir);
    let started = Utc::now();

    let prior = match load_prior_items(&paths).await {
        Ok(items) => items,
        Err(e) => {
            warn!("Ignoring unreadable prior dataset: {:#}", e);
            Vec::new()
        }
    };

    let prior_groups = match load_prior_story_groups(&paths).await {
        Ok(groups) => groups,
        Err(e) => {
            warn!("Ignoring unreadable prior story groups: {:#}", e);
            Vec::new()
        }
    };

    let sources = load_manifest(&paths.sources()).await?;
    info!("Reading {} sources", sources.len());
    let fetched = read_sources(&paths, &sources).await;
    let source_names: HashMap<String, String> = sources
        .iter()
        .map(|s| (s.id.clone(), s.name.clone()))
        .collect();

    let embeddings = if config.skip_embed {
        info!("Skipping embeddings (SKIP_EMBED)");
        None
    } else {
        load_embeddings(&paths).await
    };

    let stage_config = config.clone();
    let mut dataset = tokio::task::spawn_blocking(move || {
        build_dataset(
            prior,
            fetched,
            embeddings.as_ref(),
            &source_names,
            &stage_config,
            started,
        )
    })
    .await?;

    let carried = carry_summaries(&mut dataset.story_groups, prior_groups);
    debug!("Carried {} story group summaries from the prior run", carried);

    let feed = FeedFile::new(dataset.items, dataset.stories, started);
    write_outputs(&paths, &feed, &dataset.neighbors, &dataset.story_groups).await?;
    audit(&feed).log();

    let summary = dataset.summary;
    info!(
        "Run complete in {}s - prior={}, fetched={}, new={}, items={}, embedded={}, neighbors={}, stories={}, groups={}",
        (Utc::now() - started).num_seconds(),
        summary.prior_items,
        summary.fetched_items,
        summary.new_items,
        summary.items,
        summary.embedded,
        summary.neighbor_lists,
        summary.stories,
        summary.story_groups
    );
    Ok(summary)
}

/// Read and normalize every source concurrently, keeping manifest order
pub async fn read_sources(paths: &DatasetPaths, sources: &[SourceEntry]) -> Vec<NormalizedItem> {
    let reads: Vec<_> = sources
        .iter()
        .map(|source| {
            let path = paths.resolve(&source.path);
            async move {
                let bytes = match tokio::fs::read(&path).await {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!("Skipping source {}: failed to read {}: {}", source.id, path.display(), e);
                        return Vec::new();
                    }
                };
                match normalize_source(source, &bytes) {
                    Ok(items) => {
                        debug!("Source {} ({}) yielded {} items", source.id, source.name, items.len());
                        items
                    }
                    Err(e) => {
                        warn!("Skipping source {}: {}", source.id, e);
                        Vec::new()
                    }
                }
            }
        })
        .collect();

    futures::future::join_all(reads)
        .await
        .into_iter()
        .flatten()
        .collect()
}

/// Parse one source's feed file and normalize its records
pub fn normalize_source(source: &SourceEntry, bytes: &[u8]) -> Result<Vec<NormalizedItem>, NewsError> {
    let items = match source.kind {
        SourceKind::Rss => parse_feed_bytes(bytes)?
            .iter()
            .filter_map(|record| {
                normalize_record(
                    record,
                    &source.id,
                    source.source_type,
                    source.homepage.as_deref(),
                )
            })
            .collect(),
        SourceKind::HnAlgolia => parse_hn_response(bytes)?
            .iter()
            .filter_map(normalize_hn_hit)
            .collect(),
    };
    Ok(items)
}

async fn load_embeddings(paths: &DatasetPaths) -> Option<IndexMap<String, EmbeddingVector>> {
    let db_path = paths.embeddings_db();
    let file_path = paths.embeddings_file();

    let loaded = tokio::task::spawn_blocking(move || -> storyline_embedding::Result<_> {
        let store = EmbeddingStore::new(&db_path)?;
        if file_path.exists() {
            store.import_file(&file_path)?;
        }
        store.load_all()
    })
    .await;

    match loaded {
        Ok(Ok(vectors)) => Some(vectors),
        Ok(Err(e)) => {
            warn!("Embeddings unavailable: {}", e);
            None
        }
        Err(e) => {
            warn!("Embedding task failed: {}", e);
            None
        }
    }
}

/// The synchronous stages of a run, from dedup through clustering
pub fn build_dataset(
    prior: Vec<Item>,
    fetched: Vec<NormalizedItem>,
    embeddings: Option<&IndexMap<String, EmbeddingVector>>,
    source_names: &HashMap<String, String>,
    config: &PipelineConfig,
    now: DateTime<Utc>,
) -> Dataset {
    let mut summary = RunSummary {
        prior_items: prior.len(),
        fetched_items: fetched.len(),
        ..Default::default()
    };

    // Items already published keep their earlier enrichment
    let known: HashSet<String> = prior.iter().map(|i| i.dedup_key().to_string()).collect();
    let fresh = dedupe_by_canonical_url(
        fetched
            .into_iter()
            .filter(|n| !known.contains(&n.canonical_url))
            .map(|n| (n.item, n.canonical_url)),
    );
    summary.new_items = fresh.len();
    info!("{} new items after dedup", fresh.len());

    let mut items = dedupe_items(prior.into_iter().chain(fresh));

    let cutoff = i64::try_from(config.since_days)
        .ok()
        .and_then(Duration::try_days)
        .and_then(|window| now.checked_sub_signed(window));
    if let Some(cutoff) = cutoff {
        items.retain(|item| item.published_at >= cutoff);
    }
    items.truncate(config.max_items);
    debug!("{} items inside the {}-day window", items.len(), config.since_days);

    let tag_counts = tag_items(&mut items, &default_topics());
    info!("Top tags: {:?}", top_tag_counts(&tag_counts, 8));

    let before = items.len();
    items.retain(|item| !is_blocked(item, &config.blocked_terms));
    if items.len() < before {
        info!("Dropped {} items matching blocked terms", before - items.len());
    }

    let neighbors = match embeddings {
        Some(vectors) => {
            attach_embeddings(&mut items, vectors);
            find_neighbors(&items, &config.neighbors)
        }
        None => NeighborMap::new(),
    };
    summary.embedded = items.iter().filter(|i| i.embedding().is_some()).count();
    summary.neighbor_lists = neighbors.len();

    let (stories, story_groups) = if config.skip_cluster {
        info!("Skipping clustering (SKIP_CLUSTER)");
        (Vec::new(), Vec::new())
    } else {
        let stories = match config.cluster_mode {
            ClusterMode::Topic => cluster_by_topic(&items, &config.topic),
            ClusterMode::NearDuplicate => cluster_near_duplicates(&items, &config.near_duplicate),
        };
        let groups = curate_story_groups(&items, source_names, &config.story_groups);
        (stories, groups)
    };
    summary.stories = stories.len();
    summary.story_groups = story_groups.len();
    summary.items = items.len();

    Dataset {
        items,
        neighbors,
        stories,
        story_groups,
        summary,
    }
}

/// Copy non-empty summaries from prior groups with the same id
///
/// Returns how many groups received one.
pub fn carry_summaries(groups: &mut [StoryGroup], prior: Vec<StoryGroup>) -> usize {
    let mut summaries: HashMap<String, StoryGroupSummary> = prior
        .into_iter()
        .map(|g| (g.id, g.summary.cleaned()))
        .filter(|(_, s)| *s != StoryGroupSummary::default())
        .collect();

    let mut carried = 0;
    for group in groups.iter_mut() {
        if let Some(summary) = summaries.remove(&group.id) {
            group.summary = summary;
            carried += 1;
        }
    }
    carried
}

fn is_blocked(item: &Item, terms: &[String]) -> bool {
    let hay = format!("{} {}", item.title, item.summary).to_lowercase();
    terms
        .iter()
        .filter(|t| !t.is_empty())
        .any(|t| hay.contains(&t.to_lowercase()))
}
