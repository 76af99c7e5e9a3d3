//! Storyline dataset builder
//!
//! Batch job that turns source feed files into the published feed, the
//! related-items map, the story clusters and the curated story groups.

mod audit;
mod config;
mod dataset;
mod pipeline;

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::PipelineConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local file
    if let Err(e) = dotenvy::from_filename(".env.local") {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,storyline_pipeline=debug")),
        )
        .init();

    let config = PipelineConfig::from_env();
    info!(
        "Starting Storyline pipeline (data_dir={}, mode={:?}, max_items={}, since_days={})",
        config.data_dir.display(),
        config.cluster_mode,
        config.max_items,
        config.since_days
    );

    let summary = pipeline::run(&config).await?;
    info!(
        "Dataset ready: {} items, {} stories, {} story groups",
        summary.items, summary.stories, summary.story_groups
    );

    Ok(())
}
