//! Feed ingestion for the Storyline pipeline
//!
//! This crate turns raw feed payloads into canonical items:
//! - Canonical URLs and stable identities
//! - RSS/Atom records and Hacker News hits normalized into `Item`s
//! - Deduplication by canonical URL, newest first
//! - Keyword topic tagging

pub mod canonical;
pub mod dedup;
pub mod error;
pub mod hn;
pub mod normalize;
pub mod record;
pub mod tagging;

pub use canonical::{canonicalize, domain_from_url, stable_id};
pub use dedup::{dedupe_by_canonical_url, dedupe_items};
pub use error::NewsError;
pub use hn::{normalize_hn_hit, parse_hn_response, HnAlgoliaHit, HN_SOURCE_ID};
pub use normalize::{normalize_record, strip_html, NormalizedItem};
pub use record::{parse_feed_bytes, RawFeedRecord};
pub use tagging::{default_topics, tag_items, top_tag_counts, Topic};
