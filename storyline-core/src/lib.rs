//! Core types for the Storyline news pipeline
//!
//! This crate defines the shared data structures used across the pipeline:
//! normalized items, story clusters with their source-type lenses, and the
//! related-items neighbor map.

pub mod error;
pub mod item;
pub mod story;

pub use error::{StorylineError, StorylineResult};
pub use item::{HnSignals, Item, ItemSignals, SourceType};
pub use story::{Lenses, NeighborMap, StoryCluster, Verification};
