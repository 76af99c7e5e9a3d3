//! Similarity engine for the Storyline pipeline
//!
//! ## Features
//! - Title tokenization and Jaccard set similarity
//! - Cosine similarity and running-centroid updates for embeddings
//! - Related-item neighbor search with per-source diversity caps
//! - SQLite storage for embeddings produced by the external embedding service

pub mod error;
pub mod neighbors;
pub mod similarity;
pub mod store;
pub mod text;
pub mod types;

pub use error::{EmbeddingError, Result};
pub use neighbors::{find_neighbors, select_diverse, NeighborConfig};
pub use similarity::{cosine_similarity, running_average_embedding};
pub use store::{attach_embeddings, EmbeddingStore};
pub use text::{jaccard, tokenize_title, STOPWORDS};
pub use types::{EmbeddingVector, EmbeddingsFile, ItemEmbedding, SimilarityMatch};
