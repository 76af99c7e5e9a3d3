//! Core types for embeddings

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Embedding vector (1536 dimensions for text-embedding-3-small)
pub type EmbeddingVector = Vec<f32>;

/// Default embedding model name recorded alongside stored vectors
pub const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// Item embedding with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemEmbedding {
    /// Item identifier
    pub item_id: String,
    /// The embedding vector
    pub embedding: EmbeddingVector,
    /// Embedding dimension
    pub dimension: usize,
    /// Model that produced the vector
    pub model: String,
    /// When this embedding was stored
    pub created_at: DateTime<Utc>,
}

impl ItemEmbedding {
    pub fn new(item_id: String, model: String, embedding: EmbeddingVector) -> Self {
        Self {
            item_id,
            dimension: embedding.len(),
            embedding,
            model,
            created_at: Utc::now(),
        }
    }
}

/// Output of the external embedding service: `{model, vectors: {id: [f32]}}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddingsFile {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub vectors: IndexMap<String, EmbeddingVector>,
}

/// Similarity match result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatch {
    /// Matched item id
    pub item_id: String,
    /// Source of the matched item
    pub source_id: String,
    /// Cosine similarity score
    pub score: f64,
}
