//! SQLite storage for item embeddings using rusqlite
//!
//! Embeddings come from an external service; the store keeps them across
//! runs so items fetched earlier keep their vectors.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use indexmap::IndexMap;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, instrument, warn};

use storyline_core::Item;

use crate::{
    error::{EmbeddingError, Result},
    types::{EmbeddingVector, EmbeddingsFile, ItemEmbedding},
};

/// SQLite store for embeddings
pub struct EmbeddingStore {
    conn: Arc<Mutex<Connection>>,
}

impl EmbeddingStore {
    /// Create a new embedding store
    ///
    /// # Arguments
    /// * `database_path` - Path to SQLite database file
    #[instrument(skip(database_path))]
    pub fn new<P: AsRef<Path> + std::fmt::Debug>(database_path: P) -> Result<Self> {
        info!("Opening embedding database: {:?}", database_path.as_ref());
        if let Some(parent) = database_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(database_path.as_ref())?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        store.init_tables()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        store.init_tables()?;
        Ok(store)
    }

    /// Initialize database tables
    fn init_tables(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS item_embeddings (
                item_id TEXT PRIMARY KEY,
                model TEXT NOT NULL,
                dimension INTEGER NOT NULL,
                embedding BLOB NOT NULL,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        debug!("Embedding database tables initialized");
        Ok(())
    }

    /// Dimension of the vectors already stored, if any
    pub fn dimension(&self) -> Result<Option<usize>> {
        let conn = self.conn.lock();
        let dimension: Option<i64> = conn
            .query_row("SELECT dimension FROM item_embeddings LIMIT 1", [], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(dimension.map(|d| d as usize))
    }

    /// Save or update an item embedding
    ///
    /// Every stored vector must share one dimensionality.
    #[instrument(skip(self, embedding), fields(item_id = %embedding.item_id))]
    pub fn save_item_embedding(&self, embedding: &ItemEmbedding) -> Result<()> {
        if let Some(expected) = self.dimension()? {
            if expected != embedding.dimension {
                return Err(EmbeddingError::InvalidDimension {
                    expected,
                    actual: embedding.dimension,
                });
            }
        }

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO item_embeddings (item_id, model, dimension, embedding, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(item_id) DO UPDATE SET
                model = excluded.model,
                dimension = excluded.dimension,
                embedding = excluded.embedding,
                created_at = excluded.created_at",
            params![
                &embedding.item_id,
                &embedding.model,
                embedding.dimension as i64,
                encode_vector(&embedding.embedding),
                embedding.created_at.timestamp(),
            ],
        )?;

        Ok(())
    }

    /// Get a specific item embedding
    pub fn get_item_embedding(&self, item_id: &str) -> Result<ItemEmbedding> {
        let conn = self.conn.lock();

        let row = conn
            .query_row(
                "SELECT item_id, model, dimension, embedding, created_at
                 FROM item_embeddings WHERE item_id = ?1",
                params![item_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                },
            )
            .optional()?;

        let (item_id, model, dimension, blob, created_at) =
            row.ok_or_else(|| EmbeddingError::NotFound(item_id.to_string()))?;

        Ok(ItemEmbedding {
            embedding: decode_vector(&item_id, &blob)?,
            item_id,
            model,
            dimension: dimension as usize,
            created_at: chrono::DateTime::from_timestamp(created_at, 0).unwrap_or_else(Utc::now),
        })
    }

    /// Load every stored vector keyed by item id
    #[instrument(skip(self))]
    pub fn load_all(&self) -> Result<IndexMap<String, EmbeddingVector>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT item_id, embedding FROM item_embeddings ORDER BY item_id")?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
        })?;

        let mut vectors = IndexMap::new();
        for row in rows {
            let (item_id, blob) = row?;
            let vector = decode_vector(&item_id, &blob)?;
            vectors.insert(item_id, vector);
        }

        info!("Loaded {} item embeddings", vectors.len());
        Ok(vectors)
    }

    /// Import an embeddings file produced by the external embedding service
    ///
    /// Vectors whose dimension disagrees with the store are skipped.
    /// Returns how many vectors were stored.
    pub fn import_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let content = std::fs::read(path.as_ref())?;
        let file: EmbeddingsFile = serde_json::from_slice(&content)?;
        self.import(file)
    }

    /// Store every vector of an embeddings file
    pub fn import(&self, file: EmbeddingsFile) -> Result<usize> {
        let model = if file.model.is_empty() {
            crate::types::DEFAULT_MODEL.to_string()
        } else {
            file.model
        };

        let mut stored = 0;
        for (item_id, vector) in file.vectors {
            if vector.is_empty() {
                continue;
            }
            let embedding = ItemEmbedding::new(item_id, model.clone(), vector);
            match self.save_item_embedding(&embedding) {
                Ok(()) => stored += 1,
                Err(EmbeddingError::InvalidDimension { expected, actual }) => {
                    warn!(
                        "Skipping embedding for {}: dimension {} != {}",
                        embedding.item_id, actual, expected
                    );
                }
                Err(e) => return Err(e),
            }
        }

        info!("Imported {} embeddings (model {})", stored, model);
        Ok(stored)
    }
}

/// Set embeddings on items lacking one; returns how many items were updated
pub fn attach_embeddings(items: &mut [Item], vectors: &IndexMap<String, EmbeddingVector>) -> usize {
    let mut attached = 0;
    for item in items.iter_mut() {
        if item.embedding().is_some() {
            continue;
        }
        if let Some(vector) = vectors.get(&item.id).filter(|v| !v.is_empty()) {
            item.embedding = Some(vector.clone());
            attached += 1;
        }
    }
    debug!("Attached {} embeddings to {} items", attached, items.len());
    attached
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_vector(item_id: &str, blob: &[u8]) -> Result<EmbeddingVector> {
    if blob.len() % 4 != 0 {
        return Err(EmbeddingError::CorruptBlob(item_id.to_string()));
    }
    Ok(blob
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}
