//! pgvector store integration.
//!
//! Each collection is a PostgreSQL table (`rag_<collection>`) holding
//! `(id, text, metadata, embedding)` records indexed by the pgvector
//! extension. The persisted format is owned by the database; this module only
//! reads and writes through SQL.

use crate::document::{EmbeddedChunk, SearchHit};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

const POOL_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors raised while persisting chunks.
#[derive(Debug, Error)]
pub enum StoreWriteError {
    /// Collection table could not be created.
    #[error("Failed to prepare collection '{collection}': {source}")]
    Prepare {
        /// Collection being prepared.
        collection: String,
        /// Underlying database error.
        #[source]
        source: sqlx::Error,
    },
    /// Batch upsert failed; partial writes follow the store's own guarantees.
    #[error("Failed to write chunks to collection '{collection}': {source}")]
    Write {
        /// Collection being written.
        collection: String,
        /// Underlying database error.
        #[source]
        source: sqlx::Error,
    },
}

/// Errors raised while querying the store.
#[derive(Debug, Error)]
pub enum StoreQueryError {
    /// The database could not be reached.
    #[error("Vector store is unreachable: {0}")]
    Unreachable(#[source] sqlx::Error),
    /// The collection table is absent from the database.
    #[error("Collection '{0}' does not exist; run the ingestion command first")]
    MissingCollection(String),
    /// The similarity search itself failed.
    #[error("Similarity search against '{collection}' failed: {source}")]
    Query {
        /// Collection being searched.
        collection: String,
        /// Underlying database error.
        #[source]
        source: sqlx::Error,
    },
}

/// Interface to the vector collection shared by both pipelines.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection if it is missing, sized for the given dimension.
    async fn ensure_collection(&self, dimension: usize) -> Result<(), StoreWriteError>;

    /// Upsert a batch of embedded chunks; records sharing an id are overwritten.
    async fn upsert(&self, chunks: &[EmbeddedChunk]) -> Result<(), StoreWriteError>;

    /// Return up to `limit` stored records nearest to `embedding`,
    /// ordered by non-increasing relevance score.
    async fn search(
        &self,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchHit>, StoreQueryError>;

    /// Readiness probe: the store is reachable and the collection exists.
    async fn health(&self) -> Result<(), StoreQueryError>;
}

/// A [`VectorStore`] backed by PostgreSQL with the pgvector extension.
pub struct PgVectorStore {
    pool: PgPool,
    collection: String,
    table_name: String,
}

impl PgVectorStore {
    /// Connect to the database and bind the store to one collection.
    pub async fn connect(database_url: &str, collection: &str) -> Result<Self, StoreQueryError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(POOL_ACQUIRE_TIMEOUT)
            .connect(database_url)
            .await
            .map_err(StoreQueryError::Unreachable)?;

        tracing::debug!(collection, "Connected to pgvector store");

        Ok(Self {
            pool,
            collection: collection.to_string(),
            table_name: table_name(collection),
        })
    }

    fn vector_literal(embedding: &[f32]) -> String {
        // pgvector expects the vector as a string like '[1.0,2.0,3.0]'.
        format!(
            "[{}]",
            embedding
                .iter()
                .map(|value| value.to_string())
                .collect::<Vec<_>>()
                .join(",")
        )
    }
}

/// Sanitize a collection name into a table name.
///
/// Only alphanumeric characters and underscores survive; everything else
/// becomes an underscore.
fn table_name(collection: &str) -> String {
    let sanitized: String = collection
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if sanitized.is_empty() {
        "rag_default".to_string()
    } else {
        format!("rag_{sanitized}")
    }
}

fn metadata_from_value(value: Value) -> BTreeMap<String, Value> {
    match value {
        Value::Object(map) => map.into_iter().collect(),
        _ => BTreeMap::new(),
    }
}

#[async_trait]
impl VectorStore for PgVectorStore {
    async fn ensure_collection(&self, dimension: usize) -> Result<(), StoreWriteError> {
        let prepare = |source| StoreWriteError::Prepare {
            collection: self.collection.clone(),
            source,
        };

        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await
            .map_err(prepare)?;

        let create_sql = format!(
            "CREATE TABLE IF NOT EXISTS {table} (\
                id TEXT PRIMARY KEY, \
                text TEXT NOT NULL, \
                metadata JSONB NOT NULL DEFAULT '{{}}'::jsonb, \
                embedding vector({dimension})\
            )",
            table = self.table_name,
        );
        sqlx::query(&create_sql)
            .execute(&self.pool)
            .await
            .map_err(prepare)?;

        tracing::debug!(
            collection = %self.collection,
            table = %self.table_name,
            dimension,
            "Collection ensured"
        );
        Ok(())
    }

    async fn upsert(&self, chunks: &[EmbeddedChunk]) -> Result<(), StoreWriteError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let upsert_sql = format!(
            "INSERT INTO {table} (id, text, metadata, embedding) \
             VALUES ($1, $2, $3::jsonb, $4::vector) \
             ON CONFLICT (id) DO UPDATE SET \
                text = EXCLUDED.text, \
                metadata = EXCLUDED.metadata, \
                embedding = EXCLUDED.embedding",
            table = self.table_name,
        );

        for record in chunks {
            let metadata_json = serde_json::to_string(&record.chunk.metadata)
                .unwrap_or_else(|_| "{}".to_string());
            sqlx::query(&upsert_sql)
                .bind(&record.chunk.id)
                .bind(&record.chunk.text)
                .bind(&metadata_json)
                .bind(Self::vector_literal(&record.embedding))
                .execute(&self.pool)
                .await
                .map_err(|source| StoreWriteError::Write {
                    collection: self.collection.clone(),
                    source,
                })?;
        }

        tracing::debug!(
            collection = %self.collection,
            chunks = chunks.len(),
            "Chunks upserted"
        );
        Ok(())
    }

    async fn search(
        &self,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchHit>, StoreQueryError> {
        // Cosine distance operator `<=>` returns 0 for identical vectors,
        // so score = 1 - distance keeps the non-increasing ordering.
        let search_sql = format!(
            "SELECT id, text, metadata, \
                    1 - (embedding <=> $1::vector) AS score \
             FROM {table} \
             ORDER BY embedding <=> $1::vector \
             LIMIT $2",
            table = self.table_name,
        );

        let rows = sqlx::query(&search_sql)
            .bind(Self::vector_literal(embedding))
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|source| StoreQueryError::Query {
                collection: self.collection.clone(),
                source,
            })?;

        let hits = rows
            .iter()
            .map(|row| {
                let score: f64 = row.get("score");
                SearchHit {
                    id: row.get("id"),
                    text: row.get("text"),
                    metadata: metadata_from_value(row.get("metadata")),
                    score: score as f32,
                }
            })
            .collect();

        Ok(hits)
    }

    async fn health(&self) -> Result<(), StoreQueryError> {
        let row = sqlx::query("SELECT to_regclass($1)::text")
            .bind(&self.table_name)
            .fetch_one(&self.pool)
            .await
            .map_err(StoreQueryError::Unreachable)?;

        let table: Option<String> = row.get(0);
        if table.is_none() {
            return Err(StoreQueryError::MissingCollection(self.collection.clone()));
        }
        Ok(())
    }
}
