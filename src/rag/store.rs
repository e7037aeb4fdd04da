//! Sqlite-backed vector index over product descriptions.
//!
//! Embeddings are stored as little-endian f32 blobs next to the product
//! metadata and searched by brute-force cosine similarity. Scores are
//! similarities: higher means closer, 1.0 is identical direction.
//!
//! A build writes all rows plus a completion marker in one transaction, so
//! a crashed build is never loadable and `initialize` falls back to a fresh
//! build instead of serving a half-written index.

use std::cmp::Ordering;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use crate::catalog::ProductDocument;
use crate::errors::ApiError;
use crate::llm::LlmProvider;

/// One retrieved product with its cosine similarity to the query.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub document: ProductDocument,
    pub score: f32,
}

/// Persisted embedding index. Built once from the full catalog, loaded on
/// later startups, read-only afterwards.
pub struct VectorStore {
    db_path: PathBuf,
    provider: Arc<dyn LlmProvider>,
    embedding_model: String,
    pool: Option<SqlitePool>,
}

impl VectorStore {
    pub fn new(db_path: PathBuf, provider: Arc<dyn LlmProvider>, embedding_model: String) -> Self {
        Self {
            db_path,
            provider,
            embedding_model,
            pool: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.pool.is_some()
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// Idempotent bootstrap: load the persisted index when one exists,
    /// build (and persist) otherwise. `force_recreate` always rebuilds.
    /// Loading performs no embedding calls.
    pub async fn initialize(
        &mut self,
        documents: &[ProductDocument],
        force_recreate: bool,
    ) -> Result<(), ApiError> {
        if force_recreate || !self.db_path.exists() {
            return self.build(documents).await;
        }

        match self.load().await {
            Ok(()) => Ok(()),
            Err(ApiError::IndexNotFound(reason)) => {
                tracing::warn!("persisted index unusable ({}), rebuilding", reason);
                self.build(documents).await
            }
            Err(err) => Err(err),
        }
    }

    /// Embed every document and persist a fresh index, replacing any
    /// previous one. All rows and the completion marker commit together.
    pub async fn build(&mut self, documents: &[ProductDocument]) -> Result<(), ApiError> {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
        }
        self.remove_persisted()?;

        let inputs: Vec<String> = documents.iter().map(|doc| doc.content.clone()).collect();
        let embeddings = self
            .provider
            .embed(&inputs, &self.embedding_model)
            .await?;
        if embeddings.len() != documents.len() {
            return Err(ApiError::embedding(format!(
                "embedded {} of {} documents",
                embeddings.len(),
                documents.len()
            )));
        }

        let pool = Self::connect(&self.db_path, true).await.map_err(ApiError::internal)?;
        Self::init_schema(&pool).await?;

        let mut tx = pool.begin().await.map_err(ApiError::internal)?;
        for (doc, embedding) in documents.iter().zip(embeddings.iter()) {
            let metadata = serde_json::to_string(&doc.metadata).map_err(ApiError::internal)?;
            sqlx::query("INSERT INTO products (content, metadata, embedding) VALUES (?1, ?2, ?3)")
                .bind(&doc.content)
                .bind(&metadata)
                .bind(serialize_embedding(embedding))
                .execute(&mut *tx)
                .await
                .map_err(ApiError::internal)?;
        }
        for (key, value) in [
            ("embedding_model", self.embedding_model.clone()),
            ("document_count", documents.len().to_string()),
            ("built_at", Utc::now().to_rfc3339()),
        ] {
            sqlx::query("INSERT OR REPLACE INTO index_meta (key, value) VALUES (?1, ?2)")
                .bind(key)
                .bind(&value)
                .execute(&mut *tx)
                .await
                .map_err(ApiError::internal)?;
        }
        tx.commit().await.map_err(ApiError::internal)?;

        tracing::info!(
            documents = documents.len(),
            path = %self.db_path.display(),
            "vector index built and persisted"
        );

        self.pool = Some(pool);
        Ok(())
    }

    /// Open a previously persisted index without re-embedding anything.
    ///
    /// Fails with `IndexNotFound` when nothing usable is persisted: no file,
    /// a file without the completion marker (crashed build), or an index
    /// built with a different embedding model, whose vectors would be
    /// incomparable with query-time embeddings.
    pub async fn load(&mut self) -> Result<(), ApiError> {
        if !self.db_path.exists() {
            return Err(ApiError::IndexNotFound(self.db_path.display().to_string()));
        }

        let pool = match Self::connect(&self.db_path, false).await {
            Ok(pool) => pool,
            Err(err) => {
                return Err(ApiError::IndexNotFound(format!(
                    "{}: {}",
                    self.db_path.display(),
                    err
                )))
            }
        };

        let built_at = Self::meta_value(&pool, "built_at").await;
        let model = Self::meta_value(&pool, "embedding_model").await;

        match (built_at, model) {
            (Some(_), Some(model)) if model == self.embedding_model => {
                self.pool = Some(pool);
                Ok(())
            }
            (Some(_), Some(model)) => {
                pool.close().await;
                Err(ApiError::IndexNotFound(format!(
                    "index was built with embedding model {} (configured: {})",
                    model, self.embedding_model
                )))
            }
            _ => {
                pool.close().await;
                Err(ApiError::IndexNotFound(format!(
                    "{}: no completed build",
                    self.db_path.display()
                )))
            }
        }
    }

    async fn meta_value(pool: &SqlitePool, key: &str) -> Option<String> {
        sqlx::query_scalar("SELECT value FROM index_meta WHERE key = ?1")
            .bind(key)
            .fetch_optional(pool)
            .await
            .ok()
            .flatten()
    }

    /// Embed the query with the same model used at build time and return the
    /// k nearest documents, best first.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<SearchResult>, ApiError> {
        let pool = self.pool.as_ref().ok_or(ApiError::NotInitialized)?;

        let embeddings = self
            .provider
            .embed(&[text.to_string()], &self.embedding_model)
            .await?;
        let query_embedding = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::embedding("no embedding returned for query"))?;

        let rows = sqlx::query("SELECT content, metadata, embedding FROM products")
            .fetch_all(pool)
            .await
            .map_err(ApiError::internal)?;

        let mut scored: Vec<SearchResult> = rows
            .iter()
            .filter_map(|row| {
                let content: String = row.get(0);
                let metadata_str: String = row.get(1);
                let blob: Vec<u8> = row.get(2);

                let metadata = serde_json::from_str(&metadata_str).ok()?;
                let embedding = deserialize_embedding(&blob);
                let score = cosine_similarity(&query_embedding, &embedding);

                Some(SearchResult {
                    document: ProductDocument { content, metadata },
                    score,
                })
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        Ok(scored)
    }

    /// Number of indexed documents; 0 when nothing is built or loaded yet.
    pub async fn count(&self) -> Result<usize, ApiError> {
        let Some(pool) = self.pool.as_ref() else {
            return Ok(0);
        };

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(count as usize)
    }

    async fn connect(path: &PathBuf, create: bool) -> Result<SqlitePool, sqlx::Error> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(create)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
    }

    async fn init_schema(pool: &SqlitePool) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS products (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                content TEXT NOT NULL,
                metadata TEXT NOT NULL,
                embedding BLOB NOT NULL
            )",
        )
        .execute(pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS index_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .execute(pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    fn remove_persisted(&self) -> Result<(), ApiError> {
        // sqlite leaves -wal/-shm side files next to the database
        for suffix in ["", "-wal", "-shm"] {
            let mut os_path = self.db_path.clone().into_os_string();
            os_path.push(suffix);
            let path = PathBuf::from(os_path);
            if path.exists() {
                std::fs::remove_file(&path).map_err(ApiError::internal)?;
            }
        }
        Ok(())
    }
}

fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DocumentMetadata;
    use crate::llm::mock::MockProvider;

    fn make_document(name: &str, description: &str) -> ProductDocument {
        ProductDocument {
            content: description.to_string(),
            metadata: DocumentMetadata {
                name: name.to_string(),
                price: "$5".to_string(),
                link: format!("http://example.org/{name}"),
            },
        }
    }

    fn sample_documents() -> Vec<ProductDocument> {
        vec![
            make_document("Pain Relief X", "for headaches and migraine relief"),
            make_document("Cough Syrup Y", "soothes dry cough and sore throat"),
            make_document("Vitamin C", "daily immune system supplement"),
        ]
    }

    fn test_store(dir: &tempfile::TempDir, provider: Arc<MockProvider>) -> VectorStore {
        VectorStore::new(
            dir.path().join("vectors.db"),
            provider,
            "mock-embeddings".to_string(),
        )
    }

    #[tokio::test]
    async fn build_persists_every_document() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::new());
        let mut store = test_store(&dir, provider);

        store.build(&sample_documents()).await.unwrap();

        assert!(store.is_initialized());
        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn query_before_initialize_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::new());
        let store = test_store(&dir, provider);

        let err = store.query("headache", 2).await.unwrap_err();
        assert!(matches!(err, ApiError::NotInitialized));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn query_returns_at_most_k_sorted_descending() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::new());
        let mut store = test_store(&dir, provider);
        store.build(&sample_documents()).await.unwrap();

        let results = store.query("headache", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].score >= results[1].score);
        assert_eq!(results[0].document.metadata.name, "Pain Relief X");
    }

    #[tokio::test]
    async fn initialize_twice_does_not_reembed() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::new());
        let documents = sample_documents();

        let mut store = test_store(&dir, provider.clone());
        store.initialize(&documents, false).await.unwrap();
        assert_eq!(provider.embed_call_count(), 1);
        assert_eq!(store.count().await.unwrap(), 3);
        drop(store);

        let mut store = test_store(&dir, provider.clone());
        store.initialize(&documents, false).await.unwrap();
        assert_eq!(provider.embed_call_count(), 1);
        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn force_recreate_rebuilds_from_scratch() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::new());
        let documents = sample_documents();

        let mut store = test_store(&dir, provider.clone());
        store.initialize(&documents, false).await.unwrap();
        store.initialize(&documents, true).await.unwrap();

        assert_eq!(provider.embed_call_count(), 2);
        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn load_alone_round_trips_query_results() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::new());
        let documents = sample_documents();

        let mut store = test_store(&dir, provider.clone());
        store.build(&documents).await.unwrap();
        let before: Vec<(String, f32)> = store
            .query("headache", 3)
            .await
            .unwrap()
            .into_iter()
            .map(|r| (r.document.metadata.name, r.score))
            .collect();
        drop(store);

        let mut reloaded = test_store(&dir, provider.clone());
        reloaded.load().await.unwrap();
        let after: Vec<(String, f32)> = reloaded
            .query("headache", 3)
            .await
            .unwrap()
            .into_iter()
            .map(|r| (r.document.metadata.name, r.score))
            .collect();

        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn load_without_persisted_index_is_index_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::new());
        let mut store = test_store(&dir, provider);

        let err = store.load().await.unwrap_err();
        assert!(matches!(err, ApiError::IndexNotFound(_)));
    }

    #[tokio::test]
    async fn load_refuses_index_built_with_other_model() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::new());
        let documents = sample_documents();

        let mut store = test_store(&dir, provider.clone());
        store.build(&documents).await.unwrap();
        drop(store);

        let mut other = VectorStore::new(
            dir.path().join("vectors.db"),
            provider,
            "different-model".to_string(),
        );
        let err = other.load().await.unwrap_err();
        assert!(matches!(err, ApiError::IndexNotFound(_)));
    }

    #[tokio::test]
    async fn initialize_rebuilds_over_unusable_file() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("vectors.db");
        std::fs::write(&db_path, b"not a database").unwrap();

        let provider = Arc::new(MockProvider::new());
        let mut store = VectorStore::new(db_path, provider, "mock-embeddings".to_string());
        store.initialize(&sample_documents(), false).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 3);
    }
}
