use std::sync::Arc;

use crate::errors::ApiError;
use crate::rag::store::{SearchResult, VectorStore};

/// Top-k plus minimum-score retrieval policy over the vector store.
///
/// An empty result set means "no sufficiently relevant product" and is a
/// normal outcome, not an error.
pub struct Retriever {
    store: Arc<VectorStore>,
    default_k: usize,
    min_score: f32,
}

impl Retriever {
    pub fn new(store: Arc<VectorStore>, default_k: usize, min_score: f32) -> Self {
        Self {
            store,
            default_k,
            min_score,
        }
    }

    /// Query the index and keep results with `score >= min_score`,
    /// preserving the index ordering. Defaults apply when `k` or
    /// `min_score` are not given.
    pub async fn search(
        &self,
        query: &str,
        k: Option<usize>,
        min_score: Option<f32>,
    ) -> Result<Vec<SearchResult>, ApiError> {
        let k = k.unwrap_or(self.default_k);
        let threshold = min_score.unwrap_or(self.min_score);

        let results = self.store.query(query, k).await?;
        let kept = results
            .into_iter()
            .filter(|result| result.score >= threshold)
            .collect::<Vec<_>>();

        tracing::debug!(query, kept = kept.len(), threshold, "retrieval complete");
        Ok(kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DocumentMetadata, ProductDocument};
    use crate::llm::mock::MockProvider;

    async fn built_retriever(
        dir: &tempfile::TempDir,
        default_k: usize,
        min_score: f32,
    ) -> Retriever {
        let provider = Arc::new(MockProvider::new());
        let documents = vec![
            ProductDocument {
                content: "for headaches and migraine relief".to_string(),
                metadata: DocumentMetadata {
                    name: "Pain Relief X".to_string(),
                    price: "$5".to_string(),
                    link: "http://x".to_string(),
                },
            },
            ProductDocument {
                content: "daily immune system supplement".to_string(),
                metadata: DocumentMetadata {
                    name: "Vitamin C".to_string(),
                    price: "$8".to_string(),
                    link: "http://c".to_string(),
                },
            },
        ];

        let mut store = VectorStore::new(
            dir.path().join("vectors.db"),
            provider,
            "mock-embeddings".to_string(),
        );
        store.initialize(&documents, false).await.unwrap();
        Retriever::new(Arc::new(store), default_k, min_score)
    }

    #[tokio::test]
    async fn every_result_clears_the_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let retriever = built_retriever(&dir, 2, 0.1).await;

        let results = retriever.search("headache", None, None).await.unwrap();
        assert!(!results.is_empty());
        assert!(results.iter().all(|r| r.score >= 0.1));
    }

    #[tokio::test]
    async fn nothing_above_threshold_yields_empty_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let retriever = built_retriever(&dir, 2, 0.99).await;

        let results = retriever
            .search("unrelated term", None, None)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn per_call_overrides_beat_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let retriever = built_retriever(&dir, 2, 0.99).await;

        let results = retriever
            .search("headache", Some(1), Some(0.0))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.metadata.name, "Pain Relief X");
    }
}
