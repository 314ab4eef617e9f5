//! Group-scoped nearest-chunk retrieval.
//!
//! Embeds a question and asks the store for the top-k nearest chunks owned
//! by the querying group. Read-only; the group filter lives inside the
//! store query, so a chunk from another group can never appear in the
//! result set regardless of similarity.

use std::sync::Arc;

use crate::embedding::EmbeddingProvider;
use crate::error::{is_provider_timeout, AskError};
use crate::models::RetrievedChunk;
use crate::store::Store;

pub struct RetrievalEngine {
    store: Arc<dyn Store>,
    embedder: Arc<dyn EmbeddingProvider>,
    top_k: usize,
}

impl RetrievalEngine {
    pub fn new(store: Arc<dyn Store>, embedder: Arc<dyn EmbeddingProvider>, top_k: usize) -> Self {
        Self {
            store,
            embedder,
            top_k,
        }
    }

    /// The configured default result count.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Retrieve up to `k` chunks for `question`, nearest first.
    ///
    /// If the question cannot be embedded the request fails with
    /// [`AskError::EmbeddingUnavailable`] (or [`AskError::Timeout`]) and
    /// the caller must not proceed to generation. The result may be empty;
    /// that is a valid outcome, not an error.
    pub async fn retrieve(
        &self,
        group_id: &str,
        question: &str,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, AskError> {
        let vector = match self.embedder.embed(question).await {
            Ok(v) if v.is_empty() => {
                return Err(AskError::EmbeddingUnavailable(
                    "provider returned an empty vector".to_string(),
                ))
            }
            Ok(v) => v,
            Err(e) if is_provider_timeout(&e) => return Err(AskError::Timeout(e.to_string())),
            Err(e) => return Err(AskError::EmbeddingUnavailable(e.to_string())),
        };

        self.store
            .nearest_chunks(group_id, &vector, k)
            .await
            .map_err(AskError::Store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Chunk, Document, DocumentStatus};
    use crate::store::memory::InMemoryStore;
    use async_trait::async_trait;
    use chrono::Utc;

    /// Keyword-feature embedding: each dimension counts one keyword, plus a
    /// constant bias so no vector is ever zero. Semantically similar texts
    /// (shared keywords) end up closer in cosine distance.
    struct KeywordEmbedding;

    #[async_trait]
    impl EmbeddingProvider for KeywordEmbedding {
        fn model_name(&self) -> &str {
            "keyword"
        }
        fn dims(&self) -> usize {
            3
        }
        async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            let lower = text.to_lowercase();
            Ok(vec![
                lower.matches("sky").count() as f32,
                lower.matches("grass").count() as f32,
                0.1,
            ])
        }
    }

    struct BrokenEmbedding;

    #[async_trait]
    impl EmbeddingProvider for BrokenEmbedding {
        fn model_name(&self) -> &str {
            "broken"
        }
        fn dims(&self) -> usize {
            3
        }
        async fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
            anyhow::bail!("provider unavailable")
        }
    }

    fn doc(id: &str, group: &str) -> Document {
        Document {
            id: id.to_string(),
            group_id: group.to_string(),
            uploader_id: "u1".to_string(),
            filename: format!("{}.txt", id),
            filepath: format!("/tmp/{}.txt", id),
            content_type: "text/plain".to_string(),
            status: DocumentStatus::Complete,
            created_at: Utc::now().timestamp(),
        }
    }

    fn chunk(id: &str, doc_id: &str, index: i64, text: &str) -> Chunk {
        Chunk {
            id: id.to_string(),
            document_id: doc_id.to_string(),
            chunk_index: index,
            text: text.to_string(),
            created_at: Utc::now().timestamp(),
        }
    }

    async fn seed_two_groups(store: &InMemoryStore) {
        store.create_document(&doc("da", "group-a")).await.unwrap();
        store.create_document(&doc("db", "group-b")).await.unwrap();

        // Group A: moderately related text.
        store
            .insert_chunk(&chunk("ca", "da", 0, "The grass is green."), &[0.0, 1.0, 0.1])
            .await
            .unwrap();
        // Group B: a deliberate similarity trap. Its vector matches a
        // sky question far better than anything in group A.
        store
            .insert_chunk(&chunk("cb", "db", 0, "The sky is blue."), &[1.0, 0.0, 0.1])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_isolation_beats_similarity() {
        let store = Arc::new(InMemoryStore::new());
        seed_two_groups(&store).await;

        let engine = RetrievalEngine::new(store, Arc::new(KeywordEmbedding), 5);
        let results = engine
            .retrieve("group-a", "What color is the sky?", 5)
            .await
            .unwrap();

        assert!(!results.is_empty());
        assert!(
            results.iter().all(|c| c.document_id == "da"),
            "retrieval leaked a chunk from another group: {:?}",
            results
        );
    }

    #[tokio::test]
    async fn test_result_size_is_min_of_k_and_matches() {
        let store = Arc::new(InMemoryStore::new());
        seed_two_groups(&store).await;

        let engine = RetrievalEngine::new(store.clone(), Arc::new(KeywordEmbedding), 5);
        let results = engine.retrieve("group-a", "anything", 5).await.unwrap();
        assert_eq!(results.len(), 1);

        let empty = engine.retrieve("group-c", "anything", 5).await.unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_embedding_failure_is_fatal_to_request() {
        let store = Arc::new(InMemoryStore::new());
        let engine = RetrievalEngine::new(store, Arc::new(BrokenEmbedding), 5);

        let err = engine.retrieve("group-a", "question", 5).await.unwrap_err();
        assert!(matches!(err, AskError::EmbeddingUnavailable(_)));
    }

    #[tokio::test]
    async fn test_results_ordered_ascending_by_distance() {
        let store = Arc::new(InMemoryStore::new());
        store.create_document(&doc("d1", "g")).await.unwrap();
        store
            .insert_chunk(&chunk("c0", "d1", 0, "The sky is blue."), &[1.0, 0.0, 0.1])
            .await
            .unwrap();
        store
            .insert_chunk(&chunk("c1", "d1", 1, "Grass is green."), &[0.0, 1.0, 0.1])
            .await
            .unwrap();

        let engine = RetrievalEngine::new(store, Arc::new(KeywordEmbedding), 5);
        let results = engine
            .retrieve("g", "What color is the sky?", 5)
            .await
            .unwrap();

        assert_eq!(results[0].chunk_id, "c0");
        for pair in results.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
    }
}
