//! In-memory [`Store`] implementation for tests.
//!
//! Uses `HashMap` and `Vec` behind `std::sync::RwLock` for thread safety.
//! Nearest-neighbor search is brute-force cosine distance over all stored
//! vectors, filtered by group before scoring, matching the query-level
//! isolation the SQLite store enforces.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use crate::embedding::cosine_distance;
use crate::models::{Chunk, Document, DocumentStatus, RetrievedChunk};

use super::Store;

struct StoredChunk {
    chunk: Chunk,
    vector: Vec<f32>,
    /// Insertion sequence, used for stable distance tie-breaking.
    seq: u64,
}

/// In-memory store used as a test double.
pub struct InMemoryStore {
    docs: RwLock<HashMap<String, Document>>,
    chunks: RwLock<Vec<StoredChunk>>,
    next_seq: RwLock<u64>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
            chunks: RwLock::new(Vec::new()),
            next_seq: RwLock::new(0),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create_document(&self, doc: &Document) -> Result<()> {
        let mut docs = self.docs.write().unwrap();
        if docs.contains_key(&doc.id) {
            anyhow::bail!("document already exists: {}", doc.id);
        }
        docs.insert(doc.id.clone(), doc.clone());
        Ok(())
    }

    async fn set_document_status(&self, id: &str, status: DocumentStatus) -> Result<()> {
        let mut docs = self.docs.write().unwrap();
        match docs.get_mut(id) {
            Some(doc) => {
                doc.status = status;
                Ok(())
            }
            None => anyhow::bail!("document not found: {}", id),
        }
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.docs.read().unwrap().get(id).cloned())
    }

    async fn list_documents(&self, group_id: &str) -> Result<Vec<Document>> {
        let docs = self.docs.read().unwrap();
        let mut out: Vec<Document> = docs
            .values()
            .filter(|d| d.group_id == group_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(out)
    }

    async fn delete_document(&self, id: &str) -> Result<()> {
        self.docs.write().unwrap().remove(id);
        self.chunks
            .write()
            .unwrap()
            .retain(|sc| sc.chunk.document_id != id);
        Ok(())
    }

    async fn insert_chunk(&self, chunk: &Chunk, vector: &[f32]) -> Result<()> {
        let seq = {
            let mut next = self.next_seq.write().unwrap();
            *next += 1;
            *next
        };
        self.chunks.write().unwrap().push(StoredChunk {
            chunk: chunk.clone(),
            vector: vector.to_vec(),
            seq,
        });
        Ok(())
    }

    async fn list_chunks(&self, document_id: &str) -> Result<Vec<Chunk>> {
        let chunks = self.chunks.read().unwrap();
        let mut out: Vec<Chunk> = chunks
            .iter()
            .filter(|sc| sc.chunk.document_id == document_id)
            .map(|sc| sc.chunk.clone())
            .collect();
        out.sort_by_key(|c| c.chunk_index);
        Ok(out)
    }

    async fn nearest_chunks(
        &self,
        group_id: &str,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let group_docs: Vec<String> = {
            let docs = self.docs.read().unwrap();
            docs.values()
                .filter(|d| d.group_id == group_id)
                .map(|d| d.id.clone())
                .collect()
        };

        let chunks = self.chunks.read().unwrap();
        let mut scored: Vec<(RetrievedChunk, u64)> = chunks
            .iter()
            .filter(|sc| group_docs.contains(&sc.chunk.document_id))
            .map(|sc| {
                (
                    RetrievedChunk {
                        chunk_id: sc.chunk.id.clone(),
                        document_id: sc.chunk.document_id.clone(),
                        text: sc.chunk.text.clone(),
                        distance: cosine_distance(query, &sc.vector),
                    },
                    sc.seq,
                )
            })
            .collect();

        scored.sort_by(|a, b| {
            a.0.distance
                .partial_cmp(&b.0.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });
        scored.truncate(k);

        Ok(scored.into_iter().map(|(c, _)| c).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn doc(id: &str, group: &str) -> Document {
        Document {
            id: id.to_string(),
            group_id: group.to_string(),
            uploader_id: "u1".to_string(),
            filename: format!("{}.txt", id),
            filepath: format!("/tmp/{}.txt", id),
            content_type: "text/plain".to_string(),
            status: DocumentStatus::Uploaded,
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

    #[tokio::test]
    async fn test_nearest_chunks_filters_by_group() {
        let store = InMemoryStore::new();
        store.create_document(&doc("a1", "group-a")).await.unwrap();
        store.create_document(&doc("b1", "group-b")).await.unwrap();

        // The chunk in group B matches the query vector exactly.
        store
            .insert_chunk(&chunk("ca", "a1", 0, "alpha"), &[0.0, 1.0])
            .await
            .unwrap();
        store
            .insert_chunk(&chunk("cb", "b1", 0, "beta"), &[1.0, 0.0])
            .await
            .unwrap();

        let results = store
            .nearest_chunks("group-a", &[1.0, 0.0], 5)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk_id, "ca");
    }

    #[tokio::test]
    async fn test_nearest_chunks_ordering_and_truncation() {
        let store = InMemoryStore::new();
        store.create_document(&doc("d1", "g")).await.unwrap();
        store
            .insert_chunk(&chunk("far", "d1", 0, "far"), &[0.0, 1.0])
            .await
            .unwrap();
        store
            .insert_chunk(&chunk("near", "d1", 1, "near"), &[1.0, 0.1])
            .await
            .unwrap();
        store
            .insert_chunk(&chunk("mid", "d1", 2, "mid"), &[1.0, 1.0])
            .await
            .unwrap();

        let results = store.nearest_chunks("g", &[1.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk_id, "near");
        assert_eq!(results[1].chunk_id, "mid");
        assert!(results[0].distance <= results[1].distance);
    }

    #[tokio::test]
    async fn test_nearest_chunks_stable_tie_break() {
        let store = InMemoryStore::new();
        store.create_document(&doc("d1", "g")).await.unwrap();
        // Identical vectors: insertion order must decide.
        store
            .insert_chunk(&chunk("first", "d1", 0, "first"), &[1.0, 0.0])
            .await
            .unwrap();
        store
            .insert_chunk(&chunk("second", "d1", 1, "second"), &[1.0, 0.0])
            .await
            .unwrap();

        let results = store.nearest_chunks("g", &[1.0, 0.0], 5).await.unwrap();
        assert_eq!(results[0].chunk_id, "first");
        assert_eq!(results[1].chunk_id, "second");
    }

    #[tokio::test]
    async fn test_delete_document_cascades_to_chunks() {
        let store = InMemoryStore::new();
        store.create_document(&doc("d1", "g")).await.unwrap();
        store
            .insert_chunk(&chunk("c1", "d1", 0, "text"), &[1.0])
            .await
            .unwrap();

        store.delete_document("d1").await.unwrap();
        assert!(store.get_document("d1").await.unwrap().is_none());
        assert!(store.list_chunks("d1").await.unwrap().is_empty());
        assert!(store.nearest_chunks("g", &[1.0], 5).await.unwrap().is_empty());
    }
}
