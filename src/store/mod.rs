//! Storage abstraction for documents, chunks, and vectors.
//!
//! The [`Store`] trait defines every persistence operation the ingestion
//! pipeline and retrieval engine need, enabling pluggable backends: SQLite
//! for production, in-memory for tests.
//!
//! Two invariants every implementation must uphold:
//!
//! - **Atomic chunk visibility**: a chunk's text and vector are written
//!   together; no reader ever observes a chunk without its vector.
//! - **Query-level group isolation**: [`nearest_chunks`](Store::nearest_chunks)
//!   restricts candidates to documents owned by the given group inside the
//!   query itself, never by filtering results after the fact.

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Chunk, Document, DocumentStatus, RetrievedChunk};

/// Abstract storage backend.
///
/// All operations are async (via `async-trait`). Implementations must be
/// `Send + Sync`; chunk writes are append-only and scoped by document, so
/// concurrent pipelines for different documents need no extra locking.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`create_document`](Store::create_document) | Insert a new document row |
/// | [`set_document_status`](Store::set_document_status) | Advance the processing state |
/// | [`get_document`](Store::get_document) | Fetch one document by id |
/// | [`list_documents`](Store::list_documents) | List a group's documents, newest first |
/// | [`delete_document`](Store::delete_document) | Delete a document and all its chunks |
/// | [`insert_chunk`](Store::insert_chunk) | Persist chunk text + vector together |
/// | [`list_chunks`](Store::list_chunks) | List a document's chunks in index order |
/// | [`nearest_chunks`](Store::nearest_chunks) | Group-scoped nearest-neighbor query |
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a new document row. Fails if the id already exists.
    async fn create_document(&self, doc: &Document) -> Result<()>;

    /// Record the document's processing state.
    async fn set_document_status(&self, id: &str, status: DocumentStatus) -> Result<()>;

    /// Fetch a document by id.
    async fn get_document(&self, id: &str) -> Result<Option<Document>>;

    /// List all documents belonging to a group, newest first.
    async fn list_documents(&self, group_id: &str) -> Result<Vec<Document>>;

    /// Delete a document and cascade to all its chunks and vectors.
    async fn delete_document(&self, id: &str) -> Result<()>;

    /// Persist a chunk and its embedding vector in one atomic write.
    async fn insert_chunk(&self, chunk: &Chunk, vector: &[f32]) -> Result<()>;

    /// List a document's persisted chunks in ascending index order.
    async fn list_chunks(&self, document_id: &str) -> Result<Vec<Chunk>>;

    /// Return up to `k` chunks nearest to `query` by cosine distance,
    /// restricted to documents owned by `group_id`. Ordered ascending by
    /// distance; ties break by insertion order (stable).
    async fn nearest_chunks(
        &self,
        group_id: &str,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<RetrievedChunk>>;
}
