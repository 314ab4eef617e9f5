//! Ingestion pipeline orchestration.
//!
//! Transforms one stored document file into embedded, persisted chunks:
//! extraction → chunking → per-chunk embed+store. The document moves
//! through `uploaded → extracting → chunking → embedding → complete`, with
//! `failed` recorded on any document-fatal error.
//!
//! Chunk embedding is strictly sequential in index order: one in-flight
//! embedding call per document bounds memory and respects provider rate
//! limits. A single chunk's embedding failure is contained: logged,
//! skipped, and the pipeline continues with the next chunk. There are no
//! automatic retries; a failed document is only reprocessed by explicit
//! re-registration.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::chunk::build_chunks;
use crate::config::Config;
use crate::db;
use crate::embedding::{self, EmbeddingProvider};
use crate::error::{ChunkEmbeddingError, IngestError};
use crate::extract;
use crate::models::{Chunk, Document, DocumentStatus};
use crate::store::sqlite::SqliteStore;
use crate::store::Store;

/// Outcome counters for one document's ingestion.
#[derive(Debug, Clone, Copy)]
pub struct IngestReport {
    pub chunks_total: usize,
    pub chunks_embedded: usize,
    pub chunks_skipped: usize,
}

/// Per-document ingestion orchestrator.
///
/// Holds its collaborators as injected trait objects so tests can
/// substitute an in-memory store and scripted providers.
pub struct IngestionPipeline {
    store: Arc<dyn Store>,
    embedder: Arc<dyn EmbeddingProvider>,
    max_chars: usize,
    overlap_chars: usize,
}

impl IngestionPipeline {
    pub fn new(
        store: Arc<dyn Store>,
        embedder: Arc<dyn EmbeddingProvider>,
        max_chars: usize,
        overlap_chars: usize,
    ) -> Self {
        Self {
            store,
            embedder,
            max_chars,
            overlap_chars,
        }
    }

    /// Run the full pipeline for one document.
    ///
    /// Document-fatal errors (unsupported format, unreadable file, store
    /// write failures) record the `failed` status and propagate; per-chunk
    /// embedding failures are logged and skipped.
    pub async fn ingest(
        &self,
        document_id: &str,
        filepath: &Path,
        content_type: &str,
    ) -> Result<IngestReport, IngestError> {
        self.set_status(document_id, DocumentStatus::Extracting)
            .await?;

        let path = filepath.to_path_buf();
        let ct = content_type.to_string();
        let extracted = match tokio::task::spawn_blocking(move || extract::extract_text(&path, &ct))
            .await
        {
            Ok(result) => result,
            Err(join_err) => {
                self.mark_failed(document_id).await;
                return Err(IngestError::Extraction(join_err.to_string()));
            }
        };

        let text = match extracted {
            Ok(text) => text,
            Err(e) => {
                self.mark_failed(document_id).await;
                return Err(e.into());
            }
        };

        self.set_status(document_id, DocumentStatus::Chunking)
            .await?;
        let chunks = build_chunks(document_id, &text, self.max_chars, self.overlap_chars);

        self.set_status(document_id, DocumentStatus::Embedding)
            .await?;

        let mut embedded = 0usize;
        let mut skipped = 0usize;
        for chunk in &chunks {
            match self.embed_chunk(chunk).await {
                Ok(vector) => {
                    if let Err(e) = self.store.insert_chunk(chunk, &vector).await {
                        self.mark_failed(document_id).await;
                        return Err(IngestError::Store(e));
                    }
                    embedded += 1;
                }
                Err(e) => {
                    warn!(document_id = %document_id, "{}", e);
                    skipped += 1;
                }
            }
        }

        self.set_status(document_id, DocumentStatus::Complete)
            .await?;

        let report = IngestReport {
            chunks_total: chunks.len(),
            chunks_embedded: embedded,
            chunks_skipped: skipped,
        };
        info!(
            document_id = %document_id,
            chunks = report.chunks_total,
            embedded = report.chunks_embedded,
            skipped = report.chunks_skipped,
            "document ingested"
        );
        Ok(report)
    }

    /// Embed one chunk, treating an empty vector as a provider failure.
    async fn embed_chunk(&self, chunk: &Chunk) -> Result<Vec<f32>, ChunkEmbeddingError> {
        match self.embedder.embed(&chunk.text).await {
            Ok(vector) if vector.is_empty() => Err(ChunkEmbeddingError {
                chunk_index: chunk.chunk_index,
                reason: "provider returned an empty vector".to_string(),
            }),
            Ok(vector) => Ok(vector),
            Err(e) => Err(ChunkEmbeddingError {
                chunk_index: chunk.chunk_index,
                reason: e.to_string(),
            }),
        }
    }

    async fn set_status(&self, document_id: &str, status: DocumentStatus) -> Result<(), IngestError> {
        if let Err(e) = self.store.set_document_status(document_id, status).await {
            self.mark_failed(document_id).await;
            return Err(IngestError::Store(e));
        }
        Ok(())
    }

    /// Best-effort: the failure being recorded is the interesting error.
    async fn mark_failed(&self, document_id: &str) {
        if let Err(e) = self
            .store
            .set_document_status(document_id, DocumentStatus::Failed)
            .await
        {
            tracing::error!(document_id = %document_id, "could not record failed status: {}", e);
        }
    }
}

/// Build a new [`Document`] row for a file that is already persisted.
pub fn new_document(
    group_id: &str,
    uploader_id: &str,
    filename: &str,
    filepath: &str,
    content_type: &str,
) -> Document {
    Document {
        id: Uuid::new_v4().to_string(),
        group_id: group_id.to_string(),
        uploader_id: uploader_id.to_string(),
        filename: filename.to_string(),
        filepath: filepath.to_string(),
        content_type: content_type.to_string(),
        status: DocumentStatus::Uploaded,
        created_at: Utc::now().timestamp(),
    }
}

/// CLI entry: ingest one file in the foreground and print a summary.
pub async fn run_ingest(
    config: &Config,
    group_id: &str,
    file: &Path,
    content_type: &str,
    uploader: &str,
) -> Result<()> {
    if !config.embedding.is_enabled() {
        bail!("Embedding provider is disabled. Set [embedding] provider in config.");
    }

    let pool = db::connect(config).await?;
    let store: Arc<dyn Store> = Arc::new(SqliteStore::new(pool.clone()));
    let embedder: Arc<dyn EmbeddingProvider> =
        embedding::create_embedding_provider(&config.embedding)?.into();

    let filename = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document");
    let doc = new_document(
        group_id,
        uploader,
        filename,
        &file.display().to_string(),
        content_type,
    );
    store.create_document(&doc).await?;

    let pipeline = IngestionPipeline::new(
        store,
        embedder,
        config.chunking.max_chars,
        config.chunking.overlap_chars,
    );
    let report = pipeline.ingest(&doc.id, file, content_type).await?;

    println!("ingest {}", file.display());
    println!("  document: {}", doc.id);
    println!("  chunks: {}", report.chunks_total);
    println!("  embedded: {}", report.chunks_embedded);
    println!("  skipped: {}", report.chunks_skipped);
    println!("ok");

    pool.close().await;
    Ok(())
}

/// CLI entry: list a group's documents.
pub async fn run_documents(config: &Config, group_id: &str) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());

    let docs = store.list_documents(group_id).await?;
    if docs.is_empty() {
        println!("No documents.");
    } else {
        for doc in &docs {
            let date = chrono::DateTime::from_timestamp(doc.created_at, 0)
                .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            println!(
                "{}  {}  [{}]  {} ({})",
                doc.id, date, doc.status, doc.filename, doc.content_type
            );
        }
    }

    pool.close().await;
    Ok(())
}
