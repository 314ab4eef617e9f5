//! SQLite [`Store`] implementation over `sqlx`.
//!
//! Vectors are stored as little-endian f32 BLOBs in a NOT NULL column of
//! the chunk row itself, so chunk text and vector land in one
//! parameterized INSERT and are atomically visible to retrieval.
//!
//! Nearest-neighbor search fetches the group's candidate vectors with a
//! bound `group_id` predicate (isolation enforced in SQL, not post-hoc)
//! and scores cosine distance in Rust. A dedicated similarity index is a
//! deployment concern for larger corpora; the brute-force scan is exact.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::embedding::{blob_to_vec, cosine_distance, vec_to_blob};
use crate::models::{Chunk, Document, DocumentStatus, RetrievedChunk};

use super::Store;

/// Production store backed by a SQLite pool.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> Document {
    let status: String = row.get("status");
    Document {
        id: row.get("id"),
        group_id: row.get("group_id"),
        uploader_id: row.get("uploader_id"),
        filename: row.get("filename"),
        filepath: row.get("filepath"),
        content_type: row.get("content_type"),
        status: DocumentStatus::parse(&status).unwrap_or(DocumentStatus::Failed),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_document(&self, doc: &Document) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (id, group_id, uploader_id, filename, filepath, content_type, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.group_id)
        .bind(&doc.uploader_id)
        .bind(&doc.filename)
        .bind(&doc.filepath)
        .bind(&doc.content_type)
        .bind(doc.status.as_str())
        .bind(doc.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_document_status(&self, id: &str, status: DocumentStatus) -> Result<()> {
        let result = sqlx::query("UPDATE documents SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            anyhow::bail!("document not found: {}", id);
        }
        Ok(())
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query("SELECT * FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(row_to_document))
    }

    async fn list_documents(&self, group_id: &str) -> Result<Vec<Document>> {
        let rows = sqlx::query(
            "SELECT * FROM documents WHERE group_id = ? ORDER BY created_at DESC, id ASC",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_document).collect())
    }

    async fn delete_document(&self, id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn insert_chunk(&self, chunk: &Chunk, vector: &[f32]) -> Result<()> {
        let blob = vec_to_blob(vector);

        sqlx::query(
            r#"
            INSERT INTO chunks (id, document_id, chunk_index, text, embedding, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&chunk.id)
        .bind(&chunk.document_id)
        .bind(chunk.chunk_index)
        .bind(&chunk.text)
        .bind(&blob)
        .bind(chunk.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_chunks(&self, document_id: &str) -> Result<Vec<Chunk>> {
        let rows = sqlx::query(
            r#"
            SELECT id, document_id, chunk_index, text, created_at
            FROM chunks
            WHERE document_id = ?
            ORDER BY chunk_index ASC
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| Chunk {
                id: row.get("id"),
                document_id: row.get("document_id"),
                chunk_index: row.get("chunk_index"),
                text: row.get("text"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    async fn nearest_chunks(
        &self,
        group_id: &str,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        // Group isolation is part of the query: only chunks whose owning
        // document belongs to group_id are ever candidates.
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.document_id, c.text, c.embedding, c.created_at, c.rowid AS seq
            FROM chunks c
            JOIN documents d ON d.id = c.document_id
            WHERE d.group_id = ?
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        let mut scored: Vec<(RetrievedChunk, i64, i64)> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let vector = blob_to_vec(&blob);
                (
                    RetrievedChunk {
                        chunk_id: row.get("id"),
                        document_id: row.get("document_id"),
                        text: row.get("text"),
                        distance: cosine_distance(query, &vector),
                    },
                    row.get::<i64, _>("created_at"),
                    row.get::<i64, _>("seq"),
                )
            })
            .collect();

        // Ascending distance; ties break by insertion order for stability.
        scored.sort_by(|a, b| {
            a.0.distance
                .partial_cmp(&b.0.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
                .then(a.2.cmp(&b.2))
        });
        scored.truncate(k);

        Ok(scored.into_iter().map(|(c, _, _)| c).collect())
    }
}
