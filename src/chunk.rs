//! Sliding-window text chunker.
//!
//! Splits extracted document text into overlapping windows of at most
//! `max_chars` characters, advancing the window start by
//! `max_chars - overlap` each step. The trailing remainder is always kept;
//! windows that trim to nothing are dropped.
//!
//! Windows are measured in characters, never bytes, so multi-byte UTF-8
//! text cannot split inside a code point.

use chrono::Utc;
use uuid::Uuid;

use crate::models::Chunk;

/// Split `text` into overlapping windows.
///
/// Requires `0 < overlap < max_chars` (validated at config load). Empty
/// input yields an empty sequence. Identical inputs always yield identical
/// output: same boundaries, same order.
pub fn chunk_text(text: &str, max_chars: usize, overlap: usize) -> Vec<String> {
    debug_assert!(overlap > 0 && overlap < max_chars);

    if text.is_empty() {
        return Vec::new();
    }

    // Byte offset of every char, so windows slice on char boundaries.
    let offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    let total = offsets.len();
    let step = max_chars - overlap;

    let mut windows = Vec::new();
    let mut start = 0usize;
    loop {
        let end = (start + max_chars).min(total);
        let byte_start = offsets[start];
        let byte_end = if end == total { text.len() } else { offsets[end] };
        let window = &text[byte_start..byte_end];
        if !window.trim().is_empty() {
            windows.push(window.to_string());
        }
        if end == total {
            break;
        }
        start += step;
    }

    windows
}

/// Chunk a document body into [`Chunk`] models with contiguous indices.
///
/// Embedding vectors are attached later by the ingestion pipeline; a chunk
/// model on its own carries only text and position.
pub fn build_chunks(document_id: &str, text: &str, max_chars: usize, overlap: usize) -> Vec<Chunk> {
    let now = Utc::now().timestamp();
    chunk_text(text, max_chars, overlap)
        .into_iter()
        .enumerate()
        .map(|(i, window)| Chunk {
            id: Uuid::new_v4().to_string(),
            document_id: document_id.to_string(),
            chunk_index: i as i64,
            text: window,
            created_at: now,
        })
        .collect()
}
