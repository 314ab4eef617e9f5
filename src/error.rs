//! Error taxonomy for ingestion and question answering.
//!
//! Chunk-level failures are contained (logged and skipped) and never leave
//! the pipeline; document-level and request-level failures propagate to the
//! caller as one of the types here. CLI and orchestration code wraps these
//! in `anyhow` at the boundary.

use crate::extract::ExtractError;

/// A document-fatal ingestion failure. The document row survives; its
/// status is recorded as failed and no further chunks are written.
#[derive(Debug)]
pub enum IngestError {
    /// Content type outside the supported set; no chunks were created.
    UnsupportedFormat(String),
    /// The stored file was unreadable or malformed.
    Extraction(String),
    /// The backing store rejected a write.
    Store(anyhow::Error),
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestError::UnsupportedFormat(ct) => write!(f, "unsupported document format: {}", ct),
            IngestError::Extraction(e) => write!(f, "text extraction failed: {}", e),
            IngestError::Store(e) => write!(f, "store error during ingestion: {}", e),
        }
    }
}

impl std::error::Error for IngestError {}

impl From<ExtractError> for IngestError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::UnsupportedContentType(ct) => IngestError::UnsupportedFormat(ct),
            other => IngestError::Extraction(other.to_string()),
        }
    }
}

/// A single chunk's embedding failed. Contained: the pipeline logs it,
/// skips the chunk, and continues with the next one.
#[derive(Debug)]
pub struct ChunkEmbeddingError {
    pub chunk_index: i64,
    pub reason: String,
}

impl std::fmt::Display for ChunkEmbeddingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "embedding failed for chunk {}: {}",
            self.chunk_index, self.reason
        )
    }
}

impl std::error::Error for ChunkEmbeddingError {}

/// A request-fatal question-answering failure.
#[derive(Debug)]
pub enum AskError {
    /// The caller supplied an empty question; client error, not a pipeline error.
    EmptyQuestion,
    /// The question could not be embedded; generation must not proceed.
    EmbeddingUnavailable(String),
    /// The generative provider failed. Carries the question and a truncated
    /// context summary for diagnostics.
    Generation {
        question: String,
        context_summary: String,
        reason: String,
    },
    /// A provider call exceeded its bounded duration.
    Timeout(String),
    /// The backing store rejected the retrieval query.
    Store(anyhow::Error),
}

impl std::fmt::Display for AskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AskError::EmptyQuestion => write!(f, "question must not be empty"),
            AskError::EmbeddingUnavailable(e) => {
                write!(f, "could not embed question: {}", e)
            }
            AskError::Generation {
                question, reason, ..
            } => write!(f, "answer generation failed for {:?}: {}", question, reason),
            AskError::Timeout(e) => write!(f, "provider call timed out: {}", e),
            AskError::Store(e) => write!(f, "store error during retrieval: {}", e),
        }
    }
}

impl std::error::Error for AskError {}

/// Whether a provider error bottoms out in an HTTP request timeout.
/// Callers map such errors to [`AskError::Timeout`] instead of the
/// provider-specific variant.
pub(crate) fn is_provider_timeout(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<reqwest::Error>()
            .is_some_and(|e| e.is_timeout())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractError;

    #[test]
    fn unsupported_content_type_maps_to_unsupported_format() {
        let err: IngestError =
            ExtractError::UnsupportedContentType("image/png".to_string()).into();
        assert!(matches!(err, IngestError::UnsupportedFormat(_)));
    }

    #[test]
    fn other_extract_errors_map_to_extraction() {
        let err: IngestError = ExtractError::Io("gone".to_string()).into();
        assert!(matches!(err, IngestError::Extraction(_)));
    }

    #[test]
    fn generation_error_display_includes_question() {
        let err = AskError::Generation {
            question: "why?".to_string(),
            context_summary: "ctx".to_string(),
            reason: "provider down".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("why?"));
        assert!(msg.contains("provider down"));
    }
}
