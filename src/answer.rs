//! Grounded answer synthesis.
//!
//! Joins retrieved chunk texts into a context block, wraps them in a prompt
//! that confines the model to that context, and returns the generated text
//! unmodified. An empty retrieval short-circuits to a fixed response
//! without touching the generative provider.

use std::sync::Arc;

use anyhow::{bail, Result};

use crate::config::Config;
use crate::db;
use crate::embedding;
use crate::error::{is_provider_timeout, AskError};
use crate::generation::{self, GenerativeProvider};
use crate::models::RetrievedChunk;
use crate::retrieve::RetrievalEngine;
use crate::store::sqlite::SqliteStore;
use crate::store::Store;

/// Fixed response when retrieval found nothing for the group.
pub const NO_CONTEXT_ANSWER: &str =
    "Sorry, I couldn't find any relevant information in this group's documents.";

/// Separator between chunk texts inside the context block.
const CONTEXT_SEPARATOR: &str = "\n---\n";

/// Maximum characters of context carried in a generation-failure report.
const CONTEXT_SUMMARY_CHARS: usize = 200;

pub struct AnswerSynthesizer {
    generator: Arc<dyn GenerativeProvider>,
}

impl AnswerSynthesizer {
    pub fn new(generator: Arc<dyn GenerativeProvider>) -> Self {
        Self { generator }
    }

    /// Produce an answer for `question` grounded in `chunks`.
    ///
    /// Empty `chunks` returns [`NO_CONTEXT_ANSWER`] without invoking the
    /// generative provider. Provider failures surface as
    /// [`AskError::Generation`] (or [`AskError::Timeout`]); no retry.
    pub async fn synthesize(
        &self,
        question: &str,
        chunks: &[RetrievedChunk],
    ) -> Result<String, AskError> {
        if chunks.is_empty() {
            return Ok(NO_CONTEXT_ANSWER.to_string());
        }

        let context = build_context(chunks);
        let prompt = build_prompt(question, &context);

        match self.generator.generate(&prompt).await {
            Ok(answer) => Ok(answer),
            Err(e) if is_provider_timeout(&e) => Err(AskError::Timeout(e.to_string())),
            Err(e) => Err(AskError::Generation {
                question: question.to_string(),
                context_summary: truncate_chars(&context, CONTEXT_SUMMARY_CHARS),
                reason: e.to_string(),
            }),
        }
    }
}

/// Concatenate chunk texts in retrieval order.
fn build_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// The grounding prompt: context-only answering, explicit admission when
/// the context is insufficient, verbatim question.
fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "Answer the user's question using only the context below, which was \
         extracted from uploaded documents. If the context does not contain \
         the answer, state that clearly. Do not use any prior knowledge.\n\n\
         Context:\n{}\n\nQuestion: {}\n\nAnswer:",
        context, question
    )
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    s.chars().take(max_chars).collect()
}

/// CLI entry: answer one question for a group and print the result.
pub async fn run_ask(config: &Config, group_id: &str, question: &str) -> Result<()> {
    if question.trim().is_empty() {
        bail!("question must not be empty");
    }
    if !config.embedding.is_enabled() {
        bail!("Embedding provider is disabled. Set [embedding] provider in config.");
    }
    if !config.generation.is_enabled() {
        bail!("Generative provider is disabled. Set [generation] provider in config.");
    }

    let pool = db::connect(config).await?;
    let store: Arc<dyn Store> = Arc::new(SqliteStore::new(pool.clone()));
    let embedder = embedding::create_embedding_provider(&config.embedding)?.into();
    let generator = generation::create_generative_provider(&config.generation)?.into();

    let engine = RetrievalEngine::new(store, embedder, config.retrieval.top_k);
    let synthesizer = AnswerSynthesizer::new(generator);

    let chunks = engine
        .retrieve(group_id, question, config.retrieval.top_k)
        .await?;
    let answer = synthesizer.synthesize(question, &chunks).await?;

    println!("{}", answer);

    pool.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingGenerator {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingGenerator {
        fn succeeding() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: false,
            })
        }
        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: true,
            })
        }
        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerativeProvider for CountingGenerator {
        fn model_name(&self) -> &str {
            "counting"
        }
        async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("scripted generation failure");
            }
            Ok(format!("echo: {}", prompt.len()))
        }
    }

    fn retrieved(text: &str) -> RetrievedChunk {
        RetrievedChunk {
            chunk_id: "c1".to_string(),
            document_id: "d1".to_string(),
            text: text.to_string(),
            distance: 0.1,
        }
    }

    #[tokio::test]
    async fn test_empty_retrieval_skips_generator() {
        let generator = CountingGenerator::succeeding();
        let synthesizer = AnswerSynthesizer::new(generator.clone());

        let answer = synthesizer.synthesize("why?", &[]).await.unwrap();
        assert_eq!(answer, NO_CONTEXT_ANSWER);
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_nonempty_retrieval_invokes_generator_once() {
        let generator = CountingGenerator::succeeding();
        let synthesizer = AnswerSynthesizer::new(generator.clone());

        let chunks = vec![retrieved("The sky is blue.")];
        let answer = synthesizer.synthesize("why?", &chunks).await.unwrap();
        assert!(answer.starts_with("echo:"));
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn test_generation_failure_carries_question() {
        let generator = CountingGenerator::failing();
        let synthesizer = AnswerSynthesizer::new(generator);

        let chunks = vec![retrieved("The sky is blue.")];
        let err = synthesizer
            .synthesize("What color is the sky?", &chunks)
            .await
            .unwrap_err();
        match err {
            AskError::Generation {
                question,
                context_summary,
                ..
            } => {
                assert_eq!(question, "What color is the sky?");
                assert!(context_summary.contains("sky is blue"));
            }
            other => panic!("expected Generation error, got {:?}", other),
        }
    }

    #[test]
    fn test_prompt_embeds_context_and_verbatim_question() {
        let context = build_context(&[retrieved("First chunk."), retrieved("Second chunk.")]);
        assert_eq!(context, format!("First chunk.{}Second chunk.", CONTEXT_SEPARATOR));

        let prompt = build_prompt("What color is the sky?", &context);
        assert!(prompt.contains("only the context"));
        assert!(prompt.contains("state that clearly"));
        assert!(prompt.contains(&context));
        assert!(prompt.contains("Question: What color is the sky?"));
    }

    #[test]
    fn test_context_summary_truncation() {
        let long = "x".repeat(500);
        assert_eq!(truncate_chars(&long, 200).chars().count(), 200);
        assert_eq!(truncate_chars("short", 200), "short");
    }
}
