//! Generative provider abstraction and implementations.
//!
//! Defines the [`GenerativeProvider`] trait and concrete implementations:
//! - **[`DisabledGeneration`]** — returns errors; used when generation is not configured.
//! - **[`OpenAiGeneration`]** — calls the OpenAI chat completions API.
//! - **[`OllamaGeneration`]** — calls a local Ollama instance's `/api/generate` endpoint.
//!
//! Unlike embedding, generation never retries: a failed answer is surfaced
//! to the caller immediately. Requests are bounded by
//! `generation.timeout_secs`.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::GenerationConfig;

/// A capability that turns a prompt into generated text.
#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-4o-mini"`).
    fn model_name(&self) -> &str;

    /// Generate a completion for `prompt`. The output text is returned
    /// unmodified.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Create the appropriate [`GenerativeProvider`] based on configuration.
pub fn create_generative_provider(config: &GenerationConfig) -> Result<Box<dyn GenerativeProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledGeneration)),
        "openai" => Ok(Box::new(OpenAiGeneration::new(config)?)),
        "ollama" => Ok(Box::new(OllamaGeneration::new(config)?)),
        other => bail!("Unknown generative provider: {}", other),
    }
}

// ============ Disabled provider ============

/// A no-op generative provider that always returns errors.
pub struct DisabledGeneration;

#[async_trait]
impl GenerativeProvider for DisabledGeneration {
    fn model_name(&self) -> &str {
        "disabled"
    }
    async fn generate(&self, _prompt: &str) -> Result<String> {
        bail!("Generative provider is disabled")
    }
}

// ============ OpenAI provider ============

/// Generative provider using the OpenAI chat completions API.
///
/// Calls `POST /v1/chat/completions` with a single user message. Requires
/// the `OPENAI_API_KEY` environment variable to be set.
pub struct OpenAiGeneration {
    model: String,
    client: reqwest::Client,
}

impl OpenAiGeneration {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("generation.model required for OpenAI provider"))?;

        if std::env::var("OPENAI_API_KEY").is_err() {
            bail!("OPENAI_API_KEY environment variable not set");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { model, client })
    }
}

#[async_trait]
impl GenerativeProvider for OpenAiGeneration {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("OpenAI API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        parse_openai_completion(&json)
    }
}

fn parse_openai_completion(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing message content"))
}

// ============ Ollama provider ============

/// Generative provider using a local Ollama instance.
///
/// Calls `POST /api/generate` with `stream: false` on the configured URL
/// (default `http://localhost:11434`).
pub struct OllamaGeneration {
    model: String,
    url: String,
    client: reqwest::Client,
}

impl OllamaGeneration {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("generation.model required for Ollama provider"))?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434".to_string());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { model, url, client })
    }
}

#[async_trait]
impl GenerativeProvider for OllamaGeneration {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });

        let response = self
            .client
            .post(format!("{}/api/generate", self.url))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                anyhow::anyhow!(
                    "Ollama connection error (is Ollama running at {}?): {}",
                    self.url,
                    e
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Ollama API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        json.get("response")
            .and_then(|r| r.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing response field"))
    }
}
