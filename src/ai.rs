//! AI service boundary.
//!
//! Defines the [`NoteAi`] trait with the two request shapes the tool needs
//! and [`AnthropicClient`], its implementation over the Anthropic Messages
//! API (`POST {base_url}/v1/messages`).
//!
//! | Request | Payload | Result |
//! |---------|---------|--------|
//! | [`transcribe_pdf`](NoteAi::transcribe_pdf) | base64 PDF `document` block + instruction | free text |
//! | [`complete`](NoteAi::complete) | single text prompt | free text |
//!
//! Every call is attempted exactly once; callers decide how to degrade.

use anyhow::{bail, Result};
use async_trait::async_trait;
use base64::Engine;
use std::time::Duration;

use crate::config::{AiConfig, Config};

/// Instruction sent alongside a PDF for vision transcription.
pub const TRANSCRIPTION_PROMPT: &str = "Please read and transcribe all the text content from this PDF. \
This appears to be handwritten or scanned notes. Extract all text, mathematical formulas, \
diagrams descriptions, and any other written content from all pages. Be thorough and accurate \
in your transcription. Organize the content by pages if possible.";

/// A language model able to read PDFs and answer prompts.
#[async_trait]
pub trait NoteAi: Send + Sync {
    /// Transcribes every page of the PDF in `pdf` and returns the text.
    async fn transcribe_pdf(&self, pdf: &[u8]) -> Result<String>;

    /// Sends `prompt` as a single user message and returns the reply text.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Anthropic Messages API client.
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    config: AiConfig,
}

impl AnthropicClient {
    pub fn new(config: AiConfig, api_key: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_key,
            config,
        })
    }

    /// Builds a client from the app config, failing if the API key
    /// environment variable is missing.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.api_key()?;
        Self::new(config.ai.clone(), api_key)
    }

    async fn send(&self, model: &str, max_tokens: u32, content: serde_json::Value) -> Result<String> {
        let body = serde_json::json!({
            "model": model,
            "max_tokens": max_tokens,
            "messages": [{ "role": "user", "content": content }],
        });

        let url = format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.config.api_version)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Anthropic API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        parse_message_text(&json)
    }
}

#[async_trait]
impl NoteAi for AnthropicClient {
    async fn transcribe_pdf(&self, pdf: &[u8]) -> Result<String> {
        let data = base64::engine::general_purpose::STANDARD.encode(pdf);
        let content = serde_json::json!([
            {
                "type": "document",
                "source": {
                    "type": "base64",
                    "media_type": "application/pdf",
                    "data": data,
                }
            },
            { "type": "text", "text": TRANSCRIPTION_PROMPT }
        ]);
        self.send(
            &self.config.transcription_model,
            self.config.transcription_max_tokens,
            content,
        )
        .await
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        self.send(
            &self.config.analysis_model,
            self.config.analysis_max_tokens,
            serde_json::Value::String(prompt.to_string()),
        )
        .await
    }
}

/// Extracts the first text block from a Messages API response.
fn parse_message_text(json: &serde_json::Value) -> Result<String> {
    let blocks = json
        .get("content")
        .and_then(|c| c.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid Anthropic response: missing content array"))?;

    blocks
        .iter()
        .find(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
        .and_then(|b| b.get("text"))
        .and_then(|t| t.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid Anthropic response: no text block"))
}
