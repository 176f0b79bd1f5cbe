//! Hosted LLM completion client.
//!
//! Talks to an OpenAI-compatible chat-completions endpoint (Groq in the
//! default configuration) over HTTPS, with both buffered and SSE streaming
//! variants.

use futures_util::{stream, Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::LlmConfig;
use crate::errors::{ChatError, Result};
use crate::llm::parser::SseParser;

/// Request timeout; generous because completions can take a while
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Chat-completions API client
#[derive(Debug, Clone)]
pub struct LlmClient {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl LlmClient {
    /// Create a client from configuration plus the resolved API key
    pub fn new(config: &LlmConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(ChatError::Http)?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    fn request_body(&self, system: &str, user: &str, stream: bool) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user.to_string(),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream,
        }
    }

    /// Request a full completion and return the reply text
    pub async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.api_base);
        debug!(model = %self.model, "requesting completion");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(system, user, false))
            .send()
            .await
            .map_err(|e| ChatError::LlmApi(format!("failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ChatError::LlmApi(format!("HTTP {}: {}", status, body)));
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| ChatError::LlmApi(format!("failed to parse completion: {}", e)))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ChatError::LlmApi("completion contained no content".to_string()))
    }

    /// Request a streaming completion; yields content deltas in emission
    /// order. Concatenating the chunks reconstructs the full reply.
    pub async fn complete_stream(
        &self,
        system: &str,
        user: &str,
    ) -> Result<impl Stream<Item = Result<String>>> {
        let url = format!("{}/chat/completions", self.api_base);
        debug!(model = %self.model, "requesting streaming completion");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(system, user, true))
            .send()
            .await
            .map_err(|e| ChatError::LlmApi(format!("failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ChatError::LlmApi(format!("HTTP {}: {}", status, body)));
        }

        let mut parser = SseParser::new();
        let deltas = response
            .bytes_stream()
            .map(move |chunk| match chunk {
                Ok(bytes) => parser.feed(&bytes),
                Err(e) => Err(ChatError::Streaming(e.to_string())),
            })
            .flat_map(|result| match result {
                Ok(deltas) => stream::iter(deltas.into_iter().map(Ok).collect::<Vec<_>>()),
                Err(e) => stream::iter(vec![Err(e)]),
            });

        Ok(deltas)
    }

    /// Check whether the completion endpoint is reachable
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/models", self.api_base);

        match self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// Configured model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Configured API base URL
    pub fn api_base(&self) -> &str {
        &self.api_base
    }
}
