//! LLM-backed response generation.
//!
//! Both variants build the same prompt from question, retrieved context and
//! the formatted history window, so the streamed chunks concatenate to the
//! text the buffered variant would return for equivalent inputs.

use async_trait::async_trait;
use std::sync::Arc;

use crate::errors::Result;
use crate::llm::prompts::{response_prompt, COUNSELOR_SYSTEM_PROMPT};
use crate::llm::LlmClient;
use crate::pipeline::{ChunkStream, ResponseGenerator};

/// Response generator backed by the completion API
pub struct LlmResponseGenerator {
    client: Arc<LlmClient>,
}

impl LlmResponseGenerator {
    pub fn new(client: Arc<LlmClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResponseGenerator for LlmResponseGenerator {
    async fn generate(&self, question: &str, context: &str, history: &str) -> Result<String> {
        self.client
            .complete(
                COUNSELOR_SYSTEM_PROMPT,
                &response_prompt(question, context, history),
            )
            .await
    }

    async fn generate_stream(
        &self,
        question: &str,
        context: &str,
        history: &str,
    ) -> Result<ChunkStream> {
        let stream = self
            .client
            .complete_stream(
                COUNSELOR_SYSTEM_PROMPT,
                &response_prompt(question, context, history),
            )
            .await?;

        Ok(Box::pin(stream))
    }
}
