//! Leaf-component contracts consumed by the orchestrator.
//!
//! Each stage talks to its collaborator through one of these traits, so the
//! pipeline can be exercised against mocks without a model host or vector
//! store running.

use async_trait::async_trait;
use futures_util::Stream;
use std::pin::Pin;

use crate::errors::Result;
use crate::pipeline::state::{ReferenceDocument, SentimentAssessment};

/// Lazy, finite, non-restartable sequence of response text chunks
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Emotional/severity assessment of a user message.
///
/// Implementations must return a well-formed assessment for any model
/// output; unparseable replies degrade to [`SentimentAssessment::default`]
/// inside the analyzer. Transport failures still surface as `Err` and are
/// absorbed by the orchestrator's stage wrapper.
#[async_trait]
pub trait SentimentAnalyzer: Send + Sync {
    async fn analyze(&self, text: &str) -> Result<SentimentAssessment>;
}

/// Ranked reference passages for a query, most relevant first.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ReferenceDocument>>;
}

/// Response text generation from question, retrieved context and formatted
/// history. The streaming variant must concatenate to the same text the
/// non-streaming variant would produce for equivalent inputs.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate(&self, question: &str, context: &str, history: &str) -> Result<String>;

    async fn generate_stream(
        &self,
        question: &str,
        context: &str,
        history: &str,
    ) -> Result<ChunkStream>;
}

/// Suggested next questions for a completed exchange. Empty output is valid.
#[async_trait]
pub trait FollowUpGenerator: Send + Sync {
    async fn suggest(&self, question: &str, response: &str) -> Result<Vec<String>>;
}
