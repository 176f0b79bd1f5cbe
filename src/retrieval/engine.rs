//! Semantic retriever over the reference store.
//!
//! Embeds the query locally and searches Qdrant; hits come back most
//! relevant first per the store's cosine metric. Failures propagate as
//! `Err` and are absorbed by the pipeline's retrieval stage wrapper, which
//! degrades to empty context.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::embedding::EmbeddingEngine;
use crate::errors::{ChatError, Result};
use crate::pipeline::{ReferenceDocument, Retriever};
use crate::vectordb::VectorStore;

/// Retriever backed by the embedding engine and the vector store
pub struct VectorRetriever {
    embedder: Arc<EmbeddingEngine>,
    store: Arc<VectorStore>,
    /// Minimum similarity score; 0.0 disables the cutoff
    threshold: f32,
}

impl VectorRetriever {
    pub fn new(embedder: Arc<EmbeddingEngine>, store: Arc<VectorStore>, threshold: f32) -> Self {
        Self {
            embedder,
            store,
            threshold,
        }
    }
}

#[async_trait]
impl Retriever for VectorRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ReferenceDocument>> {
        let embedding = self
            .embedder
            .embed(query)
            .map_err(|e| ChatError::Embedding(e.to_string()))?;

        let hits = self
            .store
            .search(&embedding, k, Some(self.threshold))
            .await
            .map_err(|e| ChatError::VectorStore(e.to_string()))?;

        debug!(count = hits.len(), "retrieved reference documents");

        Ok(hits
            .into_iter()
            .map(|hit| ReferenceDocument {
                content: hit.document,
                question: hit.question,
                answer: hit.answer,
                score: hit.score,
            })
            .collect())
    }
}
