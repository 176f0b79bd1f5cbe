//! Qdrant-backed reference store.
//!
//! One collection of embedded Q/A documents with cosine similarity. The
//! pipeline only ever reads from here; writes happen during dataset
//! ingestion.

use anyhow::{Context, Result};
use qdrant_client::{
    client::QdrantClient,
    qdrant::{
        point_id::PointIdOptions, value::Kind, vectors_config::Config,
        with_payload_selector::SelectorOptions, CountPoints, CreateCollection, Distance,
        PointId, PointStruct, SearchPoints, Value as QdrantValue, VectorParams, VectorsConfig,
        WithPayloadSelector,
    },
};
use std::collections::HashMap;
use tracing::info;

/// A scored hit from the reference collection
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    pub document: String,
    pub question: Option<String>,
    pub answer: Option<String>,
}

/// A document to upsert: content plus origin Q/A metadata
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub id: String,
    pub content: String,
    pub embedding: Vec<f32>,
    pub question: String,
    pub answer: String,
}

/// Vector store over a single Qdrant collection
pub struct VectorStore {
    client: QdrantClient,
    collection: String,
    dimension: u64,
}

impl VectorStore {
    /// Connect to Qdrant and ensure the collection exists
    pub async fn connect(url: &str, collection: &str, dimension: usize) -> Result<Self> {
        let client = QdrantClient::from_url(url)
            .build()
            .context("Failed to create Qdrant client")?;

        let store = Self {
            client,
            collection: collection.to_string(),
            dimension: dimension as u64,
        };

        store.ensure_collection().await?;
        Ok(store)
    }

    async fn ensure_collection(&self) -> Result<()> {
        let collections = self.client.list_collections().await?;
        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.collection);

        if !exists {
            info!(collection = %self.collection, "creating collection");
            self.client
                .create_collection(&CreateCollection {
                    collection_name: self.collection.clone(),
                    vectors_config: Some(VectorsConfig {
                        config: Some(Config::Params(VectorParams {
                            size: self.dimension,
                            distance: Distance::Cosine.into(),
                            ..Default::default()
                        })),
                    }),
                    ..Default::default()
                })
                .await
                .context("Failed to create collection")?;
        }

        Ok(())
    }

    /// Drop and recreate the collection
    pub async fn clear(&self) -> Result<()> {
        let collections = self.client.list_collections().await?;
        if collections
            .collections
            .iter()
            .any(|c| c.name == self.collection)
        {
            self.client
                .delete_collection(&self.collection)
                .await
                .context("Failed to delete collection")?;
        }
        self.ensure_collection().await
    }

    /// Upsert a batch of embedded documents
    pub async fn upsert_batch(&self, documents: Vec<StoredDocument>) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }

        let points: Vec<PointStruct> = documents
            .into_iter()
            .map(|doc| {
                let mut payload: HashMap<String, QdrantValue> = HashMap::new();
                payload.insert("document".to_string(), QdrantValue::from(doc.content));
                payload.insert("question".to_string(), QdrantValue::from(doc.question));
                payload.insert("answer".to_string(), QdrantValue::from(doc.answer));
                PointStruct::new(doc.id, doc.embedding, payload)
            })
            .collect();

        self.client
            .upsert_points_blocking(&self.collection, None, points, None)
            .await
            .context("Failed to upsert points")?;

        Ok(())
    }

    /// Search for the `top_k` most similar documents
    pub async fn search(
        &self,
        embedding: &[f32],
        top_k: usize,
        threshold: Option<f32>,
    ) -> Result<Vec<SearchHit>> {
        let result = self
            .client
            .search_points(&SearchPoints {
                collection_name: self.collection.clone(),
                vector: embedding.to_vec(),
                limit: top_k as u64,
                with_payload: Some(WithPayloadSelector {
                    selector_options: Some(SelectorOptions::Enable(true)),
                }),
                score_threshold: threshold.filter(|t| *t > 0.0),
                ..Default::default()
            })
            .await
            .context("Failed to search points")?;

        let hits = result
            .result
            .into_iter()
            .map(|point| {
                let payload = point.payload;
                SearchHit {
                    id: point.id.map(point_id_to_string).unwrap_or_default(),
                    score: point.score,
                    document: payload
                        .get("document")
                        .and_then(value_to_string)
                        .unwrap_or_default(),
                    question: payload.get("question").and_then(value_to_string),
                    answer: payload.get("answer").and_then(value_to_string),
                }
            })
            .collect();

        Ok(hits)
    }

    /// Number of documents in the collection
    pub async fn count(&self) -> Result<u64> {
        let response = self
            .client
            .count(&CountPoints {
                collection_name: self.collection.clone(),
                exact: Some(true),
                ..Default::default()
            })
            .await
            .context("Failed to count points")?;

        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }

    /// Collection name
    pub fn collection(&self) -> &str {
        &self.collection
    }
}

fn value_to_string(value: &QdrantValue) -> Option<String> {
    match &value.kind {
        Some(Kind::StringValue(s)) => Some(s.clone()),
        _ => None,
    }
}

fn point_id_to_string(id: PointId) -> String {
    match id.point_id_options {
        Some(PointIdOptions::Uuid(uuid)) => uuid,
        Some(PointIdOptions::Num(num)) => num.to_string(),
        None => String::new(),
    }
}
