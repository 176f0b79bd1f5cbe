//! Reference dataset ingestion.
//!
//! Reads the Q/A counseling dataset from CSV, builds one embeddable
//! document per pair and upserts everything into the vector store in
//! batches.

use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::embedding::EmbeddingEngine;
use crate::errors::{ChatError, Result};
use crate::vectordb::{StoredDocument, VectorStore};

/// One row of the counseling dataset
#[derive(Debug, Clone, Deserialize)]
pub struct QaRecord {
    pub question: String,
    pub answer: String,
}

/// An embeddable reference document built from a Q/A pair
#[derive(Debug, Clone)]
pub struct Document {
    pub content: String,
    pub question: String,
    pub answer: String,
}

/// CSV dataset reader
pub struct DataProcessor {
    path: PathBuf,
}

impl DataProcessor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load all rows, dropping records with a missing question or answer
    pub fn load(&self) -> Result<Vec<QaRecord>> {
        let mut reader = csv::Reader::from_path(&self.path)
            .map_err(|e| ChatError::Ingest(format!("cannot read {}: {}", self.path.display(), e)))?;

        let mut records = Vec::new();
        let mut skipped = 0usize;
        for row in reader.deserialize::<QaRecord>() {
            let record = row.map_err(|e| ChatError::Ingest(e.to_string()))?;
            if record.question.trim().is_empty() || record.answer.trim().is_empty() {
                skipped += 1;
                continue;
            }
            records.push(record);
        }

        if skipped > 0 {
            warn!(skipped, "dropped incomplete dataset rows");
        }
        info!(count = records.len(), "loaded dataset records");

        Ok(records)
    }

    /// Build the embeddable documents for the whole dataset
    pub fn documents(&self) -> Result<Vec<Document>> {
        Ok(self.load()?.into_iter().map(build_document).collect())
    }
}

/// Q/A pair formatted the way the corpus is embedded and retrieved
fn build_document(record: QaRecord) -> Document {
    Document {
        content: format!(
            "Câu hỏi: {}\nCâu trả lời: {}",
            record.question, record.answer
        ),
        question: record.question,
        answer: record.answer,
    }
}

/// Rebuild the reference collection from the dataset.
///
/// Clears the collection first, then embeds and upserts in batches.
/// Returns the number of documents stored.
pub async fn setup_database(
    processor: &DataProcessor,
    embedder: Arc<EmbeddingEngine>,
    store: Arc<VectorStore>,
    batch_size: usize,
) -> Result<usize> {
    let documents = processor.documents()?;
    info!(count = documents.len(), "rebuilding reference collection");

    store
        .clear()
        .await
        .map_err(|e| ChatError::VectorStore(e.to_string()))?;

    let batch_size = batch_size.max(1);
    let mut stored = 0usize;
    for batch in documents.chunks(batch_size) {
        let texts: Vec<&str> = batch.iter().map(|doc| doc.content.as_str()).collect();
        let embeddings = embedder
            .embed_batch(&texts)
            .map_err(|e| ChatError::Embedding(e.to_string()))?;

        let points = batch
            .iter()
            .zip(embeddings)
            .map(|(doc, embedding)| StoredDocument {
                id: Uuid::new_v4().to_string(),
                content: doc.content.clone(),
                embedding,
                question: doc.question.clone(),
                answer: doc.answer.clone(),
            })
            .collect();

        store
            .upsert_batch(points)
            .await
            .map_err(|e| ChatError::VectorStore(e.to_string()))?;
        stored += batch.len();
    }

    info!(stored, "reference collection rebuilt");
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_dataset() {
        let (_dir, path) = write_csv(
            "question,answer\n\
             Tôi khó ngủ,Hãy thử thư giãn trước khi ngủ\n\
             Tôi nhớ nhà,Hãy gọi điện cho gia đình thường xuyên\n",
        );

        let records = DataProcessor::new(&path).load().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].question, "Tôi khó ngủ");
    }

    #[test]
    fn test_incomplete_rows_dropped() {
        let (_dir, path) = write_csv(
            "question,answer\n\
             Tôi khó ngủ,Hãy thử thư giãn\n\
             ,Thiếu câu hỏi\n\
             Thiếu câu trả lời,\n",
        );

        let records = DataProcessor::new(&path).load().unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_document_format() {
        let doc = build_document(QaRecord {
            question: "Tôi khó ngủ".to_string(),
            answer: "Hãy thử thư giãn".to_string(),
        });

        assert_eq!(doc.content, "Câu hỏi: Tôi khó ngủ\nCâu trả lời: Hãy thử thư giãn");
        assert_eq!(doc.question, "Tôi khó ngủ");
    }

    #[test]
    fn test_missing_file_errors() {
        let result = DataProcessor::new("/nonexistent/data.csv").load();
        assert!(matches!(result, Err(ChatError::Ingest(_))));
    }
}
