//! Vector store backing the retriever.

pub mod manager;

pub use manager::{SearchHit, StoredDocument, VectorStore};
