//! Context retrieval.

pub mod engine;

pub use engine::VectorRetriever;
