//! Local embedding model.

pub mod engine;

pub use engine::EmbeddingEngine;
