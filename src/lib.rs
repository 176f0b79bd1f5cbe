//! Careline - trợ lý tư vấn tâm lý quân nhân.
//!
//! A retrieval-augmented counseling assistant for Vietnamese military
//! personnel. Each user turn runs through a fixed five-stage pipeline:
//! sentiment analysis, context retrieval from a Qdrant-backed reference
//! corpus, response generation, follow-up suggestion and an emergency
//! check that escalates high-severity turns. Stage failures degrade that
//! stage only; the caller always gets a usable response.

pub mod cli;
pub mod config;
pub mod doctor;
pub mod embedding;
pub mod errors;
pub mod followup;
pub mod generation;
pub mod history;
pub mod ingest;
pub mod llm;
pub mod pipeline;
pub mod repl;
pub mod retrieval;
pub mod sentiment;
pub mod vectordb;

pub use config::Config;
pub use errors::{ChatError, Result};
pub use pipeline::{
    ChatPipeline, HistoryEntry, PipelineConfig, SentimentAssessment, TurnResult, TurnStream,
};
