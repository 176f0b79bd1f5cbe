//! Request-processing pipeline: state records, stage contracts and the
//! orchestrator that sequences them.

pub mod orchestrator;
pub mod state;
pub mod traits;

pub use orchestrator::{ChatPipeline, PipelineConfig, Stage, TurnStream};
pub use state::{
    format_history, HistoryEntry, ReferenceDocument, SentimentAssessment, TurnResult, TurnState,
    ESCALATION_BANNER, FALLBACK_RESPONSE, HISTORY_WINDOW,
};
pub use traits::{ChunkStream, FollowUpGenerator, ResponseGenerator, Retriever, SentimentAnalyzer};
