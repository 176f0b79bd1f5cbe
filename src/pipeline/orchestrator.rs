//! Pipeline orchestrator - runs one conversational turn.
//!
//! Fixed five-stage sequence: sentiment analysis, context retrieval,
//! response generation, follow-up generation, emergency check. Every stage
//! is wrapped independently so a failing collaborator degrades that one
//! stage instead of aborting the turn; `process` never returns an error.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::pipeline::state::{
    format_history, HistoryEntry, SentimentAssessment, TurnResult, TurnState, ESCALATION_BANNER,
    FALLBACK_RESPONSE, HISTORY_WINDOW,
};
use crate::pipeline::traits::{FollowUpGenerator, ResponseGenerator, Retriever, SentimentAnalyzer};

/// Pipeline stages, in fixed execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Sentiment,
    Retrieval,
    Generation,
    FollowUp,
    EmergencyCheck,
}

impl Stage {
    /// Critical stages record their failures in the turn result; the rest
    /// are absorbed silently.
    pub fn is_critical(self) -> bool {
        matches!(self, Stage::Sentiment | Stage::Retrieval | Stage::Generation)
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Sentiment => "Sentiment analysis",
            Stage::Retrieval => "Context retrieval",
            Stage::Generation => "Response generation",
            Stage::FollowUp => "Follow-up generation",
            Stage::EmergencyCheck => "Emergency check",
        }
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of reference passages to retrieve per turn
    pub top_k: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

/// Five-stage conversational pipeline.
///
/// Holds only its component references and construction-time configuration;
/// independent turns may run concurrently.
pub struct ChatPipeline {
    sentiment: Arc<dyn SentimentAnalyzer>,
    retriever: Arc<dyn Retriever>,
    generator: Arc<dyn ResponseGenerator>,
    follow_up: Arc<dyn FollowUpGenerator>,
    config: PipelineConfig,
}

impl ChatPipeline {
    pub fn new(
        sentiment: Arc<dyn SentimentAnalyzer>,
        retriever: Arc<dyn Retriever>,
        generator: Arc<dyn ResponseGenerator>,
        follow_up: Arc<dyn FollowUpGenerator>,
    ) -> Self {
        Self::with_config(
            sentiment,
            retriever,
            generator,
            follow_up,
            PipelineConfig::default(),
        )
    }

    pub fn with_config(
        sentiment: Arc<dyn SentimentAnalyzer>,
        retriever: Arc<dyn Retriever>,
        generator: Arc<dyn ResponseGenerator>,
        follow_up: Arc<dyn FollowUpGenerator>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            sentiment,
            retriever,
            generator,
            follow_up,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process one user turn and append the completed exchange to `history`.
    ///
    /// Total over its input domain: every stage failure is converted into a
    /// recorded diagnostic plus a fallback value, so the caller always
    /// receives a populated [`TurnResult`] with a non-empty response.
    pub async fn process(&self, question: &str, history: &mut Vec<HistoryEntry>) -> TurnResult {
        let mut state = TurnState::new(question);

        self.run_sentiment(&mut state).await;
        self.run_retrieval(&mut state).await;

        let window = format_history(history);
        match self.generator.generate(question, &state.context, &window).await {
            Ok(text) if !text.trim().is_empty() => {
                state.response = text;
                info!("response generated");
            }
            Ok(_) => {
                // Empty model output violates the non-empty guarantee
                warn!("generator returned empty text, substituting fallback");
                state.response = FALLBACK_RESPONSE.to_string();
            }
            Err(e) => {
                warn!(error = %e, "response generation failed");
                state.error = format!("{} error: {}", Stage::Generation.label(), e);
                state.response = FALLBACK_RESPONSE.to_string();
            }
        }

        self.run_follow_up(&mut state).await;
        state.apply_emergency_check();

        history.push(HistoryEntry {
            question: question.to_string(),
            response: state.response.clone(),
        });

        state.into_result()
    }

    /// Streaming variant of [`process`](Self::process).
    ///
    /// Runs the same five stages but forwards response chunks as the
    /// generator produces them; the final [`TurnResult`] is assembled only
    /// at stream exhaustion. History is borrowed read-only: the caller
    /// appends the exchange after draining the stream, so dropping the
    /// stream early never commits a partial entry.
    pub fn process_stream(&self, question: &str, history: &[HistoryEntry]) -> TurnStream {
        let question = question.to_string();
        // Only the look-back window matters downstream
        let start = history.len().saturating_sub(HISTORY_WINDOW);
        let window: Vec<HistoryEntry> = history[start..].to_vec();

        let sentiment = Arc::clone(&self.sentiment);
        let retriever = Arc::clone(&self.retriever);
        let generator = Arc::clone(&self.generator);
        let follow_up = Arc::clone(&self.follow_up);
        let top_k = self.config.top_k;

        let (tx, rx) = mpsc::channel::<String>(32);

        let handle = tokio::spawn(async move {
            let pipeline = ChatPipeline {
                sentiment,
                retriever,
                generator,
                follow_up,
                config: PipelineConfig { top_k },
            };

            let mut state = TurnState::new(&question);
            pipeline.run_sentiment(&mut state).await;
            pipeline.run_retrieval(&mut state).await;

            // The escalation rule depends only on sentiment, so the banner
            // can be emitted ahead of the generated text. The final
            // emergency check below is idempotent with this early emission.
            let escalate = state.sentiment.severity >= 8 || state.needs_immediate_help;
            if escalate {
                if tx.send(format!("{}\n\n", ESCALATION_BANNER)).await.is_err() {
                    return state.into_result();
                }
            }

            let window_block = format_history(&window);
            let mut generated = String::new();
            match pipeline
                .generator
                .generate_stream(&question, &state.context, &window_block)
                .await
            {
                Ok(mut stream) => {
                    while let Some(item) = stream.next().await {
                        match item {
                            Ok(chunk) => {
                                if tx.send(chunk.clone()).await.is_err() {
                                    // Consumer stopped iterating; abandon
                                    // the turn without committing anything
                                    return state.into_result();
                                }
                                generated.push_str(&chunk);
                            }
                            Err(e) => {
                                warn!(error = %e, "response stream failed");
                                state.error =
                                    format!("{} error: {}", Stage::Generation.label(), e);
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "response generation failed");
                    state.error = format!("{} error: {}", Stage::Generation.label(), e);
                }
            }

            if generated.trim().is_empty() {
                generated = FALLBACK_RESPONSE.to_string();
                if tx.send(generated.clone()).await.is_err() {
                    return state.into_result();
                }
            }
            state.response = generated;

            pipeline.run_follow_up(&mut state).await;
            state.apply_emergency_check();

            state.into_result()
        });

        TurnStream { rx, handle }
    }

    async fn run_sentiment(&self, state: &mut TurnState) {
        match self.sentiment.analyze(&state.question).await {
            Ok(assessment) => {
                let assessment = assessment.clamped();
                debug!(?assessment, "sentiment analyzed");
                state.needs_immediate_help = assessment.needs_immediate_help;
                state.sentiment = assessment;
            }
            Err(e) => {
                warn!(error = %e, "sentiment analysis failed");
                state.error = format!("{} error: {}", Stage::Sentiment.label(), e);
                state.sentiment = SentimentAssessment::default();
                state.needs_immediate_help = false;
            }
        }
    }

    async fn run_retrieval(&self, state: &mut TurnState) {
        match self.retriever.retrieve(&state.question, self.config.top_k).await {
            Ok(documents) => {
                info!(count = documents.len(), "context retrieved");
                state.context = documents
                    .iter()
                    .map(|doc| doc.content.as_str())
                    .collect::<Vec<_>>()
                    .join("\n\n");
            }
            Err(e) => {
                warn!(error = %e, "context retrieval failed");
                state.error = format!("{} error: {}", Stage::Retrieval.label(), e);
                state.context.clear();
            }
        }
    }

    /// Non-critical stage: failure leaves an empty suggestion list and is
    /// never surfaced in the turn result.
    async fn run_follow_up(&self, state: &mut TurnState) {
        match self
            .follow_up
            .suggest(&state.question, &state.response)
            .await
        {
            Ok(mut questions) => {
                questions.truncate(3);
                debug!(count = questions.len(), "follow-up questions generated");
                state.follow_up_questions = questions;
            }
            Err(e) => {
                warn!(error = %e, "follow-up generation failed");
                state.follow_up_questions = Vec::new();
            }
        }
    }
}

/// In-flight streaming turn.
///
/// Yields response chunks in emission order; [`finish`](Self::finish)
/// drains any remainder and returns the finalized [`TurnResult`]. Dropping
/// the stream instead cancels the turn: the producer task observes the
/// closed channel and exits without completing.
pub struct TurnStream {
    rx: mpsc::Receiver<String>,
    handle: JoinHandle<TurnResult>,
}

impl TurnStream {
    /// Next response chunk, or `None` once the response is complete
    pub async fn next_chunk(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Drain remaining chunks and return the finalized result
    pub async fn finish(mut self) -> TurnResult {
        while self.rx.recv().await.is_some() {}

        self.handle.await.unwrap_or_else(|e| {
            warn!(error = %e, "pipeline task failed");
            TurnResult {
                response: FALLBACK_RESPONSE.to_string(),
                context: String::new(),
                sentiment: SentimentAssessment::default(),
                follow_up_questions: Vec::new(),
                needs_immediate_help: false,
                error: format!("Pipeline error: {}", e),
            }
        })
    }
}
