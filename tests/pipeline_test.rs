//! End-to-end pipeline behavior against mock collaborators.
//!
//! No model host or vector store is needed; every stage contract is
//! exercised through in-memory implementations.

use async_trait::async_trait;
use futures_util::stream;
use std::sync::{Arc, Mutex};

use careline::errors::{ChatError, Result};
use careline::pipeline::{
    ChatPipeline, ChunkStream, FollowUpGenerator, HistoryEntry, PipelineConfig, ReferenceDocument,
    ResponseGenerator, Retriever, SentimentAnalyzer, SentimentAssessment, ESCALATION_BANNER,
    FALLBACK_RESPONSE,
};

struct StaticSentiment(SentimentAssessment);

#[async_trait]
impl SentimentAnalyzer for StaticSentiment {
    async fn analyze(&self, _text: &str) -> Result<SentimentAssessment> {
        Ok(self.0.clone())
    }
}

struct FailingSentiment;

#[async_trait]
impl SentimentAnalyzer for FailingSentiment {
    async fn analyze(&self, _text: &str) -> Result<SentimentAssessment> {
        Err(ChatError::LlmApi("connection refused".to_string()))
    }
}

struct StaticRetriever(Vec<ReferenceDocument>);

#[async_trait]
impl Retriever for StaticRetriever {
    async fn retrieve(&self, _query: &str, k: usize) -> Result<Vec<ReferenceDocument>> {
        Ok(self.0.iter().take(k).cloned().collect())
    }
}

struct FailingRetriever;

#[async_trait]
impl Retriever for FailingRetriever {
    async fn retrieve(&self, _query: &str, _k: usize) -> Result<Vec<ReferenceDocument>> {
        Err(ChatError::VectorStore("qdrant unreachable".to_string()))
    }
}

/// Replies with fixed text and records the history block each call received
struct RecordingGenerator {
    reply: String,
    seen_history: Mutex<Vec<String>>,
}

impl RecordingGenerator {
    fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            seen_history: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ResponseGenerator for RecordingGenerator {
    async fn generate(&self, _question: &str, _context: &str, history: &str) -> Result<String> {
        self.seen_history.lock().unwrap().push(history.to_string());
        Ok(self.reply.clone())
    }

    async fn generate_stream(
        &self,
        question: &str,
        context: &str,
        history: &str,
    ) -> Result<ChunkStream> {
        let text = self.generate(question, context, history).await?;
        Ok(Box::pin(stream::once(async move { Ok(text) })))
    }
}

/// Streams a fixed chunk sequence; the last item may be an error
struct ChunkGenerator {
    chunks: Vec<Result<String>>,
}

impl ChunkGenerator {
    fn ok(chunks: &[&str]) -> Self {
        Self {
            chunks: chunks.iter().map(|c| Ok(c.to_string())).collect(),
        }
    }

    fn failing_after(chunks: &[&str]) -> Self {
        let mut items: Vec<Result<String>> =
            chunks.iter().map(|c| Ok(c.to_string())).collect();
        items.push(Err(ChatError::Streaming("connection reset".to_string())));
        Self { chunks: items }
    }
}

#[async_trait]
impl ResponseGenerator for ChunkGenerator {
    async fn generate(&self, _question: &str, _context: &str, _history: &str) -> Result<String> {
        let mut text = String::new();
        for chunk in &self.chunks {
            match chunk {
                Ok(c) => text.push_str(c),
                Err(e) => return Err(ChatError::Streaming(e.to_string())),
            }
        }
        Ok(text)
    }

    async fn generate_stream(
        &self,
        _question: &str,
        _context: &str,
        _history: &str,
    ) -> Result<ChunkStream> {
        let items: Vec<Result<String>> = self
            .chunks
            .iter()
            .map(|chunk| match chunk {
                Ok(c) => Ok(c.clone()),
                Err(e) => Err(ChatError::Streaming(e.to_string())),
            })
            .collect();
        Ok(Box::pin(stream::iter(items)))
    }
}

struct FailingGenerator;

#[async_trait]
impl ResponseGenerator for FailingGenerator {
    async fn generate(&self, _question: &str, _context: &str, _history: &str) -> Result<String> {
        Err(ChatError::LlmApi("model overloaded".to_string()))
    }

    async fn generate_stream(
        &self,
        _question: &str,
        _context: &str,
        _history: &str,
    ) -> Result<ChunkStream> {
        Err(ChatError::LlmApi("model overloaded".to_string()))
    }
}

struct StaticFollowUp(Vec<String>);

#[async_trait]
impl FollowUpGenerator for StaticFollowUp {
    async fn suggest(&self, _question: &str, _response: &str) -> Result<Vec<String>> {
        Ok(self.0.clone())
    }
}

struct FailingFollowUp;

#[async_trait]
impl FollowUpGenerator for FailingFollowUp {
    async fn suggest(&self, _question: &str, _response: &str) -> Result<Vec<String>> {
        Err(ChatError::LlmApi("model overloaded".to_string()))
    }
}

fn calm() -> SentimentAssessment {
    SentimentAssessment {
        emotion: "bình tĩnh".to_string(),
        severity: 3,
        issue_type: "giấc ngủ".to_string(),
        needs_immediate_help: false,
    }
}

fn document(content: &str, score: f32) -> ReferenceDocument {
    ReferenceDocument {
        content: content.to_string(),
        question: None,
        answer: None,
        score,
    }
}

fn pipeline(
    sentiment: impl SentimentAnalyzer + 'static,
    retriever: impl Retriever + 'static,
    generator: impl ResponseGenerator + 'static,
    follow_up: impl FollowUpGenerator + 'static,
) -> ChatPipeline {
    ChatPipeline::with_config(
        Arc::new(sentiment),
        Arc::new(retriever),
        Arc::new(generator),
        Arc::new(follow_up),
        PipelineConfig { top_k: 3 },
    )
}

#[tokio::test]
async fn full_turn_with_all_stages_healthy() {
    let pipeline = pipeline(
        StaticSentiment(calm()),
        StaticRetriever(vec![document("tài liệu một", 0.9), document("tài liệu hai", 0.8)]),
        RecordingGenerator::new("Hãy thử thư giãn trước khi ngủ."),
        StaticFollowUp(vec!["Bạn ngủ mấy tiếng mỗi đêm?".to_string()]),
    );

    let mut history = Vec::new();
    let result = pipeline.process("Tôi khó ngủ", &mut history).await;

    assert_eq!(result.response, "Hãy thử thư giãn trước khi ngủ.");
    assert_eq!(result.context, "tài liệu một\n\ntài liệu hai");
    assert_eq!(result.sentiment.severity, 3);
    assert_eq!(result.follow_up_questions.len(), 1);
    assert!(result.error.is_empty());
    assert!(!result.needs_immediate_help);

    assert_eq!(history.len(), 1);
    assert_eq!(history[0].question, "Tôi khó ngủ");
    assert_eq!(history[0].response, result.response);
}

#[tokio::test]
async fn response_is_never_empty_and_severity_in_range() {
    let cases: Vec<ChatPipeline> = vec![
        pipeline(
            FailingSentiment,
            FailingRetriever,
            FailingGenerator,
            FailingFollowUp,
        ),
        pipeline(
            StaticSentiment(SentimentAssessment {
                severity: 0,
                ..calm()
            }),
            StaticRetriever(vec![]),
            ChunkGenerator::ok(&[""]),
            StaticFollowUp(vec![]),
        ),
    ];

    for pipeline in cases {
        let mut history = Vec::new();
        let result = pipeline.process("Xin chào", &mut history).await;
        assert!(!result.response.is_empty());
        assert!((1..=10).contains(&result.sentiment.severity));
    }
}

#[tokio::test]
async fn empty_retrieval_leaves_context_empty() {
    let pipeline = pipeline(
        StaticSentiment(calm()),
        StaticRetriever(vec![]),
        RecordingGenerator::new("trả lời"),
        StaticFollowUp(vec![]),
    );

    let mut history = Vec::new();
    let result = pipeline.process("câu hỏi lạ", &mut history).await;
    assert_eq!(result.context, "");
    assert!(result.error.is_empty());
}

#[tokio::test]
async fn high_severity_prepends_banner_exactly_once() {
    let pipeline = pipeline(
        StaticSentiment(SentimentAssessment {
            emotion: "tuyệt vọng".to_string(),
            severity: 9,
            issue_type: "khủng hoảng".to_string(),
            needs_immediate_help: true,
        }),
        StaticRetriever(vec![]),
        RecordingGenerator::new("Tôi rất tiếc khi nghe điều này."),
        StaticFollowUp(vec![]),
    );

    let mut history = Vec::new();
    let result = pipeline
        .process("Tôi cảm thấy rất tuyệt vọng", &mut history)
        .await;

    assert!(result.response.starts_with(ESCALATION_BANNER));
    assert!(result.response.ends_with("Tôi rất tiếc khi nghe điều này."));
    assert_eq!(result.response.matches("LƯU Ý QUAN TRỌNG").count(), 1);
    assert!(result.needs_immediate_help);
}

#[tokio::test]
async fn immediate_help_flag_alone_triggers_banner() {
    let pipeline = pipeline(
        StaticSentiment(SentimentAssessment {
            severity: 4,
            needs_immediate_help: true,
            ..calm()
        }),
        StaticRetriever(vec![]),
        RecordingGenerator::new("trả lời"),
        StaticFollowUp(vec![]),
    );

    let mut history = Vec::new();
    let result = pipeline.process("câu hỏi", &mut history).await;
    assert!(result.response.starts_with(ESCALATION_BANNER));
}

#[tokio::test]
async fn history_grows_by_one_entry_per_turn_in_order() {
    let pipeline = pipeline(
        StaticSentiment(calm()),
        StaticRetriever(vec![]),
        RecordingGenerator::new("trả lời"),
        StaticFollowUp(vec![]),
    );

    let mut history = Vec::new();
    for i in 0..4 {
        pipeline.process(&format!("câu hỏi {}", i), &mut history).await;
    }

    assert_eq!(history.len(), 4);
    for (i, entry) in history.iter().enumerate() {
        assert_eq!(entry.question, format!("câu hỏi {}", i));
    }
}

#[tokio::test]
async fn generator_sees_only_last_three_turns_oldest_first() {
    let generator = Arc::new(RecordingGenerator::new("trả lời"));
    let pipeline = ChatPipeline::with_config(
        Arc::new(StaticSentiment(calm())),
        Arc::new(StaticRetriever(vec![])),
        Arc::clone(&generator) as Arc<dyn ResponseGenerator>,
        Arc::new(StaticFollowUp(vec![])),
        PipelineConfig { top_k: 3 },
    );

    let mut history: Vec<HistoryEntry> = (1..=5)
        .map(|i| HistoryEntry {
            question: format!("q{}", i),
            response: format!("a{}", i),
        })
        .collect();

    pipeline.process("câu hỏi mới", &mut history).await;

    let seen = generator.seen_history.lock().unwrap();
    let block = &seen[0];
    assert!(!block.contains("q1"));
    assert!(!block.contains("q2"));
    assert_eq!(
        block.as_str(),
        "Q: q3\nA: a3\n\nQ: q4\nA: a4\n\nQ: q5\nA: a5"
    );
}

#[tokio::test]
async fn sentiment_failure_degrades_to_default_and_records_error() {
    let pipeline = pipeline(
        FailingSentiment,
        StaticRetriever(vec![document("tài liệu", 0.9)]),
        RecordingGenerator::new("trả lời"),
        StaticFollowUp(vec![]),
    );

    let mut history = Vec::new();
    let result = pipeline.process("câu hỏi", &mut history).await;

    assert_eq!(result.sentiment, SentimentAssessment::default());
    assert!(result.error.contains("Sentiment analysis error"));
    // The rest of the turn still runs
    assert_eq!(result.response, "trả lời");
    assert_eq!(result.context, "tài liệu");
}

#[tokio::test]
async fn generation_failure_yields_fallback_and_error() {
    let pipeline = pipeline(
        StaticSentiment(calm()),
        StaticRetriever(vec![]),
        FailingGenerator,
        StaticFollowUp(vec![]),
    );

    let mut history = Vec::new();
    let result = pipeline.process("câu hỏi", &mut history).await;

    assert_eq!(result.response, FALLBACK_RESPONSE);
    assert!(result.error.contains("Response generation error"));
    assert_eq!(history[0].response, FALLBACK_RESPONSE);
}

#[tokio::test]
async fn empty_generator_output_falls_back_without_error() {
    let pipeline = pipeline(
        StaticSentiment(calm()),
        StaticRetriever(vec![]),
        ChunkGenerator::ok(&["   "]),
        StaticFollowUp(vec![]),
    );

    let mut history = Vec::new();
    let result = pipeline.process("câu hỏi", &mut history).await;
    assert_eq!(result.response, FALLBACK_RESPONSE);
    assert!(result.error.is_empty());
}

#[tokio::test]
async fn later_critical_failure_overwrites_earlier_error() {
    let pipeline = pipeline(
        FailingSentiment,
        FailingRetriever,
        FailingGenerator,
        StaticFollowUp(vec![]),
    );

    let mut history = Vec::new();
    let result = pipeline.process("câu hỏi", &mut history).await;
    assert!(result.error.contains("Response generation error"));
    assert!(!result.error.contains("Sentiment analysis"));
}

#[tokio::test]
async fn follow_up_failure_is_silent() {
    let pipeline = pipeline(
        StaticSentiment(calm()),
        StaticRetriever(vec![]),
        RecordingGenerator::new("trả lời"),
        FailingFollowUp,
    );

    let mut history = Vec::new();
    let result = pipeline.process("câu hỏi", &mut history).await;
    assert!(result.follow_up_questions.is_empty());
    assert!(result.error.is_empty());
}

#[tokio::test]
async fn follow_up_suggestions_capped_at_three() {
    let pipeline = pipeline(
        StaticSentiment(calm()),
        StaticRetriever(vec![]),
        RecordingGenerator::new("trả lời"),
        StaticFollowUp(vec![
            "một".to_string(),
            "hai".to_string(),
            "ba".to_string(),
            "bốn".to_string(),
        ]),
    );

    let mut history = Vec::new();
    let result = pipeline.process("câu hỏi", &mut history).await;
    assert_eq!(result.follow_up_questions.len(), 3);
}

#[tokio::test]
async fn empty_question_still_completes() {
    let pipeline = pipeline(
        StaticSentiment(calm()),
        StaticRetriever(vec![]),
        RecordingGenerator::new("Bạn muốn hỏi điều gì?"),
        StaticFollowUp(vec![]),
    );

    let mut history = Vec::new();
    let result = pipeline.process("", &mut history).await;
    assert!(!result.response.is_empty());
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn streamed_chunks_concatenate_to_final_response() {
    let pipeline = pipeline(
        StaticSentiment(calm()),
        StaticRetriever(vec![]),
        ChunkGenerator::ok(&["Hãy ", "thử ", "thư giãn."]),
        StaticFollowUp(vec![]),
    );

    let mut stream = pipeline.process_stream("Tôi khó ngủ", &[]);
    let mut collected = String::new();
    while let Some(chunk) = stream.next_chunk().await {
        collected.push_str(&chunk);
    }
    let result = stream.finish().await;

    assert_eq!(collected, "Hãy thử thư giãn.");
    assert_eq!(result.response, collected);
    assert!(result.error.is_empty());
}

#[tokio::test]
async fn streaming_emits_banner_as_first_chunk() {
    let pipeline = pipeline(
        StaticSentiment(SentimentAssessment {
            severity: 9,
            needs_immediate_help: true,
            ..calm()
        }),
        StaticRetriever(vec![]),
        ChunkGenerator::ok(&["Tôi rất ", "tiếc."]),
        StaticFollowUp(vec![]),
    );

    let mut stream = pipeline.process_stream("Tôi cảm thấy rất tuyệt vọng", &[]);
    let first = stream.next_chunk().await.unwrap();
    assert!(first.starts_with(ESCALATION_BANNER));

    let mut collected = first;
    while let Some(chunk) = stream.next_chunk().await {
        collected.push_str(&chunk);
    }
    let result = stream.finish().await;

    // The assembled stream matches the finalized response
    assert_eq!(collected, result.response);
    assert_eq!(result.response.matches("LƯU Ý QUAN TRỌNG").count(), 1);
}

#[tokio::test]
async fn mid_stream_failure_keeps_partial_text_and_records_error() {
    let pipeline = pipeline(
        StaticSentiment(calm()),
        StaticRetriever(vec![]),
        ChunkGenerator::failing_after(&["Một phần "]),
        StaticFollowUp(vec![]),
    );

    let mut stream = pipeline.process_stream("câu hỏi", &[]);
    while stream.next_chunk().await.is_some() {}
    let result = stream.finish().await;

    assert_eq!(result.response, "Một phần ");
    assert!(result.error.contains("Response generation error"));
}

#[tokio::test]
async fn stream_start_failure_falls_back() {
    let pipeline = pipeline(
        StaticSentiment(calm()),
        StaticRetriever(vec![]),
        FailingGenerator,
        StaticFollowUp(vec![]),
    );

    let result = pipeline.process_stream("câu hỏi", &[]).finish().await;
    assert_eq!(result.response, FALLBACK_RESPONSE);
    assert!(result.error.contains("Response generation error"));
}

#[tokio::test]
async fn dropping_the_stream_cancels_the_turn() {
    let pipeline = pipeline(
        StaticSentiment(calm()),
        StaticRetriever(vec![]),
        ChunkGenerator::ok(&["a", "b", "c"]),
        FailingFollowUp,
    );

    let history: Vec<HistoryEntry> = Vec::new();
    let mut stream = pipeline.process_stream("câu hỏi", &history);
    let _ = stream.next_chunk().await;
    drop(stream);

    // The caller never committed the exchange
    assert!(history.is_empty());
}
