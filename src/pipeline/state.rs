//! Turn state and result records for the five-stage pipeline.
//!
//! One `TurnState` is created per user turn, threaded through every stage
//! and discarded once the `TurnResult` is extracted. Nothing here survives
//! across turns; conversation history is owned by the caller.

use serde::{Deserialize, Serialize};

/// Number of prior turns the generation stage sees
pub const HISTORY_WINDOW: usize = 3;

/// Fallback reply when response generation fails
pub const FALLBACK_RESPONSE: &str =
    "Xin lỗi, tôi gặp khó khăn trong việc xử lý câu hỏi của bạn. Vui lòng thử lại sau.";

/// Fixed escalation banner prepended to the response under high-severity
/// conditions. Referral targets come from the unit support chain.
pub const ESCALATION_BANNER: &str = "\
⚠️ LƯU Ý QUAN TRỌNG:
Dựa trên câu hỏi của bạn, tôi khuyến nghị bạn nên tìm kiếm sự hỗ trợ chuyên môn ngay lập tức.
Vui lòng liên hệ với:
- Cán bộ tâm lý trong đơn vị
- Bác sĩ quân y
- Cấp trên trực tiếp
- Đường dây nóng hỗ trợ tâm lý quân đội

Bạn không đơn độc và luôn có người sẵn sàng lắng nghe và hỗ trợ bạn.";

/// One completed question/response exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub question: String,
    pub response: String,
}

/// Structured emotional assessment of a user message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentAssessment {
    /// Free-form emotion label ("lo lắng", "buồn", ...)
    pub emotion: String,
    /// Severity on a 1-10 scale
    pub severity: u8,
    /// Free-form issue category ("stress", "gia đình", ...)
    pub issue_type: String,
    /// Model-decided escalation flag
    pub needs_immediate_help: bool,
}

impl Default for SentimentAssessment {
    fn default() -> Self {
        Self {
            emotion: "unknown".to_string(),
            severity: 5,
            issue_type: "general".to_string(),
            needs_immediate_help: false,
        }
    }
}

impl SentimentAssessment {
    /// Clamp severity into the valid 1-10 range
    pub fn clamped(mut self) -> Self {
        self.severity = self.severity.clamp(1, 10);
        self
    }
}

/// A ranked reference passage returned by the retriever
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceDocument {
    pub content: String,
    /// Origin question from the Q/A dataset, when known
    pub question: Option<String>,
    /// Origin answer from the Q/A dataset, when known
    pub answer: Option<String>,
    pub score: f32,
}

/// Mutable per-turn record threaded through the pipeline stages.
///
/// Invariant: once a stage completes, its output field is only ever
/// replaced by that stage's own fallback, never reverted to the initial
/// placeholder by a later stage.
#[derive(Debug, Clone)]
pub struct TurnState {
    pub question: String,
    pub context: String,
    pub response: String,
    pub sentiment: SentimentAssessment,
    pub follow_up_questions: Vec<String>,
    pub needs_immediate_help: bool,
    pub error: String,
}

impl TurnState {
    pub fn new(question: &str) -> Self {
        Self {
            question: question.to_string(),
            context: String::new(),
            response: String::new(),
            sentiment: SentimentAssessment::default(),
            follow_up_questions: Vec::new(),
            needs_immediate_help: false,
            error: String::new(),
        }
    }

    /// Emergency-escalation rule, evaluated once per turn after generation.
    ///
    /// Deterministic and idempotent: re-applying to the same state never
    /// stacks a second banner.
    pub fn apply_emergency_check(&mut self) {
        if self.sentiment.severity >= 8 || self.needs_immediate_help {
            if !self.response.starts_with(ESCALATION_BANNER) {
                self.response = format!("{}\n\n{}", ESCALATION_BANNER, self.response);
            }
        }
    }

    pub fn into_result(self) -> TurnResult {
        TurnResult {
            response: self.response,
            context: self.context,
            sentiment: self.sentiment,
            follow_up_questions: self.follow_up_questions,
            needs_immediate_help: self.needs_immediate_help,
            error: self.error,
        }
    }
}

/// Finalized outcome of one pipeline turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResult {
    /// Generated reply; never empty (fallback apology at minimum)
    pub response: String,
    /// Retrieved reference text, empty when nothing matched
    pub context: String,
    pub sentiment: SentimentAssessment,
    /// At most 3 suggested next questions
    pub follow_up_questions: Vec<String>,
    pub needs_immediate_help: bool,
    /// Description of the last failing critical stage, empty when clean
    pub error: String,
}

/// Format the last [`HISTORY_WINDOW`] entries for the generation prompt:
/// `Q:`/`A:` blocks joined by blank lines, oldest first.
pub fn format_history(history: &[HistoryEntry]) -> String {
    let start = history.len().saturating_sub(HISTORY_WINDOW);
    history[start..]
        .iter()
        .map(|entry| format!("Q: {}\nA: {}", entry.question, entry.response))
        .collect::<Vec<_>>()
        .join("\n\n")
}
