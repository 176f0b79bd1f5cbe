//! LLM-backed follow-up question suggestion.
//!
//! Asks the model for a JSON array of at most 3 questions. An unparseable
//! reply yields an empty set — empty output is valid and never an error.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use crate::errors::Result;
use crate::llm::prompts::{follow_up_prompt, FOLLOW_UP_SYSTEM_PROMPT};
use crate::llm::LlmClient;
use crate::pipeline::FollowUpGenerator;

/// Follow-up generator backed by the completion API
pub struct LlmFollowUpGenerator {
    client: Arc<LlmClient>,
}

impl LlmFollowUpGenerator {
    pub fn new(client: Arc<LlmClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FollowUpGenerator for LlmFollowUpGenerator {
    async fn suggest(&self, question: &str, response: &str) -> Result<Vec<String>> {
        let reply = self
            .client
            .complete(FOLLOW_UP_SYSTEM_PROMPT, &follow_up_prompt(question, response))
            .await?;

        Ok(parse_suggestions(&reply))
    }
}

/// Extract at most 3 suggestions from a model reply; empty on failure
pub fn parse_suggestions(reply: &str) -> Vec<String> {
    let Some(json) = extract_json_array(reply) else {
        warn!("follow-up reply contained no JSON array");
        return Vec::new();
    };

    match serde_json::from_str::<Vec<String>>(json) {
        Ok(mut questions) => {
            questions.retain(|q| !q.trim().is_empty());
            questions.truncate(3);
            questions
        }
        Err(e) => {
            warn!(error = %e, "unparseable follow-up reply");
            Vec::new()
        }
    }
}

fn extract_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_array() {
        let reply = r#"["Làm sao để ngủ ngon hơn?", "Tôi nên nói với ai?"]"#;
        let suggestions = parse_suggestions(reply);
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0], "Làm sao để ngủ ngon hơn?");
    }

    #[test]
    fn test_parse_array_in_prose() {
        let reply = "Các câu hỏi gợi ý:\n[\"a\", \"b\", \"c\"]\nHy vọng hữu ích.";
        assert_eq!(parse_suggestions(reply).len(), 3);
    }

    #[test]
    fn test_truncates_to_three() {
        let reply = r#"["a", "b", "c", "d", "e"]"#;
        assert_eq!(parse_suggestions(reply).len(), 3);
    }

    #[test]
    fn test_garbage_yields_empty() {
        assert!(parse_suggestions("không có gợi ý nào").is_empty());
        assert!(parse_suggestions("[broken").is_empty());
    }

    #[test]
    fn test_blank_entries_dropped() {
        let reply = r#"["", "  ", "câu hỏi thật"]"#;
        let suggestions = parse_suggestions(reply);
        assert_eq!(suggestions, vec!["câu hỏi thật".to_string()]);
    }
}
