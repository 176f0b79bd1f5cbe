//! LLM-backed sentiment analysis with a parse-or-default contract.
//!
//! The model is asked for a bare JSON object; whatever comes back, the
//! analyzer returns a well-formed assessment. Unparseable output degrades
//! to the default assessment here, so the fallback path is a first-class
//! behavior rather than an incidental exception swallow. Transport
//! failures still propagate and are handled by the pipeline's stage
//! wrapper.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::llm::prompts::{sentiment_prompt, SENTIMENT_SYSTEM_PROMPT};
use crate::llm::LlmClient;
use crate::pipeline::{SentimentAnalyzer, SentimentAssessment};

/// Sentiment analyzer backed by the completion API
pub struct LlmSentimentAnalyzer {
    client: Arc<LlmClient>,
}

/// Loosely-typed shape of the model's JSON reply; every field optional so
/// a partially-correct reply still contributes what it can
#[derive(Debug, Deserialize)]
struct RawAssessment {
    emotion: Option<String>,
    severity: Option<i64>,
    issue_type: Option<String>,
    needs_immediate_help: Option<bool>,
}

impl LlmSentimentAnalyzer {
    pub fn new(client: Arc<LlmClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SentimentAnalyzer for LlmSentimentAnalyzer {
    async fn analyze(&self, text: &str) -> Result<SentimentAssessment> {
        let reply = self
            .client
            .complete(SENTIMENT_SYSTEM_PROMPT, &sentiment_prompt(text))
            .await?;

        Ok(parse_assessment(&reply))
    }
}

/// Extract an assessment from a model reply, defaulting on any failure.
///
/// Models sometimes wrap the JSON in prose or code fences, so the first
/// `{...}` span is extracted before parsing.
pub fn parse_assessment(reply: &str) -> SentimentAssessment {
    let Some(json) = extract_json_object(reply) else {
        warn!("sentiment reply contained no JSON object, using default");
        return SentimentAssessment::default();
    };

    match serde_json::from_str::<RawAssessment>(json) {
        Ok(raw) => {
            let defaults = SentimentAssessment::default();
            let assessment = SentimentAssessment {
                emotion: raw.emotion.unwrap_or(defaults.emotion),
                severity: raw
                    .severity
                    .map(|s| s.clamp(1, 10) as u8)
                    .unwrap_or(defaults.severity),
                issue_type: raw.issue_type.unwrap_or(defaults.issue_type),
                needs_immediate_help: raw.needs_immediate_help.unwrap_or(false),
            };
            debug!(?assessment, "parsed sentiment assessment");
            assessment
        }
        Err(e) => {
            warn!(error = %e, "unparseable sentiment reply, using default");
            SentimentAssessment::default()
        }
    }
}

fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
