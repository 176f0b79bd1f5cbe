//! Hosted LLM plumbing: completion client, SSE stream parser and prompt
//! templates.

pub mod client;
pub mod parser;
pub mod prompts;

pub use client::LlmClient;
pub use parser::SseParser;
