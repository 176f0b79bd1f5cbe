//! Interactive chat loop.
//!
//! Streams the response as it is generated, then shows the sentiment
//! indicator and follow-up suggestions. Conversation history lives in the
//! session and is committed only after a stream is fully consumed; the
//! durable transcript gets one `(role, content)` pair per side of the
//! exchange.

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::Write;
use tracing::warn;

use crate::errors::{ChatError, Result};
use crate::history::HistoryStore;
use crate::pipeline::{ChatPipeline, HistoryEntry, TurnResult};

/// Terminal chat session
pub struct ChatSession {
    pipeline: ChatPipeline,
    transcript: HistoryStore,
    history: Vec<HistoryEntry>,
}

impl ChatSession {
    pub fn new(pipeline: ChatPipeline, transcript: HistoryStore) -> Self {
        Self {
            pipeline,
            transcript,
            history: Vec::new(),
        }
    }

    /// Run the read-eval-print loop until EOF or an exit command
    pub async fn run(&mut self) -> Result<()> {
        println!("{}", "Chatbot Tư vấn Tâm lý Quân nhân".bold());
        println!(
            "{}",
            "Nhập câu hỏi của bạn. /new bắt đầu phiên mới, /exit để thoát.".dimmed()
        );
        println!();

        let mut editor =
            DefaultEditor::new().map_err(|e| ChatError::Other(e.to_string()))?;

        loop {
            match editor.readline("bạn> ") {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match line {
                        "/exit" | "/quit" => break,
                        "/new" => {
                            self.history.clear();
                            self.transcript.new_session();
                            println!("{}", "Đã bắt đầu phiên trò chuyện mới.".dimmed());
                            continue;
                        }
                        _ => {}
                    }

                    let _ = editor.add_history_entry(line);
                    self.turn(line).await;
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => return Err(ChatError::Other(e.to_string())),
            }
        }

        println!("{}", "Tạm biệt. Hãy giữ gìn sức khỏe!".dimmed());
        Ok(())
    }

    async fn turn(&mut self, question: &str) {
        let mut stream = self.pipeline.process_stream(question, &self.history);

        print!("\n{} ", "trợ lý>".cyan().bold());
        let _ = std::io::stdout().flush();

        while let Some(chunk) = stream.next_chunk().await {
            print!("{}", chunk);
            let _ = std::io::stdout().flush();
        }
        println!("\n");

        let result = stream.finish().await;

        // Stream fully consumed; commit the exchange
        self.history.push(HistoryEntry {
            question: question.to_string(),
            response: result.response.clone(),
        });
        if let Err(e) = self.transcript.append("user", question) {
            warn!(error = %e, "failed to persist user message");
        }
        if let Err(e) = self.transcript.append("assistant", &result.response) {
            warn!(error = %e, "failed to persist assistant message");
        }

        self.show_assessment(&result);
    }

    fn show_assessment(&self, result: &TurnResult) {
        let severity = result.sentiment.severity;
        let severity_label = format!("{}/10", severity);
        let severity_colored = match severity {
            0..=3 => severity_label.green(),
            4..=7 => severity_label.yellow(),
            _ => severity_label.red(),
        };
        println!(
            "{} {} · {} · {}",
            "cảm xúc:".dimmed(),
            result.sentiment.emotion,
            severity_colored,
            result.sentiment.issue_type
        );

        if !result.follow_up_questions.is_empty() {
            println!("{}", "Câu hỏi gợi ý:".dimmed());
            for question in &result.follow_up_questions {
                println!("  💭 {}", question);
            }
        }

        if !result.error.is_empty() {
            println!("{}", format!("(một phần bị suy giảm: {})", result.error).dimmed());
        }

        println!();
    }
}
