//! System diagnostics.
//!
//! Checks that the external collaborators the pipeline degrades around are
//! actually reachable: the LLM endpoint, Qdrant and the reference
//! collection.

use colored::Colorize;
use std::sync::Arc;

use crate::config::Config;
use crate::llm::LlmClient;
use crate::vectordb::VectorStore;

/// Health-check runner
pub struct Doctor {
    llm: Arc<LlmClient>,
    config: Config,
}

impl Doctor {
    pub fn new(llm: Arc<LlmClient>, config: Config) -> Self {
        Self { llm, config }
    }

    /// Run all checks, printing one line per check. Returns true when
    /// everything passed.
    pub async fn run(&self) -> bool {
        println!("{}", "careline doctor".bold());
        println!();

        let mut all_ok = true;

        let llm_ok = self.llm.health_check().await;
        report(
            llm_ok,
            &format!("LLM endpoint ({})", self.llm.api_base()),
            "check the API key and network connection",
        );
        all_ok &= llm_ok;

        match VectorStore::connect(
            &self.config.retrieval.qdrant_url,
            &self.config.retrieval.collection,
            self.config.embedding.dimension,
        )
        .await
        {
            Ok(store) => {
                report(true, &format!("Qdrant ({})", self.config.retrieval.qdrant_url), "");

                match store.count().await {
                    Ok(count) if count > 0 => {
                        report(true, &format!("reference collection ({} documents)", count), "");
                    }
                    Ok(_) => {
                        report(
                            false,
                            "reference collection is empty",
                            "run `careline setup-db` to ingest the dataset",
                        );
                        all_ok = false;
                    }
                    Err(_) => {
                        report(false, "reference collection", "collection is unreadable");
                        all_ok = false;
                    }
                }
            }
            Err(_) => {
                report(
                    false,
                    &format!("Qdrant ({})", self.config.retrieval.qdrant_url),
                    "start Qdrant or fix retrieval.qdrant_url in the config",
                );
                all_ok = false;
            }
        }

        println!();
        if all_ok {
            println!("{}", "All checks passed.".green());
        } else {
            println!("{}", "Some checks failed; chat will degrade accordingly.".yellow());
        }

        all_ok
    }
}

fn report(ok: bool, label: &str, hint: &str) {
    if ok {
        println!("  {} {}", "✓".green(), label);
    } else if hint.is_empty() {
        println!("  {} {}", "✗".red(), label);
    } else {
        println!("  {} {} — {}", "✗".red(), label, hint.dimmed());
    }
}
