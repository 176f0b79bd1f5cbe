use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use careline::cli::{Args, Commands};
use careline::config::Config;
use careline::doctor::Doctor;
use careline::embedding::EmbeddingEngine;
use careline::followup::LlmFollowUpGenerator;
use careline::generation::LlmResponseGenerator;
use careline::history::HistoryStore;
use careline::ingest::{setup_database, DataProcessor};
use careline::llm::LlmClient;
use careline::pipeline::{ChatPipeline, PipelineConfig};
use careline::repl::ChatSession;
use careline::retrieval::VectorRetriever;
use careline::sentiment::LlmSentimentAnalyzer;
use careline::vectordb::VectorStore;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(args.log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path.clone())?,
        None => Config::load()?,
    };
    args.apply_overrides(&mut config);

    match args.command.as_ref().unwrap_or(&Commands::Chat) {
        Commands::Chat => {
            let pipeline = build_pipeline(&config).await?;
            let transcript = HistoryStore::new(&config.history.dir)?;
            ChatSession::new(pipeline, transcript).run().await?;
        }
        Commands::Ask { question } => {
            let pipeline = build_pipeline(&config).await?;
            let mut history = Vec::new();
            let result = pipeline.process(question, &mut history).await;

            println!("{}", result.response);
            if !result.follow_up_questions.is_empty() {
                eprintln!();
                for follow_up in &result.follow_up_questions {
                    eprintln!("  💭 {}", follow_up);
                }
            }
            if !result.error.is_empty() {
                eprintln!("{}", format!("degraded: {}", result.error).yellow());
            }
        }
        Commands::SetupDb { file } => {
            let dataset = file.clone().unwrap_or_else(|| config.data.file.clone());
            let processor = DataProcessor::new(dataset);

            let embedder = Arc::new(load_embedder(&config)?);
            let store = Arc::new(
                VectorStore::connect(
                    &config.retrieval.qdrant_url,
                    &config.retrieval.collection,
                    config.embedding.dimension,
                )
                .await?,
            );

            let stored =
                setup_database(&processor, embedder, store, config.embedding.batch_size).await?;
            println!("{} {} documents stored", "✓".green(), stored);
        }
        Commands::Doctor => {
            let api_key = config.api_key()?;
            let llm = Arc::new(LlmClient::new(&config.llm, api_key)?);
            let ok = Doctor::new(llm, config).run().await;
            if !ok {
                std::process::exit(1);
            }
        }
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

/// Wire the full pipeline from configuration: hosted LLM for the language
/// stages, local embeddings plus Qdrant for retrieval.
async fn build_pipeline(config: &Config) -> Result<ChatPipeline> {
    let api_key = config.api_key()?;
    let llm = Arc::new(LlmClient::new(&config.llm, api_key)?);

    let embedder = Arc::new(load_embedder(config)?);
    let store = Arc::new(
        VectorStore::connect(
            &config.retrieval.qdrant_url,
            &config.retrieval.collection,
            config.embedding.dimension,
        )
        .await?,
    );

    let retriever = Arc::new(VectorRetriever::new(
        embedder,
        store,
        config.retrieval.threshold,
    ));

    Ok(ChatPipeline::with_config(
        Arc::new(LlmSentimentAnalyzer::new(Arc::clone(&llm))),
        retriever,
        Arc::new(LlmResponseGenerator::new(Arc::clone(&llm))),
        Arc::new(LlmFollowUpGenerator::new(llm)),
        PipelineConfig {
            top_k: config.retrieval.top_k,
        },
    ))
}

/// Load the embedding model behind a spinner; the first run downloads it
fn load_embedder(config: &Config) -> Result<EmbeddingEngine> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner} {msg}")?);
    spinner.set_message(format!("loading embedding model {}", config.embedding.model));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let engine = EmbeddingEngine::new(&config.embedding);
    spinner.finish_and_clear();

    Ok(engine?)
}
