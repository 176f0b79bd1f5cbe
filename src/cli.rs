//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "careline")]
#[command(about = "Trợ lý tư vấn tâm lý quân nhân", long_about = None)]
#[command(version)]
pub struct Args {
    /// Override the LLM model
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Override the LLM API base URL
    #[arg(long, global = true)]
    pub api_base: Option<String>,

    /// Override the Qdrant URL
    #[arg(long, global = true)]
    pub qdrant_url: Option<String>,

    /// Use an explicit config file instead of ~/.careline/config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive chat session (default)
    Chat,
    /// Answer a single question and exit
    Ask {
        /// The question to answer
        question: String,
    },
    /// Rebuild the reference collection from the dataset
    SetupDb {
        /// Dataset CSV, defaults to data.file from the config
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Check connectivity to the LLM endpoint and the vector store
    Doctor,
    /// Print the active configuration
    Config,
}

impl Args {
    /// Fold command-line overrides into the loaded configuration
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
        if let Some(api_base) = &self.api_base {
            config.llm.api_base = api_base.clone();
        }
        if let Some(url) = &self.qdrant_url {
            config.retrieval.qdrant_url = url.clone();
        }
    }

    /// Default tracing filter for the chosen verbosity
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "careline=info",
            _ => "careline=debug",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_applied() {
        let args = Args::parse_from([
            "careline",
            "--model",
            "llama-3.1-8b-instant",
            "--qdrant-url",
            "http://qdrant:6334",
            "chat",
        ]);

        let mut config = Config::default();
        args.apply_overrides(&mut config);
        assert_eq!(config.llm.model, "llama-3.1-8b-instant");
        assert_eq!(config.retrieval.qdrant_url, "http://qdrant:6334");
        assert_eq!(config.llm.api_base, Config::default().llm.api_base);
    }

    #[test]
    fn test_verbosity_filter() {
        let quiet = Args::parse_from(["careline"]);
        assert_eq!(quiet.log_filter(), "warn");

        let debug = Args::parse_from(["careline", "-vv", "doctor"]);
        assert_eq!(debug.log_filter(), "careline=debug");
    }

    #[test]
    fn test_ask_takes_question() {
        let args = Args::parse_from(["careline", "ask", "Tôi khó ngủ thì nên làm gì?"]);
        match args.command {
            Some(Commands::Ask { question }) => {
                assert_eq!(question, "Tôi khó ngủ thì nên làm gì?")
            }
            _ => panic!("expected ask subcommand"),
        }
    }
}
