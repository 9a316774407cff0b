/*
briefing - strategic research newsletter builder
Serves the topic-selection UI, or generates a single newsletter from the command line.
*/

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use briefing::article::TopicSelection;
use briefing::ingestion::HttpFeedSource;
use briefing::llm::remote::RemoteLlmProvider;
use briefing::pipeline::{self, NewsletterOutcome, NO_RESULTS_MESSAGE};
use briefing::server::{launch_rocket, AppState};

#[derive(Parser, Debug)]
#[command(name = "briefing", about = "Strategic research newsletter builder")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server (default)
    Serve,
    /// Generate one newsletter and write it to a markdown file
    Generate {
        /// Topic label from the vocabulary; repeat for several topics
        #[arg(long = "topic", value_name = "LABEL", required = true)]
        topics: Vec<String>,

        /// Directory receiving newsletter_<date>.md
        #[arg(long, value_name = "DIR", default_value = ".")]
        output: PathBuf,
    },
    /// List the configured topic vocabulary
    Topics,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = match load_config(args.config).await {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            error!("failed to load configuration: {:#}", e);
            return Err(e);
        }
    };

    match args.command.unwrap_or(Command::Serve) {
        Command::Topics => {
            for topic in &config.topics.available {
                println!("{}", topic);
            }
            Ok(())
        }
        Command::Serve => {
            let feeds = Arc::new(HttpFeedSource::new(&config.fetch)?);
            let llm = Arc::new(RemoteLlmProvider::from_config(&config.llm)?);
            info!(model = %config.llm.model, api_url = %config.llm.api_url, "LLM provider initialized");

            launch_rocket(AppState::new(config.clone(), feeds, llm)).await
        }
        Command::Generate { topics, output } => {
            let selection = TopicSelection::new(topics, &config.topics.available)?;
            let feeds = HttpFeedSource::new(&config.fetch)?;
            let llm = RemoteLlmProvider::from_config(&config.llm)?;

            match pipeline::generate_newsletter(&config, &feeds, &llm, &selection).await {
                NewsletterOutcome::NoResults => {
                    println!("{}", NO_RESULTS_MESSAGE);
                }
                NewsletterOutcome::Ready(newsletter) => {
                    let path = output.join(pipeline::today_filename());
                    tokio::fs::write(&path, newsletter.render())
                        .await
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Found {} strong articles.", newsletter.article_count());
                    println!("{}", path.display());
                }
            }
            Ok(())
        }
    }
}

/// Merges `config.default.toml` (if present) with `--config`, or `config.toml` when no
/// path is given. Built-in defaults fill whatever neither file sets.
async fn load_config(explicit: Option<PathBuf>) -> Result<Config> {
    let default_path = PathBuf::from("config.default.toml");

    let override_path = match explicit {
        Some(p) if !p.exists() => {
            anyhow::bail!("Config file not found: {}", p.display());
        }
        Some(p) => Some(p),
        None => {
            let p = PathBuf::from("config.toml");
            if p.exists() { Some(p) } else { None }
        }
    };

    let config = Config::load_with_defaults(
        default_path.exists().then_some(default_path.as_path()),
        override_path.as_deref(),
    )
    .await?;
    info!(default = ?default_path, override_file = ?override_path, feeds = config.feeds.len(), "configuration loaded");
    Ok(config)
}
